//! CLI definitions and command implementations for faultline.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use faultline::Error;
use faultline::snapshot::Snapshot;

pub mod dedup;
pub mod init;
pub mod inspect;

/// faultline — inspect failure graphs captured as JSON snapshots.
#[derive(Debug, Parser)]
#[command(name = "faultline")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, global = true, env = "FAULTLINE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Generate a default TOML configuration file.
    Init {
        /// Output path for the configuration file.
        #[arg(short, long, default_value = "config.toml")]
        output: PathBuf,

        /// Overwrite the file if it already exists.
        #[arg(long, default_value_t = false)]
        force: bool,
    },

    /// Summarise the root failure of a snapshot.
    Inspect {
        /// Path to the JSON failure graph snapshot.
        snapshot: PathBuf,
    },

    /// Deduplicate the reports of a snapshot.
    Dedup {
        /// Path to the JSON failure graph snapshot.
        snapshot: PathBuf,
    },
}

/// Read and parse a JSON failure graph snapshot.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a valid snapshot.
pub fn load_snapshot(path: &Path) -> Result<Snapshot, Error> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::snapshot(format!("failed to read '{}': {e}", path.display())))?;
    serde_json::from_str(&content)
        .map_err(|e| Error::snapshot(format!("failed to parse '{}': {e}", path.display())))
}
