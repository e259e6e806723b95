//! faultline CLI
//!
//! Inspects failure graphs captured as JSON snapshots using the
//! `faultline` library.
//!
//! ```sh
//! faultline init                  # Generate default config.toml
//! faultline inspect graph.json    # Summarise the root failure
//! faultline dedup graph.json      # Deduplicate per-resource reports
//! ```

mod cmd;
mod telemetry;

use clap::Parser;
use cmd::{Cli, Commands};
use faultline::config::{Config, load_config};

use crate::telemetry::Telemetry;

#[allow(clippy::print_stderr)]
fn main() {
    let cli = Cli::parse();

    let config = match cli.config.as_deref().map(load_config).transpose() {
        Ok(config) => config.unwrap_or_default(),
        Err(e) => {
            eprintln!("Error: {}", report(&e));
            std::process::exit(1);
        }
    };

    let mut telemetry = Telemetry::new();
    if let Some(level) = &config.log_level {
        telemetry = telemetry.with_log_level(level.clone());
    }
    telemetry.register();

    let result = run(cli.command, &config);

    if let Err(e) = result {
        eprintln!("Error: {}", report(&e));
        std::process::exit(1);
    }
}

fn run(command: Commands, config: &Config) -> Result<(), faultline::Error> {
    match command {
        Commands::Init { output, force } => cmd::init::run(&output, force),
        Commands::Inspect { snapshot } => cmd::inspect::run(&snapshot, &config.limits),
        Commands::Dedup { snapshot } => cmd::dedup::run(&snapshot),
    }
}

/// Formats an error followed by its sources.
fn report(error: &dyn std::error::Error) -> String {
    let mut out = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}
