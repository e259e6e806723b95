//! Configuration loading and default template generation.
//!
//! This module provides:
//!
//! - [`Limits`] — traversal bounds, with methods running the core
//!   operations under those bounds.
//! - [`Config`] — the TOML configuration file.
//! - [`load_config`] — reads and parses a TOML configuration file.
//! - [`generate_default_config`] — produces a commented TOML template.
//!
//! # Configuration File Format
//!
//! ```toml
//! log_level = "info"
//!
//! [limits]
//! max_unwrap_depth = 10
//! max_fatal_iterations = 1024
//! ```

use std::path::Path;
use std::thread::JoinHandle;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::failure::Chained;
use crate::fatal::{self, MAX_ITERATIONS};
use crate::walker::{self, MAX_UNWRAP_DEPTH};

/// Bounds applied to failure graph traversals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Wrapper levels [`walker::unwrap_cause`] descends through.
    pub max_unwrap_depth: usize,
    /// Nodes [`fatal::find_fatal`] visits before giving up.
    pub max_fatal_iterations: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_unwrap_depth: MAX_UNWRAP_DEPTH,
            max_fatal_iterations: MAX_ITERATIONS,
        }
    }
}

impl Limits {
    /// [`walker::unwrap_cause`] bounded by `max_unwrap_depth`.
    #[must_use]
    pub fn unwrap_cause<'a, F: Chained>(&self, failure: &'a F) -> &'a F {
        walker::unwrap_cause_bounded(failure, self.max_unwrap_depth)
    }

    /// [`fatal::find_fatal`] bounded by `max_fatal_iterations`.
    #[must_use]
    pub fn find_fatal<'a, F: Chained>(&self, root: &'a F) -> Option<&'a F> {
        fatal::find_fatal_bounded(root, self.max_fatal_iterations)
    }

    /// [`fatal::escalate_if_fatal`] bounded by `max_fatal_iterations`.
    pub fn escalate_if_fatal<F>(&self, failure: &F) -> Option<JoinHandle<()>>
    where
        F: Chained + Clone + Send + 'static,
    {
        fatal::escalate_if_fatal_bounded(failure, self.max_fatal_iterations)
    }
}

/// Contents of a faultline configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log filter used when `RUST_LOG` is not set.
    pub log_level: Option<String>,
    /// Traversal bounds.
    pub limits: Limits,
}

/// Load configuration from a TOML file at the given path.
///
/// Keys missing from the file fall back to their defaults.
///
/// # Errors
///
/// Returns an error if the file cannot be resolved, read, or parsed.
pub fn load_config(path: &Path) -> Result<Config, Error> {
    let config_path = path.canonicalize().map_err(|e| {
        Error::config_with(
            format!("failed to resolve config path '{}'", path.display()),
            e,
        )
    })?;
    let content = std::fs::read_to_string(&config_path).map_err(|e| {
        Error::config_with(
            format!("failed to read config file '{}'", config_path.display()),
            e,
        )
    })?;
    toml::from_str(&content).map_err(|e| {
        Error::config_with(
            format!("failed to parse TOML config '{}'", config_path.display()),
            e,
        )
    })
}

/// Generate a default TOML configuration template.
#[must_use]
pub fn generate_default_config() -> String {
    format!(
        r#"# faultline configuration

# Log filter used when RUST_LOG is not set.
log_level = "info"

# ── Traversal limits ────────────────────────────────────────────────
# Failure graphs may contain cycles; every walk is bounded.

[limits]
# Wrapper levels to strip before settling on a cause.
max_unwrap_depth = {MAX_UNWRAP_DEPTH}
# Nodes to visit while searching for a fatal failure.
max_fatal_iterations = {MAX_ITERATIONS}
"#
    )
}
