//! CLI module
//!
//! Provides command-line interface for:
//! - import: copy registers into the store
//! - resolve: write plain registers, resolve object-storage values
//! - inspect: checkpoint header and node counts
//! - get: one resolved value from an imported store

mod args;
mod commands;
mod config;
mod errors;

pub use args::{Cli, Command, DEFAULT_CONFIG_PATH};
pub use commands::{get, import, inspect, resolve, run, run_command};
pub use config::Config;
pub use errors::{CliError, CliErrorCode, CliResult};
