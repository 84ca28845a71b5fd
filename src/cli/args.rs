//! CLI argument definitions using clap
//!
//! Commands:
//! - checkpoint-migrate import  --config <path>
//! - checkpoint-migrate resolve --config <path>   (default)
//! - checkpoint-migrate inspect --config <path>
//! - checkpoint-migrate get --owner <hex> --key <path> --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Default configuration file location
pub const DEFAULT_CONFIG_PATH: &str = "./migrate.json";

/// Migrates ledger registers from a trie checkpoint into a key-value store
#[derive(Parser, Debug)]
#[command(name = "checkpoint-migrate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Copy every register with a path into the store, raw
    Import {
        /// Path to configuration file
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
    },

    /// Write plain registers and resolve object-storage values
    Resolve {
        /// Path to configuration file
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
    },

    /// Print the checkpoint header and node counts
    Inspect {
        /// Path to configuration file
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
    },

    /// Resolve one object-storage value from an imported store
    Get {
        /// Path to configuration file
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,

        /// Owner address in hex, `0x` prefix optional
        #[arg(long)]
        owner: String,

        /// Register path: `storage/vault` (`/` is the separator) or `hex:<bytes>`
        #[arg(long)]
        key: String,
    },
}

impl Command {
    /// The run performed when no subcommand is given
    pub fn default_command() -> Self {
        Command::Resolve {
            config: PathBuf::from(DEFAULT_CONFIG_PATH),
        }
    }
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_is_none() {
        let cli = Cli::try_parse_from(["checkpoint-migrate"]).unwrap();
        assert!(cli.command.is_none());
        assert!(matches!(Command::default_command(), Command::Resolve { .. }));
    }

    #[test]
    fn test_get_arguments() {
        let cli = Cli::try_parse_from([
            "checkpoint-migrate",
            "get",
            "--owner",
            "0x01",
            "--key",
            "storage/vault",
        ])
        .unwrap();
        match cli.command {
            Some(Command::Get { owner, key, config }) => {
                assert_eq!(owner, "0x01");
                assert_eq!(key, "storage/vault");
                assert_eq!(config, PathBuf::from(DEFAULT_CONFIG_PATH));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
