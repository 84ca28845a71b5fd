//! CLI command implementations
//!
//! `import` and `resolve` run the migration driver; `inspect` and `get`
//! are read-only helpers over the checkpoint and the store. Every command
//! prints one JSON object on stdout.

use std::io::{self, Write};
use std::path::Path;

use serde_json::{json, Value};

use crate::checkpoint::CheckpointReader;
use crate::migration::{run_migration, MigrationMode};
use crate::namespace::{self, PathClass};
use crate::observability::{log_event, Event, Logger};
use crate::payload::{decode_payload, LogicalKey, PATH_SEPARATOR};
use crate::slab::SlabResolver;
use crate::store::{LedgerReader, LedgerStore};

use super::args::{Cli, Command, DEFAULT_CONFIG_PATH};
use super::config::Config;
use super::errors::{CliError, CliResult};

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// With no subcommand, runs `resolve` with the default configuration.
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_command(cli.command.unwrap_or_else(Command::default_command))
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Import { config } => import(&config),
        Command::Resolve { config } => resolve(&config),
        Command::Inspect { config } => inspect(&config),
        Command::Get { config, owner, key } => get(&config, &owner, &key),
    }
}

/// Copy every register with a path into the store
pub fn import(config_path: &Path) -> CliResult<()> {
    migrate(config_path, MigrationMode::Import)
}

/// Write plain registers and resolve object-storage values
pub fn resolve(config_path: &Path) -> CliResult<()> {
    migrate(config_path, MigrationMode::Resolve)
}

fn migrate(config_path: &Path, mode: MigrationMode) -> CliResult<()> {
    let config = load_config(config_path)?;
    let report = run_migration(
        &config.checkpoint_path,
        &config.store_path,
        &config.migration_options(mode),
    )?;

    write_json(&serde_json::to_value(&report)?)?;
    report.into_result()?;
    Ok(())
}

/// Print the checkpoint header and node counts
pub fn inspect(config_path: &Path) -> CliResult<()> {
    let config = load_config(config_path)?;
    let mut reader = CheckpointReader::open(&config.checkpoint_path)?;
    let header = reader.read_header()?;

    let mut nodes = 0u64;
    let mut pathless = 0u64;
    let mut plain = 0u64;
    let mut object_storage = 0u64;
    let mut slab_registers = 0u64;
    let mut undecodable = 0u64;

    while let Some(node) = reader.next_node()? {
        nodes += 1;
        if !node.has_path() {
            pathless += 1;
            continue;
        }
        let key = match decode_payload(&node.encoded_payload).and_then(|p| p.logical_key()) {
            Ok(key) => key,
            Err(_) => {
                undecodable += 1;
                continue;
            }
        };
        if namespace::is_slab_key(&key.path) {
            slab_registers += 1;
        }
        match namespace::classify(&key.path) {
            PathClass::Plain => plain += 1,
            PathClass::ObjectStorage => object_storage += 1,
        }
    }

    write_json(&json!({
        "checkpoint": config.checkpoint_path.display().to_string(),
        "header": {
            "format_markers": header.format_markers,
            "node_count": header.node_count,
            "trailer": header.trailer,
        },
        "nodes": nodes,
        "leaves": nodes - pathless,
        "pathless": pathless,
        "plain": plain,
        "object_storage": object_storage,
        "slab_registers": slab_registers,
        "undecodable": undecodable,
    }))
}

/// Resolve one object-storage value from an imported store
pub fn get(config_path: &Path, owner: &str, key: &str) -> CliResult<()> {
    let config = load_config(config_path)?;
    let owner = parse_owner(owner)?;
    let path = parse_key(key)?;

    let store = LedgerStore::open_existing(&config.store_path)?;
    let adapter = LedgerReader::new(&store);
    let value = SlabResolver::new(&adapter).read_value(&owner, &path)?;

    let key = LogicalKey::new(owner, path);
    write_json(&json!({
        "owner": format!("0x{}", hex::encode(&key.owner)),
        "path": key.display_path(),
        "value": value.to_json(),
    }))
}

fn load_config(config_path: &Path) -> CliResult<Config> {
    let config = Config::load_or_default(config_path, Path::new(DEFAULT_CONFIG_PATH))?;
    if let Some(severity) = config.log_severity() {
        Logger::set_min_severity(severity);
    }
    let source = config_path.display().to_string();
    log_event(Event::ConfigLoaded, &[("source", source.as_str())]);
    Ok(config)
}

/// Owner bytes from hex, `0x` prefix optional
pub(crate) fn parse_owner(owner: &str) -> CliResult<Vec<u8>> {
    let digits = owner.strip_prefix("0x").unwrap_or(owner);
    hex::decode(digits)
        .map_err(|e| CliError::invalid_argument(format!("Invalid owner '{}': {}", owner, e)))
}

/// Path bytes from `hex:<bytes>` or text with `/` as the separator
pub(crate) fn parse_key(key: &str) -> CliResult<Vec<u8>> {
    if let Some(digits) = key.strip_prefix("hex:") {
        return hex::decode(digits)
            .map_err(|e| CliError::invalid_argument(format!("Invalid key '{}': {}", key, e)));
    }
    if key.is_empty() {
        return Err(CliError::invalid_argument("Key must not be empty"));
    }
    Ok(key
        .bytes()
        .map(|b| if b == b'/' { PATH_SEPARATOR } else { b })
        .collect())
}

fn write_json(value: &Value) -> CliResult<()> {
    let mut stdout = io::stdout();
    serde_json::to_writer(&mut stdout, value)?;
    writeln!(stdout)?;
    stdout.flush()?;
    Ok(())
}
