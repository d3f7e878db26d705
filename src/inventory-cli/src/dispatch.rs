//! Command dispatch functions

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

use crate::cli::Commands;
use crate::commands;
use crate::config::Config;

/// Pick the database path: `--db`/`INVENTORY_DB`, then the configured
/// default, then the built-in default.
pub fn resolve_db(flag: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(db) = flag {
        return Ok(db);
    }
    let config = Config::load()?;
    Ok(config
        .database
        .unwrap_or_else(|| PathBuf::from(inventory_db::DEFAULT_DB_PATH)))
}

/// Collapse an `--x`/`--no-x` pair; neither set keeps the configured value
fn flag_pair(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

/// Dispatch database subcommands
pub fn dispatch(db: &Path, command: Commands) -> Result<()> {
    match command {
        Commands::Init => commands::store::init(db),
        Commands::Stats => commands::store::stats(db),
        Commands::Export { output, scope } => commands::archive::export(db, &output, &scope),
        Commands::Import {
            input,
            overwrite,
            no_overwrite,
            keep_going,
            fail_fast,
            format,
        } => {
            let options = Config::load()?.import_options(
                flag_pair(overwrite, no_overwrite),
                flag_pair(fail_fast, keep_going),
            );
            commands::archive::import(db, &input, &options, format)
        }
        Commands::Configure { .. } => bail!("configure does not take a database"),
    }
}
