//! Configuration command handlers
//!
//! Handles the `configure` subcommand for setting up CLI defaults.

use crate::config::Config;
use anyhow::Result;
use std::path::PathBuf;

/// Handle the configure command
pub fn handle(
    database: Option<PathBuf>,
    overwrite: Option<bool>,
    fail_on_error: Option<bool>,
    show: bool,
) -> Result<()> {
    let mut config = Config::load()?;

    if show {
        show_config(&config);
        return Ok(());
    }

    if !apply(&mut config, database, overwrite, fail_on_error) {
        show_usage();
        return Ok(());
    }

    config.save()?;
    println!("Configuration updated");
    show_config(&config);
    Ok(())
}

/// Apply the given settings. Returns false if nothing was given.
fn apply(
    config: &mut Config,
    database: Option<PathBuf>,
    overwrite: Option<bool>,
    fail_on_error: Option<bool>,
) -> bool {
    let changed = database.is_some() || overwrite.is_some() || fail_on_error.is_some();
    if let Some(database) = database {
        config.database = Some(database);
    }
    if let Some(overwrite) = overwrite {
        config.import.overwrite = overwrite;
    }
    if let Some(fail_on_error) = fail_on_error {
        config.import.fail_on_error = fail_on_error;
    }
    changed
}

/// Display current configuration
fn show_config(config: &Config) {
    match &config.database {
        Some(db) => println!("Database: {}", db.display()),
        None => println!(
            "Database: {} (default)",
            inventory_db::DEFAULT_DB_PATH
        ),
    }
    println!("Import overwrite: {}", config.import.overwrite);
    println!("Import fail on error: {}", config.import.fail_on_error);

    if let Ok(path) = Config::config_path() {
        println!("Config file: {}", path.display());
    }
}

/// Show usage help for the configure command
fn show_usage() {
    println!("Usage: inventory configure --database PATH");
    println!("   or: inventory configure --overwrite true --fail-on-error false");
    println!("   or: inventory configure --show");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_nothing() {
        let mut config = Config::default();
        assert!(!apply(&mut config, None, None, None));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_apply_settings() {
        let mut config = Config::default();
        assert!(apply(
            &mut config,
            Some(PathBuf::from("home.db")),
            None,
            Some(false)
        ));
        assert_eq!(config.database, Some(PathBuf::from("home.db")));
        assert!(!config.import.overwrite);
        assert!(!config.import.fail_on_error);
    }

    #[test]
    fn test_config_path_exists() {
        assert!(Config::config_path().is_ok());
    }
}
