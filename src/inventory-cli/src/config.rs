//! Configuration management for the inventory CLI

use anyhow::{Context, Result};
use inventory_db::ImportOptions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Default database path
    pub database: Option<PathBuf>,
    pub import: ImportDefaults,
}

/// Defaults applied to `inventory import` when no flag overrides them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportDefaults {
    pub overwrite: bool,
    pub fail_on_error: bool,
}

impl Default for ImportDefaults {
    fn default() -> Self {
        let options = ImportOptions::default();
        Self {
            overwrite: options.overwrite,
            fail_on_error: options.fail_on_error,
        }
    }
}

impl Config {
    /// Get the path to the config file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("inventory");

        Ok(config_dir.join("config.toml"))
    }

    /// Load configuration from file, or the defaults if it doesn't exist
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        toml::from_str(&contents).context("Failed to parse config file")
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory at {}", parent.display())
            })?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, contents)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;

        Ok(())
    }

    /// Import options after applying command-line overrides. `None` keeps
    /// the configured default.
    pub fn import_options(
        &self,
        overwrite: Option<bool>,
        fail_on_error: Option<bool>,
    ) -> ImportOptions {
        ImportOptions {
            overwrite: overwrite.unwrap_or(self.import.overwrite),
            fail_on_error: fail_on_error.unwrap_or(self.import.fail_on_error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert!(config.import.fail_on_error);
        assert!(!config.import.overwrite);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = Config {
            database: Some(PathBuf::from("/tmp/home.db")),
            import: ImportDefaults {
                overwrite: true,
                fail_on_error: false,
            },
        };
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[import]\noverwrite = true\n").unwrap();
        let config = Config::load_from(&path).unwrap();
        assert!(config.database.is_none());
        assert!(config.import.overwrite);
        assert!(config.import.fail_on_error);
    }

    #[test]
    fn test_flags_override_defaults() {
        let config = Config::default();
        let options = config.import_options(Some(true), Some(false));
        assert!(options.overwrite);
        assert!(!options.fail_on_error);

        let options = config.import_options(None, None);
        assert_eq!(options, ImportOptions::default());
    }

    #[test]
    fn test_flags_turn_off_configured_defaults() {
        let config = Config {
            database: None,
            import: ImportDefaults {
                overwrite: true,
                fail_on_error: false,
            },
        };
        let options = config.import_options(None, None);
        assert!(options.overwrite);
        assert!(!options.fail_on_error);

        let options = config.import_options(Some(false), Some(true));
        assert_eq!(options, ImportOptions::default());
    }
}
