//! Core CLI definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Output format for the import report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "inventory")]
#[command(about = "Inventory database and archive tool", long_about = None)]
pub struct Cli {
    /// Path to the inventory database (falls back to the configured default)
    #[arg(long, global = true, env = "INVENTORY_DB")]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the inventory database
    Init,

    /// Show record counts
    Stats,

    /// Export the inventory to a ZIP archive
    #[command(visible_alias = "e")]
    Export {
        /// Output archive path
        #[arg(short, long)]
        output: PathBuf,

        /// Record types to export (e.g. rooms,items); defaults to all
        #[arg(short, long, value_delimiter = ',')]
        scope: Vec<String>,
    },

    /// Import a ZIP archive into the inventory
    #[command(visible_alias = "i")]
    Import {
        /// Archive to import
        input: PathBuf,

        /// Replace existing records that share a stable identifier
        #[arg(long, conflicts_with = "no_overwrite")]
        overwrite: bool,

        /// Skip existing records even when overwrite is the configured default
        #[arg(long)]
        no_overwrite: bool,

        /// Continue past failed records instead of stopping at the first one
        #[arg(long, conflicts_with = "fail_fast")]
        keep_going: bool,

        /// Stop at the first failed record even when the configured default
        /// is to keep going
        #[arg(long)]
        fail_fast: bool,

        /// Report format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Configure default settings
    #[command(visible_alias = "c")]
    Configure {
        /// Set the default database path
        #[arg(long)]
        database: Option<PathBuf>,

        /// Default overwrite mode for imports
        #[arg(long)]
        overwrite: Option<bool>,

        /// Default fail-fast mode for imports
        #[arg(long)]
        fail_on_error: Option<bool>,

        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
}
