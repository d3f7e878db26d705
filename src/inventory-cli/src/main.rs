mod cli;
mod commands;
mod config;
mod dispatch;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::*;

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "inventory_db=info,inventory=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Configure {
            database,
            overwrite,
            fail_on_error,
            show,
        } => commands::configure::handle(database, overwrite, fail_on_error, show),

        command => {
            let db = dispatch::resolve_db(cli.db)?;
            dispatch::dispatch(&db, command)
        }
    }
}
