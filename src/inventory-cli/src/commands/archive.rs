//! Archive export and import

use anyhow::{bail, Context, Result};
use inventory_db::{export_archive, import_archive, ExportScope, ImportOptions};
use std::path::Path;

use super::store;
use crate::cli::OutputFormat;

/// Handle `inventory export`
pub fn export(db: &Path, output: &Path, scope: &[String]) -> Result<()> {
    let scope = ExportScope::parse(scope)?;
    let store = store::open(db)?;

    let bytes = export_archive(&store, &scope)?;
    std::fs::write(output, &bytes)
        .with_context(|| format!("Failed to write archive to {}", output.display()))?;

    let kinds: Vec<String> = scope.kinds().map(|k| k.to_string()).collect();
    println!(
        "Exported {} to {} ({} bytes)",
        kinds.join(", "),
        output.display(),
        bytes.len()
    );
    Ok(())
}

/// Handle `inventory import`
pub fn import(db: &Path, input: &Path, options: &ImportOptions, format: OutputFormat) -> Result<()> {
    let bytes = std::fs::read(input)
        .with_context(|| format!("Failed to read archive {}", input.display()))?;
    let store = store::open(db)?;

    let result = import_archive(&store, &bytes, options);
    match format {
        OutputFormat::Text => print!("{}", result),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
    }

    if !result.success {
        bail!("Import of {} failed with {} error(s)", input.display(), result.errors.len());
    }
    Ok(())
}
