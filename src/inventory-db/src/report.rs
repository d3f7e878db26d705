//! Import result reporting.

use crate::types::RecordKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Created/updated counts for one record kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeCounts {
    pub imported: usize,
    pub updated: usize,
}

/// What happened to a single record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Created,
    Updated,
    Skipped,
}

/// Outcome of a whole import. Always returned to the caller, even when the
/// archive could not be read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub success: bool,
    pub overwrite: bool,
    pub counts: BTreeMap<RecordKind, TypeCounts>,
    pub total_imported: usize,
    pub total_updated: usize,
    pub skipped: usize,
    pub failed: usize,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ImportResult {
    pub fn new(overwrite: bool) -> Self {
        Self {
            overwrite,
            ..Default::default()
        }
    }

    /// A failed outcome with a single error and zero counts
    pub fn fatal(overwrite: bool, message: impl Into<String>) -> Self {
        let mut result = Self::new(overwrite);
        result.error(message);
        result.finish()
    }

    /// Count a per-record decision
    pub fn record(&mut self, kind: RecordKind, outcome: Outcome) {
        match outcome {
            Outcome::Created => {
                self.counts.entry(kind).or_default().imported += 1;
                self.total_imported += 1;
            }
            Outcome::Updated => {
                self.counts.entry(kind).or_default().updated += 1;
                self.total_updated += 1;
            }
            Outcome::Skipped => self.skipped += 1,
        }
    }

    /// Count a failed record and remember why
    pub fn fail(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::error!("{}", message);
        self.failed += 1;
        self.errors.push(message);
    }

    /// Record an error that is not tied to a counted record
    fn error(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::error!("{}", message);
        self.errors.push(message);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{}", message);
        self.warnings.push(message);
    }

    /// Imported count for one kind
    pub fn imported(&self, kind: RecordKind) -> usize {
        self.counts.get(&kind).map(|c| c.imported).unwrap_or(0)
    }

    /// Updated count for one kind
    pub fn updated(&self, kind: RecordKind) -> usize {
        self.counts.get(&kind).map(|c| c.updated).unwrap_or(0)
    }

    /// Settle the success flag: true iff no errors were recorded
    pub fn finish(mut self) -> Self {
        self.success = self.errors.is_empty();
        self
    }
}

impl std::fmt::Display for ImportResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Import {} (overwrite: {})",
            if self.success { "succeeded" } else { "failed" },
            if self.overwrite { "on" } else { "off" }
        )?;
        for kind in RecordKind::ALL {
            let counts = self.counts.get(kind).copied().unwrap_or_default();
            writeln!(
                f,
                "  {:<30} {:>5} imported {:>5} updated",
                kind.to_string(),
                counts.imported,
                counts.updated
            )?;
        }
        writeln!(
            f,
            "  Total: {} imported, {} updated, {} skipped, {} failed",
            self.total_imported, self.total_updated, self.skipped, self.failed
        )?;
        for warning in &self.warnings {
            writeln!(f, "  warning: {}", warning)?;
        }
        for error in &self.errors {
            writeln!(f, "  error: {}", error)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_result() {
        let result = ImportResult::fatal(false, "data.json missing in archive");
        assert!(!result.success);
        assert_eq!(result.errors, vec!["data.json missing in archive"]);
        assert_eq!(result.total_imported, 0);
        assert_eq!(result.failed, 0);
        assert!(result.counts.is_empty());
    }

    #[test]
    fn test_record_counts() {
        let mut result = ImportResult::new(true);
        result.record(RecordKind::Items, Outcome::Created);
        result.record(RecordKind::Items, Outcome::Created);
        result.record(RecordKind::Items, Outcome::Updated);
        result.record(RecordKind::Tags, Outcome::Skipped);

        assert_eq!(result.imported(RecordKind::Items), 2);
        assert_eq!(result.updated(RecordKind::Items), 1);
        assert_eq!(result.imported(RecordKind::Tags), 0);
        assert_eq!(result.total_imported, 2);
        assert_eq!(result.total_updated, 1);
        assert_eq!(result.skipped, 1);
    }

    #[test]
    fn test_warnings_do_not_fail() {
        let mut result = ImportResult::new(false);
        result.warn("storage 1: parent storage 2 not found, leaving unset");
        let result = result.finish();
        assert!(result.success);
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_errors_fail() {
        let mut result = ImportResult::new(false);
        result.fail("Failed to import item 1: boom");
        let result = result.finish();
        assert!(!result.success);
        assert_eq!(result.failed, 1);
    }

    #[test]
    fn test_serializes_camel_case() {
        let mut result = ImportResult::new(false);
        result.record(RecordKind::Rooms, Outcome::Created);
        let json = serde_json::to_value(result.finish()).unwrap();
        assert_eq!(json["totalImported"], 1);
        assert_eq!(json["counts"]["rooms"]["imported"], 1);
        assert_eq!(json["success"], true);
    }
}
