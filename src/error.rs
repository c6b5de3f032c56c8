//! Error handling for the rent-roll importer
//!
//! Everything in here is fatal for a run: row-level problems never surface as
//! `Err`, they are collected as conditions and reported against source rows.

use import_types::{EntityKind, Ordinal};
use thiserror::Error;

/// Main error type for an import run
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Required data column(s) missing: {}", .columns.join(", "))]
    MissingRequiredColumns { columns: Vec<String> },

    #[error("Loader output violated its format contract: {0}")]
    Contract(#[from] TokenError),

    #[error("No provenance for {kind} derived line {line}")]
    ProvenanceMiss { kind: EntityKind, line: Ordinal },

    #[error("Item {item} out of range for {kind} derived line {line} ({contributors} contributor(s))")]
    ItemOutOfRange {
        kind: EntityKind,
        line: Ordinal,
        item: usize,
        contributors: usize,
    },

    #[error("Provenance of {0} is sealed; its table is already written")]
    SealedProvenance(EntityKind),

    #[error("Bulk load of {kind} table failed: {source}")]
    Loader {
        kind: EntityKind,
        #[source]
        source: anyhow::Error,
    },

    #[error("Directory lookup failed: {0}")]
    Directory(#[source] anyhow::Error),

    #[error("Working storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Extract read error: {0}")]
    Extract(#[from] csv::Error),
}

/// Configuration loading and validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("No schema configured for {0}")]
    MissingSchema(EntityKind),

    #[error("Field '{field}' of {kind} must declare exactly one of default, computed, column")]
    AmbiguousBinding { kind: EntityKind, field: String },

    #[error("Field '{field}' of {kind} uses the numeric rule without a column")]
    NumericWithoutColumn { kind: EntityKind, field: String },

    #[error("Field '{field}' of {kind} references undeclared header '{header}'")]
    UnknownHeader {
        kind: EntityKind,
        field: String,
        header: String,
    },

    #[error("Header '{0}' is declared more than once")]
    DuplicateHeader(String),

    #[error("Required header '{0}' is not declared")]
    MissingHeader(String),

    #[error("Status '{status}' enables {kind}, which has no working table")]
    KindWithoutTable { status: String, kind: EntityKind },
}

/// Loader error strings that do not follow
/// `<origin>: line <N>, column <C>[, item <I>] >>> <reason>`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("missing '>>>' reason separator in '{0}'")]
    MissingReason(String),

    #[error("missing origin prefix in '{0}'")]
    MissingOrigin(String),

    #[error("unparseable position '{position}' in '{text}'")]
    BadPosition { position: String, text: String },
}

/// Working storage (per-run namespace) errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Table for {0} was never written")]
    UnwrittenTable(EntityKind),
}

/// Result alias for import runs
pub type ImportResult<T> = Result<T, ImportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_columns_message() {
        let err = ImportError::MissingRequiredColumns {
            columns: vec!["Unit".to_string(), "FloorPlan".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Required data column(s) missing: Unit, FloorPlan"
        );
    }
}
