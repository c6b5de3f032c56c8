//! Rent-roll extract importer
//!
//! Converts vendor rent-roll extracts into the working tables of a bulk
//! loader and maps every loader rejection back to the extract row the
//! customer has to fix.
//!
//! ## Pipeline
//! Extract rows flow through one path:
//! Header detection -> Row classification -> Field projection -> Dedup /
//! provenance -> Working tables -> Bulk load -> Error translation -> Report
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rentroll_import::{Extract, ImportConfig, ImportPipeline, ImportRequest};
//! # async fn demo(pipeline: ImportPipeline) -> anyhow::Result<()> {
//! let extract = Extract::from_path("rentroll.csv".as_ref())?;
//! let date = chrono::NaiveDate::from_ymd_opt(2026, 10, 14).unwrap();
//! let request = ImportRequest::new(extract, date, "/tmp/rentroll").with_value("BUD", "REX");
//! let outcome = pipeline.run(request).await?;
//! println!("{}", outcome.report.to_json()?);
//! # Ok(())
//! # }
//! ```

// Core error handling
pub mod error;

// Configuration and per-run context
pub mod config;
pub mod run;

// Extract reading and header detection
pub mod extract;

// Row classification and field projection
pub mod classify;
pub mod projection;

// Identity, provenance and ingestion
pub mod dedup;
pub mod ingest;
pub mod provenance;

// External collaborators and working storage
pub mod loader;
pub mod storage;

// Reporting and orchestration
pub mod pipeline;
pub mod report;

#[cfg(test)]
pub(crate) mod testing;

pub use classify::{KindSet, RowClassifier, RowStatus};
pub use config::{ConfigDocument, ImportConfig};
pub use dedup::{Admission, DedupAggregator, DedupPolicy, TableBuilder};
pub use error::{ConfigError, ImportError, ImportResult, StorageError, TokenError};
pub use extract::{Extract, SourceRow, SupplementalContacts};
pub use import_types::{
    Condition, EntityKind, KindSummary, Ordinal, ReportEntry, Severity,
};
pub use loader::{AttributeDirectory, AttributeQuery, BulkLoader, PersonDirectory, PersonMatch};
pub use pipeline::{ImportOutcome, ImportPipeline, ImportRequest, Stage};
pub use projection::{Binding, DerivedRecord, FieldSpec, ProjectionContext, Rule, Schema};
pub use provenance::{parse_token, ErrorToken, ErrorTranslator, ParsedToken, ProvenanceIndex};
pub use report::{ConditionLog, ImportReport, ReportAssembler, RowIssues};
pub use run::RunContext;

/// Install a `tracing` subscriber filtered by `RUST_LOG` (default `info`)
///
/// Safe to call more than once; later calls are ignored.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init();
}
