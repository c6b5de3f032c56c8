//! External collaborators
//!
//! The importer never persists anything itself. It hands working tables to a
//! [`BulkLoader`] and asks directories about what the loader created. Every
//! method is awaited to completion before the run moves on.

use async_trait::async_trait;
use import_types::EntityKind;
use std::path::Path;

/// Loads one working table into the system of record
#[async_trait]
pub trait BulkLoader: Send + Sync {
    /// Load a table; each returned string is one row-level loader error
    /// in the `<origin>: line N, column C[, item I] >>> reason` format
    async fn load(&self, kind: EntityKind, table: &Path) -> anyhow::Result<Vec<String>>;

    /// Records of `kind` present after the load
    async fn imported_count(&self, kind: EntityKind) -> anyhow::Result<usize>;
}

/// A person known to the system of record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonMatch {
    pub id: i64,
    pub note: String,
}

/// Person lookups used to recover references for inserted or existing people
#[async_trait]
pub trait PersonDirectory: Send + Sync {
    /// People whose email or phone equals `contact`
    async fn find_by_contact(&self, contact: &str) -> anyhow::Result<Vec<i64>>;

    /// People whose note contains `fragment`
    async fn find_by_note(&self, fragment: &str) -> anyhow::Result<Vec<PersonMatch>>;
}

/// Identifies a custom attribute definition by value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeQuery<'a> {
    pub value_type: &'a str,
    pub name: &'a str,
    pub value: &'a str,
    pub units: &'a str,
}

/// Rentable-type and custom-attribute lookups for attribute references
#[async_trait]
pub trait AttributeDirectory: Send + Sync {
    async fn rentable_type_id(&self, style: &str) -> anyhow::Result<Option<i64>>;

    async fn custom_attribute_id(&self, query: &AttributeQuery<'_>) -> anyhow::Result<Option<i64>>;

    async fn reference_exists(&self, rentable_type: i64, attribute: i64) -> anyhow::Result<bool>;

    async fn insert_reference(&self, rentable_type: i64, attribute: i64) -> anyhow::Result<()>;
}
