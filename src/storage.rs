//! Per-run working storage
//!
//! Working tables are CSV files in a namespace directory named by the run
//! token, so concurrent runs never see each other's files.

use crate::dedup::TableBuilder;
use crate::error::StorageError;
use import_types::EntityKind;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Debug)]
pub struct WorkingStorage {
    dir: PathBuf,
    written: BTreeMap<EntityKind, PathBuf>,
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StorageError + '_ {
    move |source| StorageError::Io {
        path: path.display().to_string(),
        source,
    }
}

impl WorkingStorage {
    /// Create the namespace `<root>/<token>`
    pub fn create(root: &Path, token: Uuid) -> Result<Self, StorageError> {
        let dir = root.join(token.simple().to_string());
        std::fs::create_dir_all(&dir).map_err(io_error(&dir))?;
        tracing::debug!(dir = %dir.display(), "working storage created");
        Ok(Self {
            dir,
            written: BTreeMap::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write a table, header row first
    pub fn write_table(&mut self, table: &TableBuilder) -> Result<PathBuf, StorageError> {
        let path = self.dir.join(format!("{}.csv", table.kind.key()));
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_path(&path)?;
        writer.write_record(table.header())?;
        for row in table.rows() {
            writer.write_record(row)?;
        }
        writer.flush().map_err(io_error(&path))?;

        tracing::debug!(kind = %table.kind, rows = table.len(), "working table written");
        self.written.insert(table.kind, path.clone());
        Ok(path)
    }

    pub fn path(&self, kind: EntityKind) -> Result<&Path, StorageError> {
        self.written
            .get(&kind)
            .map(PathBuf::as_path)
            .ok_or(StorageError::UnwrittenTable(kind))
    }

    /// End the run; the namespace is removed unless retained
    pub fn finish(self, retain: bool) -> Result<Option<PathBuf>, StorageError> {
        if retain {
            tracing::info!(dir = %self.dir.display(), "working storage retained");
            return Ok(Some(self.dir));
        }
        std::fs::remove_dir_all(&self.dir).map_err(io_error(&self.dir))?;
        Ok(None)
    }
}
