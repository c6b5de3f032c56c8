//! Shared helpers for integration tests
//!
//! `MockWorld` plays every external collaborator: it captures each working
//! table at load time, returns scripted loader errors, and registers what a
//! real loader would have created so later directory lookups see it.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use rentroll_import::{
    parse_token, AttributeDirectory, AttributeQuery, BulkLoader, EntityKind, Extract,
    ImportConfig, ImportPipeline, PersonDirectory, PersonMatch,
};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};

pub const FIXTURE_CONFIG: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/test_config.yaml");

pub fn config() -> Arc<ImportConfig> {
    Arc::new(ImportConfig::from_file(FIXTURE_CONFIG).unwrap())
}

pub fn run_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 14).unwrap()
}

pub fn extract(text: &str) -> Extract {
    Extract::from_reader(text.as_bytes()).unwrap()
}

/// A loaded working table, header row first
#[derive(Debug, Clone)]
pub struct LoadedTable {
    pub kind: EntityKind,
    pub rows: Vec<Vec<String>>,
}

impl LoadedTable {
    pub fn column(&self, name: &str) -> usize {
        self.rows[0].iter().position(|h| h == name).unwrap()
    }

    /// Value at a derived ordinal (header is line 1)
    pub fn cell(&self, line: usize, name: &str) -> &str {
        &self.rows[line - 1][self.column(name)]
    }

    pub fn data_len(&self) -> usize {
        self.rows.len() - 1
    }
}

#[derive(Default)]
pub struct MockWorld {
    load_errors: Mutex<HashMap<EntityKind, Vec<String>>>,
    loads: Mutex<Vec<LoadedTable>>,
    imported: Mutex<HashMap<EntityKind, usize>>,
    contacts: Mutex<HashMap<String, Vec<i64>>>,
    people: Mutex<Vec<PersonMatch>>,
    rentable_types: Mutex<HashMap<String, i64>>,
    attributes: Mutex<HashMap<(String, String), i64>>,
    refs: Mutex<HashSet<(i64, i64)>>,
}

impl MockWorld {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn pipeline(self: &Arc<Self>) -> ImportPipeline {
        ImportPipeline::new(config(), self.clone(), self.clone(), self.clone())
    }

    /// Errors the loader reports for `kind`
    pub fn fail_load(&self, kind: EntityKind, errors: &[&str]) {
        self.load_errors
            .lock()
            .unwrap()
            .insert(kind, errors.iter().map(|e| e.to_string()).collect());
    }

    pub fn with_contact(&self, contact: &str, ids: &[i64]) {
        self.contacts
            .lock()
            .unwrap()
            .insert(contact.to_string(), ids.to_vec());
    }

    pub fn existing_reference(&self, rentable_type: i64, attribute: i64) {
        self.refs.lock().unwrap().insert((rentable_type, attribute));
    }

    pub fn table(&self, kind: EntityKind) -> Option<LoadedTable> {
        self.loads
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|t| t.kind == kind)
            .cloned()
    }

    pub fn load_order(&self) -> Vec<EntityKind> {
        self.loads.lock().unwrap().iter().map(|t| t.kind).collect()
    }

    pub fn reference_count(&self) -> usize {
        self.refs.lock().unwrap().len()
    }

    fn register(&self, table: &LoadedTable, failed: &HashSet<usize>) {
        let inserted: Vec<(usize, &Vec<String>)> = table
            .rows
            .iter()
            .enumerate()
            .skip(1)
            .map(|(idx, row)| (idx + 1, row))
            .filter(|(line, _)| !failed.contains(line))
            .collect();
        self.imported.lock().unwrap().insert(table.kind, inserted.len());

        match table.kind {
            EntityKind::Person => {
                let notes = table.column("Notes");
                let mut people = self.people.lock().unwrap();
                for (_, row) in inserted {
                    let id = 100 + people.len() as i64;
                    people.push(PersonMatch {
                        id,
                        note: row[notes].clone(),
                    });
                }
            }
            EntityKind::RentableType => {
                let style = table.column("Style");
                let mut types = self.rentable_types.lock().unwrap();
                for (_, row) in inserted {
                    let id = 1000 + types.len() as i64;
                    types.insert(row[style].clone(), id);
                }
            }
            EntityKind::CustomAttribute => {
                let (name, value) = (table.column("Name"), table.column("Value"));
                let mut attributes = self.attributes.lock().unwrap();
                for (_, row) in inserted {
                    let id = 2000 + attributes.len() as i64;
                    attributes.insert((row[name].clone(), row[value].clone()), id);
                }
            }
            _ => {}
        }
    }
}

#[async_trait]
impl BulkLoader for MockWorld {
    async fn load(&self, kind: EntityKind, table: &Path) -> anyhow::Result<Vec<String>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(table)?;
        let rows = reader
            .records()
            .map(|r| r.map(|rec| rec.iter().map(str::to_string).collect()))
            .collect::<Result<Vec<Vec<String>>, _>>()?;
        let loaded = LoadedTable { kind, rows };

        let errors = self
            .load_errors
            .lock()
            .unwrap()
            .get(&kind)
            .cloned()
            .unwrap_or_default();
        let failed: HashSet<usize> = errors
            .iter()
            .filter_map(|e| parse_token(e).into_result().ok())
            .map(|t| t.line)
            .collect();

        self.register(&loaded, &failed);
        self.loads.lock().unwrap().push(loaded);
        Ok(errors)
    }

    async fn imported_count(&self, kind: EntityKind) -> anyhow::Result<usize> {
        Ok(self.imported.lock().unwrap().get(&kind).copied().unwrap_or(0))
    }
}

#[async_trait]
impl PersonDirectory for MockWorld {
    async fn find_by_contact(&self, contact: &str) -> anyhow::Result<Vec<i64>> {
        Ok(self
            .contacts
            .lock()
            .unwrap()
            .get(contact)
            .cloned()
            .unwrap_or_default())
    }

    async fn find_by_note(&self, fragment: &str) -> anyhow::Result<Vec<PersonMatch>> {
        Ok(self
            .people
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.note.contains(fragment))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AttributeDirectory for MockWorld {
    async fn rentable_type_id(&self, style: &str) -> anyhow::Result<Option<i64>> {
        Ok(self.rentable_types.lock().unwrap().get(style).copied())
    }

    async fn custom_attribute_id(&self, query: &AttributeQuery<'_>) -> anyhow::Result<Option<i64>> {
        Ok(self
            .attributes
            .lock()
            .unwrap()
            .get(&(query.name.to_string(), query.value.to_string()))
            .copied())
    }

    async fn reference_exists(&self, rentable_type: i64, attribute: i64) -> anyhow::Result<bool> {
        Ok(self.refs.lock().unwrap().contains(&(rentable_type, attribute)))
    }

    async fn insert_reference(&self, rentable_type: i64, attribute: i64) -> anyhow::Result<()> {
        self.refs.lock().unwrap().insert((rentable_type, attribute));
        Ok(())
    }
}
