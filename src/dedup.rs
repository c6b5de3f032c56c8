//! Deduplication and aggregation of derived rows
//!
//! Each working table enforces its own identity rule:
//!
//! | Kind | Key | On collision |
//! |------|-----|--------------|
//! | Person, RentalAgreement | none | every candidate is a new row |
//! | RentableType, CustomAttribute | style / attribute value | later candidates discarded |
//! | Rentable | unit | status and type references appended, provenance extended |
//!
//! Derived ordinals count the header as line 1, so the first data row of every
//! table is ordinal 2.

use crate::config::ImportConfig;
use crate::error::{ConfigError, ImportError};
use crate::projection::{DerivedRecord, Schema};
use crate::provenance::ProvenanceIndex;
use import_types::{EntityKind, Ordinal};
use std::collections::{BTreeMap, HashMap};

/// Fields of a rentable row that accumulate across merged source rows
pub const RENTABLE_MERGE_FIELDS: [&str; 2] = ["RentableStatus", "RentableTypeRef"];

/// Working table header of synthesized custom attributes
pub const CUSTOM_ATTRIBUTE_HEADER: [&str; 5] = ["BUD", "Name", "ValueType", "Value", "Units"];

/// Derived ordinal of the first data row
pub const FIRST_DERIVED: Ordinal = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DedupPolicy {
    /// No identity; every candidate is emitted
    Unique,
    /// First occurrence wins
    Discard,
    /// First occurrence wins; these field positions accumulate later values
    Merge(Vec<usize>),
}

impl DedupPolicy {
    pub fn for_kind(kind: EntityKind, schema: Option<&Schema>) -> Result<Self, ConfigError> {
        Ok(match kind {
            EntityKind::Person | EntityKind::RentalAgreement | EntityKind::CustomAttributeRef => {
                DedupPolicy::Unique
            }
            EntityKind::RentableType | EntityKind::CustomAttribute => DedupPolicy::Discard,
            EntityKind::Rentable => {
                let schema = schema.ok_or(ConfigError::MissingSchema(kind))?;
                let positions = RENTABLE_MERGE_FIELDS
                    .iter()
                    .filter_map(|field| schema.position(field))
                    .collect();
                DedupPolicy::Merge(positions)
            }
        })
    }
}

/// What happened to one candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Emitted(Ordinal),
    Merged(Ordinal),
    Discarded(Ordinal),
}

/// Rows of one working table plus its identity state
#[derive(Debug, Clone)]
pub struct TableBuilder {
    pub kind: EntityKind,
    header: Vec<String>,
    rows: Vec<Vec<String>>,
    policy: DedupPolicy,
    seen: HashMap<String, Ordinal>,
    separator: String,
}

impl TableBuilder {
    pub fn new(kind: EntityKind, header: Vec<String>, policy: DedupPolicy, separator: &str) -> Self {
        Self {
            kind,
            header,
            rows: Vec::new(),
            policy,
            seen: HashMap::new(),
            separator: separator.to_string(),
        }
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row at a derived ordinal
    pub fn row(&self, derived: Ordinal) -> Option<&[String]> {
        derived
            .checked_sub(FIRST_DERIVED)
            .and_then(|idx| self.rows.get(idx))
            .map(Vec::as_slice)
    }

    /// Admit one candidate from `source`, keeping provenance in step
    ///
    /// Fails without touching the table once the kind's provenance is sealed.
    pub fn admit(
        &mut self,
        record: DerivedRecord,
        source: Ordinal,
        provenance: &mut ProvenanceIndex,
    ) -> Result<Admission, ImportError> {
        provenance.ensure_open(self.kind)?;
        let existing = match (&self.policy, &record.key) {
            (DedupPolicy::Unique, _) | (_, None) => None,
            (_, Some(key)) => self.seen.get(key).copied(),
        };

        let Some(derived) = existing else {
            let derived = self.rows.len() + FIRST_DERIVED;
            if let (false, Some(key)) = (self.policy == DedupPolicy::Unique, record.key) {
                self.seen.insert(key, derived);
            }
            self.rows.push(record.values);
            provenance.record(self.kind, derived, source)?;
            return Ok(Admission::Emitted(derived));
        };

        match &self.policy {
            DedupPolicy::Merge(positions) => {
                let row = &mut self.rows[derived - FIRST_DERIVED];
                for &pos in positions {
                    if let (Some(cell), Some(value)) = (row.get_mut(pos), record.values.get(pos)) {
                        cell.push_str(&self.separator);
                        cell.push_str(value);
                    }
                }
                provenance.append(self.kind, derived, source)?;
                tracing::debug!(kind = %self.kind, derived, source, "merged duplicate");
                Ok(Admission::Merged(derived))
            }
            _ => Ok(Admission::Discarded(derived)),
        }
    }
}

/// First source row seen for a rentable-type style, with its attribute values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeRefCandidate {
    pub style: String,
    pub source: Ordinal,
    /// Attribute name -> value, in configured order
    pub values: Vec<(String, String)>,
}

/// All working tables of one extract
#[derive(Debug, Clone)]
pub struct DedupAggregator {
    tables: BTreeMap<EntityKind, TableBuilder>,
    attribute_refs: BTreeMap<String, AttributeRefCandidate>,
}

impl DedupAggregator {
    pub fn new(config: &ImportConfig) -> Result<Self, ConfigError> {
        let mut tables = BTreeMap::new();
        for kind in crate::config::SCHEMA_KINDS {
            let schema = config.schema(kind).ok_or(ConfigError::MissingSchema(kind))?;
            let policy = DedupPolicy::for_kind(kind, Some(schema))?;
            tables.insert(
                kind,
                TableBuilder::new(kind, schema.header(), policy, &config.merge_separator),
            );
        }
        tables.insert(
            EntityKind::CustomAttribute,
            TableBuilder::new(
                EntityKind::CustomAttribute,
                CUSTOM_ATTRIBUTE_HEADER.iter().map(|h| h.to_string()).collect(),
                DedupPolicy::Discard,
                &config.merge_separator,
            ),
        );
        Ok(Self {
            tables,
            attribute_refs: BTreeMap::new(),
        })
    }

    pub fn table(&self, kind: EntityKind) -> Option<&TableBuilder> {
        self.tables.get(&kind)
    }

    pub fn admit(
        &mut self,
        record: DerivedRecord,
        source: Ordinal,
        provenance: &mut ProvenanceIndex,
    ) -> Result<Option<Admission>, ImportError> {
        self.tables
            .get_mut(&record.kind)
            .map(|table| table.admit(record, source, provenance))
            .transpose()
    }

    /// Synthesize one custom attribute row per distinct value
    pub fn admit_custom_attribute(
        &mut self,
        bud: &str,
        attr: &crate::config::CustomAttributeConfig,
        value: &str,
        source: Ordinal,
        provenance: &mut ProvenanceIndex,
    ) -> Result<Option<Admission>, ImportError> {
        let record = DerivedRecord {
            kind: EntityKind::CustomAttribute,
            values: vec![
                bud.to_string(),
                attr.name.clone(),
                attr.value_type.clone(),
                value.to_string(),
                attr.units.clone(),
            ],
            key: Some(format!("{}\u{1f}{}", attr.name, value)),
        };
        self.admit(record, source, provenance)
    }

    /// Remember the first row of a style for attribute reference insertion
    pub fn note_attribute_ref(&mut self, candidate: AttributeRefCandidate) {
        self.attribute_refs
            .entry(candidate.style.clone())
            .or_insert(candidate);
    }

    /// Attribute reference candidates, sorted by style
    pub fn attribute_refs(&self) -> impl Iterator<Item = &AttributeRefCandidate> {
        self.attribute_refs.values()
    }
}
