//! Row provenance
//!
//! Every derived row written to a working table remembers which source rows
//! contributed to it, in encounter order. Loader errors only know the derived
//! line (and, for merged rows, the item within it); this index turns those
//! back into the source ordinal the customer must fix.
//!
//! A kind's entries are sealed once its table is written; recording into a
//! sealed kind is an error. Resolution only reads the index.

pub mod duplicate_person;
pub mod translate;

pub use duplicate_person::{DuplicatePersonResolver, PersonResolution};
pub use translate::{parse_token, ErrorToken, ErrorTranslator, ParsedToken, Translation};

use crate::error::ImportError;
use import_types::{EntityKind, Ordinal};
use smallvec::SmallVec;
use std::collections::{BTreeMap, BTreeSet};

/// Contributors of one derived row
///
/// Bounded inline capacity; a unit rarely spans more than a few rows
pub type Contributors = SmallVec<[Ordinal; 4]>;

#[derive(Debug, Clone, Default)]
pub struct ProvenanceIndex {
    entries: BTreeMap<(EntityKind, Ordinal), Contributors>,
    /// Source ordinal -> display label (the unit)
    labels: BTreeMap<Ordinal, String>,
    sealed: BTreeSet<EntityKind>,
}

impl ProvenanceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a derived row with its first contributor
    pub fn record(&mut self, kind: EntityKind, derived: Ordinal, source: Ordinal) -> Result<(), ImportError> {
        self.ensure_open(kind)?;
        let mut contributors = Contributors::new();
        contributors.push(source);
        self.entries.insert((kind, derived), contributors);
        Ok(())
    }

    /// Append a contributor to an existing derived row
    pub fn append(&mut self, kind: EntityKind, derived: Ordinal, source: Ordinal) -> Result<(), ImportError> {
        self.ensure_open(kind)?;
        self.entries.entry((kind, derived)).or_default().push(source);
        Ok(())
    }

    pub fn set_label(&mut self, source: Ordinal, label: impl Into<String>) {
        self.labels.entry(source).or_insert_with(|| label.into());
    }

    pub fn label(&self, source: Ordinal) -> Option<&str> {
        self.labels.get(&source).map(String::as_str)
    }

    pub fn labels(&self) -> &BTreeMap<Ordinal, String> {
        &self.labels
    }

    /// Freeze a kind once its table is on disk
    pub fn seal(&mut self, kind: EntityKind) {
        self.sealed.insert(kind);
    }

    pub fn is_sealed(&self, kind: EntityKind) -> bool {
        self.sealed.contains(&kind)
    }

    /// `Err` once `kind` has been sealed
    pub fn ensure_open(&self, kind: EntityKind) -> Result<(), ImportError> {
        if self.is_sealed(kind) {
            return Err(ImportError::SealedProvenance(kind));
        }
        Ok(())
    }

    pub fn contributors(&self, kind: EntityKind, derived: Ordinal) -> Option<&[Ordinal]> {
        self.entries.get(&(kind, derived)).map(|c| c.as_slice())
    }

    /// Derived rows of one kind, in derived order
    pub fn derived_rows(&self, kind: EntityKind) -> impl Iterator<Item = (Ordinal, &[Ordinal])> + '_ {
        self.entries
            .range((kind, 0)..=(kind, Ordinal::MAX))
            .map(|((_, derived), c)| (*derived, c.as_slice()))
    }

    pub fn len(&self, kind: EntityKind) -> usize {
        self.derived_rows(kind).count()
    }

    /// Resolve a derived line and optional 1-based item to a source ordinal
    ///
    /// A missing item, and item 0, select the first contributor.
    pub fn resolve(
        &self,
        kind: EntityKind,
        line: Ordinal,
        item: Option<usize>,
    ) -> Result<Ordinal, ImportError> {
        let contributors = self
            .contributors(kind, line)
            .ok_or(ImportError::ProvenanceMiss { kind, line })?;
        let item = item.unwrap_or(1);
        let idx = item.max(1) - 1;
        contributors
            .get(idx)
            .copied()
            .ok_or(ImportError::ItemOutOfRange {
                kind,
                line,
                item,
                contributors: contributors.len(),
            })
    }
}
