//! Row ingestion
//!
//! Walks the data rows of an extract and feeds every eligible projection
//! through the aggregator. Ingestion runs twice: once for the property and
//! person tables, and again for the lease-dependent tables after person
//! references are known.

use crate::classify::RowClassifier;
use crate::config::{fields, ImportConfig};
use crate::dedup::{Admission, AttributeRefCandidate, DedupAggregator};
use crate::error::ImportResult;
use crate::extract::normalize::strip_digit_group_separators;
use crate::extract::{Extract, HeaderDetection, SourceRow, SupplementalContacts};
use crate::projection::{self, ProjectionContext};
use crate::provenance::ProvenanceIndex;
use crate::report::ConditionLog;
use crate::run::RunContext;
use import_types::{Condition, EntityKind, Ordinal};
use std::collections::{BTreeMap, HashMap, HashSet};

pub const NO_DATA_ROWS: &str = "There are no data rows present";

/// Data rows of an extract: from below the header up to the first blank row
pub fn data_rows<'a>(extract: &'a Extract, detection: &'a HeaderDetection) -> Vec<SourceRow<'a>> {
    extract
        .rows()
        .iter()
        .enumerate()
        .skip(detection.data_start())
        .map(|(idx, cells)| SourceRow::new(idx + 1, cells, &detection.headers))
        .take_while(|row| !row.is_blank())
        .collect()
}

/// Duplicate-person heuristics over the person rows of one extract
///
/// Names are remembered from rows without any contact; phones from every row
/// that carries one.
#[derive(Debug, Default)]
struct PeopleTracker {
    contactless_names: HashSet<String>,
    phones: HashSet<String>,
}

impl PeopleTracker {
    fn check(&mut self, row: &SourceRow<'_>) -> Vec<Condition> {
        let display = row.value(fields::NAME);
        let name = display.to_lowercase();
        let email = row.value(fields::EMAIL);
        let phone = row.value(fields::PHONE);
        let mut warnings = Vec::new();

        if !name.is_empty() && email.is_empty() && phone.is_empty()
            && !self.contactless_names.insert(name.clone())
        {
            warnings.push(Condition::warning(
                EntityKind::Person,
                format!(
                    "There is at least one other person with the name \"{display}\" who also has \
                     no unique identifiers such as cell phone number or email."
                ),
            ));
        }

        if !phone.is_empty() {
            if self.phones.contains(phone) && self.contactless_names.contains(&name) {
                warnings.push(Condition::warning(
                    EntityKind::Person,
                    format!(
                        "There is at least one other person with the same name \"{display}\" and \
                         work phone \"{phone}\" and no other unique identifiers such as cell phone \
                         or email"
                    ),
                ));
            } else {
                self.phones.insert(phone.to_string());
            }
        }
        warnings
    }
}

/// Shared state of both ingestion passes
pub struct RowIngestor<'a> {
    config: &'a ImportConfig,
    run: &'a RunContext,
    classifier: RowClassifier,
    defaults: BTreeMap<String, String>,
    supplemental: Option<&'a SupplementalContacts>,
    /// How often each primary-key name occurs; supplemental data only
    /// applies to names that occur once
    name_counts: HashMap<String, usize>,
}

impl<'a> RowIngestor<'a> {
    pub fn new(
        config: &'a ImportConfig,
        run: &'a RunContext,
        supplemental: Option<&'a SupplementalContacts>,
        rows: &[SourceRow<'_>],
    ) -> Self {
        let mut name_counts = HashMap::new();
        if let Some(sup) = &config.supplemental {
            for row in rows {
                let name = row.value(&sup.primary_column);
                if !name.is_empty() {
                    *name_counts.entry(name.to_string()).or_insert(0) += 1;
                }
            }
        }
        Self {
            config,
            run,
            classifier: RowClassifier::new(config),
            defaults: run.defaults(),
            supplemental,
            name_counts,
        }
    }

    fn business_unit(&self) -> &str {
        self.defaults.get("BUD").map(String::as_str).unwrap_or("")
    }

    fn supplemental_for(&self, row: &SourceRow<'_>) -> Option<&'a SupplementalContacts> {
        let sup = self.config.supplemental.as_ref()?;
        let name = row.value(&sup.primary_column);
        (self.name_counts.get(name) == Some(&1))
            .then_some(self.supplemental)
            .flatten()
    }

    fn project(
        &self,
        kind: EntityKind,
        row: &SourceRow<'_>,
        ctx: &ProjectionContext<'_>,
        aggregator: &mut DedupAggregator,
        provenance: &mut ProvenanceIndex,
    ) -> ImportResult<Option<Admission>> {
        let Some(schema) = self.config.schema(kind) else {
            return Ok(None);
        };
        let record = projection::project(schema, row, ctx);
        aggregator.admit(record, row.ordinal, provenance)
    }

    /// First pass: rentable types, custom attributes and people
    pub fn ingest_primary(
        &self,
        rows: &[SourceRow<'_>],
        aggregator: &mut DedupAggregator,
        provenance: &mut ProvenanceIndex,
        log: &mut ConditionLog,
    ) -> ImportResult<()> {
        let mut people = PeopleTracker::default();
        let supplemental_key = self
            .config
            .supplemental
            .as_ref()
            .map(|s| s.primary_column.as_str())
            .unwrap_or(fields::NAME);

        for row in rows {
            let status = self.classifier.classify(row.value(fields::STATUS));
            provenance.set_label(row.ordinal, row.value(fields::UNIT));
            let ctx = ProjectionContext::new(self.run, &self.defaults, status);

            if status.allows(EntityKind::RentableType) {
                self.project(EntityKind::RentableType, row, &ctx, aggregator, provenance)?;
                self.note_attribute_ref(row, aggregator);
            }

            if status.allows(EntityKind::CustomAttribute) {
                for attr in &self.config.custom_attributes {
                    let value = strip_digit_group_separators(row.value(&attr.column));
                    if value.is_empty() {
                        continue;
                    }
                    aggregator.admit_custom_attribute(
                        self.business_unit(),
                        attr,
                        &value,
                        row.ordinal,
                        provenance,
                    )?;
                }
            }

            if status.allows(EntityKind::Person) {
                for warning in people.check(row) {
                    log.add(row.ordinal, warning);
                }
                let ctx = ctx.with_supplemental(self.supplemental_for(row), supplemental_key);
                self.project(EntityKind::Person, row, &ctx, aggregator, provenance)?;
            }
        }
        Ok(())
    }

    fn note_attribute_ref(&self, row: &SourceRow<'_>, aggregator: &mut DedupAggregator) {
        let style = row.value(fields::FLOOR_PLAN);
        if style.is_empty() || self.config.custom_attributes.is_empty() {
            return;
        }
        let values = self
            .config
            .custom_attributes
            .iter()
            .map(|attr| {
                (
                    attr.name.clone(),
                    strip_digit_group_separators(row.value(&attr.column)),
                )
            })
            .filter(|(_, value)| !value.is_empty())
            .collect::<Vec<_>>();
        if values.is_empty() {
            return;
        }
        aggregator.note_attribute_ref(AttributeRefCandidate {
            style: style.to_string(),
            source: row.ordinal,
            values,
        });
    }

    /// Second pass: rentables and rental agreements, with person references
    pub fn ingest_lease_dependent(
        &self,
        rows: &[SourceRow<'_>],
        person_refs: &BTreeMap<Ordinal, String>,
        aggregator: &mut DedupAggregator,
        provenance: &mut ProvenanceIndex,
        log: &mut ConditionLog,
    ) -> ImportResult<()> {
        for row in rows {
            let status = self.classifier.classify(row.value(fields::STATUS));
            let ctx = ProjectionContext::new(self.run, &self.defaults, status)
                .with_person_ref(person_refs.get(&row.ordinal).map(String::as_str));

            if status.allows(EntityKind::Rentable) {
                if status.is("occupied") {
                    self.lease_date_warnings(EntityKind::Rentable, row, log);
                }
                self.project(EntityKind::Rentable, row, &ctx, aggregator, provenance)?;
            }

            if status.allows(EntityKind::RentalAgreement) {
                self.lease_date_warnings(EntityKind::RentalAgreement, row, log);
                self.project(EntityKind::RentalAgreement, row, &ctx, aggregator, provenance)?;
            }
        }
        Ok(())
    }

    fn lease_date_warnings(&self, kind: EntityKind, row: &SourceRow<'_>, log: &mut ConditionLog) {
        if row.value(fields::LEASE_START).is_empty() {
            log.add(
                row.ordinal,
                Condition::warning(
                    kind,
                    format!("No lease start date found. Using default value: {}", self.run.run_date),
                ),
            );
        }
        if row.value(fields::LEASE_END).is_empty() {
            log.add(
                row.ordinal,
                Condition::warning(
                    kind,
                    format!("No lease end date found. Using default value: {}", self.run.stop_date),
                ),
            );
        }
    }
}
