//! Field projection
//!
//! Projects one source row into one target schema. A schema is an explicit
//! ordered list of `(field name, binding)` pairs and a single data-driven
//! projector walks it. Per field, first hit wins:
//!
//! 1. caller default for the field name
//! 2. supplemental contact value (fields that declare one)
//! 3. binding: fixed default or computed rule
//! 4. mapped source column, trimmed; blank when the column was not found
//!
//! Projection never fails.

pub mod rules;

pub use rules::Rule;

use crate::classify::RowStatus;
use crate::config::fields;
use crate::extract::{SourceRow, SupplementalContacts};
use crate::run::RunContext;
use import_types::EntityKind;
use std::collections::BTreeMap;

/// How a schema field obtains its value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    FixedDefault(String),
    /// Rule plus its input column, when the rule takes one
    Computed(Rule, Option<String>),
    SourceColumn(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub binding: Binding,
    /// Supplemental contact header overriding this field
    pub supplemental: Option<String>,
}

/// Ordered target schema of one entity kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    pub kind: EntityKind,
    pub fields: Vec<FieldSpec>,
    /// Source field whose value identifies an entity instance
    pub dedup_key: Option<String>,
}

impl Schema {
    /// Header row of the working table
    pub fn header(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    pub fn position(&self, field: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == field)
    }
}

/// A projected record, before deduplication
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedRecord {
    pub kind: EntityKind,
    pub values: Vec<String>,
    pub key: Option<String>,
}

/// Inputs that vary per row but not per field
#[derive(Debug, Clone, Copy)]
pub struct ProjectionContext<'a> {
    pub run: &'a RunContext,
    pub defaults: &'a BTreeMap<String, String>,
    pub status: RowStatus<'a>,
    /// Person reference resolved for this row, if any
    pub person_ref: Option<&'a str>,
    /// Supplemental contacts usable for this row (`None` on name collisions)
    pub supplemental: Option<&'a SupplementalContacts>,
    /// Primary field the supplemental index is keyed by
    pub supplemental_key: &'a str,
}

impl<'a> ProjectionContext<'a> {
    pub fn new(
        run: &'a RunContext,
        defaults: &'a BTreeMap<String, String>,
        status: RowStatus<'a>,
    ) -> Self {
        Self {
            run,
            defaults,
            status,
            person_ref: None,
            supplemental: None,
            supplemental_key: fields::NAME,
        }
    }

    pub fn with_person_ref(mut self, person_ref: Option<&'a str>) -> Self {
        self.person_ref = person_ref;
        self
    }

    pub fn with_supplemental(
        mut self,
        contacts: Option<&'a SupplementalContacts>,
        key: &'a str,
    ) -> Self {
        self.supplemental = contacts;
        self.supplemental_key = key;
        self
    }
}

/// Project a row into a schema
pub fn project(schema: &Schema, row: &SourceRow<'_>, ctx: &ProjectionContext<'_>) -> DerivedRecord {
    let values = schema
        .fields
        .iter()
        .map(|field| project_field(field, row, ctx))
        .collect();
    let key = schema
        .dedup_key
        .as_deref()
        .map(|k| row.value(k).to_string());

    DerivedRecord {
        kind: schema.kind,
        values,
        key,
    }
}

fn project_field(field: &FieldSpec, row: &SourceRow<'_>, ctx: &ProjectionContext<'_>) -> String {
    if let Some(value) = ctx.defaults.get(&field.name) {
        return value.clone();
    }

    if let (Some(header), Some(contacts)) = (&field.supplemental, ctx.supplemental) {
        if let Some(value) = contacts.value(row.value(ctx.supplemental_key), header) {
            return value.to_string();
        }
    }

    match &field.binding {
        Binding::FixedDefault(value) => value.clone(),
        Binding::Computed(rule, column) => rule.apply(row, ctx, column.as_deref()),
        Binding::SourceColumn(column) => row.value(column).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::RowClassifier;
    use crate::extract::{detect_headers, Extract};
    use crate::testing::{sample_config, sample_run};

    const DATA: &str = "Unit,Floor Plan,Unit/Lease Status,Name,Sq Ft,Rent,Lease Start,Lease End,Email\n\
                        101,2B2B,occupied,\"Doe, Pat\",\"1,050\",\"1,200.00\",,12/31/2027,pat@example.com\n";

    #[test]
    fn test_person_projection() {
        let config = sample_config();
        let run = sample_run(&config);
        let extract = Extract::from_reader(DATA.as_bytes()).unwrap();
        let detection = detect_headers(extract.rows(), &config.headers).unwrap();
        let row = SourceRow::new(2, extract.row(2).unwrap(), &detection.headers);
        let classifier = RowClassifier::new(&config);
        let defaults = run.defaults();
        let ctx = ProjectionContext::new(&run, &defaults, classifier.classify(row.value("UnitLeaseStatus")));

        let schema = config.schema(EntityKind::Person).unwrap();
        let record = project(schema, &row, &ctx);
        let by_name = |name: &str| record.values[schema.position(name).unwrap()].clone();

        assert_eq!(by_name("LastName"), "Doe");
        assert_eq!(by_name("FirstName"), "Pat");
        assert_eq!(by_name("PrimaryEmail"), "pat@example.com");
        assert_eq!(by_name("BUD"), "TEST");
        assert_eq!(by_name("Notes"), run.note_tag(2));
        assert_eq!(record.key, None);
    }

    #[test]
    fn test_lease_projection_composites() {
        let config = sample_config();
        let run = sample_run(&config);
        let extract = Extract::from_reader(DATA.as_bytes()).unwrap();
        let detection = detect_headers(extract.rows(), &config.headers).unwrap();
        let row = SourceRow::new(2, extract.row(2).unwrap(), &detection.headers);
        let classifier = RowClassifier::new(&config);
        let defaults = run.defaults();
        let ctx = ProjectionContext::new(&run, &defaults, classifier.classify("occupied"))
            .with_person_ref(Some("TC00042"));

        let schema = config.schema(EntityKind::RentalAgreement).unwrap();
        let record = project(schema, &row, &ctx);
        let by_name = |name: &str| record.values[schema.position(name).unwrap()].clone();

        assert_eq!(by_name("PayorSpec"), "TC00042,10/14/2026,12/31/2027");
        assert_eq!(by_name("RentableSpec"), "101,1200.00");
    }

    #[test]
    fn test_rentable_composites_and_unknown_status() {
        let config = sample_config();
        let run = sample_run(&config);
        let extract = Extract::from_reader(DATA.as_bytes()).unwrap();
        let detection = detect_headers(extract.rows(), &config.headers).unwrap();
        let row = SourceRow::new(2, extract.row(2).unwrap(), &detection.headers);
        let classifier = RowClassifier::new(&config);
        let defaults = run.defaults();
        let schema = config.schema(EntityKind::Rentable).unwrap();

        let ctx = ProjectionContext::new(&run, &defaults, classifier.classify("occupied"));
        let record = project(schema, &row, &ctx);
        let type_ref = schema.position("RentableTypeRef").unwrap();
        assert_eq!(record.values[type_ref], "2B2B,10/14/2026,");
        assert_eq!(record.key.as_deref(), Some("101"));

        let ctx = ProjectionContext::new(&run, &defaults, classifier.classify("???"));
        let record = project(schema, &row, &ctx);
        let status = schema.position("RentableStatus").unwrap();
        assert_eq!(record.values[status], "");
    }

    #[test]
    fn test_caller_default_wins_over_column() {
        let config = sample_config();
        let run = sample_run(&config);
        let extract = Extract::from_reader(DATA.as_bytes()).unwrap();
        let detection = detect_headers(extract.rows(), &config.headers).unwrap();
        let row = SourceRow::new(2, extract.row(2).unwrap(), &detection.headers);
        let classifier = RowClassifier::new(&config);
        let mut defaults = run.defaults();
        defaults.insert("Style".to_string(), "OVERRIDE".to_string());
        let ctx = ProjectionContext::new(&run, &defaults, classifier.classify("occupied"));

        let schema = config.schema(EntityKind::RentableType).unwrap();
        let record = project(schema, &row, &ctx);
        assert_eq!(record.values[schema.position("Style").unwrap()], "OVERRIDE");
        assert_eq!(record.key.as_deref(), Some("2B2B"));
    }
}
