//! Property tests for provenance, merging, projection and classification
//!
//! Run with: cargo test --test provenance_properties

mod common;

use proptest::prelude::*;
use rentroll_import::extract::detect_headers;
use rentroll_import::projection::{self, ProjectionContext};
use rentroll_import::{
    DedupPolicy, DerivedRecord, EntityKind, Extract, ImportError, ProvenanceIndex, RowClassifier,
    RunContext, SourceRow, TableBuilder,
};
use std::collections::BTreeMap;

const STATUSES: &[&str] = &["occupied", "vacant", "model", "notice", ""];

fn rentable_record(unit: &str, status: &str) -> DerivedRecord {
    DerivedRecord {
        kind: EntityKind::Rentable,
        values: vec![unit.to_string(), status.to_string()],
        key: Some(unit.to_string()),
    }
}

proptest! {
    #[test]
    fn prop_resolve_returns_contributor_by_item(sources in prop::collection::vec(2usize..5000, 1..8)) {
        let mut index = ProvenanceIndex::new();
        index.record(EntityKind::Rentable, 2, sources[0]).unwrap();
        for &source in &sources[1..] {
            index.append(EntityKind::Rentable, 2, source).unwrap();
        }

        prop_assert_eq!(index.resolve(EntityKind::Rentable, 2, None).unwrap(), sources[0]);
        for (idx, &source) in sources.iter().enumerate() {
            prop_assert_eq!(index.resolve(EntityKind::Rentable, 2, Some(idx + 1)).unwrap(), source);
        }
        let out_of_range = matches!(
            index.resolve(EntityKind::Rentable, 2, Some(sources.len() + 1)),
            Err(ImportError::ItemOutOfRange { .. })
        );
        prop_assert!(out_of_range);
        let missed = matches!(
            index.resolve(EntityKind::Rentable, 3, None),
            Err(ImportError::ProvenanceMiss { .. })
        );
        prop_assert!(missed);
    }

    #[test]
    fn prop_merge_joins_in_encounter_order(statuses in prop::collection::vec("[a-z]{1,8}", 1..6)) {
        let header = vec!["RentableName".to_string(), "RentableStatus".to_string()];
        let mut table = TableBuilder::new(EntityKind::Rentable, header, DedupPolicy::Merge(vec![1]), ";");
        let mut provenance = ProvenanceIndex::new();

        for (idx, status) in statuses.iter().enumerate() {
            table.admit(rentable_record("101", status), idx + 2, &mut provenance).unwrap();
        }

        prop_assert_eq!(table.len(), 1);
        let row = table.row(2).unwrap();
        prop_assert_eq!(row[0].as_str(), "101");
        prop_assert_eq!(row[1].clone(), statuses.join(";"));
        let expected: Vec<usize> = (2..statuses.len() + 2).collect();
        prop_assert_eq!(provenance.contributors(EntityKind::Rentable, 2).unwrap(), &expected[..]);
    }

    #[test]
    fn prop_projection_is_idempotent(
        unit in "[0-9]{1,4}",
        plan in "[A-Z0-9]{0,4}",
        status in prop::sample::select(STATUSES),
        last in "[A-Za-z]{0,8}",
        first in "[A-Za-z]{0,8}",
        rent in "[0-9]{0,2}(,[0-9]{3})?",
    ) {
        let config = common::config();
        let header: Vec<String> = ["Unit", "Floor Plan", "Unit/Lease Status", "Name", "Rent"]
            .iter()
            .map(|h| h.to_string())
            .collect();
        let data = vec![unit, plan, status.to_string(), format!("{last}, {first}"), rent];
        let extract = Extract::from_rows(vec![header, data]);
        let detection = detect_headers(extract.rows(), &config.headers).unwrap();
        let row = SourceRow::new(2, extract.row(2).unwrap(), &detection.headers);

        let run = RunContext::new(&config, common::run_date(), BTreeMap::new());
        let defaults = run.defaults();
        let classifier = RowClassifier::new(&config);
        let ctx = ProjectionContext::new(&run, &defaults, classifier.classify(row.value("UnitLeaseStatus")));

        for kind in EntityKind::ALL {
            let Some(schema) = config.schema(kind) else { continue };
            let once = projection::project(schema, &row, &ctx);
            let twice = projection::project(schema, &row, &ctx);
            prop_assert_eq!(&once, &twice);
            prop_assert_eq!(once.values.len(), schema.fields.len());
        }
    }

    #[test]
    fn prop_classification_ignores_case_and_spacing(raw in "[a-zA-Z ]{0,16}") {
        let config = common::config();
        let classifier = RowClassifier::new(&config);
        let plain = classifier.classify(&raw);
        let noisy_text = format!("  {}  ", raw.to_uppercase());
        let noisy = classifier.classify(&noisy_text);

        prop_assert_eq!(plain.name(), noisy.name());
        prop_assert_eq!(plain.kinds(), noisy.kinds());
        prop_assert_eq!(plain.name(), classifier.classify(&raw).name());
    }
}
