//! Import configuration
//!
//! Loads the per-vendor YAML document that declares expected headers, the
//! status table, the target schemas and the loader signatures. The document is
//! validated once into an immutable [`ImportConfig`] that every stage borrows.
//!
//! # Config Format
//!
//! ```yaml
//! vendor:
//!   name: OneSite
//!   note_prefix: "onesite$"
//! headers:
//!   - { name: Unit, text: Unit }
//!   - { name: Email, text: Email, optional: true }
//! statuses:
//!   - { name: occupied, code: "1", kinds: [rentable_type, person, rentable, rental_agreement] }
//! unknown_kinds: [rentable_type, rentable]
//! schemas:
//!   rentable:
//!     dedup_key: Unit
//!     fields:
//!       - { name: BUD, default: "" }
//!       - { name: RentableName, column: Unit }
//!       - { name: RentableStatus, computed: rentable_status }
//! ```

use crate::error::ConfigError;
use crate::projection::{Binding, FieldSpec, Rule, Schema};
use import_types::EntityKind;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;

/// Header names the computed rules read from
pub mod fields {
    pub const UNIT: &str = "Unit";
    pub const FLOOR_PLAN: &str = "FloorPlan";
    pub const STATUS: &str = "UnitLeaseStatus";
    pub const NAME: &str = "Name";
    pub const EMAIL: &str = "Email";
    pub const PHONE: &str = "PhoneNumber";
    pub const LEASE_START: &str = "LeaseStart";
    pub const LEASE_END: &str = "LeaseEnd";
    pub const RENT: &str = "Rent";
}

/// Root configuration document as written on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigDocument {
    pub vendor: VendorConfig,
    pub headers: Vec<HeaderConfig>,
    #[serde(default)]
    pub statuses: Vec<StatusConfig>,
    #[serde(default)]
    pub unknown_kinds: Vec<EntityKind>,
    pub schemas: BTreeMap<EntityKind, SchemaConfig>,
    #[serde(default)]
    pub custom_attributes: Vec<CustomAttributeConfig>,
    #[serde(default)]
    pub supplemental: Option<SupplementalConfig>,
    #[serde(default)]
    pub skip_signatures: Vec<String>,
    #[serde(default = "default_duplicate_person_signature")]
    pub duplicate_person_signature: String,
    #[serde(default = "default_person_ref_prefix")]
    pub person_ref_prefix: String,
    #[serde(default = "default_merge_separator")]
    pub merge_separator: String,
    #[serde(default = "default_stop_date")]
    pub stop_date: String,
}

fn default_duplicate_person_signature() -> String {
    "PrimaryEmail".to_string()
}

fn default_person_ref_prefix() -> String {
    "TC000".to_string()
}

fn default_merge_separator() -> String {
    ";".to_string()
}

fn default_stop_date() -> String {
    "12/31/9999".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorConfig {
    pub name: String,
    /// Prefix of the person note tag used to trace inserted people
    pub note_prefix: String,
}

/// One expected header of an extract
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeaderConfig {
    /// Logical field name (what schemas and rules refer to)
    pub name: String,
    /// Display text as it appears in the extract
    pub text: String,
    #[serde(default)]
    pub optional: bool,
    /// Alternate header texts accepted for this field
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// One recognized vendor status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusConfig {
    pub name: String,
    /// Status code written into composite status cells
    pub code: String,
    pub kinds: Vec<EntityKind>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaConfig {
    #[serde(default)]
    pub dedup_key: Option<String>,
    pub fields: Vec<FieldConfig>,
}

/// A schema field; exactly one of `default`, `computed`, `column` is set
/// (`numeric` takes its input from `column`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldConfig {
    pub name: String,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub computed: Option<Rule>,
    #[serde(default)]
    pub column: Option<String>,
    #[serde(default)]
    pub supplemental: Option<String>,
}

/// A custom attribute synthesized from one extract column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomAttributeConfig {
    pub column: String,
    pub name: String,
    pub value_type: String,
    pub units: String,
}

/// Secondary contact extract keyed by person name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupplementalConfig {
    /// Supplemental header holding the person name
    pub key_header: String,
    /// Primary header whose value is looked up in the supplemental index
    #[serde(default = "default_supplemental_primary")]
    pub primary_column: String,
    pub headers: Vec<HeaderConfig>,
}

fn default_supplemental_primary() -> String {
    fields::NAME.to_string()
}

/// Validated, immutable configuration for import runs
#[derive(Debug, Clone)]
pub struct ImportConfig {
    pub vendor: VendorConfig,
    pub headers: Vec<HeaderConfig>,
    pub statuses: Vec<StatusConfig>,
    pub unknown_kinds: BTreeSet<EntityKind>,
    pub custom_attributes: Vec<CustomAttributeConfig>,
    pub supplemental: Option<SupplementalConfig>,
    pub skip_signatures: Vec<String>,
    pub duplicate_person_signature: String,
    pub person_ref_prefix: String,
    pub merge_separator: String,
    pub stop_date: String,
    schemas: BTreeMap<EntityKind, Schema>,
}

/// Kinds that are projected through a configured schema
pub const SCHEMA_KINDS: [EntityKind; 4] = [
    EntityKind::RentableType,
    EntityKind::Person,
    EntityKind::Rentable,
    EntityKind::RentalAgreement,
];

impl ImportConfig {
    /// Load configuration from YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Load configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let doc: ConfigDocument = serde_yaml::from_str(yaml)?;
        Self::from_document(doc)
    }

    /// Validate a parsed document
    pub fn from_document(doc: ConfigDocument) -> Result<Self, ConfigError> {
        let mut declared = HashSet::new();
        for header in &doc.headers {
            if !declared.insert(header.name.as_str()) {
                return Err(ConfigError::DuplicateHeader(header.name.clone()));
            }
        }
        for required in [fields::UNIT, fields::STATUS] {
            if !declared.contains(required) {
                return Err(ConfigError::MissingHeader(required.to_string()));
            }
        }

        for status in &doc.statuses {
            if let Some(kind) = status
                .kinds
                .iter()
                .find(|k| **k == EntityKind::CustomAttributeRef)
            {
                return Err(ConfigError::KindWithoutTable {
                    status: status.name.clone(),
                    kind: *kind,
                });
            }
        }

        let mut schemas = BTreeMap::new();
        for kind in SCHEMA_KINDS {
            let raw = doc
                .schemas
                .get(&kind)
                .ok_or(ConfigError::MissingSchema(kind))?;
            schemas.insert(kind, compile_schema(kind, raw, &declared)?);
        }

        for attr in &doc.custom_attributes {
            if !declared.contains(attr.column.as_str()) {
                return Err(ConfigError::UnknownHeader {
                    kind: EntityKind::CustomAttribute,
                    field: attr.name.clone(),
                    header: attr.column.clone(),
                });
            }
        }

        Ok(Self {
            vendor: doc.vendor,
            headers: doc.headers,
            statuses: doc
                .statuses
                .into_iter()
                .map(|mut s| {
                    s.name = s.name.trim().to_lowercase();
                    s
                })
                .collect(),
            unknown_kinds: doc.unknown_kinds.into_iter().collect(),
            custom_attributes: doc.custom_attributes,
            supplemental: doc.supplemental,
            skip_signatures: doc.skip_signatures,
            duplicate_person_signature: doc.duplicate_person_signature,
            person_ref_prefix: doc.person_ref_prefix,
            merge_separator: doc.merge_separator,
            stop_date: doc.stop_date,
            schemas,
        })
    }

    /// Compiled schema for a projected kind
    pub fn schema(&self, kind: EntityKind) -> Option<&Schema> {
        self.schemas.get(&kind)
    }

    /// Whether a loader message matches the skip list
    pub fn is_skippable(&self, message: &str) -> bool {
        self.skip_signatures
            .iter()
            .any(|sig| message.contains(sig.as_str()))
    }
}

fn compile_schema(
    kind: EntityKind,
    raw: &SchemaConfig,
    declared: &HashSet<&str>,
) -> Result<Schema, ConfigError> {
    let check_header = |field: &str, header: &str| {
        if declared.contains(header) {
            Ok(())
        } else {
            Err(ConfigError::UnknownHeader {
                kind,
                field: field.to_string(),
                header: header.to_string(),
            })
        }
    };

    let mut fields = Vec::with_capacity(raw.fields.len());
    for field in &raw.fields {
        let binding = match (&field.default, &field.computed, &field.column) {
            (Some(value), None, None) => Binding::FixedDefault(value.clone()),
            (None, Some(Rule::Numeric), Some(column)) => {
                check_header(&field.name, column)?;
                Binding::Computed(Rule::Numeric, Some(column.clone()))
            }
            (None, Some(Rule::Numeric), None) => {
                return Err(ConfigError::NumericWithoutColumn {
                    kind,
                    field: field.name.clone(),
                })
            }
            (None, Some(rule), None) => Binding::Computed(*rule, None),
            (None, None, Some(column)) => {
                check_header(&field.name, column)?;
                Binding::SourceColumn(column.clone())
            }
            _ => {
                return Err(ConfigError::AmbiguousBinding {
                    kind,
                    field: field.name.clone(),
                })
            }
        };
        fields.push(FieldSpec {
            name: field.name.clone(),
            binding,
            supplemental: field.supplemental.clone(),
        });
    }

    if let Some(key) = &raw.dedup_key {
        check_header("dedup_key", key)?;
    }

    Ok(Schema {
        kind,
        fields,
        dedup_key: raw.dedup_key.clone(),
    })
}
