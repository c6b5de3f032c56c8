//! Import Types - Level 1 Foundation Types
//!
//! Pure data structures shared by every stage of the rent-roll importer.
//!
//! ## Architecture Level: LEVEL 1 (Foundation)
//!
//! This is the bottom layer of the dependency hierarchy. The importer crate
//! depends on it; it depends on nothing else in the workspace.
//!
//! ## Contents
//!
//! - Target entity kinds
//! - Condition severities and row conditions
//! - Report entries and per-kind summary counts
//!
//! ## Rules
//!
//! 1. **NO BUSINESS LOGIC** - Only data structures, constructors, accessors
//! 2. **NO WORKSPACE DEPENDENCIES**
//! 3. **SERIALIZABLE** - All types support serde

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// 1-based row position within a file.
///
/// Source ordinals address rows of the vendor extract; derived ordinals
/// address rows of a working table, where the header occupies position 1.
pub type Ordinal = usize;

// ============================================================================
// ENTITY KINDS
// ============================================================================

/// Target entity tables produced from one extract
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    RentableType,
    CustomAttribute,
    Person,
    Rentable,
    RentalAgreement,
    CustomAttributeRef,
}

impl EntityKind {
    /// All kinds, in load order
    pub const ALL: [EntityKind; 6] = [
        EntityKind::CustomAttribute,
        EntityKind::RentableType,
        EntityKind::CustomAttributeRef,
        EntityKind::Person,
        EntityKind::Rentable,
        EntityKind::RentalAgreement,
    ];

    /// Tag name used inside condition text (`E:<RentableType>:...`)
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::RentableType => "RentableType",
            EntityKind::CustomAttribute => "CustomAttribute",
            EntityKind::Person => "People",
            EntityKind::Rentable => "Rentable",
            EntityKind::RentalAgreement => "RentalAgreement",
            EntityKind::CustomAttributeRef => "CustomAttributeRef",
        }
    }

    /// Stable snake_case identifier (matches the serde representation)
    pub fn key(&self) -> &'static str {
        match self {
            EntityKind::RentableType => "rentable_type",
            EntityKind::CustomAttribute => "custom_attribute",
            EntityKind::Person => "person",
            EntityKind::Rentable => "rentable",
            EntityKind::RentalAgreement => "rental_agreement",
            EntityKind::CustomAttributeRef => "custom_attribute_ref",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown entity kind tag
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown entity kind '{0}'")]
pub struct KindParseError(pub String);

impl FromStr for EntityKind {
    type Err = KindParseError;

    /// Accepts both the tag name and the snake_case key
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s || k.key() == s)
            .ok_or_else(|| KindParseError(s.to_string()))
    }
}

// ============================================================================
// SEVERITY AND CONDITIONS
// ============================================================================

/// Severity of a row-level condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    /// Single-letter prefix used in tagged condition text
    pub fn tag(&self) -> &'static str {
        match self {
            Severity::Error => "E",
            Severity::Warning => "W",
        }
    }
}

/// A condition attributable to one source row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub severity: Severity,
    pub kind: EntityKind,
    pub message: String,
}

impl Condition {
    pub fn error(kind: EntityKind, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            kind,
            message: message.into(),
        }
    }

    pub fn warning(kind: EntityKind, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for Condition {
    /// Tagged form: `E:<Rentable>:message`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:<{}>:{}", self.severity.tag(), self.kind, self.message)
    }
}

// ============================================================================
// REPORT
// ============================================================================

/// Externally visible unit of the final report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEntry {
    /// Source row the customer must fix
    pub source_row: Ordinal,
    /// Display label for the row (e.g. the unit)
    pub label: Option<String>,
    pub severity: Severity,
    pub kind: EntityKind,
    pub message: String,
}

/// Per-kind import counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindSummary {
    pub possible: usize,
    pub imported: usize,
    pub issues: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parse_accepts_tag_and_key() {
        assert_eq!("People".parse::<EntityKind>(), Ok(EntityKind::Person));
        assert_eq!(
            "rental_agreement".parse::<EntityKind>(),
            Ok(EntityKind::RentalAgreement)
        );
        assert!("Lease".parse::<EntityKind>().is_err());
    }

    #[test]
    fn test_condition_tagged_display() {
        let c = Condition::warning(EntityKind::Rentable, "No lease end date found.");
        assert_eq!(c.to_string(), "W:<Rentable>:No lease end date found.");
    }
}
