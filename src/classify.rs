//! Row classification
//!
//! Maps a row's status indicator to the set of entity kinds that may be
//! projected from it. The status table comes from configuration; text that
//! matches nothing classifies as "unknown", which still permits the property
//! kinds listed under `unknown_kinds`.

use crate::config::ImportConfig;
use crate::extract::normalize::normalize_status_text;
use import_types::EntityKind;
use std::collections::BTreeSet;

/// Fixed set of eligible kinds for one status
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KindSet(BTreeSet<EntityKind>);

impl KindSet {
    pub fn contains(&self, kind: EntityKind) -> bool {
        self.0.contains(&kind)
    }
}

impl FromIterator<EntityKind> for KindSet {
    fn from_iter<I: IntoIterator<Item = EntityKind>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone)]
struct StatusRule {
    name: String,
    code: String,
    kinds: KindSet,
}

/// Classification of one status indicator
#[derive(Debug, Clone, Copy)]
pub struct RowStatus<'c> {
    rule: Option<&'c StatusRule>,
    kinds: &'c KindSet,
}

impl<'c> RowStatus<'c> {
    /// Internal status name, `None` for unknown
    pub fn name(&self) -> Option<&'c str> {
        self.rule.map(|r| r.name.as_str())
    }

    /// Configured status code, `None` for unknown
    pub fn code(&self) -> Option<&'c str> {
        self.rule.map(|r| r.code.as_str())
    }

    pub fn is_known(&self) -> bool {
        self.rule.is_some()
    }

    pub fn is(&self, name: &str) -> bool {
        self.name() == Some(name)
    }

    pub fn allows(&self, kind: EntityKind) -> bool {
        self.kinds.contains(kind)
    }

    pub fn kinds(&self) -> &'c KindSet {
        self.kinds
    }
}

/// Status indicator -> eligible kinds
#[derive(Debug, Clone)]
pub struct RowClassifier {
    rules: Vec<StatusRule>,
    unknown: KindSet,
}

impl RowClassifier {
    pub fn new(config: &ImportConfig) -> Self {
        Self {
            rules: config
                .statuses
                .iter()
                .map(|s| StatusRule {
                    name: normalize_status_text(&s.name),
                    code: s.code.clone(),
                    kinds: s.kinds.iter().copied().collect(),
                })
                .collect(),
            unknown: config.unknown_kinds.iter().copied().collect(),
        }
    }

    /// Classify raw status text. Exact matches win over containment; among
    /// containment matches the first configured status wins.
    pub fn classify(&self, raw: &str) -> RowStatus<'_> {
        let text = normalize_status_text(raw);
        let rule = if text.is_empty() {
            None
        } else {
            self.rules
                .iter()
                .find(|r| r.name == text)
                .or_else(|| self.rules.iter().find(|r| text.contains(r.name.as_str())))
        };

        match rule {
            Some(rule) => RowStatus {
                rule: Some(rule),
                kinds: &rule.kinds,
            },
            None => RowStatus {
                rule: None,
                kinds: &self.unknown,
            },
        }
    }
}
