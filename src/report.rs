//! Condition collection and report assembly

use import_types::{Condition, EntityKind, KindSummary, Ordinal, ReportEntry, Severity};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Row conditions collected during a run, keyed by source ordinal
#[derive(Debug, Clone, Default)]
pub struct ConditionLog {
    rows: BTreeMap<Ordinal, Vec<Condition>>,
    general: Vec<String>,
}

impl ConditionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, source: Ordinal, condition: Condition) {
        tracing::debug!(source, condition = %condition, "condition recorded");
        self.rows.entry(source).or_default().push(condition);
    }

    pub fn add_general(&mut self, message: impl Into<String>) {
        self.general.push(message.into());
    }

    pub fn has_errors(&self) -> bool {
        !self.general.is_empty() || self.count(Severity::Error) > 0
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.conditions().filter(|(_, c)| c.severity == severity).count()
    }

    pub fn issues_for(&self, kind: EntityKind) -> usize {
        self.conditions().filter(|(_, c)| c.kind == kind).count()
    }

    pub fn for_row(&self, source: Ordinal) -> &[Condition] {
        self.rows.get(&source).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn general(&self) -> &[String] {
        &self.general
    }

    pub fn conditions(&self) -> impl Iterator<Item = (Ordinal, &Condition)> {
        self.rows
            .iter()
            .flat_map(|(source, conds)| conds.iter().map(move |c| (*source, c)))
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() && self.general.is_empty()
    }
}

impl fmt::Display for ConditionLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return writeln!(f, "No conditions");
        }
        for message in &self.general {
            writeln!(f, "{message}")?;
        }
        for (source, condition) in self.conditions() {
            writeln!(f, "row {source}: {condition}")?;
        }
        Ok(())
    }
}

/// Conditions of one source row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowIssues {
    pub source_row: Ordinal,
    pub label: Option<String>,
    pub entries: Vec<ReportEntry>,
}

pub type Summary = BTreeMap<EntityKind, KindSummary>;

/// Final outcome of one extract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ImportReport {
    Issues {
        rows: Vec<RowIssues>,
        general: Vec<String>,
        summary: Summary,
    },
    Success {
        summary: Summary,
        /// Warnings never block a run but are still shown
        warnings: Vec<RowIssues>,
    },
}

impl ImportReport {
    pub fn is_success(&self) -> bool {
        matches!(self, ImportReport::Success { .. })
    }

    pub fn summary(&self) -> &Summary {
        match self {
            ImportReport::Issues { summary, .. } | ImportReport::Success { summary, .. } => summary,
        }
    }

    pub fn rows(&self) -> &[RowIssues] {
        match self {
            ImportReport::Issues { rows, .. } => rows,
            ImportReport::Success { warnings, .. } => warnings,
        }
    }

    /// Every entry, in source order
    pub fn entries(&self) -> impl Iterator<Item = &ReportEntry> {
        self.rows().iter().flat_map(|r| r.entries.iter())
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Groups collected conditions by source row
pub struct ReportAssembler<'a> {
    labels: &'a BTreeMap<Ordinal, String>,
}

impl<'a> ReportAssembler<'a> {
    pub fn new(labels: &'a BTreeMap<Ordinal, String>) -> Self {
        Self { labels }
    }

    /// Build the report. `counts` carries (possible, imported) per kind; the
    /// issue count comes from the log.
    pub fn assemble(&self, log: ConditionLog, counts: &BTreeMap<EntityKind, (usize, usize)>) -> ImportReport {
        let summary: Summary = EntityKind::ALL
            .into_iter()
            .map(|kind| {
                let (possible, imported) = counts.get(&kind).copied().unwrap_or_default();
                let issues = log.issues_for(kind);
                (
                    kind,
                    KindSummary {
                        possible,
                        imported,
                        issues,
                    },
                )
            })
            .collect();

        let has_errors = log.has_errors();
        let ConditionLog { rows, general } = log;
        let rows: Vec<RowIssues> = rows
            .into_iter()
            .map(|(source_row, conditions)| {
                let label = self.labels.get(&source_row).cloned();
                let entries = conditions
                    .into_iter()
                    .map(|c| ReportEntry {
                        source_row,
                        label: label.clone(),
                        severity: c.severity,
                        kind: c.kind,
                        message: c.message,
                    })
                    .collect();
                RowIssues {
                    source_row,
                    label,
                    entries,
                }
            })
            .collect();

        if has_errors {
            ImportReport::Issues {
                rows,
                general,
                summary,
            }
        } else {
            ImportReport::Success {
                summary,
                warnings: rows,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_groups_by_row_with_labels() {
        let mut log = ConditionLog::new();
        log.add(7, Condition::error(EntityKind::RentableType, "invalid date"));
        log.add(3, Condition::warning(EntityKind::Rentable, "No lease end date found."));
        log.add(7, Condition::warning(EntityKind::Person, "duplicate name"));
        let labels = BTreeMap::from([(7, "101".to_string())]);
        let counts = BTreeMap::from([(EntityKind::RentableType, (4, 3))]);

        let report = ReportAssembler::new(&labels).assemble(log, &counts);
        assert!(!report.is_success());
        let rows = report.rows();
        assert_eq!(rows.iter().map(|r| r.source_row).collect::<Vec<_>>(), vec![3, 7]);
        assert_eq!(rows[1].label.as_deref(), Some("101"));
        assert_eq!(rows[1].entries.len(), 2);
        assert_eq!(
            report.summary()[&EntityKind::RentableType],
            KindSummary { possible: 4, imported: 3, issues: 1 }
        );
    }

    #[test]
    fn test_warnings_only_is_success() {
        let mut log = ConditionLog::new();
        log.add(2, Condition::warning(EntityKind::RentalAgreement, "No lease start date found."));
        let labels = BTreeMap::new();
        let report = ReportAssembler::new(&labels).assemble(log, &BTreeMap::new());
        assert!(report.is_success());
        assert_eq!(report.entries().count(), 1);
        let json = report.to_json().unwrap();
        assert!(json.contains("\"status\": \"success\""));
    }

    #[test]
    fn test_general_issue_fails_run() {
        let mut log = ConditionLog::new();
        log.add_general("There are no data rows present");
        assert!(log.has_errors());
        let labels = BTreeMap::new();
        match ReportAssembler::new(&labels).assemble(log, &BTreeMap::new()) {
            ImportReport::Issues { general, rows, .. } => {
                assert_eq!(general, vec!["There are no data rows present".to_string()]);
                assert!(rows.is_empty());
            }
            other => panic!("expected issues, got {other:?}"),
        }
    }
}
