//! Per-run context
//!
//! Everything that varies between two runs of the same configuration: the
//! run token naming the working-storage namespace, the run date stamped
//! into composite cells, and the caller-supplied default values.

use crate::config::ImportConfig;
use chrono::{Datelike, NaiveDate};
use import_types::Ordinal;
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct RunContext {
    pub token: Uuid,
    /// Run date as `M/D/YYYY`
    pub run_date: String,
    /// Open-ended stop date
    pub stop_date: String,
    note_prefix: String,
    /// Caller-supplied field values (business unit, cycles, ...)
    pub supplied: BTreeMap<String, String>,
}

impl RunContext {
    pub fn new(config: &ImportConfig, date: NaiveDate, supplied: BTreeMap<String, String>) -> Self {
        Self::with_token(config, Uuid::new_v4(), date, supplied)
    }

    pub fn with_token(
        config: &ImportConfig,
        token: Uuid,
        date: NaiveDate,
        supplied: BTreeMap<String, String>,
    ) -> Self {
        Self {
            token,
            run_date: format_run_date(date),
            stop_date: config.stop_date.clone(),
            note_prefix: config.vendor.note_prefix.clone(),
            supplied,
        }
    }

    /// Token text used in file names and note tags
    pub fn token_str(&self) -> String {
        self.token.simple().to_string()
    }

    /// Note tag prefix shared by every person of this run
    pub fn note_tag_prefix(&self) -> String {
        format!("{}{}$", self.note_prefix, self.token_str())
    }

    /// Note tag for the person projected from one source row
    pub fn note_tag(&self, ordinal: Ordinal) -> String {
        format!("{}{}", self.note_tag_prefix(), ordinal)
    }

    /// Source ordinal encoded in a note tag of this run
    pub fn ordinal_from_note(&self, note: &str) -> Option<Ordinal> {
        let prefix = self.note_tag_prefix();
        let start = note.find(&prefix)? + prefix.len();
        let digits: String = note[start..]
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        digits.parse().ok()
    }

    /// Caller defaults merged with the run's dates
    pub fn defaults(&self) -> BTreeMap<String, String> {
        let mut defaults = self.supplied.clone();
        defaults.insert("DtStart".to_string(), self.run_date.clone());
        defaults.insert("DtStop".to_string(), self.stop_date.clone());
        defaults
    }
}

/// `M/D/YYYY` without zero padding
pub fn format_run_date(date: NaiveDate) -> String {
    format!("{}/{}/{}", date.month(), date.day(), date.year())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_config;

    #[test]
    fn test_run_date_unpadded() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 7).unwrap();
        assert_eq!(format_run_date(date), "3/7/2026");
    }

    #[test]
    fn test_note_tag_round_trip() {
        let config = sample_config();
        let date = NaiveDate::from_ymd_opt(2026, 10, 14).unwrap();
        let run = RunContext::new(&config, date, BTreeMap::new());
        let tag = run.note_tag(17);
        assert!(tag.starts_with("test$"));
        assert_eq!(run.ordinal_from_note(&tag), Some(17));
        assert_eq!(run.ordinal_from_note(&format!("imported; {tag}")), Some(17));
        assert_eq!(run.ordinal_from_note("test$othertoken$17"), None);
    }
}
