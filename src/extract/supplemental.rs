//! Supplemental contact extract
//!
//! A secondary file (guest lists and the like) carrying contact details keyed
//! by the person name used in the primary extract.

use super::header::{detect_headers, HeaderMap};
use super::row::{Extract, SourceRow};
use crate::config::{fields, SupplementalConfig};
use crate::error::ImportError;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9._%+\-]+@[a-zA-Z0-9.\-]+$").unwrap());

/// Loose email shape check used on supplemental contact data
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Supplemental records indexed by trimmed person name
#[derive(Debug, Clone, Default)]
pub struct SupplementalContacts {
    headers: HeaderMap,
    records: HashMap<String, Vec<String>>,
}

impl SupplementalContacts {
    pub fn build(extract: &Extract, config: &SupplementalConfig) -> Result<Self, ImportError> {
        let detection = detect_headers(extract.rows(), &config.headers)?;
        let headers = detection.headers;
        let email_idx = headers.index(fields::EMAIL);

        let mut records = HashMap::new();
        for (idx, cells) in extract.rows().iter().enumerate().skip(detection.header_row + 1) {
            let view = SourceRow::new(idx + 1, cells, &headers);
            let key = view.value(&config.key_header);
            if key.is_empty() || records.contains_key(key) {
                continue;
            }
            let mut cells = cells.clone();
            if let Some(cell) = email_idx.and_then(|i| cells.get_mut(i)) {
                if !is_valid_email(cell.trim()) {
                    cell.clear();
                }
            }
            records.insert(key.to_string(), cells);
        }

        tracing::debug!(records = records.len(), "supplemental contacts indexed");
        Ok(Self { headers, records })
    }

    /// Trimmed supplemental value for a person name, `None` when the person
    /// is unknown or the value is blank
    pub fn value(&self, name: &str, field: &str) -> Option<&str> {
        let cells = self.records.get(name.trim())?;
        self.headers
            .index(field)
            .and_then(|idx| cells.get(idx))
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
