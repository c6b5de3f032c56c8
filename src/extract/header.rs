//! Header detection
//!
//! Vendor extracts put report banners above the real header line, so the
//! header row is found by scanning: the first row in which every required
//! header is present wins, and data starts on the next row.

use super::normalize::normalize_header_text;
use crate::config::HeaderConfig;
use crate::error::ImportError;
use std::collections::BTreeMap;

/// Logical field name -> column index ("not found" is `None`)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    columns: BTreeMap<String, Option<usize>>,
}

impl HeaderMap {
    /// Every configured header starts as "not found"
    pub fn unresolved(headers: &[HeaderConfig]) -> Self {
        Self {
            columns: headers.iter().map(|h| (h.name.clone(), None)).collect(),
        }
    }

    pub fn index(&self, field: &str) -> Option<usize> {
        self.columns.get(field).copied().flatten()
    }

    pub fn set(&mut self, field: &str, index: usize) {
        self.columns.insert(field.to_string(), Some(index));
    }

    pub fn found_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.columns.values().filter_map(|idx| *idx)
    }

    fn missing_required<'h>(&self, headers: &'h [HeaderConfig]) -> Vec<&'h str> {
        headers
            .iter()
            .filter(|h| !h.optional && self.index(&h.name).is_none())
            .map(|h| h.name.as_str())
            .collect()
    }
}

/// Outcome of the header scan
#[derive(Debug, Clone)]
pub struct HeaderDetection {
    pub headers: HeaderMap,
    /// 0-based index of the header row
    pub header_row: usize,
}

impl HeaderDetection {
    /// 0-based index of the first data row
    pub fn data_start(&self) -> usize {
        self.header_row + 1
    }
}

/// Match one row's cells against the configured headers
pub fn match_header_row(cells: &[String], headers: &[HeaderConfig]) -> HeaderMap {
    let mut map = HeaderMap::unresolved(headers);
    let normalized: Vec<String> = cells.iter().map(|c| normalize_header_text(c)).collect();

    for header in headers {
        let candidates: Vec<String> = std::iter::once(&header.text)
            .chain(header.aliases.iter())
            .map(|t| normalize_header_text(t))
            .collect();
        // Header text takes precedence over aliases
        let found = candidates
            .iter()
            .find_map(|cand| normalized.iter().position(|cell| cell == cand));
        if let Some(idx) = found {
            map.set(&header.name, idx);
        }
    }
    map
}

/// Scan rows top-down for the header line
pub fn detect_headers(
    rows: &[Vec<String>],
    headers: &[HeaderConfig],
) -> Result<HeaderDetection, ImportError> {
    let mut best: Option<(usize, HeaderMap)> = None;

    for (row_idx, cells) in rows.iter().enumerate() {
        let map = match_header_row(cells, headers);
        let missing = map.missing_required(headers).len();
        if missing == 0 {
            tracing::debug!(row = row_idx + 1, "header row detected");
            return Ok(HeaderDetection {
                headers: map,
                header_row: row_idx,
            });
        }
        if best.as_ref().map_or(true, |(m, _)| missing < *m) {
            best = Some((missing, map));
        }
    }

    let reference = best
        .map(|(_, map)| map)
        .unwrap_or_else(|| HeaderMap::unresolved(headers));
    let columns = reference
        .missing_required(headers)
        .into_iter()
        .map(str::to_string)
        .collect();
    Err(ImportError::MissingRequiredColumns { columns })
}
