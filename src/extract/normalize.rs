//! Text normalization for header and status matching
//!
//! - Unicode NFKC normalization
//! - Lowercase conversion
//! - Header text drops every non-alphanumeric character
//! - Status text keeps words, collapsing whitespace

use unicode_normalization::UnicodeNormalization;

/// Normalize header cell text for matching.
///
/// `"Unit Lease Status"`, `"unit_lease_status"` and `"UNIT-LEASE STATUS "`
/// all normalize to `"unitleasestatus"`.
pub fn normalize_header_text(s: &str) -> String {
    s.nfkc()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Normalize a status indicator: NFKC fold, lowercase, collapse whitespace
pub fn normalize_status_text(s: &str) -> String {
    let folded: String = s.nfkc().flat_map(char::to_lowercase).collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Strip thousands separators from a numeric cell (`1,200,000` -> `1200000`)
pub fn strip_digit_group_separators(s: &str) -> String {
    s.trim().replace(',', "")
}
