//! Computed field rules
//!
//! Composite cells (`value,startDate,endDate`) are the bulk loader's own
//! wire format and are produced byte-for-byte.

use super::ProjectionContext;
use crate::config::fields;
use crate::extract::normalize::strip_digit_group_separators;
use crate::extract::SourceRow;
use serde::{Deserialize, Serialize};

/// Identifier of a computed field rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    /// Name segment before the first comma
    LastName,
    /// Name segment after the first comma
    FirstName,
    /// Provenance tag stored in the person note
    PersonNote,
    /// `FloorPlan,<run date>,`
    RentableTypeRef,
    /// `<status code>,<run date>,` or `,,` for unknown statuses
    RentableStatus,
    /// Always blank; the loader links users from the lease table
    RentableUserSpec,
    /// `<person ref>,<lease start>,<lease end>`
    PayorSpec,
    UserSpec,
    /// `<unit>,<rent>`
    RentableSpec,
    /// Normalized internal status name
    StatusName,
    /// Bound column with thousands separators stripped
    Numeric,
}

impl Rule {
    pub fn apply(
        self,
        row: &SourceRow<'_>,
        ctx: &ProjectionContext<'_>,
        column: Option<&str>,
    ) -> String {
        match self {
            Rule::LastName => split_name(row.value(fields::NAME)).0.to_string(),
            Rule::FirstName => split_name(row.value(fields::NAME)).1.to_string(),
            Rule::PersonNote => ctx.run.note_tag(row.ordinal),
            Rule::RentableTypeRef => {
                composite(&[row.value(fields::FLOOR_PLAN), ctx.run.run_date.as_str(), ""])
            }
            Rule::RentableStatus => match ctx.status.code() {
                Some(code) => composite(&[code, ctx.run.run_date.as_str(), ""]),
                None => composite(&["", "", ""]),
            },
            Rule::RentableUserSpec => String::new(),
            Rule::PayorSpec | Rule::UserSpec => {
                let (start, end) = lease_dates(row, ctx);
                composite(&[ctx.person_ref.unwrap_or(""), start, end])
            }
            Rule::RentableSpec => {
                let rent = strip_digit_group_separators(row.value(fields::RENT));
                composite(&[row.value(fields::UNIT), rent.as_str()])
            }
            Rule::StatusName => ctx.status.name().unwrap_or("").to_string(),
            Rule::Numeric => column
                .map(|c| strip_digit_group_separators(row.value(c)))
                .unwrap_or_default(),
        }
    }
}

/// Split a full-name cell on the first comma into (last, first)
pub fn split_name(full: &str) -> (&str, &str) {
    match full.split_once(',') {
        Some((last, first)) => (last.trim(), first.trim()),
        None => (full.trim(), ""),
    }
}

/// Lease start/end, falling back to the run date and the open stop date
pub fn lease_dates<'a>(row: &SourceRow<'a>, ctx: &'a ProjectionContext<'_>) -> (&'a str, &'a str) {
    let start = match row.value(fields::LEASE_START) {
        "" => ctx.run.run_date.as_str(),
        s => s,
    };
    let end = match row.value(fields::LEASE_END) {
        "" => ctx.run.stop_date.as_str(),
        e => e,
    };
    (start, end)
}

fn composite(parts: &[&str]) -> String {
    parts.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_name_on_first_comma() {
        assert_eq!(split_name("Doe, Pat"), ("Doe", "Pat"));
        assert_eq!(split_name(" Doe ,  Pat , Jr "), ("Doe", "Pat , Jr"));
        assert_eq!(split_name("Cher"), ("Cher", ""));
        assert_eq!(split_name(""), ("", ""));
    }
}
