//! Vendor extract reading
//!
//! Raw delimited rows, header detection against the configured header list,
//! and the optional supplemental contact extract.

pub mod header;
pub mod normalize;
pub mod row;
pub mod supplemental;

pub use header::{detect_headers, HeaderDetection, HeaderMap};
pub use row::{Extract, SourceRow};
pub use supplemental::SupplementalContacts;
