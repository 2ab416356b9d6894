//! Column-level cleaning transforms.
//!
//! Every transform is an inherent method on [`Table`](crate::table::Table)
//! that rewrites one column (or filters rows) in place:
//!
//! - `text`: accent stripping, symbol removal and capitalisation.
//! - `numbers`: numeric extraction from messy text.
//! - `outliers`: IQR-based row filtering.
//! - `dates`: date parsing into millisecond timestamps.
//! - `structure`: column naming, rounding, empty rows and pattern extraction.

pub mod dates;
pub mod numbers;
pub mod outliers;
pub mod structure;
pub mod text;

pub use dates::{parse_datetime, to_timestamps};
pub use outliers::{DEFAULT_IQR_FACTOR, quantile};
pub use structure::DEFAULT_EXTRACT_PATTERN;
