//! Core library for cleaning and reshaping tabular data.
//!
//! `tabkit-core` loads a table from a file (CSV, Parquet, JSON, Excel) or a
//! SQLite database into an Arrow-backed [`Table`], transforms it in place and
//! writes it back out:
//!
//! - Column cleaning: text normalization, numeric extraction, outlier
//!   trimming, date parsing, renaming, rounding and pattern extraction
//!   (`clean` module).
//! - Derived columns through an operator dispatcher and a catalogue of named
//!   business formulas (`calc` module) and their date counterparts (`time`
//!   module).
//! - Row and column concatenation of tables (`merge` module).
//! - Previews, per-column profiles and an append-only process journal
//!   (`view`, `inspect`, `journal` modules).
//!
//! The [`Toolbox`] session ties these together for callers such as the
//! `tabkit` command line.
#![deny(missing_docs)]
pub mod calc;
pub mod clean;
pub mod convert;
pub mod error;
pub mod inspect;
pub mod io;
pub mod journal;
pub mod merge;
pub mod sql;
pub mod table;
pub mod time;
pub mod toolbox;
pub mod view;

pub use calc::{Calculation, Formula, FormulaArgs, Operand, Operator, Value};
pub use error::{TableError, TableResult};
pub use io::{ExportFormat, FileFormat, read_table};
pub use merge::MergeAxis;
pub use sql::{ConnectionConfig, ExportMode};
pub use table::Table;
pub use time::{DateCalculation, DateFormula, DateFormulaArgs, DateOperator, DateOutcome};
pub use toolbox::{Toolbox, ToolboxConfig};
