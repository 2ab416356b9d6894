//! Error types and SNAFU context selectors for `tabkit-core`.
//!
//! This module centralizes the `TableError` enum used by the public API and
//! exposes context selectors (via `#[snafu(visibility(pub(crate)))]`) so the
//! loaders, cleaners and calculators can attach context without re-exporting
//! everything at the crate root. Keep new variants here so user-facing
//! messages stay consistent.

use arrow::{datatypes::DataType, error::ArrowError};
use parquet::errors::ParquetError;
use snafu::prelude::*;

/// Errors from table loading, transformation and export.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum TableError {
    /// Filesystem access failed.
    #[snafu(display("I/O error at {path}: {source}"))]
    Io {
        /// The path being read or written.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The file extension does not map to a supported format.
    #[snafu(display("Unsupported file format '{extension}'"))]
    UnsupportedFormat {
        /// The extension (or format name) that was rejected.
        extension: String,
    },

    /// An Arrow kernel, reader or writer failed.
    #[snafu(display("Arrow error: {source}"))]
    Arrow {
        /// Underlying Arrow error.
        source: ArrowError,
    },

    /// Reading or writing Parquet failed.
    #[snafu(display("Parquet error: {source}"))]
    Parquet {
        /// Underlying Parquet error.
        source: ParquetError,
    },

    /// JSON input could not be parsed.
    #[snafu(display("Invalid JSON in {path}: {source}"))]
    Json {
        /// The file being parsed.
        path: String,
        /// Underlying serde_json error.
        source: serde_json::Error,
    },

    /// Reading or writing an Excel workbook failed.
    #[snafu(display("Excel error at {path}: {message}"))]
    Excel {
        /// The workbook path.
        path: String,
        /// Backend error rendered as text.
        message: String,
    },

    /// One or more referenced columns do not exist.
    #[snafu(display("Cannot compute '{target}': missing columns {columns:?}"))]
    MissingColumns {
        /// What was being computed (a result column or an operation name).
        target: String,
        /// Every missing column name.
        columns: Vec<String>,
    },

    /// A column array does not have the table's row count.
    #[snafu(display("Column {column} has {actual} rows, table has {expected}"))]
    ColumnLength {
        /// The column being written.
        column: String,
        /// The table row count.
        expected: usize,
        /// The array length.
        actual: usize,
    },

    /// A column has a type the operation cannot work with.
    #[snafu(display("Column {column} has type {data_type}, expected {expected}"))]
    ColumnType {
        /// The offending column.
        column: String,
        /// The actual Arrow type.
        data_type: DataType,
        /// Human readable description of what was expected.
        expected: String,
    },

    /// The operator string is not one the dispatcher knows.
    #[snafu(display("Unknown operator '{op}'"))]
    UnknownOperator {
        /// The operator as given.
        op: String,
    },

    /// The named formula does not exist.
    #[snafu(display("Unknown formula '{name}'"))]
    UnknownFormula {
        /// The formula name as given.
        name: String,
    },

    /// An operation was given the wrong operand shape.
    #[snafu(display("Invalid operands for '{op}': {message}"))]
    InvalidOperands {
        /// The operator being evaluated.
        op: String,
        /// What was wrong.
        message: String,
    },

    /// A literal could not be parsed as a date.
    #[snafu(display("Cannot parse '{value}' as a date"))]
    InvalidDate {
        /// The rejected literal.
        value: String,
    },

    /// A user supplied regular expression did not compile.
    #[snafu(display("Invalid pattern '{pattern}': {source}"))]
    InvalidPattern {
        /// The pattern as given.
        pattern: String,
        /// Underlying regex error.
        source: regex::Error,
    },

    /// A SQL operation was requested before `connect`.
    #[snafu(display("No active database connection; call connect first"))]
    NotConnected,

    /// The connection config names an engine this build cannot open.
    #[snafu(display("Unsupported database engine '{engine}' ({url})"))]
    UnsupportedEngine {
        /// The engine name.
        engine: String,
        /// The URL built from the config, with the password masked.
        url: String,
    },

    /// The SQLite backend reported an error.
    #[snafu(display("SQL error: {source}"))]
    Sql {
        /// Underlying rusqlite error.
        source: rusqlite::Error,
    },

    /// An export target already holds a table and the mode forbids replacing it.
    #[snafu(display("Table {table} already exists"))]
    SqlTableExists {
        /// The target table name.
        table: String,
    },

    /// Export was requested for a table with no rows.
    #[snafu(display("Table is empty; nothing to export"))]
    EmptyTable,
}

/// Convenience result alias for this crate.
pub type TableResult<T> = Result<T, TableError>;
