//! Column naming, rounding, empty-row removal and pattern extraction.

use std::{collections::HashMap, sync::Arc};

use arrow::{
    array::{Array, BooleanArray},
    compute::{is_not_null, or},
    datatypes::Float64Type,
};
use log::{info, warn};
use regex::Regex;
use snafu::prelude::*;

use crate::{
    convert::{string_column, to_f64, to_strings},
    error::{ArrowSnafu, InvalidPatternSnafu, TableResult},
    table::Table,
};

/// Pattern used by [`Table::extract_pattern`] when none is given: e-mail addresses.
pub const DEFAULT_EXTRACT_PATTERN: &str = r"[\w\.-]+@[\w\.-]+";

/// Lower-case `raw`, map everything outside `[a-z0-9_]` to `_` and make sure
/// the result starts with a letter.
pub fn sanitize_column_name(raw: &str) -> String {
    let mut out: String = raw
        .trim()
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                ch.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();

    if out.is_empty() {
        return "c".to_string();
    }

    if out
        .chars()
        .next()
        .map(|ch| !ch.is_ascii_alphabetic())
        .unwrap_or(false)
    {
        out = format!("c_{out}");
    }
    out
}

fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals.min(f64::MAX_10_EXP as u32) as i32);
    let scaled = value * factor;
    if scaled.is_finite() {
        scaled.round() / factor
    } else {
        value
    }
}

impl Table {
    /// Rename the first columns positionally to `names`.
    ///
    /// Extra names (or extra columns) are left alone.
    pub fn standardize_columns(&mut self, names: &[String]) -> TableResult<()> {
        if names.len() != self.num_columns() {
            warn!(
                "standardize: {} names for {} columns; renaming the first {}",
                names.len(),
                self.num_columns(),
                names.len().min(self.num_columns())
            );
        }

        let mapping: HashMap<String, String> = self
            .column_names()
            .into_iter()
            .zip(names.iter().cloned())
            .collect();
        self.rename_columns(&mapping)
    }

    /// Rewrite every column name with [`sanitize_column_name`].
    pub fn normalize_column_names(&mut self) -> TableResult<()> {
        let mapping: HashMap<String, String> = self
            .column_names()
            .into_iter()
            .map(|name| {
                let clean = sanitize_column_name(&name);
                (name, clean)
            })
            .collect();
        self.rename_columns(&mapping)
    }

    /// Coerce `column` to float and round it to `decimals` places.
    pub fn round_decimals(&mut self, column: &str, decimals: u32) -> TableResult<()> {
        let values = to_f64(self.column(column)?.as_ref())?;
        let rounded = values.unary::<_, Float64Type>(|v| round_to(v, decimals));
        self.set_column(column, Arc::new(rounded))?;
        info!("column '{column}' rounded to {decimals} decimals");
        Ok(())
    }

    /// Remove rows in which every column is null. Returns the removed count.
    pub fn drop_empty_rows(&mut self) -> TableResult<usize> {
        let mut keep = BooleanArray::from(vec![false; self.num_rows()]);
        for array in self.batch().columns() {
            let present = is_not_null(array.as_ref()).context(ArrowSnafu)?;
            keep = or(&keep, &present).context(ArrowSnafu)?;
        }

        let removed = self.filter_rows(&keep)?;
        info!("removed {removed} empty rows");
        Ok(removed)
    }

    /// Replace every value of `column` with the first match of `pattern`
    /// (null when nothing matches).
    pub fn extract_pattern(&mut self, column: &str, pattern: &str) -> TableResult<()> {
        let re = Regex::new(pattern).context(InvalidPatternSnafu { pattern })?;
        let values = to_strings(self.column(column)?.as_ref())?;

        let extracted: Vec<Option<String>> = values
            .into_iter()
            .map(|v| v.and_then(|s| re.find(&s).map(|m| m.as_str().to_string())))
            .collect();
        let found = extracted.iter().filter(|v| v.is_some()).count();

        self.set_column(column, string_column(extracted))?;
        info!("extracted {found} matches of /{pattern}/ in '{column}'");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow::array::{Array, ArrayRef, AsArray, Float64Array, Int64Array, StringArray};
    use arrow::datatypes::Float64Type;

    use super::{DEFAULT_EXTRACT_PATTERN, round_to, sanitize_column_name};
    use crate::{error::TableError, table::Table, table::test_util::sales_table};

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn sanitize_column_name_rules() {
        assert_eq!(sanitize_column_name(" Unit Price ($) "), "unit_price____");
        assert_eq!(sanitize_column_name("2024 sales"), "c_2024_sales");
        assert_eq!(sanitize_column_name(""), "c");
    }

    #[test]
    fn standardize_renames_positionally() -> TestResult {
        let mut table = sales_table();
        table.standardize_columns(&["ID".to_string(), "Product".to_string()])?;
        assert_eq!(table.column_names(), vec!["ID", "Product", "qty"]);
        Ok(())
    }

    #[test]
    fn normalize_column_names_sanitizes_all() -> TestResult {
        let mut table = Table::try_from_columns([(
            "Fecha Compra",
            Arc::new(Int64Array::from(vec![1])) as ArrayRef,
        )])?;
        table.normalize_column_names()?;
        assert_eq!(table.column_names(), vec!["fecha_compra"]);
        Ok(())
    }

    #[test]
    fn round_decimals_coerces_text() -> TestResult {
        let mut table = Table::try_from_columns([(
            "tax",
            Arc::new(StringArray::from(vec![Some("1.23456"), Some("x")])) as ArrayRef,
        )])?;
        table.round_decimals("tax", 2)?;
        let col = table.column("tax")?.as_primitive::<Float64Type>();
        assert_eq!(col.value(0), 1.23);
        assert!(col.is_null(1));
        Ok(())
    }

    #[test]
    fn huge_precision_leaves_values_alone() {
        assert_eq!(round_to(123.456, 400), 123.456);
        assert_eq!(round_to(1.0e10, u32::MAX), 1.0e10);
        assert_eq!(round_to(1.26, 1), 1.3);
    }

    #[test]
    fn drop_empty_rows_only_removes_fully_null_rows() -> TestResult {
        let mut table = Table::try_from_columns([
            (
                "a",
                Arc::new(StringArray::from(vec![Some("x"), None, None])) as ArrayRef,
            ),
            (
                "b",
                Arc::new(Float64Array::from(vec![None, None, Some(1.0)])) as ArrayRef,
            ),
        ])?;
        assert_eq!(table.drop_empty_rows()?, 1);
        assert_eq!(table.num_rows(), 2);
        Ok(())
    }

    #[test]
    fn extract_pattern_keeps_first_match() -> TestResult {
        let mut table = Table::try_from_columns([(
            "email",
            Arc::new(StringArray::from(vec![
                Some("contact: ana@mail.com, old: a@b.c"),
                Some("no email here"),
                None,
            ])) as ArrayRef,
        )])?;
        table.extract_pattern("email", DEFAULT_EXTRACT_PATTERN)?;
        let col = table.column("email")?.as_string::<i32>();
        assert_eq!(col.value(0), "ana@mail.com");
        assert!(col.is_null(1));
        assert!(col.is_null(2));
        Ok(())
    }

    #[test]
    fn extract_pattern_rejects_bad_regex() {
        let mut table = sales_table();
        let err = table.extract_pattern("product", "(").unwrap_err();
        assert!(matches!(err, TableError::InvalidPattern { .. }));
    }
}
