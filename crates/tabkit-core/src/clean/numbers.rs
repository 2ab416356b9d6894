//! Numeric extraction from messy text columns.

use std::sync::Arc;

use arrow::array::{Array, Int64Array};
use log::info;
use regex::Regex;
use snafu::prelude::*;

use crate::{
    convert::{to_f64, to_strings},
    error::{InvalidPatternSnafu, TableResult},
    table::Table,
};

const NUMBER_PATTERN: &str = r"-?\d+(?:\.\d+)?";

/// First number in `value` (after removing `symbol`), rounded to an integer.
fn extract_number(re: &Regex, value: &str, symbol: Option<&str>) -> Option<i64> {
    let value = match symbol {
        Some(sym) if !sym.is_empty() => value.replace(sym, ""),
        _ => value.to_string(),
    };
    re.find(&value)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .map(|v| v.round() as i64)
}

impl Table {
    /// Coerce `column` into whole numbers.
    ///
    /// Text values have `symbol` removed (when given) and the first number
    /// extracted; numeric columns are rounded directly. Values without a
    /// number become null, or 0 when `fill_missing`.
    pub fn clean_numbers(
        &mut self,
        column: &str,
        symbol: Option<&str>,
        fill_missing: bool,
    ) -> TableResult<()> {
        let array = self.column(column)?.clone();

        let values: Vec<Option<i64>> = if array.data_type().is_numeric() {
            to_f64(array.as_ref())?
                .iter()
                .map(|v| v.map(|f| f.round() as i64))
                .collect()
        } else {
            let re = Regex::new(NUMBER_PATTERN).context(InvalidPatternSnafu {
                pattern: NUMBER_PATTERN,
            })?;
            to_strings(array.as_ref())?
                .into_iter()
                .map(|v| v.and_then(|s| extract_number(&re, &s, symbol)))
                .collect()
        };

        let values: Vec<Option<i64>> = if fill_missing {
            values.into_iter().map(|v| Some(v.unwrap_or(0))).collect()
        } else {
            values
        };

        self.set_column(column, Arc::new(Int64Array::from(values)))?;
        info!("column '{column}' coerced to integers");
        Ok(())
    }
}
