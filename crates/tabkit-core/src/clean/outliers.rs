//! Interquartile-range outlier filtering.

use std::sync::Arc;

use arrow::array::{BooleanArray, Float64Array};
use log::info;

use crate::{convert::to_f64, error::TableResult, table::Table};

/// Tukey fence multiplier applied to the interquartile range.
pub const DEFAULT_IQR_FACTOR: f64 = 1.5;

/// Quantile `q` (0..=1) of already sorted values, interpolating linearly
/// between the two nearest ranks. `None` for an empty slice.
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// `(lower, upper)` fences for `values`, ignoring NaN.
pub fn iqr_bounds(values: impl IntoIterator<Item = f64>, factor: f64) -> Option<(f64, f64)> {
    let mut sorted: Vec<f64> = values.into_iter().filter(|v| !v.is_nan()).collect();
    sorted.sort_by(f64::total_cmp);

    let q1 = quantile(&sorted, 0.25)?;
    let q3 = quantile(&sorted, 0.75)?;
    let iqr = q3 - q1;
    Some((q1 - factor * iqr, q3 + factor * iqr))
}

impl Table {
    /// Drop rows whose `column` value lies outside the Tukey fences
    /// `[Q1 - factor * IQR, Q3 + factor * IQR]`.
    ///
    /// The column is coerced to float first (unparsable values and NaN become
    /// null). Rows with a null value are kept. Returns the number of removed rows.
    pub fn remove_outliers(&mut self, column: &str, factor: f64) -> TableResult<usize> {
        let values: Float64Array = to_f64(self.column(column)?.as_ref())?
            .iter()
            .map(|v| v.filter(|x| !x.is_nan()))
            .collect();
        self.set_column(column, Arc::new(values.clone()))?;

        let Some((lower, upper)) = iqr_bounds(values.iter().flatten(), factor) else {
            return Ok(0);
        };

        let keep: BooleanArray = values
            .iter()
            .map(|v| Some(v.is_none_or(|x| x >= lower && x <= upper)))
            .collect();
        let removed = self.filter_rows(&keep)?;

        info!("removed {removed} outliers in '{column}' (bounds {lower:.4}..={upper:.4})");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow::array::{Array, ArrayRef, AsArray, Float64Array, StringArray};
    use arrow::datatypes::Float64Type;

    use super::{DEFAULT_IQR_FACTOR, iqr_bounds, quantile};
    use crate::table::Table;

    #[test]
    fn quantile_interpolates_linearly() {
        let v = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile(&v, 0.25), Some(1.75));
        assert_eq!(quantile(&v, 0.75), Some(3.25));
        assert_eq!(quantile(&v, 0.0), Some(1.0));
        assert_eq!(quantile(&v, 1.0), Some(4.0));
        assert_eq!(quantile(&[], 0.5), None);
    }

    #[test]
    fn bounds_follow_tukey_fences() {
        let (lo, hi) = iqr_bounds([1.0, 2.0, 3.0, 4.0], 1.5).expect("non-empty");
        assert_eq!(lo, 1.75 - 1.5 * 1.5);
        assert_eq!(hi, 3.25 + 1.5 * 1.5);
    }

    #[test]
    fn removes_extreme_rows_and_keeps_nulls() -> Result<(), Box<dyn std::error::Error>> {
        let mut table = Table::try_from_columns([
            (
                "price",
                Arc::new(StringArray::from(vec![
                    Some("10"),
                    Some("12"),
                    Some("11"),
                    Some("9999"),
                    Some("n/a"),
                    Some("13"),
                ])) as ArrayRef,
            ),
            (
                "id",
                Arc::new(Float64Array::from(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0])) as ArrayRef,
            ),
        ])?;

        let removed = table.remove_outliers("price", DEFAULT_IQR_FACTOR)?;
        assert_eq!(removed, 1);
        assert_eq!(table.num_rows(), 5);

        let price = table.column("price")?.as_primitive::<Float64Type>();
        assert_eq!(price.null_count(), 1);
        let ids = table.column("id")?.as_primitive::<Float64Type>();
        assert_eq!(ids.values().to_vec(), vec![1.0, 2.0, 3.0, 5.0, 6.0]);
        Ok(())
    }

    #[test]
    fn nan_text_is_kept_like_null() -> Result<(), Box<dyn std::error::Error>> {
        let mut table = Table::try_from_columns([(
            "x",
            Arc::new(StringArray::from(vec!["1", "2", "3", "NaN"])) as ArrayRef,
        )])?;
        assert_eq!(table.remove_outliers("x", DEFAULT_IQR_FACTOR)?, 0);
        assert_eq!(table.num_rows(), 4);
        assert!(table.column("x")?.is_null(3));
        Ok(())
    }

    #[test]
    fn all_null_column_removes_nothing() -> Result<(), Box<dyn std::error::Error>> {
        let mut table = Table::try_from_columns([(
            "x",
            Arc::new(StringArray::from(vec![Some("a"), None])) as ArrayRef,
        )])?;
        assert_eq!(table.remove_outliers("x", DEFAULT_IQR_FACTOR)?, 0);
        assert_eq!(table.num_rows(), 2);
        Ok(())
    }
}
