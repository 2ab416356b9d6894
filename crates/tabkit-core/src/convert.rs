//! Array coercion helpers shared by the cleaners, calculators and writers.

use std::sync::Arc;

use arrow::{
    array::{Array, ArrayRef, AsArray, Float64Array, StringArray},
    compute::cast,
    datatypes::{
        DataType, Float32Type, Float64Type, Int8Type, Int16Type, Int32Type, Int64Type, UInt8Type,
        UInt16Type, UInt32Type, UInt64Type,
    },
    error::ArrowError,
    util::display::{ArrayFormatter, FormatOptions},
};
use snafu::prelude::*;

use crate::error::{ArrowSnafu, TableResult};

/// A single value pulled out of an Arrow array for row-oriented sinks
/// (SQLite inserts, Excel cells).
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// Missing value.
    Null,
    /// Signed integer.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// Boolean flag.
    Bool(bool),
    /// Anything else, rendered as text.
    Text(String),
}

/// True for the date and timestamp Arrow types.
pub fn is_temporal(data_type: &DataType) -> bool {
    matches!(
        data_type,
        DataType::Date32 | DataType::Date64 | DataType::Timestamp(_, _)
    )
}

/// Coerce any array to `Float64`. Values that do not parse become null.
pub fn to_f64(array: &dyn Array) -> TableResult<Float64Array> {
    let out = cast(array, &DataType::Float64).context(ArrowSnafu)?;
    Ok(out.as_primitive::<Float64Type>().clone())
}

/// Coerce any array to optional strings.
pub fn to_strings(array: &dyn Array) -> TableResult<Vec<Option<String>>> {
    let utf8 = match array.data_type() {
        DataType::Utf8 => return Ok(collect_strings(array.as_string::<i32>())),
        _ => cast(array, &DataType::Utf8).context(ArrowSnafu)?,
    };
    Ok(collect_strings(utf8.as_string::<i32>()))
}

fn collect_strings(array: &StringArray) -> Vec<Option<String>> {
    array.iter().map(|v| v.map(str::to_string)).collect()
}

/// A column of `len` copies of `value`.
pub fn broadcast_f64(value: f64, len: usize) -> ArrayRef {
    Arc::new(Float64Array::from(vec![value; len]))
}

/// Read the value at `row` as a [`Cell`].
pub fn cell_at(array: &dyn Array, row: usize) -> Result<Cell, ArrowError> {
    if array.is_null(row) {
        return Ok(Cell::Null);
    }

    let cell = match array.data_type() {
        DataType::Int8 => Cell::Int(array.as_primitive::<Int8Type>().value(row) as i64),
        DataType::Int16 => Cell::Int(array.as_primitive::<Int16Type>().value(row) as i64),
        DataType::Int32 => Cell::Int(array.as_primitive::<Int32Type>().value(row) as i64),
        DataType::Int64 => Cell::Int(array.as_primitive::<Int64Type>().value(row)),
        DataType::UInt8 => Cell::Int(array.as_primitive::<UInt8Type>().value(row) as i64),
        DataType::UInt16 => Cell::Int(array.as_primitive::<UInt16Type>().value(row) as i64),
        DataType::UInt32 => Cell::Int(array.as_primitive::<UInt32Type>().value(row) as i64),
        DataType::UInt64 => match i64::try_from(array.as_primitive::<UInt64Type>().value(row)) {
            Ok(v) => Cell::Int(v),
            Err(_) => Cell::Float(array.as_primitive::<UInt64Type>().value(row) as f64),
        },
        DataType::Float32 => Cell::Float(array.as_primitive::<Float32Type>().value(row) as f64),
        DataType::Float64 => Cell::Float(array.as_primitive::<Float64Type>().value(row)),
        DataType::Boolean => Cell::Bool(array.as_boolean().value(row)),
        DataType::Utf8 => Cell::Text(array.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => Cell::Text(array.as_string::<i64>().value(row).to_string()),
        _ => {
            let options = FormatOptions::default();
            let formatter = ArrayFormatter::try_new(array, &options)?;
            Cell::Text(formatter.value(row).try_to_string()?)
        }
    };
    Ok(cell)
}

/// Render every value of `array` for display; nulls become the empty string.
pub fn format_values(array: &dyn Array, rows: usize) -> Result<Vec<String>, ArrowError> {
    let options = FormatOptions::default();
    let formatter = ArrayFormatter::try_new(array, &options)?;
    (0..rows.min(array.len()))
        .map(|row| formatter.value(row).try_to_string())
        .collect()
}

/// Build a `Utf8` column from optional values.
pub fn string_column(values: Vec<Option<String>>) -> ArrayRef {
    Arc::new(StringArray::from(values))
}

#[cfg(test)]
mod tests {
    use arrow::array::{Array, Float64Array, Int64Array, StringArray};

    use super::{Cell, cell_at, to_f64, to_strings};

    #[test]
    fn to_f64_turns_garbage_into_null() -> Result<(), Box<dyn std::error::Error>> {
        let input = StringArray::from(vec![Some("1.5"), Some("abc"), None]);
        let out = to_f64(&input)?;
        assert_eq!(out.value(0), 1.5);
        assert!(out.is_null(1));
        assert!(out.is_null(2));
        Ok(())
    }

    #[test]
    fn to_strings_renders_numbers() -> Result<(), Box<dyn std::error::Error>> {
        let input = Int64Array::from(vec![Some(7), None]);
        assert_eq!(to_strings(&input)?, vec![Some("7".to_string()), None]);
        Ok(())
    }

    #[test]
    fn cell_at_reads_typed_values() -> Result<(), Box<dyn std::error::Error>> {
        let floats = Float64Array::from(vec![Some(2.5), None]);
        assert_eq!(cell_at(&floats, 0)?, Cell::Float(2.5));
        assert_eq!(cell_at(&floats, 1)?, Cell::Null);
        Ok(())
    }
}
