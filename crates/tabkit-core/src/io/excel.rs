//! Excel workbook reader and writer (cargo feature `excel`).
//!
//! Without the feature both entry points fail with `UnsupportedFormat`.

use std::path::Path;

use crate::{error::TableResult, table::Table};

#[cfg(not(feature = "excel"))]
use crate::error::UnsupportedFormatSnafu;

/// Read the first worksheet of a workbook. The first row holds the column names.
#[cfg(feature = "excel")]
pub fn read_excel(path: &Path) -> TableResult<Table> {
    imp::read_excel(path)
}

/// Read the first worksheet of a workbook. The first row holds the column names.
#[cfg(not(feature = "excel"))]
pub fn read_excel(path: &Path) -> TableResult<Table> {
    let _ = path;
    UnsupportedFormatSnafu {
        extension: "excel (build with the `excel` feature)",
    }
    .fail()
}

/// Write `table` to an `.xlsx` workbook with one sheet called `sheet`.
#[cfg(feature = "excel")]
pub fn write_excel(table: &Table, path: &Path, sheet: &str) -> TableResult<()> {
    imp::write_excel(table, path, sheet)
}

/// Write `table` to an `.xlsx` workbook with one sheet called `sheet`.
#[cfg(not(feature = "excel"))]
pub fn write_excel(table: &Table, path: &Path, sheet: &str) -> TableResult<()> {
    let _ = (table, path, sheet);
    UnsupportedFormatSnafu {
        extension: "excel (build with the `excel` feature)",
    }
    .fail()
}

#[cfg(feature = "excel")]
mod imp {
    use std::{path::Path, sync::Arc};

    use arrow::array::{
        ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray, TimestampMillisecondArray,
    };
    use calamine::{Data, Reader, open_workbook_auto};
    use rust_xlsxwriter::Workbook;
    use snafu::prelude::*;

    use crate::{
        convert::{Cell, cell_at},
        error::{ArrowSnafu, ExcelSnafu, TableResult},
        table::Table,
    };

    fn excel_err(path: &Path, e: impl std::fmt::Display) -> crate::error::TableError {
        ExcelSnafu {
            path: path.display().to_string(),
            message: e.to_string(),
        }
        .build()
    }

    fn header_name(cell: &Data, idx: usize) -> String {
        match cell {
            Data::Empty => format!("column_{idx}"),
            other => other.to_string(),
        }
    }

    fn infer_column(values: &[&Data]) -> ArrayRef {
        let non_empty = || values.iter().filter(|v| !matches!(v, Data::Empty));

        if non_empty().all(|v| matches!(v, Data::Int(_))) {
            return Arc::new(Int64Array::from(
                values
                    .iter()
                    .map(|v| match v {
                        Data::Int(i) => Some(*i),
                        _ => None,
                    })
                    .collect::<Vec<_>>(),
            ));
        }

        if non_empty().all(|v| matches!(v, Data::Int(_) | Data::Float(_))) {
            return Arc::new(Float64Array::from(
                values
                    .iter()
                    .map(|v| match v {
                        Data::Int(i) => Some(*i as f64),
                        Data::Float(f) => Some(*f),
                        _ => None,
                    })
                    .collect::<Vec<_>>(),
            ));
        }

        if non_empty().all(|v| matches!(v, Data::Bool(_))) {
            return Arc::new(BooleanArray::from(
                values
                    .iter()
                    .map(|v| match v {
                        Data::Bool(b) => Some(*b),
                        _ => None,
                    })
                    .collect::<Vec<_>>(),
            ));
        }

        if non_empty().all(|v| matches!(v, Data::DateTime(_))) {
            return Arc::new(TimestampMillisecondArray::from(
                values
                    .iter()
                    .map(|v| match v {
                        Data::DateTime(dt) => dt.as_datetime().map(|d| d.and_utc().timestamp_millis()),
                        _ => None,
                    })
                    .collect::<Vec<_>>(),
            ));
        }

        Arc::new(StringArray::from(
            values
                .iter()
                .map(|v| match v {
                    Data::Empty => None,
                    other => Some(other.to_string()),
                })
                .collect::<Vec<_>>(),
        ))
    }

    pub(super) fn read_excel(path: &Path) -> TableResult<Table> {
        let mut workbook = open_workbook_auto(path).map_err(|e| excel_err(path, e))?;
        let Some(sheet) = workbook.sheet_names().first().cloned() else {
            return Ok(Table::empty());
        };
        let range = workbook
            .worksheet_range(&sheet)
            .map_err(|e| excel_err(path, e))?;

        let mut rows = range.rows();
        let Some(header) = rows.next() else {
            return Ok(Table::empty());
        };
        let body: Vec<&[Data]> = rows.collect();

        let mut columns = Vec::with_capacity(header.len());
        for (idx, cell) in header.iter().enumerate() {
            let values: Vec<&Data> = body
                .iter()
                .map(|row| row.get(idx).unwrap_or(&Data::Empty))
                .collect();
            columns.push((header_name(cell, idx), infer_column(&values)));
        }
        Table::try_from_columns(columns)
    }

    pub(super) fn write_excel(table: &Table, path: &Path, sheet: &str) -> TableResult<()> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sheet).map_err(|e| excel_err(path, e))?;

        for (col, name) in table.column_names().iter().enumerate() {
            worksheet
                .write_string(0, col as u16, name)
                .map_err(|e| excel_err(path, e))?;
        }

        for (col, array) in table.batch().columns().iter().enumerate() {
            for row in 0..table.num_rows() {
                let xl_row = row as u32 + 1;
                let xl_col = col as u16;
                let written = match cell_at(array.as_ref(), row).context(ArrowSnafu)? {
                    Cell::Null => continue,
                    Cell::Int(v) => worksheet.write_number(xl_row, xl_col, v as f64),
                    Cell::Float(v) => worksheet.write_number(xl_row, xl_col, v),
                    Cell::Bool(v) => worksheet.write_boolean(xl_row, xl_col, v),
                    Cell::Text(v) => worksheet.write_string(xl_row, xl_col, &v),
                };
                written.map_err(|e| excel_err(path, e))?;
            }
        }

        workbook.save(path).map_err(|e| excel_err(path, e))?;
        Ok(())
    }
}

#[cfg(all(test, feature = "excel"))]
mod tests {
    use tempfile::TempDir;

    use super::{read_excel, write_excel};
    use crate::table::test_util::sales_table;

    #[test]
    fn excel_round_trip_keeps_shape() -> Result<(), Box<dyn std::error::Error>> {
        let tmp = TempDir::new()?;
        let path = tmp.path().join("sales.xlsx");
        let table = sales_table();

        write_excel(&table, &path, "sales")?;
        let back = read_excel(&path)?;
        assert_eq!(back.column_names(), table.column_names());
        assert_eq!(back.num_rows(), 3);
        Ok(())
    }
}
