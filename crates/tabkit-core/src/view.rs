//! Text previews of a table.

use arrow::record_batch::RecordBatch;
use snafu::prelude::*;
use tabled::{
    builder::Builder,
    settings::{Style, object::Rows, style::LineText, width::MinWidth},
};

use crate::{
    convert::format_values,
    error::{ArrowSnafu, TableResult},
    table::Table,
};

/// Cell text of every row in `batch`, row-major.
fn batch_rows(batch: &RecordBatch) -> TableResult<Vec<Vec<String>>> {
    let columns = batch
        .columns()
        .iter()
        .map(|col| format_values(col.as_ref(), batch.num_rows()))
        .collect::<Result<Vec<_>, _>>()
        .context(ArrowSnafu)?;

    Ok((0..batch.num_rows())
        .map(|row| columns.iter().map(|col| col[row].clone()).collect())
        .collect())
}

/// Boxed preview of the first `rows` rows. The top border carries the
/// `showing N of M rows` count.
pub fn render_preview(table: &Table, rows: usize) -> TableResult<String> {
    if table.num_columns() == 0 {
        return Ok("(empty table)".to_string());
    }

    let head = table.head(rows);
    let label = format!(" showing {} of {} rows ", head.num_rows(), table.num_rows());
    let width = label.chars().count() + 2;

    let mut builder = Builder::default();
    builder.push_record(table.column_names());
    for record in batch_rows(&head)? {
        builder.push_record(record);
    }

    let mut grid = builder.build();
    grid.with(Style::rounded())
        .with(MinWidth::new(width))
        .with(LineText::new(label, Rows::first()).offset(1))
        // the label does not widen the grid
        .with(MinWidth::new(width));
    Ok(grid.to_string())
}
