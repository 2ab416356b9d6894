//! Parquet reader and writer.

use std::path::Path;

use parquet::{
    arrow::{ArrowWriter, arrow_reader::ParquetRecordBatchReaderBuilder},
    basic::Compression,
    file::properties::WriterProperties,
};
use snafu::prelude::*;

use crate::{
    error::{ArrowSnafu, ParquetSnafu, TableResult},
    io::{create_file, open_file},
    table::Table,
};

/// Read every row group of a Parquet file into one table.
pub fn read_parquet(path: &Path) -> TableResult<Table> {
    let file = open_file(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file).context(ParquetSnafu)?;
    let schema = builder.schema().clone();
    let reader = builder.build().context(ParquetSnafu)?;

    let batches = reader.collect::<Result<Vec<_>, _>>().context(ArrowSnafu)?;
    Table::try_from_batches(schema, &batches)
}

/// Write `table` as a single snappy-compressed Parquet file.
pub fn write_parquet(table: &Table, path: &Path) -> TableResult<()> {
    let file = create_file(path)?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();

    let mut writer =
        ArrowWriter::try_new(file, table.schema(), Some(props)).context(ParquetSnafu)?;
    writer.write(table.batch()).context(ParquetSnafu)?;
    writer.close().context(ParquetSnafu)?;
    Ok(())
}
