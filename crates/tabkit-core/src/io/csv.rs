//! CSV reader and writer.

use std::{io::Seek, path::Path, sync::Arc};

use arrow_csv::{ReaderBuilder, WriterBuilder, reader::Format};
use snafu::prelude::*;

use crate::{
    error::{ArrowSnafu, IoSnafu, TableResult},
    io::{create_file, open_file},
    table::Table,
};

/// Read a CSV file with a header row. The schema is inferred from every record.
pub fn read_csv(path: &Path) -> TableResult<Table> {
    let mut file = open_file(path)?;

    let format = Format::default().with_header(true);
    let (schema, _) = format.infer_schema(&mut file, None).context(ArrowSnafu)?;
    file.rewind().context(IoSnafu {
        path: path.display().to_string(),
    })?;

    let schema = Arc::new(schema);
    let reader = ReaderBuilder::new(schema.clone())
        .with_format(format)
        .build(file)
        .context(ArrowSnafu)?;

    let batches = reader.collect::<Result<Vec<_>, _>>().context(ArrowSnafu)?;
    Table::try_from_batches(schema, &batches)
}

/// Write `table` as CSV with a header row.
pub fn write_csv(table: &Table, path: &Path) -> TableResult<()> {
    let file = create_file(path)?;
    let mut writer = WriterBuilder::new().with_header(true).build(file);
    writer.write(table.batch()).context(ArrowSnafu)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use arrow::{array::Array, datatypes::DataType};
    use tempfile::TempDir;

    use super::{read_csv, write_csv};

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn read_csv_infers_types_and_nulls() -> TestResult {
        let tmp = TempDir::new()?;
        let path = tmp.path().join("in.csv");
        fs::write(&path, "id,name,price\n1,Ana,2.5\n2,,3\n3,Luis,\n")?;

        let table = read_csv(&path)?;
        assert_eq!(table.num_rows(), 3);
        assert_eq!(table.column("id")?.data_type(), &DataType::Int64);
        assert_eq!(table.column("price")?.data_type(), &DataType::Float64);
        assert_eq!(table.column("name")?.null_count(), 1);
        assert_eq!(table.column("price")?.null_count(), 1);
        Ok(())
    }

    #[test]
    fn write_csv_emits_header() -> TestResult {
        let tmp = TempDir::new()?;
        let src = tmp.path().join("in.csv");
        fs::write(&src, "a,b\nx,1\n")?;
        let table = read_csv(&src)?;

        let out = tmp.path().join("out.csv");
        write_csv(&table, &out)?;
        let text = fs::read_to_string(&out)?;
        assert_eq!(text.lines().next(), Some("a,b"));
        assert_eq!(text.lines().count(), 2);
        Ok(())
    }
}
