//! JSON reader and writer.
//!
//! Input may be a JSON array of objects (one object per row) or
//! newline-delimited objects. Output is always an array of records.

use std::{io::Write, path::Path, sync::Arc};

use arrow::datatypes::{Field, Schema};
use arrow_json::{ArrayWriter, ReaderBuilder, reader::infer_json_schema_from_iterator};
use serde_json::Value;
use snafu::prelude::*;

use crate::{
    error::{ArrowSnafu, IoSnafu, JsonSnafu, TableResult},
    io::create_file,
    table::Table,
};

fn parse_records(path: &Path, text: &str) -> TableResult<Vec<Value>> {
    let trimmed = text.trim_start();
    if trimmed.starts_with('[') {
        return serde_json::from_str::<Vec<Value>>(trimmed).context(JsonSnafu {
            path: path.display().to_string(),
        });
    }

    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            serde_json::from_str::<Value>(line).context(JsonSnafu {
                path: path.display().to_string(),
            })
        })
        .collect()
}

/// Column names in order of first appearance across all records.
fn key_order(records: &[Value]) -> Vec<String> {
    let mut order: Vec<String> = Vec::new();
    for record in records {
        if let Value::Object(map) = record {
            for key in map.keys() {
                if !order.iter().any(|k| k == key) {
                    order.push(key.clone());
                }
            }
        }
    }
    order
}

/// Read a JSON file into a table, inferring the schema from every record.
pub fn read_json(path: &Path) -> TableResult<Table> {
    let text = std::fs::read_to_string(path).context(IoSnafu {
        path: path.display().to_string(),
    })?;
    let records = parse_records(path, &text)?;
    if records.is_empty() {
        return Ok(Table::empty());
    }

    let inferred =
        infer_json_schema_from_iterator(records.iter().map(Ok::<_, arrow::error::ArrowError>))
            .context(ArrowSnafu)?;

    let fields: Vec<Field> = key_order(&records)
        .iter()
        .filter_map(|name| inferred.field_with_name(name).ok().cloned())
        .collect();
    let schema = Arc::new(Schema::new(fields));

    let mut decoder = ReaderBuilder::new(schema.clone())
        .with_batch_size(records.len())
        .build_decoder()
        .context(ArrowSnafu)?;
    decoder.serialize(&records).context(ArrowSnafu)?;

    match decoder.flush().context(ArrowSnafu)? {
        Some(batch) => Ok(Table::from_batch(batch)),
        None => Table::try_from_batches(schema, &[]),
    }
}

/// Write `table` as a JSON array of records.
pub fn write_json(table: &Table, path: &Path) -> TableResult<()> {
    let file = create_file(path)?;
    let mut writer = ArrayWriter::new(file);
    writer.write(table.batch()).context(ArrowSnafu)?;
    writer.finish().context(ArrowSnafu)?;

    let mut file = writer.into_inner();
    file.write_all(b"\n").context(IoSnafu {
        path: path.display().to_string(),
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use arrow::datatypes::DataType;
    use tempfile::TempDir;

    use super::read_json;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn reads_array_of_records_in_key_order() -> TestResult {
        let tmp = TempDir::new()?;
        let path = tmp.path().join("rows.json");
        fs::write(
            &path,
            r#"[{"zeta": 1, "alpha": "x"}, {"zeta": 2, "alpha": null, "extra": 1.5}]"#,
        )?;

        let table = read_json(&path)?;
        assert_eq!(table.column_names(), vec!["zeta", "alpha", "extra"]);
        assert_eq!(table.num_rows(), 2);
        assert_eq!(table.column("extra")?.data_type(), &DataType::Float64);
        Ok(())
    }

    #[test]
    fn reads_newline_delimited_records() -> TestResult {
        let tmp = TempDir::new()?;
        let path = tmp.path().join("rows.json");
        fs::write(&path, "{\"a\": 1}\n\n{\"a\": 2}\n")?;

        let table = read_json(&path)?;
        assert_eq!(table.num_rows(), 2);
        Ok(())
    }

    #[test]
    fn empty_array_gives_empty_table() -> TestResult {
        let tmp = TempDir::new()?;
        let path = tmp.path().join("rows.json");
        fs::write(&path, "[]")?;
        assert!(read_json(&path)?.is_empty());
        Ok(())
    }
}
