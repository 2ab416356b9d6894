//! In-memory table backed by a single Arrow `RecordBatch`.
//!
//! A `Table` is an ordered set of named, equal-length columns. Every
//! transformation in this crate mutates a `Table` in place: the batch is
//! rebuilt from its (mostly shared) column arrays and swapped in.

use std::{collections::HashMap, sync::Arc};

use arrow::{
    array::{Array, ArrayRef, BooleanArray},
    compute::{concat_batches, filter_record_batch},
    datatypes::{Field, Schema, SchemaRef},
    record_batch::{RecordBatch, RecordBatchOptions},
};
use snafu::prelude::*;

use crate::error::{ArrowSnafu, ColumnLengthSnafu, MissingColumnsSnafu, TableResult};

/// Tabular data shared by all toolkit operations.
#[derive(Debug, Clone)]
pub struct Table {
    batch: RecordBatch,
}

impl Default for Table {
    fn default() -> Self {
        Self::empty()
    }
}

impl Table {
    /// A table with no columns and no rows.
    pub fn empty() -> Self {
        Self {
            batch: RecordBatch::new_empty(Arc::new(Schema::empty())),
        }
    }

    /// Wrap an existing batch.
    pub fn from_batch(batch: RecordBatch) -> Self {
        Self { batch }
    }

    /// Concatenate `batches` (all sharing `schema`) into one table.
    pub fn try_from_batches(schema: SchemaRef, batches: &[RecordBatch]) -> TableResult<Self> {
        let batch = concat_batches(&schema, batches).context(ArrowSnafu)?;
        Ok(Self { batch })
    }

    /// Build a table from `(name, array)` pairs. All arrays must have the same length.
    pub fn try_from_columns<I, S>(columns: I) -> TableResult<Self>
    where
        I: IntoIterator<Item = (S, ArrayRef)>,
        S: Into<String>,
    {
        let mut table = Self::empty();
        for (name, array) in columns {
            table.set_column(name, array)?;
        }
        Ok(table)
    }

    /// The underlying batch.
    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    /// Consume the table, returning its batch.
    pub fn into_batch(self) -> RecordBatch {
        self.batch
    }

    /// Current schema.
    pub fn schema(&self) -> SchemaRef {
        self.batch.schema()
    }

    /// Number of rows.
    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    /// Number of columns.
    pub fn num_columns(&self) -> usize {
        self.batch.num_columns()
    }

    /// True when the table holds no rows.
    pub fn is_empty(&self) -> bool {
        self.batch.num_rows() == 0
    }

    /// Column names in order.
    pub fn column_names(&self) -> Vec<String> {
        self.batch
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().to_string())
            .collect()
    }

    /// True when a column named `name` exists.
    pub fn has_column(&self, name: &str) -> bool {
        self.batch.schema().index_of(name).is_ok()
    }

    /// Look up a column by name.
    pub fn column(&self, name: &str) -> TableResult<&ArrayRef> {
        self.batch.column_by_name(name).context(MissingColumnsSnafu {
            target: name.to_string(),
            columns: vec![name.to_string()],
        })
    }

    /// Fail with every name in `names` that is not a column of this table.
    pub fn require_columns(&self, target: &str, names: &[&str]) -> TableResult<()> {
        let missing: Vec<String> = names
            .iter()
            .filter(|n| !self.has_column(n))
            .map(|n| n.to_string())
            .collect();

        ensure!(
            missing.is_empty(),
            MissingColumnsSnafu {
                target: target.to_string(),
                columns: missing,
            }
        );
        Ok(())
    }

    /// Replace column `name` in place, or append it when it does not exist yet.
    ///
    /// A table without columns adopts the length of the first array written.
    pub fn set_column(&mut self, name: impl Into<String>, array: ArrayRef) -> TableResult<()> {
        let name = name.into();
        if self.num_columns() > 0 {
            ensure!(
                array.len() == self.num_rows(),
                ColumnLengthSnafu {
                    column: name,
                    expected: self.num_rows(),
                    actual: array.len(),
                }
            );
        }

        let field = Field::new(name.as_str(), array.data_type().clone(), true);
        let schema = self.batch.schema();
        let mut fields: Vec<Field> = schema.fields().iter().map(|f| f.as_ref().clone()).collect();
        let mut columns: Vec<ArrayRef> = self.batch.columns().to_vec();

        match schema.index_of(&name) {
            Ok(idx) => {
                fields[idx] = field;
                columns[idx] = array;
            }
            Err(_) => {
                fields.push(field);
                columns.push(array);
            }
        }

        let rows = columns.first().map(|c| c.len()).unwrap_or(0);
        self.rebuild(fields, columns, rows)
    }

    /// Rename columns according to `mapping` (`old -> new`). Unknown keys are ignored.
    pub fn rename_columns(&mut self, mapping: &HashMap<String, String>) -> TableResult<()> {
        let schema = self.batch.schema();
        let fields: Vec<Field> = schema
            .fields()
            .iter()
            .map(|f| match mapping.get(f.name()) {
                Some(new_name) => f.as_ref().clone().with_name(new_name.as_str()),
                None => f.as_ref().clone(),
            })
            .collect();
        let rows = self.num_rows();
        self.rebuild(fields, self.batch.columns().to_vec(), rows)
    }

    /// Keep only the rows where `mask` is true. Returns how many rows were removed.
    pub fn filter_rows(&mut self, mask: &BooleanArray) -> TableResult<usize> {
        let before = self.num_rows();
        if self.num_columns() == 0 {
            return Ok(0);
        }
        self.batch = filter_record_batch(&self.batch, mask).context(ArrowSnafu)?;
        Ok(before - self.num_rows())
    }

    /// The first `n` rows (zero-copy slice).
    pub fn head(&self, n: usize) -> RecordBatch {
        self.batch.slice(0, n.min(self.num_rows()))
    }

    pub(crate) fn rebuild(
        &mut self,
        fields: Vec<Field>,
        columns: Vec<ArrayRef>,
        rows: usize,
    ) -> TableResult<()> {
        let options = RecordBatchOptions::new().with_row_count(Some(rows));
        self.batch =
            RecordBatch::try_new_with_options(Arc::new(Schema::new(fields)), columns, &options)
                .context(ArrowSnafu)?;
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use std::{collections::HashMap, sync::Arc};

    use arrow::array::{Array, BooleanArray, Int64Array};

    use super::{Table, test_util::sales_table};
    use crate::error::TableError;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn head_slices_without_touching_the_table() {
        let table = sales_table();
        let first = table.head(2);
        assert_eq!(first.num_rows(), 2);
        assert_eq!(first.num_columns(), 3);
        assert_eq!(table.head(10).num_rows(), 3);
        assert_eq!(table.head(0).num_rows(), 0);
        assert_eq!(table.num_rows(), 3);
    }

    #[test]
    fn set_column_replaces_in_place_and_appends_new() -> TestResult {
        let mut table = sales_table();
        table.set_column("qty", Arc::new(Int64Array::from(vec![1, 2, 3])))?;
        assert_eq!(table.column_names(), vec!["product", "price", "qty"]);
        assert_eq!(table.column("qty")?.null_count(), 0);

        table.set_column("extra", Arc::new(Int64Array::from(vec![7, 8, 9])))?;
        assert_eq!(table.num_columns(), 4);
        assert_eq!(table.column_names()[3], "extra");
        Ok(())
    }

    #[test]
    fn set_column_rejects_length_mismatch() {
        let mut table = sales_table();
        let err = table
            .set_column("bad", Arc::new(Int64Array::from(vec![1])))
            .unwrap_err();
        assert!(matches!(
            err,
            TableError::ColumnLength {
                expected: 3,
                actual: 1,
                ..
            }
        ));
    }

    #[test]
    fn rename_ignores_unknown_keys() -> TestResult {
        let mut table = sales_table();
        let mapping = HashMap::from([
            ("price".to_string(), "cost".to_string()),
            ("nope".to_string(), "whatever".to_string()),
        ]);
        table.rename_columns(&mapping)?;
        assert_eq!(table.column_names(), vec!["product", "cost", "qty"]);
        Ok(())
    }

    #[test]
    fn filter_rows_reports_removed_count() -> TestResult {
        let mut table = sales_table();
        let removed = table.filter_rows(&BooleanArray::from(vec![true, false, true]))?;
        assert_eq!(removed, 1);
        assert_eq!(table.num_rows(), 2);
        Ok(())
    }

    #[test]
    fn require_columns_lists_every_missing_name() {
        let table = sales_table();
        let err = table
            .require_columns("Subtotal", &["price", "a", "b"])
            .unwrap_err();
        match err {
            TableError::MissingColumns { columns, target } => {
                assert_eq!(target, "Subtotal");
                assert_eq!(columns, vec!["a".to_string(), "b".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn empty_table_adopts_first_column_length() -> TestResult {
        let mut table = Table::empty();
        assert!(table.is_empty());
        table.set_column("a", Arc::new(Int64Array::from(vec![1, 2])))?;
        assert_eq!(table.num_rows(), 2);
        Ok(())
    }
}
