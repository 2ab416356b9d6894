//! Per-column data quality profile.

use std::fmt;

use arrow::{array::Array, datatypes::DataType};
use tabled::{builder::Builder, settings::Style};

use crate::table::Table;

/// Profile of one column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnProfile {
    /// Column name.
    pub name: String,
    /// Arrow type.
    pub data_type: DataType,
    /// Number of null values.
    pub nulls: usize,
    /// Share of null values, in percent (0 for an empty table).
    pub null_pct: f64,
}

/// Shape, types and missing-value counts of a table.
#[derive(Debug, Clone, PartialEq)]
pub struct Inspection {
    /// Row count.
    pub rows: usize,
    /// One profile per column, in table order.
    pub columns: Vec<ColumnProfile>,
}

impl Table {
    /// Profile every column of the table.
    pub fn inspect(&self) -> Inspection {
        let rows = self.num_rows();
        let columns = self
            .schema()
            .fields()
            .iter()
            .zip(self.batch().columns())
            .map(|(field, array)| {
                let nulls = array.null_count();
                let null_pct = if rows == 0 {
                    0.0
                } else {
                    nulls as f64 / rows as f64 * 100.0
                };
                ColumnProfile {
                    name: field.name().to_string(),
                    data_type: field.data_type().clone(),
                    nulls,
                    null_pct,
                }
            })
            .collect();

        Inspection { rows, columns }
    }
}

impl fmt::Display for Inspection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "shape: ({}, {})", self.rows, self.columns.len())?;

        let mut builder = Builder::default();
        builder.push_record(["column", "type", "nulls", "null %"]);
        for col in &self.columns {
            builder.push_record([
                col.name.clone(),
                col.data_type.to_string(),
                col.nulls.to_string(),
                format!("{:.2}", col.null_pct),
            ]);
        }
        let mut table = builder.build();
        table.with(Style::rounded());
        write!(f, "{table}")
    }
}

#[cfg(test)]
mod tests {
    use crate::table::test_util::sales_table;

    #[test]
    fn inspect_counts_nulls_per_column() {
        let report = sales_table().inspect();
        assert_eq!(report.rows, 3);
        assert_eq!(report.columns.len(), 3);

        let product = &report.columns[0];
        assert_eq!(product.nulls, 1);
        assert!((product.null_pct - 100.0 / 3.0).abs() < 1e-9);
        assert_eq!(report.columns[1].nulls, 0);

        let text = report.to_string();
        assert!(text.starts_with("shape: (3, 3)"));
        assert!(text.contains("qty"));
    }
}
