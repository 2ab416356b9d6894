//! Vertical (row) and horizontal (column) concatenation of tables.

use std::{fmt, str::FromStr};

use arrow::{
    array::{Array, ArrayRef, new_null_array},
    compute::{cast, concat},
    datatypes::DataType,
};
use log::warn;
use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use crate::{
    error::{ArrowSnafu, TableResult},
    table::Table,
};

/// Direction of a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeAxis {
    /// Append the rows of the other table.
    #[default]
    Vertical,
    /// Place the columns of the other table to the right.
    Horizontal,
}

impl MergeAxis {
    /// Lenient parse: `h`/`horizontal` and `v`/`vertical` (any case).
    /// Anything else falls back to vertical with a warning.
    pub fn parse_lenient(s: &str) -> Self {
        match s.parse() {
            Ok(axis) => axis,
            Err(_) => {
                warn!("unknown merge axis '{s}'; allowed values are h or v, using vertical");
                MergeAxis::Vertical
            }
        }
    }
}

impl FromStr for MergeAxis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "v" | "vertical" => Ok(MergeAxis::Vertical),
            "h" | "horizontal" => Ok(MergeAxis::Horizontal),
            other => Err(format!("unknown merge axis '{other}'")),
        }
    }
}

impl fmt::Display for MergeAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeAxis::Vertical => f.write_str("vertical"),
            MergeAxis::Horizontal => f.write_str("horizontal"),
        }
    }
}

/// Common type for a column seen with two different types.
fn widen(left: &DataType, right: &DataType) -> DataType {
    if left == right {
        left.clone()
    } else if *left == DataType::Null {
        right.clone()
    } else if *right == DataType::Null {
        left.clone()
    } else if left.is_numeric() && right.is_numeric() {
        DataType::Float64
    } else {
        DataType::Utf8
    }
}

fn column_or_nulls(table: &Table, name: &str, data_type: &DataType) -> TableResult<ArrayRef> {
    match table.column(name) {
        Ok(array) if array.data_type() == data_type => Ok(array.clone()),
        Ok(array) => cast(array.as_ref(), data_type).context(ArrowSnafu),
        Err(_) => Ok(new_null_array(data_type, table.num_rows())),
    }
}

fn pad(array: &ArrayRef, rows: usize) -> TableResult<ArrayRef> {
    if array.len() >= rows {
        return Ok(array.clone());
    }
    let nulls = new_null_array(array.data_type(), rows - array.len());
    concat(&[array.as_ref(), nulls.as_ref()]).context(ArrowSnafu)
}

fn unique_name(taken: &[String], name: &str) -> String {
    if !taken.iter().any(|t| t == name) {
        return name.to_string();
    }
    (2..)
        .map(|n| format!("{name}_{n}"))
        .find(|candidate| !taken.iter().any(|t| t == candidate))
        .unwrap_or_else(|| name.to_string())
}

impl Table {
    /// Merge `other` into this table along `axis`.
    pub fn merge(&mut self, other: &Table, axis: MergeAxis) -> TableResult<()> {
        match axis {
            MergeAxis::Vertical => self.merge_rows(other),
            MergeAxis::Horizontal => self.merge_columns(other),
        }
    }

    fn merge_rows(&mut self, other: &Table) -> TableResult<()> {
        if self.num_columns() == 0 {
            *self = other.clone();
            return Ok(());
        }
        if self.column_names() != other.column_names() {
            warn!("merging tables whose columns differ; missing values are filled with nulls");
        }

        let mut names = self.column_names();
        for name in other.column_names() {
            if !names.contains(&name) {
                names.push(name);
            }
        }

        let mut columns = Vec::with_capacity(names.len());
        for name in &names {
            let left_type = self.column(name).map(|c| c.data_type().clone()).ok();
            let right_type = other.column(name).map(|c| c.data_type().clone()).ok();
            let data_type = match (&left_type, &right_type) {
                (Some(l), Some(r)) => widen(l, r),
                (Some(t), None) | (None, Some(t)) => t.clone(),
                (None, None) => DataType::Null,
            };

            let top = column_or_nulls(self, name, &data_type)?;
            let bottom = column_or_nulls(other, name, &data_type)?;
            let merged = concat(&[top.as_ref(), bottom.as_ref()]).context(ArrowSnafu)?;
            columns.push((name.clone(), merged));
        }

        *self = Table::try_from_columns(columns)?;
        Ok(())
    }

    fn merge_columns(&mut self, other: &Table) -> TableResult<()> {
        let rows = self.num_rows().max(other.num_rows());
        let mut names: Vec<String> = Vec::new();
        let mut columns = Vec::new();

        for table in [&*self, other] {
            for (name, array) in table.column_names().into_iter().zip(table.batch().columns()) {
                let name = unique_name(&names, &name);
                names.push(name.clone());
                columns.push((name, pad(array, rows)?));
            }
        }

        *self = Table::try_from_columns(columns)?;
        Ok(())
    }
}
