//! Date and date-time parsing.

use std::sync::Arc;

use arrow::{
    array::{Array, AsArray, BooleanArray, TimestampMillisecondArray},
    compute::cast,
    datatypes::{DataType, TimeUnit, TimestampMillisecondType},
};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use log::info;
use snafu::prelude::*;

use crate::{
    convert::{is_temporal, to_strings},
    error::{ArrowSnafu, TableResult},
    table::Table,
};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d-%m-%Y %H:%M:%S",
];

// Month-first before day-first for ambiguous slashed dates.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d/%m/%Y", "%d-%m-%Y", "%Y%m%d", "%d %b %Y", "%b %d %Y",
    "%B %d, %Y", "%d %B %Y",
];

/// Parse a date or date-time literal. Surrounding whitespace is ignored.
///
/// Offsets (RFC 3339) are converted to UTC; everything else is taken as-is.
pub fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Coerce any array into naive millisecond timestamps; unparsable values become null.
pub fn to_timestamps(array: &dyn Array) -> TableResult<TimestampMillisecondArray> {
    let target = DataType::Timestamp(TimeUnit::Millisecond, None);
    if is_temporal(array.data_type()) {
        let out = cast(array, &target).context(ArrowSnafu)?;
        return Ok(out.as_primitive::<TimestampMillisecondType>().clone());
    }

    Ok(to_strings(array)?
        .into_iter()
        .map(|v| {
            v.as_deref()
                .and_then(parse_datetime)
                .map(|dt| dt.and_utc().timestamp_millis())
        })
        .collect())
}

impl Table {
    /// Parse `column` into a millisecond timestamp column.
    ///
    /// Invalid values become null; with `drop_invalid` their rows are removed.
    /// Returns the number of removed rows.
    pub fn clean_dates(&mut self, column: &str, drop_invalid: bool) -> TableResult<usize> {
        let parsed = to_timestamps(self.column(column)?.as_ref())?;
        let invalid = parsed.null_count();
        self.set_column(column, Arc::new(parsed.clone()))?;

        let removed = if drop_invalid && invalid > 0 {
            let keep: BooleanArray = parsed.iter().map(|v| Some(v.is_some())).collect();
            self.filter_rows(&keep)?
        } else {
            0
        };

        info!("column '{column}' parsed as dates ({invalid} invalid, {removed} rows dropped)");
        Ok(removed)
    }
}
