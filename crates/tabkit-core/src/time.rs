//! Date arithmetic and calendar extraction.
//!
//! Dates live in naive millisecond timestamp columns. Text operands are
//! parsed with the same rules as [`Table::clean_dates`]; a text operand that
//! does not name a column is read as a date literal.

use std::{collections::BTreeMap, fmt, str::FromStr, sync::Arc};

use arrow::array::{Array, ArrayRef, Int64Array, StringArray, TimestampMillisecondArray};
use chrono::{DateTime, Datelike, NaiveDateTime, Timelike, Weekday};
use log::info;
use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use crate::{
    calc::Operand,
    clean::{parse_datetime, to_timestamps},
    convert::to_f64,
    error::{
        InvalidDateSnafu, InvalidOperandsSnafu, TableError, TableResult, UnknownFormulaSnafu,
        UnknownOperatorSnafu,
    },
    table::Table,
};

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Operators of the date dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DateOperator {
    /// `=`: parse the operand as dates.
    Parse,
    /// `+`: shift by a number of days.
    Add,
    /// `-`: whole days between two dates, or shift back by days.
    Sub,
    /// `D`: weekday number, Monday = 0.
    Weekday,
    /// `D2`: weekday name.
    WeekdayName,
    /// `S`: ISO week number.
    Week,
    /// `M`: month.
    Month,
    /// `H`: hour.
    Hour,
    /// `Y`: year.
    Year,
}

impl DateOperator {
    /// The symbol this operator is keyed by.
    pub fn symbol(self) -> &'static str {
        match self {
            DateOperator::Parse => "=",
            DateOperator::Add => "+",
            DateOperator::Sub => "-",
            DateOperator::Weekday => "D",
            DateOperator::WeekdayName => "D2",
            DateOperator::Week => "S",
            DateOperator::Month => "M",
            DateOperator::Hour => "H",
            DateOperator::Year => "Y",
        }
    }
}

impl FromStr for DateOperator {
    type Err = TableError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "=" => Ok(DateOperator::Parse),
            "+" => Ok(DateOperator::Add),
            "-" => Ok(DateOperator::Sub),
            "D" => Ok(DateOperator::Weekday),
            "D2" => Ok(DateOperator::WeekdayName),
            "S" => Ok(DateOperator::Week),
            "M" => Ok(DateOperator::Month),
            "H" => Ok(DateOperator::Hour),
            "Y" => Ok(DateOperator::Year),
            other => UnknownOperatorSnafu { op: other }.fail(),
        }
    }
}

impl TryFrom<String> for DateOperator {
    type Error = TableError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DateOperator> for String {
    fn from(op: DateOperator) -> Self {
        op.symbol().to_string()
    }
}

impl fmt::Display for DateOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A single date dispatcher request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DateCalculation {
    /// Operator symbol.
    pub op: DateOperator,
    /// Date column or date literal.
    #[serde(alias = "col1")]
    pub first: Operand,
    /// Second date, or a number of days, for `+` and `-`.
    #[serde(default, alias = "col2")]
    pub second: Option<Operand>,
    /// Column that receives the result.
    #[serde(default, alias = "res")]
    pub result: Option<String>,
}

/// Resolved operand: per-row millisecond timestamps or day counts.
enum Resolved {
    Moments(Vec<Option<i64>>),
    Days(Vec<Option<f64>>),
}

fn to_naive(millis: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp_millis(millis).map(|dt| dt.naive_utc())
}

/// `None` when the shift does not fit in an i64 millisecond count.
fn days_to_millis(days: f64) -> Option<i64> {
    let millis = (days * MILLIS_PER_DAY as f64).round();
    (millis.is_finite() && millis.abs() < i64::MAX as f64).then_some(millis as i64)
}

impl Table {
    fn resolve_moments(&self, op: &str, operand: &Operand) -> TableResult<Vec<Option<i64>>> {
        match self.resolve_dates(op, operand)? {
            Resolved::Moments(moments) => Ok(moments),
            Resolved::Days(_) => InvalidOperandsSnafu {
                op,
                message: "expected a date column or literal, found a number",
            }
            .fail(),
        }
    }

    fn resolve_dates(&self, op: &str, operand: &Operand) -> TableResult<Resolved> {
        let rows = self.num_rows();
        match operand {
            Operand::Scalar(days) => Ok(Resolved::Days(vec![Some(*days); rows])),
            Operand::Column(name) if self.has_column(name) => {
                let array = self.column(name)?;
                if array.data_type().is_numeric() {
                    Ok(Resolved::Days(to_f64(array.as_ref())?.iter().collect()))
                } else {
                    Ok(Resolved::Moments(to_timestamps(array.as_ref())?.iter().collect()))
                }
            }
            Operand::Column(literal) => {
                let parsed = parse_datetime(literal).context(InvalidDateSnafu {
                    value: literal.as_str(),
                })?;
                let millis = parsed.and_utc().timestamp_millis();
                info!("'{literal}' read as a date literal for '{op}'");
                Ok(Resolved::Moments(vec![Some(millis); rows]))
            }
        }
    }

    fn required_second<'a>(op: DateOperator, calc: &'a DateCalculation) -> TableResult<&'a Operand> {
        calc.second.as_ref().context(InvalidOperandsSnafu {
            op: op.symbol(),
            message: "a second operand is required",
        })
    }

    /// Run one date dispatcher request, returning the computed column.
    pub fn date_calculate(&mut self, calc: &DateCalculation) -> TableResult<ArrayRef> {
        let op = calc.op;
        let first = self.resolve_moments(op.symbol(), &calc.first)?;

        let out: ArrayRef = match op {
            DateOperator::Parse => Arc::new(TimestampMillisecondArray::from(first)),
            DateOperator::Add | DateOperator::Sub => {
                let second = Self::required_second(op, calc)?;
                match (op, self.resolve_dates(op.symbol(), second)?) {
                    (DateOperator::Sub, Resolved::Moments(other)) => {
                        let days: Int64Array = first
                            .iter()
                            .zip(other)
                            .map(|(a, b)| {
                                Some((*a)?.checked_sub(b?)?.div_euclid(MILLIS_PER_DAY))
                            })
                            .collect();
                        Arc::new(days)
                    }
                    (_, Resolved::Moments(_)) => {
                        return InvalidOperandsSnafu {
                            op: op.symbol(),
                            message: "cannot add two dates",
                        }
                        .fail();
                    }
                    (_, Resolved::Days(days)) => {
                        let sub = op == DateOperator::Sub;
                        let shifted: TimestampMillisecondArray = first
                            .iter()
                            .zip(days)
                            .map(|(a, d)| {
                                let delta = days_to_millis(d?)?;
                                if sub {
                                    (*a)?.checked_sub(delta)
                                } else {
                                    (*a)?.checked_add(delta)
                                }
                            })
                            .collect();
                        Arc::new(shifted)
                    }
                }
            }
            DateOperator::WeekdayName => {
                let names: StringArray = first
                    .iter()
                    .map(|m| m.and_then(to_naive).map(|dt| weekday_name(dt.weekday())))
                    .collect();
                Arc::new(names)
            }
            DateOperator::Weekday
            | DateOperator::Week
            | DateOperator::Month
            | DateOperator::Hour
            | DateOperator::Year => {
                let parts: Int64Array = first
                    .iter()
                    .map(|m| m.and_then(to_naive).map(|dt| calendar_part(op, &dt)))
                    .collect();
                Arc::new(parts)
            }
        };

        if let Some(name) = calc.result.as_deref().filter(|n| !n.is_empty()) {
            self.set_column(name, out.clone())?;
            info!("column '{name}' created by date operator '{op}'");
        }
        Ok(out)
    }
}

fn calendar_part(op: DateOperator, dt: &NaiveDateTime) -> i64 {
    match op {
        DateOperator::Weekday => dt.weekday().num_days_from_monday() as i64,
        DateOperator::Week => dt.iso_week().week() as i64,
        DateOperator::Month => dt.month() as i64,
        DateOperator::Hour => dt.hour() as i64,
        _ => dt.year() as i64,
    }
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Named date formulas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateFormula {
    /// Days from `second` (order date) to `first` (delivery date).
    LeadTime,
    /// Days from `second` (entry date) to `first` (reference date).
    InventoryAge,
    /// `first` moved forward by `second` days.
    Projection,
    /// Counts per year, month and weekday/weekend.
    Seasonality,
    /// Work shift label from the hour of day.
    Shifts,
}

impl DateFormula {
    /// Every date formula.
    pub const ALL: [DateFormula; 5] = [
        DateFormula::LeadTime,
        DateFormula::InventoryAge,
        DateFormula::Projection,
        DateFormula::Seasonality,
        DateFormula::Shifts,
    ];

    /// The name this formula is looked up by.
    pub fn name(self) -> &'static str {
        match self {
            DateFormula::LeadTime => "lead_time",
            DateFormula::InventoryAge => "inventory_age",
            DateFormula::Projection => "projection",
            DateFormula::Seasonality => "seasonality",
            DateFormula::Shifts => "shifts",
        }
    }

    /// Column written when the caller does not name one.
    pub fn default_result(self) -> Option<&'static str> {
        match self {
            DateFormula::LeadTime => Some("Lead_time"),
            DateFormula::InventoryAge => Some("Inventory_age"),
            DateFormula::Projection => Some("Projection"),
            DateFormula::Seasonality => None,
            DateFormula::Shifts => Some("Shift"),
        }
    }
}

impl FromStr for DateFormula {
    type Err = TableError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        DateFormula::ALL
            .into_iter()
            .find(|f| f.name() == wanted)
            .context(UnknownFormulaSnafu { name: s })
    }
}

impl fmt::Display for DateFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Operands for a date formula.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DateFormulaArgs {
    /// Main date column.
    #[serde(alias = "col1")]
    pub first: Operand,
    /// Second date column or day count.
    #[serde(default, alias = "col2")]
    pub second: Option<Operand>,
    /// Result column, overriding the formula default.
    #[serde(default, alias = "res")]
    pub result: Option<String>,
}

/// Calendar distribution of a date column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeasonalitySummary {
    /// Row count per year.
    pub by_year: BTreeMap<i32, usize>,
    /// Row count per month (1-12).
    pub by_month: BTreeMap<u32, usize>,
    /// Rows falling Monday to Friday.
    pub weekdays: usize,
    /// Rows falling on Saturday or Sunday.
    pub weekends: usize,
}

impl fmt::Display for SeasonalitySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "by year:")?;
        for (year, count) in &self.by_year {
            writeln!(f, "  {year}: {count}")?;
        }
        writeln!(f, "by month:")?;
        for (month, count) in &self.by_month {
            writeln!(f, "  {month:02}: {count}")?;
        }
        write!(f, "weekdays: {}, weekends: {}", self.weekdays, self.weekends)
    }
}

/// What a date formula produced.
#[derive(Debug, Clone)]
pub enum DateOutcome {
    /// A computed column.
    Column(ArrayRef),
    /// A seasonality report (nothing written to the table).
    Seasonality(SeasonalitySummary),
}

/// Label for an hour of the day.
pub fn shift_for_hour(hour: u32) -> &'static str {
    match hour {
        6..=11 => "Morning",
        12..=17 => "Afternoon",
        18..=23 => "Evening",
        _ => "Night",
    }
}

impl Table {
    /// Evaluate a named date formula.
    pub fn apply_date_formula(
        &mut self,
        formula: DateFormula,
        args: &DateFormulaArgs,
    ) -> TableResult<DateOutcome> {
        let result = args
            .result
            .clone()
            .or_else(|| formula.default_result().map(str::to_string));

        let op = match formula {
            DateFormula::LeadTime | DateFormula::InventoryAge => DateOperator::Sub,
            DateFormula::Projection => DateOperator::Add,
            DateFormula::Seasonality => {
                return Ok(DateOutcome::Seasonality(self.seasonality(&args.first)?));
            }
            DateFormula::Shifts => {
                let hours = self.resolve_moments(formula.name(), &args.first)?;
                let labels: StringArray = hours
                    .into_iter()
                    .map(|m| m.and_then(to_naive).map(|dt| shift_for_hour(dt.hour())))
                    .collect();
                let labels: ArrayRef = Arc::new(labels);
                if let Some(name) = result.as_deref() {
                    self.set_column(name, labels.clone())?;
                }
                return Ok(DateOutcome::Column(labels));
            }
        };

        let calc = DateCalculation {
            op,
            first: args.first.clone(),
            second: args.second.clone(),
            result,
        };
        self.date_calculate(&calc).map(DateOutcome::Column)
    }

    /// Count the dates in `operand` per year, month and weekday/weekend.
    pub fn seasonality(&self, operand: &Operand) -> TableResult<SeasonalitySummary> {
        let moments = self.resolve_moments(DateFormula::Seasonality.name(), operand)?;
        let mut summary = SeasonalitySummary::default();
        for dt in moments.into_iter().flatten().filter_map(to_naive) {
            *summary.by_year.entry(dt.year()).or_default() += 1;
            *summary.by_month.entry(dt.month()).or_default() += 1;
            if dt.weekday().num_days_from_monday() >= 5 {
                summary.weekends += 1;
            } else {
                summary.weekdays += 1;
            }
        }
        Ok(summary)
    }
}
