//! String-keyed arithmetic over columns and scalars.
//!
//! An [`Operator`] is resolved from its symbol (`+`, `-`, `*`, `/`, `++`)
//! and applied elementwise to [`Operand`]s, which are either column names or
//! numeric literals. Named business formulas in [`formula`] are built on the
//! same evaluation path.

pub mod formula;

use std::{fmt, str::FromStr};

use arrow::{
    array::{ArrayRef, Datum, Float64Array, Scalar},
    compute::{
        kernels::numeric::{add, div, mul, sub},
        sum,
    },
    datatypes::Float64Type,
};
use log::info;
use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use crate::{
    convert::{broadcast_f64, to_f64},
    error::{ArrowSnafu, InvalidOperandsSnafu, TableError, TableResult, UnknownOperatorSnafu},
    table::Table,
};

pub use formula::{Formula, FormulaArgs};

/// Arithmetic operators understood by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Operator {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/` (zero divisors are replaced by 1)
    Div,
    /// `++`: sum of the left operand.
    Sum,
}

impl Operator {
    /// The symbol this operator is keyed by.
    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Sub => "-",
            Operator::Mul => "*",
            Operator::Div => "/",
            Operator::Sum => "++",
        }
    }

    fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            Operator::Add => a + b,
            Operator::Sub => a - b,
            Operator::Mul => a * b,
            Operator::Div => a / non_zero(b),
            Operator::Sum => a,
        }
    }
}

fn non_zero(v: f64) -> f64 {
    if v == 0.0 { 1.0 } else { v }
}

impl FromStr for Operator {
    type Err = TableError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "+" => Ok(Operator::Add),
            "-" => Ok(Operator::Sub),
            "*" => Ok(Operator::Mul),
            "/" => Ok(Operator::Div),
            "++" => Ok(Operator::Sum),
            other => UnknownOperatorSnafu { op: other }.fail(),
        }
    }
}

impl TryFrom<String> for Operator {
    type Error = TableError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Operator> for String {
    fn from(op: Operator) -> Self {
        op.symbol().to_string()
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// One side of a calculation as written by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Operand {
    /// Numeric literal.
    Scalar(f64),
    /// Name of an existing column.
    Column(String),
}

impl Operand {
    /// Shorthand for [`Operand::Column`].
    pub fn column(name: impl Into<String>) -> Self {
        Operand::Column(name.into())
    }

    fn column_name(&self) -> Option<&str> {
        match self {
            Operand::Column(name) => Some(name),
            Operand::Scalar(_) => None,
        }
    }
}

impl From<f64> for Operand {
    fn from(v: f64) -> Self {
        Operand::Scalar(v)
    }
}

impl From<&str> for Operand {
    fn from(name: &str) -> Self {
        Operand::Column(name.to_string())
    }
}

/// The outcome of an evaluation: a whole column or a single number.
#[derive(Debug, Clone)]
pub enum Value {
    /// Column-shaped result.
    Column(ArrayRef),
    /// Scalar result (scalar-only operands, or a `++` reduction).
    Scalar(f64),
}

impl Value {
    /// The scalar, when this is one.
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Value::Scalar(v) => Some(*v),
            Value::Column(_) => None,
        }
    }

    /// The array, broadcasting a scalar to `len` rows.
    pub fn into_array(self, len: usize) -> ArrayRef {
        match self {
            Value::Column(array) => array,
            Value::Scalar(v) => broadcast_f64(v, len),
        }
    }
}

/// A single dispatcher request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Calculation {
    /// Operator symbol.
    pub op: Operator,
    /// Left operand.
    #[serde(alias = "col1")]
    pub lhs: Operand,
    /// Right operand (unused by `++`).
    #[serde(default, alias = "col2")]
    pub rhs: Option<Operand>,
    /// Column that receives the result; when absent nothing is written.
    #[serde(default, alias = "res")]
    pub result: Option<String>,
}

enum Side {
    Array(Float64Array),
    Scalar(Scalar<Float64Array>),
}

impl Side {
    fn from_value(value: &Value, divisor: bool) -> TableResult<Self> {
        Ok(match value {
            Value::Scalar(v) => {
                let v = if divisor { non_zero(*v) } else { *v };
                Side::Scalar(Float64Array::new_scalar(v))
            }
            Value::Column(array) => {
                let floats = to_f64(array.as_ref())?;
                if divisor {
                    Side::Array(floats.unary::<_, Float64Type>(non_zero))
                } else {
                    Side::Array(floats)
                }
            }
        })
    }

    fn datum(&self) -> &dyn Datum {
        match self {
            Side::Array(a) => a,
            Side::Scalar(s) => s,
        }
    }
}

/// Apply `op` to already resolved values.
pub fn evaluate(op: Operator, lhs: &Value, rhs: Option<&Value>) -> TableResult<Value> {
    let kernel = match op {
        Operator::Add => add,
        Operator::Sub => sub,
        Operator::Mul => mul,
        Operator::Div => div,
        Operator::Sum => {
            return Ok(match lhs {
                Value::Scalar(v) => Value::Scalar(*v),
                Value::Column(array) => {
                    Value::Scalar(sum(&to_f64(array.as_ref())?).unwrap_or(0.0))
                }
            });
        }
    };

    let rhs = rhs.context(InvalidOperandsSnafu {
        op: op.symbol(),
        message: "a second operand is required",
    })?;

    if let (Value::Scalar(a), Value::Scalar(b)) = (lhs, rhs) {
        return Ok(Value::Scalar(op.apply(*a, *b)));
    }

    let left = Side::from_value(lhs, false)?;
    let right = Side::from_value(rhs, op == Operator::Div)?;
    let out = kernel(left.datum(), right.datum()).context(ArrowSnafu)?;
    Ok(Value::Column(out))
}

impl Table {
    /// Resolve `operand` against this table.
    pub fn resolve(&self, operand: &Operand) -> TableResult<Value> {
        match operand {
            Operand::Scalar(v) => Ok(Value::Scalar(*v)),
            Operand::Column(name) => Ok(Value::Column(self.column(name)?.clone())),
        }
    }

    /// Check that every column operand exists, reporting all missing names at once.
    pub(crate) fn require_operands(&self, target: &str, operands: &[&Operand]) -> TableResult<()> {
        let names: Vec<&str> = operands.iter().filter_map(|o| o.column_name()).collect();
        self.require_columns(target, &names)
    }

    /// Write `value` to `result` (when given) and hand it back.
    pub(crate) fn store(&mut self, value: Value, result: Option<&str>) -> TableResult<Value> {
        if let Some(name) = result.filter(|n| !n.is_empty()) {
            self.set_column(name, value.clone().into_array(self.num_rows()))?;
            info!("column '{name}' created");
        }
        Ok(value)
    }

    /// Run one dispatcher request.
    ///
    /// Nothing is written when an operand column is missing.
    pub fn calculate(&mut self, calc: &Calculation) -> TableResult<Value> {
        let target = calc
            .result
            .clone()
            .unwrap_or_else(|| calc.op.symbol().to_string());
        let mut operands = vec![&calc.lhs];
        if calc.op != Operator::Sum {
            operands.extend(calc.rhs.as_ref());
        }
        self.require_operands(&target, &operands)?;

        let lhs = self.resolve(&calc.lhs)?;
        let rhs = match (&calc.rhs, calc.op) {
            (_, Operator::Sum) | (None, _) => None,
            (Some(operand), _) => Some(self.resolve(operand)?),
        };

        let value = evaluate(calc.op, &lhs, rhs.as_ref())?;
        self.store(value, calc.result.as_deref())
    }
}
