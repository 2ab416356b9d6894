//! Named business formulas built on the operator dispatcher.

use std::{fmt, str::FromStr, sync::Arc};

use arrow::array::{ArrayRef, StringArray};
use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use super::{Operand, Operator, Value, evaluate};
use crate::{
    convert::to_f64,
    error::{InvalidOperandsSnafu, TableError, TableResult, UnknownFormulaSnafu},
    table::Table,
};

/// Default VAT rate used by [`Formula::Tax`].
pub const DEFAULT_TAX_RATE: f64 = 0.16;
/// Default discount used by [`Formula::Discount`] and [`Formula::FinalPrice`].
pub const DEFAULT_DISCOUNT: f64 = 0.10;
/// Default cost per kilogram used by [`Formula::ShippingByKg`].
pub const DEFAULT_SHIPPING_RATE: f64 = 15.0;

/// The business formula catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Formula {
    /// `a / b`
    UnitCost,
    /// `a * b`
    Subtotal,
    /// `a * rate`
    Tax,
    /// `a * (1 - pct)`
    Discount,
    /// `a + b - c`
    FinalPrice,
    /// `a - b`
    GrossMargin,
    /// `(a / b) * 100`
    MarginPct,
    /// `(a / b) * 100`, under its own result name.
    MarginPercent,
    /// `a * rate`
    ShippingByKg,
    /// `a * rate`
    CurrencyConversion,
    /// `Above` when `a > limit`, otherwise `Below`.
    Range,
}

impl Formula {
    /// Every formula, in catalogue order.
    pub const ALL: [Formula; 11] = [
        Formula::UnitCost,
        Formula::Subtotal,
        Formula::Tax,
        Formula::Discount,
        Formula::FinalPrice,
        Formula::GrossMargin,
        Formula::MarginPct,
        Formula::MarginPercent,
        Formula::ShippingByKg,
        Formula::CurrencyConversion,
        Formula::Range,
    ];

    /// The name this formula is looked up by.
    pub fn name(self) -> &'static str {
        match self {
            Formula::UnitCost => "unit_cost",
            Formula::Subtotal => "subtotal",
            Formula::Tax => "tax",
            Formula::Discount => "discount",
            Formula::FinalPrice => "final_price",
            Formula::GrossMargin => "gross_margin",
            Formula::MarginPct => "margin_pct",
            Formula::MarginPercent => "margin_percent",
            Formula::ShippingByKg => "shipping_by_kg",
            Formula::CurrencyConversion => "currency_conversion",
            Formula::Range => "range",
        }
    }

    /// Column written when the caller does not name one.
    ///
    /// `range` has no default and only writes when asked to.
    pub fn default_result(self) -> Option<&'static str> {
        match self {
            Formula::UnitCost => Some("Unit_cost"),
            Formula::Subtotal => Some("Subtotal"),
            Formula::Tax => Some("Tax"),
            Formula::Discount => Some("Discounted_price"),
            Formula::FinalPrice => Some("Final_price"),
            Formula::GrossMargin => Some("Gross_margin"),
            Formula::MarginPct => Some("Margin"),
            Formula::MarginPercent => Some("Margin_percent"),
            Formula::ShippingByKg => Some("Shipping"),
            Formula::CurrencyConversion => Some("Conversion"),
            Formula::Range => None,
        }
    }
}

impl FromStr for Formula {
    type Err = TableError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Formula::ALL
            .into_iter()
            .find(|f| f.name() == wanted)
            .context(UnknownFormulaSnafu { name: s })
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Operands for a formula. Which ones are read depends on the formula.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FormulaArgs {
    /// First operand; required by every formula.
    #[serde(default, alias = "col1")]
    pub a: Option<Operand>,
    /// Second operand (divisor, rate or quantity).
    #[serde(default, alias = "col2")]
    pub b: Option<Operand>,
    /// Third operand, only read by `final_price`.
    #[serde(default, alias = "col3")]
    pub c: Option<Operand>,
    /// Threshold for `range`.
    #[serde(default)]
    pub limit: Option<f64>,
    /// Result column, overriding the formula default.
    #[serde(default, alias = "res")]
    pub result: Option<String>,
}

impl FormulaArgs {
    /// Arguments with just the first two operands set.
    pub fn new(a: impl Into<Operand>, b: impl Into<Operand>) -> Self {
        Self {
            a: Some(a.into()),
            b: Some(b.into()),
            ..Self::default()
        }
    }

    /// Set the result column.
    pub fn with_result(mut self, result: impl Into<String>) -> Self {
        self.result = Some(result.into());
        self
    }
}

fn required<'a>(formula: Formula, operand: &'a Option<Operand>, slot: &str) -> TableResult<&'a Operand> {
    operand.as_ref().context(InvalidOperandsSnafu {
        op: formula.name(),
        message: format!("operand '{slot}' is required"),
    })
}

fn or_default(operand: &Option<Operand>, default: f64) -> Operand {
    operand.clone().unwrap_or(Operand::Scalar(default))
}

impl Table {
    /// Evaluate a named formula, writing its result column.
    pub fn apply_formula(&mut self, formula: Formula, args: &FormulaArgs) -> TableResult<Value> {
        let result = args
            .result
            .clone()
            .or_else(|| formula.default_result().map(str::to_string));
        let target = result.clone().unwrap_or_else(|| formula.name().to_string());

        let a = required(formula, &args.a, "a")?.clone();
        let (b, c) = match formula {
            Formula::Tax => (or_default(&args.b, DEFAULT_TAX_RATE), None),
            Formula::Discount => (or_default(&args.b, DEFAULT_DISCOUNT), None),
            Formula::ShippingByKg => (or_default(&args.b, DEFAULT_SHIPPING_RATE), None),
            Formula::CurrencyConversion => (or_default(&args.b, 1.0), None),
            Formula::FinalPrice => (
                required(formula, &args.b, "b")?.clone(),
                Some(or_default(&args.c, DEFAULT_DISCOUNT)),
            ),
            Formula::Range => (Operand::Scalar(args.limit.unwrap_or_default()), None),
            _ => (required(formula, &args.b, "b")?.clone(), None),
        };
        if formula == Formula::Range {
            ensure!(
                args.limit.is_some(),
                InvalidOperandsSnafu {
                    op: formula.name(),
                    message: "a limit is required",
                }
            );
        }

        let mut operands = vec![&a, &b];
        operands.extend(c.as_ref());
        self.require_operands(&target, &operands)?;

        let lhs = self.resolve(&a)?;
        let rhs = self.resolve(&b)?;
        let value = match formula {
            Formula::UnitCost => evaluate(Operator::Div, &lhs, Some(&rhs))?,
            Formula::Subtotal
            | Formula::Tax
            | Formula::ShippingByKg
            | Formula::CurrencyConversion => evaluate(Operator::Mul, &lhs, Some(&rhs))?,
            Formula::Discount => {
                let keep = evaluate(Operator::Sub, &Value::Scalar(1.0), Some(&rhs))?;
                evaluate(Operator::Mul, &lhs, Some(&keep))?
            }
            Formula::FinalPrice => {
                let gross = evaluate(Operator::Add, &lhs, Some(&rhs))?;
                let c = match &c {
                    Some(operand) => self.resolve(operand)?,
                    None => Value::Scalar(DEFAULT_DISCOUNT),
                };
                evaluate(Operator::Sub, &gross, Some(&c))?
            }
            Formula::GrossMargin => evaluate(Operator::Sub, &lhs, Some(&rhs))?,
            Formula::MarginPct | Formula::MarginPercent => {
                let ratio = evaluate(Operator::Div, &lhs, Some(&rhs))?;
                evaluate(Operator::Mul, &ratio, Some(&Value::Scalar(100.0)))?
            }
            Formula::Range => range_labels(&lhs, args.limit.unwrap_or_default(), self.num_rows())?,
        };

        self.store(value, result.as_deref())
    }
}

fn range_labels(value: &Value, limit: f64, rows: usize) -> TableResult<Value> {
    let label = |v: f64| if v > limit { "Above" } else { "Below" };
    let labels: StringArray = match value {
        Value::Scalar(v) => std::iter::repeat_n(Some(label(*v)), rows).collect(),
        Value::Column(array) => to_f64(array.as_ref())?
            .iter()
            .map(|v| v.map(label))
            .collect(),
    };
    Ok(Value::Column(Arc::new(labels) as ArrayRef))
}

#[cfg(test)]
mod tests {
    use arrow::{array::AsArray, datatypes::Float64Type};

    use super::{Formula, FormulaArgs};
    use crate::{
        calc::{Operand, Value},
        error::TableError,
        table::test_util::sales_table,
    };

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn floats(value: &Value) -> Vec<Option<f64>> {
        match value {
            Value::Column(array) => array.as_primitive::<Float64Type>().iter().collect(),
            Value::Scalar(v) => vec![Some(*v)],
        }
    }

    #[test]
    fn names_parse_case_insensitively() -> TestResult {
        for formula in Formula::ALL {
            assert_eq!(formula.name().to_uppercase().parse::<Formula>()?, formula);
        }
        assert!(matches!(
            "magic".parse::<Formula>(),
            Err(TableError::UnknownFormula { .. })
        ));
        Ok(())
    }

    #[test]
    fn tax_uses_default_rate_and_result_name() -> TestResult {
        let mut table = sales_table();
        let args = FormulaArgs {
            a: Some(Operand::column("price")),
            ..FormulaArgs::default()
        };
        let value = table.apply_formula(Formula::Tax, &args)?;
        assert_eq!(floats(&value), vec![Some(160.0), Some(4.0), Some(0.64)]);
        assert!(table.has_column("Tax"));
        Ok(())
    }

    #[test]
    fn discount_keeps_the_remaining_share() -> TestResult {
        let mut table = sales_table();
        let value = table.apply_formula(Formula::Discount, &FormulaArgs::new("price", 0.25))?;
        assert_eq!(floats(&value), vec![Some(750.0), Some(18.75), Some(3.0)]);
        assert!(table.has_column("Discounted_price"));
        Ok(())
    }

    #[test]
    fn final_price_adds_then_subtracts() -> TestResult {
        let mut table = sales_table();
        let args = FormulaArgs {
            c: Some(Operand::Scalar(5.0)),
            ..FormulaArgs::new("price", 10.0)
        };
        let value = table.apply_formula(Formula::FinalPrice, &args)?;
        assert_eq!(floats(&value), vec![Some(1005.0), Some(30.0), Some(9.0)]);
        Ok(())
    }

    #[test]
    fn margin_is_a_percentage_with_safe_division() -> TestResult {
        let mut table = sales_table();
        let value = table.apply_formula(
            Formula::MarginPct,
            &FormulaArgs::new("price", "qty").with_result("m"),
        )?;
        assert_eq!(floats(&value), vec![Some(50000.0), Some(2500.0), None]);
        assert!(table.has_column("m"));
        assert!(!table.has_column("Margin"));
        Ok(())
    }

    #[test]
    fn range_labels_only_written_when_requested() -> TestResult {
        let mut table = sales_table();
        let args = FormulaArgs {
            a: Some(Operand::column("price")),
            limit: Some(20.0),
            ..FormulaArgs::default()
        };
        table.apply_formula(Formula::Range, &args)?;
        assert_eq!(table.num_columns(), 3);

        table.apply_formula(Formula::Range, &args.clone().with_result("band"))?;
        let band: Vec<_> = table.column("band")?.as_string::<i32>().iter().collect();
        assert_eq!(band, vec![Some("Above"), Some("Above"), Some("Below")]);
        Ok(())
    }

    #[test]
    fn range_without_limit_is_rejected() {
        let mut table = sales_table();
        let args = FormulaArgs {
            a: Some(Operand::column("price")),
            ..FormulaArgs::default()
        };
        let err = table.apply_formula(Formula::Range, &args).unwrap_err();
        assert!(matches!(err, TableError::InvalidOperands { .. }));
    }

    #[test]
    fn missing_operand_columns_block_the_write() {
        let mut table = sales_table();
        let err = table
            .apply_formula(Formula::Subtotal, &FormulaArgs::new("price", "units"))
            .unwrap_err();
        assert!(matches!(err, TableError::MissingColumns { .. }));
        assert!(!table.has_column("Subtotal"));
    }
}
