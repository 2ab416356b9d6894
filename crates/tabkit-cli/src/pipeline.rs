//! JSON pipeline files: one input, an ordered list of steps, and outputs.
//!
//! ```json
//! {
//!   "input": "sales.csv",
//!   "config": { "journal": "report.txt" },
//!   "steps": [
//!     { "step": "clean_numbers", "column": "price", "symbol": "$" },
//!     { "step": "formula", "name": "tax", "a": "price" }
//!   ],
//!   "export": { "name": "sales_clean", "dir": "out", "format": "parquet" }
//! }
//! ```
//!
//! Relative paths are resolved against the directory of the pipeline file.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use log::info;
use serde::Deserialize;
use snafu::prelude::*;
use tabkit_core::{
    Calculation, ConnectionConfig, DateCalculation, DateFormula, DateFormulaArgs, DateOutcome,
    ExportFormat, ExportMode, Formula, FormulaArgs, MergeAxis, Operand, TableResult, Toolbox,
    ToolboxConfig, Value, clean::DEFAULT_EXTRACT_PATTERN,
};

use crate::error::{
    CliResult, DatabaseSnafu, ExportSnafu, LoadSnafu, NoInputSnafu, ParsePipelineSnafu,
    ReadPipelineSnafu, StepSnafu,
};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Pipeline {
    #[serde(default)]
    pub input: Option<PathBuf>,
    #[serde(default)]
    pub config: ToolboxConfig,
    #[serde(default)]
    pub connection: Option<ConnectionConfig>,
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default)]
    pub export: Option<ExportSpec>,
    #[serde(default)]
    pub export_sql: Option<SqlExportSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExportSpec {
    pub name: String,
    #[serde(default)]
    pub dir: Option<PathBuf>,
    #[serde(default)]
    pub format: ExportFormat,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SqlExportSpec {
    pub table: String,
    #[serde(default)]
    pub mode: ExportMode,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case", deny_unknown_fields)]
pub enum Step {
    Rename {
        mapping: HashMap<String, String>,
    },
    Standardize {
        names: Vec<String>,
    },
    NormalizeColumns,
    CleanText {
        column: String,
        #[serde(default)]
        keep_digits: bool,
    },
    CleanNumbers {
        column: String,
        #[serde(default)]
        symbol: Option<String>,
        #[serde(default)]
        fill_missing: bool,
    },
    RemoveOutliers {
        column: String,
        /// Overrides the configured IQR factor for this step.
        #[serde(default)]
        factor: Option<f64>,
    },
    CleanDates {
        column: String,
        #[serde(default)]
        drop_invalid: bool,
    },
    Round {
        column: String,
        decimals: u32,
    },
    DropEmptyRows,
    Extract {
        column: String,
        #[serde(default)]
        pattern: Option<String>,
    },
    Calculate(Calculation),
    Formula {
        name: Formula,
        #[serde(default, alias = "col1")]
        a: Option<Operand>,
        #[serde(default, alias = "col2")]
        b: Option<Operand>,
        #[serde(default, alias = "col3")]
        c: Option<Operand>,
        #[serde(default)]
        limit: Option<f64>,
        #[serde(default, alias = "res")]
        result: Option<String>,
    },
    DateCalculate(DateCalculation),
    DateFormula {
        name: DateFormula,
        #[serde(alias = "col1")]
        first: Operand,
        #[serde(default, alias = "col2")]
        second: Option<Operand>,
        #[serde(default, alias = "res")]
        result: Option<String>,
    },
    Merge {
        files: Vec<PathBuf>,
        #[serde(default)]
        axis: MergeAxis,
    },
    LoadSql {
        source: String,
    },
    View {
        #[serde(default)]
        rows: Option<usize>,
    },
    Inspect,
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::Rename { .. } => "rename",
            Step::Standardize { .. } => "standardize",
            Step::NormalizeColumns => "normalize_columns",
            Step::CleanText { .. } => "clean_text",
            Step::CleanNumbers { .. } => "clean_numbers",
            Step::RemoveOutliers { .. } => "remove_outliers",
            Step::CleanDates { .. } => "clean_dates",
            Step::Round { .. } => "round",
            Step::DropEmptyRows => "drop_empty_rows",
            Step::Extract { .. } => "extract",
            Step::Calculate(_) => "calculate",
            Step::Formula { .. } => "formula",
            Step::DateCalculate(_) => "date_calculate",
            Step::DateFormula { .. } => "date_formula",
            Step::Merge { .. } => "merge",
            Step::LoadSql { .. } => "load_sql",
            Step::View { .. } => "view",
            Step::Inspect => "inspect",
        }
    }

    /// Apply this step, printing anything it reports to stdout.
    fn apply(&self, toolbox: &mut Toolbox, base: &Path) -> TableResult<()> {
        match self {
            Step::Rename { mapping } => toolbox.table_mut().rename_columns(mapping),
            Step::Standardize { names } => toolbox.table_mut().standardize_columns(names),
            Step::NormalizeColumns => toolbox.table_mut().normalize_column_names(),
            Step::CleanText {
                column,
                keep_digits,
            } => toolbox.table_mut().clean_text(column, *keep_digits),
            Step::CleanNumbers {
                column,
                symbol,
                fill_missing,
            } => toolbox
                .table_mut()
                .clean_numbers(column, symbol.as_deref(), *fill_missing),
            Step::RemoveOutliers { column, factor } => {
                let removed = match factor {
                    Some(k) => toolbox.table_mut().remove_outliers(column, *k)?,
                    None => toolbox.remove_outliers(column)?,
                };
                println!("{removed} outlier rows removed from '{column}'");
                Ok(())
            }
            Step::CleanDates {
                column,
                drop_invalid,
            } => toolbox
                .table_mut()
                .clean_dates(column, *drop_invalid)
                .map(|_| ()),
            Step::Round { column, decimals } => {
                toolbox.table_mut().round_decimals(column, *decimals)
            }
            Step::DropEmptyRows => toolbox.table_mut().drop_empty_rows().map(|_| ()),
            Step::Extract { column, pattern } => toolbox.table_mut().extract_pattern(
                column,
                pattern.as_deref().unwrap_or(DEFAULT_EXTRACT_PATTERN),
            ),
            Step::Calculate(calc) => {
                if let Value::Scalar(v) = toolbox.calculate(calc)? {
                    println!("{} = {v}", calc.op);
                }
                Ok(())
            }
            Step::Formula {
                name,
                a,
                b,
                c,
                limit,
                result,
            } => {
                let args = FormulaArgs {
                    a: a.clone(),
                    b: b.clone(),
                    c: c.clone(),
                    limit: *limit,
                    result: result.clone(),
                };
                toolbox.apply_formula(*name, &args).map(|_| ())
            }
            Step::DateCalculate(calc) => toolbox.date_calculate(calc).map(|_| ()),
            Step::DateFormula {
                name,
                first,
                second,
                result,
            } => {
                let args = DateFormulaArgs {
                    first: first.clone(),
                    second: second.clone(),
                    result: result.clone(),
                };
                if let DateOutcome::Seasonality(summary) = toolbox.apply_date_formula(*name, &args)? {
                    println!("{summary}");
                }
                Ok(())
            }
            Step::Merge { files, axis } => {
                let files: Vec<PathBuf> = files.iter().map(|f| base.join(f)).collect();
                let stragglers = toolbox.merge_files(&files, *axis)?;
                for path in stragglers {
                    println!("not merged: {}", path.display());
                }
                Ok(())
            }
            Step::LoadSql { source } => toolbox.load_sql(source),
            Step::View { rows } => {
                println!("{}", toolbox.view(*rows)?);
                Ok(())
            }
            Step::Inspect => {
                println!("{}", toolbox.inspect());
                Ok(())
            }
        }
    }
}

pub fn load_pipeline(path: &Path) -> CliResult<Pipeline> {
    let text = std::fs::read_to_string(path).context(ReadPipelineSnafu { path })?;
    serde_json::from_str(&text).context(ParsePipelineSnafu { path })
}

/// Execute `pipeline`, resolving relative paths against `base`.
///
/// `journal` replaces the configured journal when given.
pub fn run_pipeline(
    pipeline: Pipeline,
    base: &Path,
    journal: Option<Option<PathBuf>>,
) -> CliResult<Toolbox> {
    let mut config = pipeline.config;
    match journal {
        Some(path) => config.journal = path,
        None => config.journal = config.journal.map(|p| base.join(p)),
    }
    let mut toolbox = Toolbox::new(config);

    if let Some(conn) = &pipeline.connection {
        let conn = resolve_database(conn, base);
        toolbox.connect(&conn).context(DatabaseSnafu {
            database: conn.database.as_str(),
        })?;
    }

    let starts_with_sql = matches!(pipeline.steps.first(), Some(Step::LoadSql { .. }));
    match &pipeline.input {
        Some(input) => {
            let path = base.join(input);
            toolbox.open(&path).context(LoadSnafu { path })?;
        }
        None => ensure!(starts_with_sql, NoInputSnafu),
    }

    for (index, step) in pipeline.steps.iter().enumerate() {
        info!("step {}: {}", index + 1, step.name());
        step.apply(&mut toolbox, base).context(StepSnafu {
            index: index + 1,
            step: step.name(),
        })?;
    }

    if let Some(export) = &pipeline.export {
        let dir = base.join(export.dir.as_deref().unwrap_or(Path::new(".")));
        let path = toolbox
            .export(&export.name, &dir, export.format)
            .context(ExportSnafu {
                target: dir.join(&export.name).display().to_string(),
            })?;
        println!("saved {}", path.display());
    }

    if let Some(target) = &pipeline.export_sql {
        let rows = toolbox
            .export_sql(&target.table, target.mode)
            .context(ExportSnafu {
                target: format!("SQL table {}", target.table),
            })?;
        println!("wrote {rows} rows to SQL table {}", target.table);
    }

    Ok(toolbox)
}

fn resolve_database(conn: &ConnectionConfig, base: &Path) -> ConnectionConfig {
    let mut conn = conn.clone();
    if !conn.remote && conn.database != ":memory:" {
        conn.database = base.join(&conn.database).display().to_string();
    }
    conn
}

#[cfg(test)]
mod tests {
    use super::{Pipeline, Step};

    #[test]
    fn steps_deserialize_by_tag() -> Result<(), Box<dyn std::error::Error>> {
        let pipeline: Pipeline = serde_json::from_str(
            r#"{
                "input": "sales.csv",
                "steps": [
                    {"step": "clean_numbers", "column": "price", "symbol": "$"},
                    {"step": "calculate", "op": "*", "lhs": "price", "rhs": "qty", "result": "Subtotal"},
                    {"step": "formula", "name": "tax", "a": "Subtotal"},
                    {"step": "date_formula", "name": "shifts", "first": "created"},
                    {"step": "merge", "files": ["feb.csv"], "axis": "horizontal"},
                    {"step": "drop_empty_rows"}
                ],
                "export": {"name": "out", "format": "json"}
            }"#,
        )?;
        let names: Vec<&str> = pipeline.steps.iter().map(Step::name).collect();
        assert_eq!(
            names,
            vec![
                "clean_numbers",
                "calculate",
                "formula",
                "date_formula",
                "merge",
                "drop_empty_rows"
            ]
        );
        assert_eq!(pipeline.config.preview_rows, 10);
        Ok(())
    }

    #[test]
    fn misspelled_step_arguments_are_rejected() {
        for step in [
            r#"{"step": "formula", "name": "tax", "a": "price", "rate": 0.2}"#,
            r#"{"step": "date_formula", "name": "shifts", "first": "created", "col": "x"}"#,
            r#"{"step": "calculate", "op": "+", "lhs": "a", "rsh": "b"}"#,
            r#"{"step": "round", "column": "price", "decimal": 2}"#,
        ] {
            let parsed: Result<Step, _> = serde_json::from_str(step);
            assert!(parsed.is_err(), "accepted {step}");
        }
    }

    #[test]
    fn formula_aliases_still_parse() -> Result<(), Box<dyn std::error::Error>> {
        let step: Step =
            serde_json::from_str(r#"{"step": "formula", "name": "tax", "col1": "price", "res": "T"}"#)?;
        assert_eq!(step.name(), "formula");
        Ok(())
    }

    #[test]
    fn unknown_step_is_a_parse_error() {
        let parsed: Result<Pipeline, _> =
            serde_json::from_str(r#"{"input": "a.csv", "steps": [{"step": "explode"}]}"#);
        assert!(parsed.is_err());
    }
}
