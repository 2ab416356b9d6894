//! The analyst session: one working table plus the resources around it.
//!
//! `Toolbox` owns the current [`Table`], remembers which file it came from,
//! holds the optional SQLite connection and journals exports and derived
//! columns. Cleaning transforms are reached through [`Toolbox::table_mut`].

use std::path::{Path, PathBuf};

use arrow::array::ArrayRef;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use crate::{
    calc::{Calculation, Formula, FormulaArgs, Value},
    clean::DEFAULT_IQR_FACTOR,
    error::{NotConnectedSnafu, TableResult},
    inspect::Inspection,
    io::{ExportFormat, export_table, list_files, read_table},
    journal::{DEFAULT_JOURNAL_FILE, Journal},
    merge::MergeAxis,
    sql::{ConnectionConfig, ExportMode, SqlConnection},
    table::Table,
    time::{DateCalculation, DateFormula, DateFormulaArgs, DateOutcome},
    view::render_preview,
};

/// Default number of rows shown by [`Toolbox::view`].
pub const DEFAULT_PREVIEW_ROWS: usize = 10;

fn default_journal() -> Option<PathBuf> {
    Some(PathBuf::from(DEFAULT_JOURNAL_FILE))
}

fn default_preview_rows() -> usize {
    DEFAULT_PREVIEW_ROWS
}

fn default_iqr_factor() -> f64 {
    DEFAULT_IQR_FACTOR
}

/// Session settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolboxConfig {
    /// Journal file; `null` disables journaling.
    #[serde(default = "default_journal")]
    pub journal: Option<PathBuf>,
    /// Rows shown by [`Toolbox::view`] when no count is given.
    #[serde(default = "default_preview_rows")]
    pub preview_rows: usize,
    /// IQR multiplier used by [`Toolbox::remove_outliers`].
    #[serde(default = "default_iqr_factor")]
    pub iqr_factor: f64,
}

impl Default for ToolboxConfig {
    fn default() -> Self {
        Self {
            journal: default_journal(),
            preview_rows: DEFAULT_PREVIEW_ROWS,
            iqr_factor: DEFAULT_IQR_FACTOR,
        }
    }
}

/// Working table plus connection, journal and settings.
#[derive(Debug)]
pub struct Toolbox {
    table: Table,
    source: Option<PathBuf>,
    sql: Option<SqlConnection>,
    journal: Option<Journal>,
    config: ToolboxConfig,
}

impl Default for Toolbox {
    fn default() -> Self {
        Self::new(ToolboxConfig::default())
    }
}

impl Toolbox {
    /// An empty session.
    pub fn new(config: ToolboxConfig) -> Self {
        let journal = config.journal.clone().map(Journal::new);
        Self {
            table: Table::empty(),
            source: None,
            sql: None,
            journal,
            config,
        }
    }

    /// A session working on `table`, not tied to any file.
    pub fn with_table(table: Table, config: ToolboxConfig) -> Self {
        let mut toolbox = Self::new(config);
        toolbox.table = table;
        toolbox
    }

    /// The working table.
    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Mutable access for the cleaning transforms.
    pub fn table_mut(&mut self) -> &mut Table {
        &mut self.table
    }

    /// File the working table was loaded from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Current settings.
    pub fn config(&self) -> &ToolboxConfig {
        &self.config
    }

    /// True once [`Toolbox::connect`] succeeded.
    pub fn is_connected(&self) -> bool {
        self.sql.is_some()
    }

    /// Append `message` to the journal. Failures are logged, never returned.
    pub fn record(&self, message: &str) {
        if let Some(journal) = &self.journal {
            if let Err(e) = journal.record(message) {
                warn!("could not write to journal {}: {e}", journal.path().display());
            }
        }
    }

    /// Load `path` as the working table.
    ///
    /// On failure the previous table and source are kept.
    pub fn open(&mut self, path: &Path) -> TableResult<()> {
        self.table = read_table(path)?;
        self.source = Some(path.to_path_buf());
        Ok(())
    }

    /// Replace the working table with the contents of `path`, keeping the
    /// connection and journal.
    pub fn refresh(&mut self, path: &Path) -> TableResult<()> {
        self.open(path)?;
        info!("working table refreshed from {}", path.display());
        Ok(())
    }

    /// Files in `dir` ending with `extension`.
    pub fn list_files(&self, dir: &Path, extension: &str) -> TableResult<Vec<String>> {
        list_files(dir, extension)
    }

    /// Open the database described by `config`. A second call is a no-op.
    pub fn connect(&mut self, config: &ConnectionConfig) -> TableResult<()> {
        if let Some(conn) = &self.sql {
            info!("already connected to {}", conn.url());
            return Ok(());
        }
        self.sql = Some(SqlConnection::open(config)?);
        Ok(())
    }

    /// Replace the working table with a SQL table or query result.
    pub fn load_sql(&mut self, source: &str) -> TableResult<()> {
        let conn = self.sql.as_ref().context(NotConnectedSnafu)?;
        self.table = conn.load(source)?;
        self.source = None;
        Ok(())
    }

    /// Write the working table to the SQL table `name`.
    pub fn export_sql(&mut self, name: &str, mode: ExportMode) -> TableResult<usize> {
        let conn = self.sql.as_mut().context(NotConnectedSnafu)?;
        match conn.export(&self.table, name, mode) {
            Ok(rows) => {
                self.record(&format!("exported {rows} rows to SQL table {name} ({mode})"));
                Ok(rows)
            }
            Err(e) => {
                self.record(&format!("SQL export to {name} failed: {e}"));
                Err(e)
            }
        }
    }

    /// Render the first `rows` rows (the configured default when `None`).
    pub fn view(&self, rows: Option<usize>) -> TableResult<String> {
        render_preview(&self.table, rows.unwrap_or(self.config.preview_rows))
    }

    /// Shape, types and null counts of the working table.
    pub fn inspect(&self) -> Inspection {
        self.table.inspect()
    }

    /// Drop outlier rows of `column` using the configured IQR factor.
    pub fn remove_outliers(&mut self, column: &str) -> TableResult<usize> {
        self.table.remove_outliers(column, self.config.iqr_factor)
    }

    /// Run a dispatcher request and journal it.
    pub fn calculate(&mut self, calc: &Calculation) -> TableResult<Value> {
        let value = self.table.calculate(calc)?;
        let target = calc.result.as_deref().unwrap_or("(not stored)");
        self.record(&format!("calculation '{}' -> {target}", calc.op));
        Ok(value)
    }

    /// Apply a named formula and journal it.
    pub fn apply_formula(&mut self, formula: Formula, args: &FormulaArgs) -> TableResult<Value> {
        let value = self.table.apply_formula(formula, args)?;
        let target = args
            .result
            .as_deref()
            .or(formula.default_result())
            .unwrap_or("(not stored)");
        self.record(&format!("formula {formula} -> {target}"));
        Ok(value)
    }

    /// Run a date dispatcher request and journal it.
    pub fn date_calculate(&mut self, calc: &DateCalculation) -> TableResult<ArrayRef> {
        let out = self.table.date_calculate(calc)?;
        let target = calc.result.as_deref().unwrap_or("(not stored)");
        self.record(&format!("date calculation '{}' -> {target}", calc.op));
        Ok(out)
    }

    /// Apply a named date formula and journal it.
    pub fn apply_date_formula(
        &mut self,
        formula: DateFormula,
        args: &DateFormulaArgs,
    ) -> TableResult<DateOutcome> {
        let outcome = self.table.apply_date_formula(formula, args)?;
        self.record(&format!("date formula {formula}"));
        Ok(outcome)
    }

    /// Export the working table to `<dir>/<name>.<ext>` and journal it.
    pub fn export(&self, name: &str, dir: &Path, format: ExportFormat) -> TableResult<PathBuf> {
        let path = export_table(&self.table, name, dir, format)?;
        self.record(&format!(
            "exported {} rows to {}",
            self.table.num_rows(),
            path.display()
        ));
        Ok(path)
    }

    /// Merge the files in `paths` into the working table.
    ///
    /// The session's own source file is skipped. On either axis only files
    /// whose column names match the working table exactly are merged. Files
    /// that fail to load or do not match are returned.
    pub fn merge_files(&mut self, paths: &[PathBuf], axis: MergeAxis) -> TableResult<Vec<PathBuf>> {
        let mut stragglers = Vec::new();
        let mut merged = 0usize;

        for path in paths {
            if self.source.as_deref() == Some(path.as_path()) {
                continue;
            }
            let other = match read_table(path) {
                Ok(other) => other,
                Err(e) => {
                    warn!("skipping {}: {e}", path.display());
                    stragglers.push(path.clone());
                    continue;
                }
            };

            let matches = self.table.num_columns() == 0
                || other.column_names() == self.table.column_names();
            if !matches {
                warn!("skipping {}: columns do not match", path.display());
                stragglers.push(path.clone());
                continue;
            }

            self.table.merge(&other, axis)?;
            merged += 1;
        }

        info!(
            "{merged} files merged {axis}, {} left out",
            stragglers.len()
        );
        self.record(&format!("merged {merged} files ({axis})"));
        Ok(stragglers)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::{Toolbox, ToolboxConfig};
    use crate::{
        calc::{Calculation, Formula, FormulaArgs, Operator},
        error::TableError,
        io::ExportFormat,
        merge::MergeAxis,
        sql::{ConnectionConfig, ExportMode},
        table::test_util::sales_table,
    };

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn config_in(dir: &TempDir) -> ToolboxConfig {
        ToolboxConfig {
            journal: Some(dir.path().join("journal.txt")),
            ..ToolboxConfig::default()
        }
    }

    #[test]
    fn config_defaults_fill_missing_keys() -> TestResult {
        let config: ToolboxConfig = serde_json::from_str(r#"{"preview_rows": 3}"#)?;
        assert_eq!(config.preview_rows, 3);
        assert_eq!(config.iqr_factor, 1.5);
        assert_eq!(
            config.journal.as_deref(),
            Some(std::path::Path::new("process_report.txt"))
        );
        Ok(())
    }

    #[test]
    fn failed_open_keeps_previous_state() -> TestResult {
        let dir = TempDir::new()?;
        let csv = dir.path().join("a.csv");
        fs::write(&csv, "x,y\n1,2\n")?;

        let mut toolbox = Toolbox::new(config_in(&dir));
        toolbox.open(&csv)?;
        let err = toolbox.open(&dir.path().join("missing.csv")).unwrap_err();
        assert!(matches!(err, TableError::Io { .. }));
        assert_eq!(toolbox.table().num_rows(), 1);
        assert_eq!(toolbox.source(), Some(csv.as_path()));
        Ok(())
    }

    #[test]
    fn calculations_and_exports_are_journaled() -> TestResult {
        let dir = TempDir::new()?;
        let mut toolbox = Toolbox::with_table(sales_table(), config_in(&dir));
        toolbox.calculate(&Calculation {
            op: Operator::Mul,
            lhs: "price".into(),
            rhs: Some("qty".into()),
            result: Some("Subtotal".to_string()),
        })?;
        toolbox.apply_formula(Formula::Tax, &FormulaArgs::new("Subtotal", 0.16))?;
        let path = toolbox.export("sales", &dir.path().join("out"), ExportFormat::Csv)?;
        assert!(path.ends_with("out/sales.csv"));

        let journal = fs::read_to_string(dir.path().join("journal.txt"))?;
        let lines: Vec<&str> = journal.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with('['));
        assert!(lines[0].contains("calculation '*' -> Subtotal"));
        assert!(lines[1].contains("formula tax -> Tax"));
        assert!(lines[2].contains("exported 3 rows"));
        Ok(())
    }

    #[test]
    fn unwritable_journal_does_not_fail_operations() -> TestResult {
        let dir = TempDir::new()?;
        let config = ToolboxConfig {
            journal: Some(dir.path().join("no/such/dir/journal.txt")),
            ..ToolboxConfig::default()
        };
        let mut toolbox = Toolbox::with_table(sales_table(), config);
        toolbox.apply_formula(Formula::Tax, &FormulaArgs::new("price", 0.5))?;
        assert!(toolbox.table().has_column("Tax"));
        Ok(())
    }

    #[test]
    fn sql_requires_connection() -> TestResult {
        let mut toolbox = Toolbox::with_table(sales_table(), ToolboxConfig {
            journal: None,
            ..ToolboxConfig::default()
        });
        assert!(matches!(
            toolbox.load_sql("sales"),
            Err(TableError::NotConnected)
        ));
        assert!(matches!(
            toolbox.export_sql("sales", ExportMode::Append),
            Err(TableError::NotConnected)
        ));

        toolbox.connect(&ConnectionConfig::sqlite(":memory:"))?;
        toolbox.connect(&ConnectionConfig::sqlite("ignored.db"))?;
        toolbox.export_sql("sales", ExportMode::Append)?;
        toolbox.load_sql("sales")?;
        assert_eq!(toolbox.table().num_rows(), 3);
        assert!(!std::path::Path::new("ignored.db").exists());
        Ok(())
    }

    #[test]
    fn merge_files_returns_stragglers() -> TestResult {
        let dir = TempDir::new()?;
        let base = dir.path().join("jan.csv");
        let same = dir.path().join("feb.csv");
        let other = dir.path().join("odd.csv");
        let broken = dir.path().join("notes.txt");
        fs::write(&base, "id,amount\n1,10\n")?;
        fs::write(&same, "id,amount\n2,20\n3,30\n")?;
        fs::write(&other, "code,total\n9,90\n")?;
        fs::write(&broken, "hello")?;

        let mut toolbox = Toolbox::new(config_in(&dir));
        toolbox.open(&base)?;
        let stragglers = toolbox.merge_files(
            &[base.clone(), same, other.clone(), broken.clone()],
            MergeAxis::Vertical,
        )?;
        assert_eq!(stragglers, vec![other, broken]);
        assert_eq!(toolbox.table().num_rows(), 3);
        Ok(())
    }

    #[test]
    fn horizontal_merge_files_checks_columns_too() -> TestResult {
        let dir = TempDir::new()?;
        let base = dir.path().join("left.csv");
        let same = dir.path().join("right.csv");
        let other = dir.path().join("extra.csv");
        fs::write(&base, "id,amount\n1,10\n2,20\n")?;
        fs::write(&same, "id,amount\n3,30\n4,40\n")?;
        fs::write(&other, "code,total\n9,90\n")?;

        let mut toolbox = Toolbox::new(config_in(&dir));
        toolbox.open(&base)?;
        let stragglers =
            toolbox.merge_files(&[same, other.clone()], MergeAxis::Horizontal)?;
        assert_eq!(stragglers, vec![other]);
        assert_eq!(toolbox.table().num_rows(), 2);
        assert_eq!(toolbox.table().num_columns(), 4);
        Ok(())
    }

    #[test]
    fn view_uses_configured_row_count() -> TestResult {
        let toolbox = Toolbox::with_table(sales_table(), ToolboxConfig {
            journal: None,
            preview_rows: 1,
            ..ToolboxConfig::default()
        });
        assert!(toolbox.view(None)?.contains("showing 1 of 3 rows"));
        Ok(())
    }
}
