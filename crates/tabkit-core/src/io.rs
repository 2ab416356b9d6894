//! File loading, exporting and discovery.
//!
//! This module maps file extensions to the format-specific readers and
//! writers in its submodules (CSV, Parquet, JSON, Excel) and owns the small
//! amount of path handling they share.

pub mod csv;
pub mod excel;
pub mod json;
pub mod parquet;

use std::{
    fmt,
    fs::File,
    path::{Path, PathBuf},
    str::FromStr,
};

use log::{info, warn};
use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use crate::{
    error::{IoSnafu, TableError, TableResult, UnsupportedFormatSnafu},
    table::Table,
};

/// Formats the loader understands, keyed by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// Comma separated values with a header row.
    Csv,
    /// Apache Parquet.
    Parquet,
    /// JSON array of records, or newline-delimited records.
    Json,
    /// Excel workbook (first worksheet).
    Excel,
}

impl FileFormat {
    /// Resolve the format of `path` from its extension (case-insensitive).
    pub fn from_path(path: &Path) -> TableResult<Self> {
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "csv" => Ok(FileFormat::Csv),
            "parquet" => Ok(FileFormat::Parquet),
            "json" => Ok(FileFormat::Json),
            "xlsx" | "xls" => Ok(FileFormat::Excel),
            _ => UnsupportedFormatSnafu {
                extension: format!(".{extension}"),
            }
            .fail(),
        }
    }
}

/// Output formats for [`export_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// CSV with a header row.
    #[default]
    Csv,
    /// Snappy-compressed Parquet.
    Parquet,
    /// Pretty JSON array of records.
    Json,
    /// `.xlsx` workbook with one sheet named after the export.
    Excel,
}

impl ExportFormat {
    /// File extension written for this format.
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Parquet => "parquet",
            ExportFormat::Json => "json",
            ExportFormat::Excel => "xlsx",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = TableError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "parquet" => Ok(ExportFormat::Parquet),
            "json" => Ok(ExportFormat::Json),
            "excel" | "xlsx" => Ok(ExportFormat::Excel),
            other => UnsupportedFormatSnafu {
                extension: other.to_string(),
            }
            .fail(),
        }
    }
}

pub(crate) fn open_file(path: &Path) -> TableResult<File> {
    File::open(path).context(IoSnafu {
        path: path.display().to_string(),
    })
}

pub(crate) fn create_file(path: &Path) -> TableResult<File> {
    File::create(path).context(IoSnafu {
        path: path.display().to_string(),
    })
}

/// Load the file at `path`, dispatching on its extension.
pub fn read_table(path: &Path) -> TableResult<Table> {
    let table = match FileFormat::from_path(path)? {
        FileFormat::Csv => csv::read_csv(path)?,
        FileFormat::Parquet => parquet::read_parquet(path)?,
        FileFormat::Json => json::read_json(path)?,
        FileFormat::Excel => excel::read_excel(path)?,
    };

    info!(
        "loaded '{}' ({} rows, {} columns)",
        path.display(),
        table.num_rows(),
        table.num_columns()
    );
    Ok(table)
}

/// Write `table` to `<dir>/<name>.<ext>`, creating `dir` when needed.
///
/// Returns the path written.
pub fn export_table(
    table: &Table,
    name: &str,
    dir: &Path,
    format: ExportFormat,
) -> TableResult<PathBuf> {
    std::fs::create_dir_all(dir).context(IoSnafu {
        path: dir.display().to_string(),
    })?;

    let path = dir.join(format!("{name}.{}", format.extension()));
    match format {
        ExportFormat::Csv => csv::write_csv(table, &path)?,
        ExportFormat::Parquet => parquet::write_parquet(table, &path)?,
        ExportFormat::Json => json::write_json(table, &path)?,
        ExportFormat::Excel => excel::write_excel(table, &path, name)?,
    }

    info!("saved {} rows to {}", table.num_rows(), path.display());
    Ok(path)
}

/// Names of the regular files in `dir` whose name ends with `extension`, sorted.
pub fn list_files(dir: &Path, extension: &str) -> TableResult<Vec<String>> {
    let entries = std::fs::read_dir(dir).context(IoSnafu {
        path: dir.display().to_string(),
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.context(IoSnafu {
            path: dir.display().to_string(),
        })?;
        let name = entry.file_name().to_string_lossy().to_string();
        if name.ends_with(extension) && entry.path().is_file() {
            files.push(name);
        }
    }
    files.sort();

    if files.is_empty() {
        warn!("no {extension} files found in {}", dir.display());
    } else {
        info!("{} {extension} files found in {}", files.len(), dir.display());
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use std::{fs, path::Path};

    use tempfile::TempDir;

    use super::{ExportFormat, FileFormat, export_table, list_files, read_table};
    use crate::{error::TableError, table::test_util::sales_table};

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn file_format_is_case_insensitive() -> TestResult {
        assert_eq!(FileFormat::from_path(Path::new("a/B.CSV"))?, FileFormat::Csv);
        assert_eq!(FileFormat::from_path(Path::new("x.xls"))?, FileFormat::Excel);
        Ok(())
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = FileFormat::from_path(Path::new("notes.txt")).unwrap_err();
        match err {
            TableError::UnsupportedFormat { extension } => assert_eq!(extension, ".txt"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn export_format_parses_aliases() -> TestResult {
        assert_eq!("Excel".parse::<ExportFormat>()?, ExportFormat::Excel);
        assert_eq!(" json ".parse::<ExportFormat>()?, ExportFormat::Json);
        assert!("xml".parse::<ExportFormat>().is_err());
        Ok(())
    }

    #[test]
    fn list_files_filters_and_sorts() -> TestResult {
        let tmp = TempDir::new()?;
        fs::write(tmp.path().join("b.csv"), "x\n1\n")?;
        fs::write(tmp.path().join("a.csv"), "x\n1\n")?;
        fs::write(tmp.path().join("c.json"), "[]")?;
        fs::create_dir(tmp.path().join("dir.csv"))?;

        let files = list_files(tmp.path(), ".csv")?;
        assert_eq!(files, vec!["a.csv".to_string(), "b.csv".to_string()]);
        Ok(())
    }

    #[test]
    fn list_files_on_missing_dir_is_io_error() {
        let err = list_files(Path::new("/definitely/not/here"), ".csv").unwrap_err();
        assert!(matches!(err, TableError::Io { .. }));
    }

    #[test]
    fn export_creates_directory_and_reloads() -> TestResult {
        let tmp = TempDir::new()?;
        let dir = tmp.path().join("out").join("nested");
        let table = sales_table();

        for format in [ExportFormat::Csv, ExportFormat::Parquet, ExportFormat::Json] {
            let path = export_table(&table, "sales", &dir, format)?;
            assert_eq!(
                path.file_name().map(|n| n.to_string_lossy().to_string()),
                Some(format!("sales.{}", format.extension()))
            );
            let back = read_table(&path)?;
            assert_eq!(back.num_rows(), 3);
            assert_eq!(back.column_names(), vec!["product", "price", "qty"]);
        }
        Ok(())
    }
}
