//! Append-only process journal.
//!
//! Every export and calculation is recorded as one timestamped line so an
//! analyst can see afterwards what a pipeline did to their data.

use std::{
    fs::OpenOptions,
    io::Write,
    path::{Path, PathBuf},
};

use chrono::Local;
use snafu::prelude::*;

use crate::error::{IoSnafu, TableResult};

/// Default journal file name, relative to the working directory.
pub const DEFAULT_JOURNAL_FILE: &str = "process_report.txt";

/// A text file receiving `[YYYY-MM-DD HH:MM:SS] message` lines.
#[derive(Debug, Clone)]
pub struct Journal {
    path: PathBuf,
}

impl Journal {
    /// Journal writing to `path` (created on first record).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Where the journal is written.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one line stamped with the current local time.
    pub fn record(&self, message: &str) -> TableResult<()> {
        let stamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .context(IoSnafu {
                path: self.path.display().to_string(),
            })?;

        writeln!(file, "[{stamp}] {message}").context(IoSnafu {
            path: self.path.display().to_string(),
        })
    }
}
