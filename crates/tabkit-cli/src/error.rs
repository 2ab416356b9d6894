use std::path::PathBuf;

use snafu::Snafu;
use tabkit_core::TableError;

pub type CliResult<T> = std::result::Result<T, CliError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CliError {
    #[snafu(display(
        "Failed to load {}: {source}. \
         Supported extensions are .csv, .parquet, .json and .xlsx.",
        path.display()
    ))]
    Load {
        path: PathBuf,
        #[snafu(source(from(TableError, Box::new)))]
        source: Box<TableError>,
    },

    #[snafu(display("Cannot read pipeline file {}: {source}", path.display()))]
    ReadPipeline {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Invalid pipeline file {}: {source}", path.display()))]
    ParsePipeline {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[snafu(display("Pipeline has neither an input file nor a load_sql step"))]
    NoInput,

    #[snafu(display("Pipeline step {index} ({step}) failed: {source}"))]
    Step {
        index: usize,
        step: String,
        #[snafu(source(from(TableError, Box::new)))]
        source: Box<TableError>,
    },

    #[snafu(display("Export to {target} failed: {source}"))]
    Export {
        target: String,
        #[snafu(source(from(TableError, Box::new)))]
        source: Box<TableError>,
    },

    #[snafu(display("Database error ({database}): {source}"))]
    Database {
        database: String,
        #[snafu(source(from(TableError, Box::new)))]
        source: Box<TableError>,
    },

    #[snafu(display("{source}"))]
    Table {
        #[snafu(source(from(TableError, Box::new)))]
        source: Box<TableError>,
    },
}
