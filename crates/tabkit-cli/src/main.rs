//! CLI tool for cleaning and reshaping tabular data files.

mod error;
mod pipeline;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use snafu::ResultExt;
use tabkit_core::{
    ConnectionConfig, ExportFormat, ExportMode, Toolbox, ToolboxConfig, io::list_files,
};

use crate::{
    error::{CliResult, DatabaseSnafu, ExportSnafu, LoadSnafu, TableSnafu},
    pipeline::{load_pipeline, run_pipeline},
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Csv,
    Parquet,
    Json,
    Excel,
}

impl From<FormatArg> for ExportFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Csv => ExportFormat::Csv,
            FormatArg::Parquet => ExportFormat::Parquet,
            FormatArg::Json => ExportFormat::Json,
            FormatArg::Excel => ExportFormat::Excel,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Append,
    Replace,
    Fail,
}

impl From<ModeArg> for ExportMode {
    fn from(v: ModeArg) -> Self {
        match v {
            ModeArg::Append => ExportMode::Append,
            ModeArg::Replace => ExportMode::Replace,
            ModeArg::Fail => ExportMode::Fail,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Execute a JSON pipeline file
    Run {
        pipeline: PathBuf,
    },

    /// Print the first rows of a file
    View {
        file: PathBuf,

        #[arg(long, default_value_t = 10)]
        rows: usize,
    },

    /// Print shape, column types and null counts of a file
    Inspect {
        file: PathBuf,
    },

    /// List the files in a directory with a given extension
    List {
        dir: PathBuf,

        /// e.g. .csv, .parquet
        #[arg(long, default_value = ".csv")]
        ext: String,
    },

    /// Rewrite a file in another format
    Convert {
        input: PathBuf,

        #[arg(long, value_enum)]
        to: FormatArg,

        /// Output directory (default: next to the input)
        #[arg(long = "out-dir")]
        out_dir: Option<PathBuf>,

        /// Output file stem (default: the input file stem)
        #[arg(long)]
        name: Option<String>,
    },

    /// Load a SQLite table or query and print or save it
    ImportSql {
        /// SQLite database file
        #[arg(long)]
        database: PathBuf,

        /// Table name, or a full query when it contains a space
        #[arg(long)]
        source: String,

        /// Save the result as <out-dir>/<name>.<format> instead of printing it
        #[arg(long = "out-dir")]
        out_dir: Option<PathBuf>,

        #[arg(long, default_value = "sql_export")]
        name: String,

        #[arg(long, value_enum, default_value_t = FormatArg::Csv)]
        format: FormatArg,
    },

    /// Write a file into a SQLite table
    ExportSql {
        file: PathBuf,

        /// SQLite database file (created when missing)
        #[arg(long)]
        database: PathBuf,

        #[arg(long)]
        table: String,

        #[arg(long, value_enum, default_value_t = ModeArg::Append)]
        mode: ModeArg,
    },
}

#[derive(Debug, Parser)]
#[command(name = "tabkit", version, about)]
struct Cli {
    /// Log every operation (RUST_LOG takes precedence)
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    /// Journal file (default: process_report.txt)
    #[arg(long, global = true)]
    journal: Option<PathBuf>,

    /// Do not write a journal
    #[arg(long = "no-journal", global = true, conflicts_with = "journal")]
    no_journal: bool,

    #[command(subcommand)]
    cmd: Command,
}

impl Cli {
    /// Journal override: `None` keeps the configured journal.
    fn journal_override(&self) -> Option<Option<PathBuf>> {
        if self.no_journal {
            Some(None)
        } else {
            self.journal.clone().map(Some)
        }
    }

    fn config(&self) -> ToolboxConfig {
        let mut config = ToolboxConfig::default();
        if let Some(journal) = self.journal_override() {
            config.journal = journal;
        }
        config
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn open_file(path: &Path, config: ToolboxConfig) -> CliResult<Toolbox> {
    let mut toolbox = Toolbox::new(config);
    toolbox.open(path).context(LoadSnafu { path })?;
    Ok(toolbox)
}

fn cmd_run(pipeline: &Path, journal: Option<Option<PathBuf>>) -> CliResult<()> {
    let parsed = load_pipeline(pipeline)?;
    let base = pipeline.parent().unwrap_or(Path::new("."));
    let toolbox = run_pipeline(parsed, base, journal)?;
    println!(
        "pipeline finished: {} rows, {} columns",
        toolbox.table().num_rows(),
        toolbox.table().num_columns()
    );
    Ok(())
}

fn cmd_list(dir: &Path, ext: &str) -> CliResult<()> {
    let files = list_files(dir, ext).context(TableSnafu)?;
    for file in files {
        println!("{file}");
    }
    Ok(())
}

fn cmd_convert(
    input: &Path,
    to: FormatArg,
    out_dir: Option<PathBuf>,
    name: Option<String>,
    config: ToolboxConfig,
) -> CliResult<()> {
    let toolbox = open_file(input, config)?;
    let dir = out_dir.unwrap_or_else(|| input.parent().unwrap_or(Path::new(".")).to_path_buf());
    let name = name.unwrap_or_else(|| {
        input
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "converted".to_string())
    });

    let path = toolbox
        .export(&name, &dir, to.into())
        .context(ExportSnafu {
            target: dir.join(&name).display().to_string(),
        })?;
    println!("saved {}", path.display());
    Ok(())
}

fn connect(toolbox: &mut Toolbox, database: &Path) -> CliResult<()> {
    let db = database.display().to_string();
    toolbox
        .connect(&ConnectionConfig::sqlite(db.as_str()))
        .context(DatabaseSnafu { database: db })
}

fn cmd_import_sql(
    database: &Path,
    source: &str,
    out_dir: Option<PathBuf>,
    name: &str,
    format: FormatArg,
    config: ToolboxConfig,
) -> CliResult<()> {
    let mut toolbox = Toolbox::new(config);
    connect(&mut toolbox, database)?;
    toolbox.load_sql(source).context(DatabaseSnafu {
        database: database.display().to_string(),
    })?;

    match out_dir {
        Some(dir) => {
            let path = toolbox
                .export(name, &dir, format.into())
                .context(ExportSnafu {
                    target: dir.join(name).display().to_string(),
                })?;
            println!("saved {}", path.display());
        }
        None => println!("{}", toolbox.view(None).context(TableSnafu)?),
    }
    Ok(())
}

fn cmd_export_sql(
    file: &Path,
    database: &Path,
    table: &str,
    mode: ModeArg,
    config: ToolboxConfig,
) -> CliResult<()> {
    let mut toolbox = open_file(file, config)?;
    connect(&mut toolbox, database)?;
    let rows = toolbox
        .export_sql(table, mode.into())
        .context(ExportSnafu {
            target: format!("SQL table {table}"),
        })?;
    println!("wrote {rows} rows to {table}");
    Ok(())
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config = cli.config();
    let journal = cli.journal_override();

    match cli.cmd {
        Command::Run { pipeline } => cmd_run(&pipeline, journal),

        Command::View { file, rows } => {
            let toolbox = open_file(&file, config)?;
            println!("{}", toolbox.view(Some(rows)).context(TableSnafu)?);
            Ok(())
        }

        Command::Inspect { file } => {
            let toolbox = open_file(&file, config)?;
            println!("{}", toolbox.inspect());
            Ok(())
        }

        Command::List { dir, ext } => cmd_list(&dir, &ext),

        Command::Convert {
            input,
            to,
            out_dir,
            name,
        } => cmd_convert(&input, to, out_dir, name, config),

        Command::ImportSql {
            database,
            source,
            out_dir,
            name,
            format,
        } => cmd_import_sql(&database, &source, out_dir, &name, format, config),

        Command::ExportSql {
            file,
            database,
            table,
            mode,
        } => cmd_export_sql(&file, &database, &table, mode, config),
    }
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
