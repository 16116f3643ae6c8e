// plugtable CLI - sort, filter and page a data file through a URL query string

mod exit_codes;

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use log::LevelFilter;
use plugtable_cli::app::{Session, SetOp, TableOptions, UsageError};
use plugtable_cli::output::{write_rows, OutputFormat};
use plugtable_config::{LogLevel, Settings};
use plugtable_io::Dataset;
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};

use exit_codes::{EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "ptable")]
#[command(about = "Sort, filter and paginate a CSV/JSON file with URL-backed state (headless)")]
#[command(version)]
struct Cli {
    /// Settings file (.json or .toml); defaults to <config dir>/plugtable/settings.json
    #[arg(long, global = true, env = "PLUGTABLE_CONFIG")]
    config: Option<PathBuf>,

    /// More logging: -v info, -vv debug, -vvv trace
    #[arg(long, short = 'v', action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the current page, a status line and the rewritten URL
    #[command(after_help = "\
Examples:
  ptable view heroes.csv --query 'sort=power&direction=desc'
  ptable view heroes.csv --range-column power --query 'range=50%2C&page=2'
  ptable view heroes.csv --set setSort=name --set nextPage
  ptable view heroes.json --set 'setQuery={\"q\":\"man\"}' --format json")]
    View {
        #[command(flatten)]
        table: TableArgs,

        /// Output format for the page
        #[arg(long, short = 'f', value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Print the chain, merged state, misc metadata and mutators as JSON
    Inspect {
        #[command(flatten)]
        table: TableArgs,
    },
}

#[derive(Args)]
struct TableArgs {
    /// Data file (.csv, .tsv or .json)
    file: PathBuf,

    /// Query string to start from, e.g. 'sort=power&page=2'
    #[arg(long, short = 'q')]
    query: Option<String>,

    /// Base URL (overrides url.base from settings)
    #[arg(long)]
    url: Option<String>,

    /// Rows per page (overrides table.rowsPerPage)
    #[arg(long, short = 'n', value_parser = clap::value_parser!(u64).range(1..))]
    rows_per_page: Option<u64>,

    /// Column the `range` filter applies to
    #[arg(long)]
    range_column: Option<String>,

    /// Mutator or state write, applied in order. Repeatable.
    #[arg(long = "set", value_name = "NAME[=JSON]")]
    sets: Vec<String>,
}

impl TableArgs {
    fn options(&self) -> Result<TableOptions> {
        let sets = self
            .sets
            .iter()
            .map(String::as_str)
            .map(SetOp::parse)
            .collect::<Result<Vec<_>>>()?;
        let rows_per_page = match self.rows_per_page {
            Some(n) => Some(usize::try_from(n).map_err(|_| UsageError(format!("--rows-per-page {} is too large", n)))?),
            None => None,
        };
        Ok(TableOptions {
            query: self.query.clone(),
            url: self.url.clone(),
            rows_per_page,
            range_column: self.range_column.clone(),
            sets,
        })
    }

    fn session(&self, settings: &Settings) -> Result<Session> {
        let options = self.options()?;
        let dataset = Dataset::load(&self.file).with_context(|| format!("cannot load {}", self.file.display()))?;
        Session::build(dataset, settings, &options)
    }
}

fn init_logging(verbose: u8) {
    let config = ConfigBuilder::new()
        .set_time_level(LevelFilter::Off)
        .set_target_level(LevelFilter::Off)
        .build();
    // The logger passes everything; the global max level does the filtering
    let installed = TermLogger::init(LevelFilter::Trace, config, TerminalMode::Stderr, ColorChoice::Auto);
    log::set_max_level(LogLevel::Warn.raised(verbose).to_filter());
    // Fails only when a logger is already set; records keep going to that one
    if let Err(e) = installed {
        log::debug!("terminal logger not installed: {}", e);
    }
}

fn load_settings(cli: &Cli) -> Result<Settings> {
    let settings =
        Settings::resolve(cli.config.as_deref()).map_err(|e| UsageError(format!("settings: {}", e)))?;
    log::set_max_level(settings.log_level.raised(cli.verbose).to_filter());
    Ok(settings)
}

fn cmd_view(table: &TableArgs, format: OutputFormat, settings: &Settings) -> Result<()> {
    let session = table.session(settings)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_rows(format, &session.headers, session.table.table(), &mut out)?;

    // Keep machine-readable output clean
    if format == OutputFormat::Table {
        writeln!(out)?;
        writeln!(out, "{}", session.status_line())?;
        writeln!(out, "{}", session.href())?;
    } else {
        eprintln!("{}", session.status_line());
        eprintln!("{}", session.href());
    }
    Ok(())
}

fn cmd_inspect(table: &TableArgs, settings: &Settings) -> Result<()> {
    let session = table.session(settings)?;
    let mut report = session.table.inspect();
    report["href"] = serde_json::Value::String(session.href());
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run(cli: &Cli) -> Result<()> {
    let settings = load_settings(cli)?;
    match &cli.command {
        Commands::View { table, format } => cmd_view(table, *format, &settings),
        Commands::Inspect { table } => cmd_inspect(table, &settings),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(err) => {
            eprintln!("error: {:#}", err);
            let code = if err.is::<UsageError>() { EXIT_USAGE } else { EXIT_ERROR };
            ExitCode::from(code)
        }
    }
}
