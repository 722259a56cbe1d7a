//! tsqlfmt CLI
//!
//! Command-line tool for formatting T-SQL scripts.

use std::io::{IsTerminal, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{Level, error};
use tracing_subscriber::FmtSubscriber;

use tsqlfmt::config::{StyleArgs, resolve_options};
use tsqlfmt::discover::normalize_extension;
use tsqlfmt::{CliError, RunSettings, Runner};

/// Reformats T-SQL scripts.
#[derive(Parser)]
#[command(name = "tsqlfmt")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// File, directory or file name pattern (`*.sql`) to format in place.
    /// SQL is read from standard input when omitted or `-`.
    input: Option<PathBuf>,

    /// TOML file with formatting options.
    #[arg(short, long, env = "TSQLFMT_CONFIG")]
    config: Option<PathBuf>,

    #[command(flatten)]
    style: StyleArgs,

    /// Extension of the files to format (repeatable).
    #[arg(short, long = "extension", value_name = "EXT", default_value = ".sql")]
    extensions: Vec<String>,

    /// Search directories recursively.
    #[arg(short, long)]
    recursive: bool,

    /// Copy each file to `<file>.bak` before overwriting it.
    #[arg(short, long)]
    backups: bool,

    /// Write results to this directory (mirroring the input layout) or file
    /// instead of in place.
    #[arg(short, long, value_name = "FILE_OR_DIR")]
    output: Option<PathBuf>,

    /// Write results even when parsing needed error recovery.
    #[arg(short, long)]
    allow_parsing_errors: bool,

    /// Print the parsed tree as JSON instead of formatting.
    #[arg(long)]
    dump_tree: bool,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            e.print()?;
            return Ok(ExitCode::from(u8::from(e.use_stderr())));
        }
    };

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match run(cli) {
        Ok(code) => Ok(ExitCode::from(code)),
        Err(e) => {
            error!("{e}");
            Ok(ExitCode::from(e.exit_code()))
        }
    }
}

fn run(cli: Cli) -> Result<u8, CliError> {
    let options = resolve_options(cli.config.as_deref(), &cli.style)?;
    let settings = RunSettings {
        extensions: cli.extensions.iter().map(|e| normalize_extension(e)).collect(),
        recursive: cli.recursive,
        backups: cli.backups && cli.output.is_none(),
        output: cli.output,
        allow_parsing_errors: cli.allow_parsing_errors,
        dump_tree: cli.dump_tree,
    };
    let runner = Runner::new(options, settings);
    let mut stdout = std::io::stdout().lock();

    let report = match cli.input {
        Some(path) if path.as_os_str() != "-" => runner.run_files(&path, &mut stdout)?,
        _ => {
            let mut stdin = std::io::stdin();
            if stdin.is_terminal() {
                return Err(CliError::NoInput);
            }
            let mut input = String::new();
            stdin.read_to_string(&mut input)?;
            if input.is_empty() {
                return Err(CliError::NoInput);
            }
            runner.run_text(&input, &mut stdout)?
        }
    };
    Ok(report.exit_code())
}
