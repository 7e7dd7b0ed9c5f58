//! # vortex-cli
//!
//! The `vortex-harness` binary: data-driven UI test harness for point cloud
//! export testing.
//!
//! This crate provides:
//! - CLI argument parsing using `clap`
//! - Case sheet validation via `vortex-harness check`
//! - Batch execution with terminal progress via `vortex-harness run`
//! - Example case sheet generation via `vortex-harness sample-cases`
//! - Shell completion generation via `vortex-harness completions`

mod demo;
mod reporter;

use std::io::{IsTerminal, stdout};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use colored::Colorize;
use tracing_subscriber::EnvFilter;
use vortex_core::{BatchRunner, CaseReader, HarnessConfig};

use reporter::{ReportFormat, ReportWriter, TerminalReporter, Verbosity};

/// Color output mode for terminal display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
enum ColorMode {
    /// Automatically detect if stdout is a TTY
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl ColorMode {
    fn apply(self) {
        match self {
            ColorMode::Always => colored::control::set_override(true),
            ColorMode::Never => colored::control::set_override(false),
            ColorMode::Auto => {
                if !stdout().is_terminal() {
                    colored::control::set_override(false);
                }
            }
        }
    }
}

/// UI driver backing a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
enum DriverKind {
    /// Scripted in-memory application surface (dry run)
    #[default]
    Mock,
}

impl Verbosity {
    /// CLI flags beat environment variables beat the default.
    fn resolve(verbose: bool, quiet: bool) -> Self {
        if quiet {
            return Verbosity::Quiet;
        }
        if verbose {
            return Verbosity::Verbose;
        }
        if std::env::var("VORTEX_QUIET").is_ok() {
            return Verbosity::Quiet;
        }
        if std::env::var("VORTEX_VERBOSE").is_ok() {
            return Verbosity::Verbose;
        }
        Verbosity::Normal
    }
}

/// VORTEX harness - data-driven point cloud export testing
#[derive(Parser, Debug)]
#[command(name = "vortex-harness", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to harness configuration file (defaults apply when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output (per-step detail)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all but the final verdict
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Color output mode (auto, always, never)
    #[arg(long, value_enum, default_value_t = ColorMode::Auto, global = true)]
    color: ColorMode,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a batch of cases and write report artifacts
    Run(RunArgs),

    /// Parse and validate a case sheet without running anything
    Check(CheckArgs),

    /// Emit an example case sheet
    SampleCases(SampleCasesArgs),

    /// Generate shell completions
    Completions { shell: Shell },
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Case sheet (CSV)
    #[arg(long)]
    cases: PathBuf,

    /// Directory for report artifacts
    #[arg(long, default_value = "reports")]
    report_dir: PathBuf,

    /// UI driver backing the run
    #[arg(long, value_enum, default_value_t = DriverKind::Mock)]
    driver: DriverKind,

    /// Which report artifacts to write
    #[arg(long, value_enum, default_value_t = ReportFormat::All)]
    format: ReportFormat,
}

#[derive(Parser, Debug)]
struct CheckArgs {
    /// Case sheet (CSV)
    #[arg(long)]
    cases: PathBuf,
}

#[derive(Parser, Debug)]
struct SampleCasesArgs {
    /// Write to a file instead of stdout
    #[arg(long)]
    out: Option<PathBuf>,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    cli.color.apply();

    match dispatch(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{} {err:#}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

async fn dispatch(cli: Cli) -> Result<ExitCode> {
    let verbosity = Verbosity::resolve(cli.verbose, cli.quiet);
    match cli.command {
        Commands::Run(args) => run_batch(cli.config.as_deref(), &args, verbosity).await,
        Commands::Check(args) => check_cases(&args),
        Commands::SampleCases(args) => sample_cases(&args),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "vortex-harness", &mut stdout());
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<HarnessConfig> {
    match path {
        Some(path) => HarnessConfig::load(path)
            .with_context(|| format!("failed to load config '{}'", path.display())),
        None => Ok(HarnessConfig::default()),
    }
}

async fn run_batch(
    config_path: Option<&Path>,
    args: &RunArgs,
    verbosity: Verbosity,
) -> Result<ExitCode> {
    let config = load_config(config_path)?;
    let cases = CaseReader::read_path(&args.cases)
        .with_context(|| format!("case sheet '{}' rejected", args.cases.display()))?;
    if cases.is_empty() {
        bail!("case sheet '{}' contains no cases", args.cases.display());
    }

    let driver = match args.driver {
        DriverKind::Mock => demo::scripted_driver(&config, cases.len()),
    };

    let mut runner = BatchRunner::new(&driver, &config)
        .with_progress(reporter::create_progress_callback(verbosity));
    let report = runner.run(&cases).await;

    let terminal = TerminalReporter::with_verbosity(verbosity);
    terminal.print_failures(&report);
    terminal.print_summary(&report);

    let written = ReportWriter::new(&args.report_dir)
        .write(&report, args.format)
        .context("failed to write report artifacts")?;
    if verbosity != Verbosity::Quiet {
        for path in &written {
            println!("   {}", format!("wrote {}", path.display()).dimmed());
        }
    }

    Ok(if report.all_passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn check_cases(args: &CheckArgs) -> Result<ExitCode> {
    let cases = CaseReader::read_path(&args.cases)
        .with_context(|| format!("case sheet '{}' rejected", args.cases.display()))?;

    reporter::print_case_listing(&cases, &mut stdout());
    let plural = if cases.len() == 1 { "" } else { "s" };
    println!("{}", format!("✓ {} case{plural} valid", cases.len()).green());
    Ok(ExitCode::SUCCESS)
}

/// Rows of the generated example sheet. Covers every output format, both
/// thinning modes (and their combination), and each texture at least once.
const SAMPLE_ROWS: [[&str; 11]; 6] = [
    [
        "TC001", "pts", "disabled", "", "", "single-station", "grayscale", "disabled", "disabled",
        "success", "baseline single-station export",
    ],
    [
        "TC002", "e57", "enabled", "enabled", "", "merged", "reflectance", "enabled", "disabled",
        "success", "voxel thinning with denoise",
    ],
    [
        "TC003", "las", "enabled", "", "enabled", "single+merged", "reflectance+color", "disabled",
        "enabled", "success", "",
    ],
    [
        "TC004", "e57", "disabled", "", "", "merged", "reflectance+grayscale", "enabled", "enabled",
        "success", "",
    ],
    [
        "TC005", "pts", "enabled", "enabled", "enabled", "single+merged", "reflectance", "disabled",
        "disabled", "success", "both thinning modes at once",
    ],
    [
        "TC006", "las", "disabled", "", "", "single-station", "reflectance", "enabled", "disabled",
        "success", "",
    ],
];

fn sample_cases(args: &SampleCasesArgs) -> Result<ExitCode> {
    let mut writer: csv::Writer<Box<dyn std::io::Write>> = match &args.out {
        Some(path) => csv::Writer::from_writer(Box::new(
            std::fs::File::create(path)
                .with_context(|| format!("failed to create '{}'", path.display()))?,
        )),
        None => csv::Writer::from_writer(Box::new(stdout())),
    };

    writer.write_record([
        "case_id",
        "output_format",
        "thinning",
        "voxel_thinning",
        "random_thinning",
        "output_type",
        "texture",
        "denoise",
        "thickness_optimization",
        "expected_result",
        "notes",
    ])?;
    for row in SAMPLE_ROWS {
        writer.write_record(row)?;
    }
    writer.flush()?;

    if let Some(path) = &args.out {
        println!("{}", format!("wrote {}", path.display()).green());
    }
    Ok(ExitCode::SUCCESS)
}
