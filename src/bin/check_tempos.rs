use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use cycle_check::analysis::{ClipSpec, WorstError};
use cycle_check::batch::{format_worst_error, BatchChecker, BatchEvent, RunSummary};
use cycle_check::capability;
use cycle_check::config::{AppConfig, MalformedPolicy};
use cycle_check::error::{log_check_error, CheckError};
use cycle_check::fixtures::{write_wav, ClickTrack, ToneSpec};
use tracing::Level;

#[derive(Parser, Debug)]
#[command(
    name = "check_tempos",
    about = "Verify onset spacing of rendered cycle clips against their filenames"
)]
struct Cli {
    /// Print debug logs to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check every clip set directory (default when no subcommand is given)
    Check(CheckArgs),
    /// Check a single clip file
    File {
        path: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Write a synthetic three-click clip with exact frame spacing
    Synth {
        #[arg(long)]
        out: PathBuf,
        #[arg(long)]
        beat_frames: u32,
        #[arg(long)]
        decay_frames: u32,
        #[arg(long, default_value_t = 35.0)]
        lead_in_ms: f64,
        /// Add a decaying tone after every click
        #[arg(long)]
        tone: bool,
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Args, Debug, Default)]
struct CheckArgs {
    /// Directory holding one subdirectory per clip set
    #[arg(long)]
    root: Option<PathBuf>,
    /// Clip set to check under the root (repeatable)
    #[arg(long = "set")]
    sets: Vec<String>,
    /// Check these directories instead of the clip sets (repeatable)
    #[arg(long = "dir")]
    dirs: Vec<PathBuf>,
    #[arg(long)]
    config: Option<PathBuf>,
    /// Warn about unrecognized filenames instead of aborting
    #[arg(long)]
    skip_malformed: bool,
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
enum OutputFormat {
    #[default]
    Table,
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            if let Some(check_err) = err.downcast_ref::<CheckError>() {
                log_check_error(check_err, "check_tempos");
            }
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command.unwrap_or_else(|| Commands::Check(CheckArgs::default())) {
        Commands::Check(args) => run_check(args),
        Commands::File { path, config } => run_file(&path, config.as_deref()),
        Commands::Synth {
            out,
            beat_frames,
            decay_frames,
            lead_in_ms,
            tone,
            config,
        } => run_synth(
            &out,
            ClipSpec {
                beat_frames,
                decay_frames,
            },
            lead_in_ms,
            tone,
            config.as_deref(),
        ),
    }
}

/// Defaults unless `--config` was given, in which case the file must load
fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    match path {
        Some(path) => AppConfig::from_file(path).context("loading --config"),
        None => Ok(AppConfig::default()),
    }
}

fn run_check(args: CheckArgs) -> Result<ExitCode> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(root) = args.root {
        config.batch.root = root;
    }
    if !args.sets.is_empty() {
        config.batch.sets = args.sets;
    }
    if args.skip_malformed {
        config.batch.malformed_policy = MalformedPolicy::Skip;
    }

    capability::verify(&config).context("startup capability check")?;

    let dirs: Vec<PathBuf> = if args.dirs.is_empty() {
        config
            .batch
            .sets
            .iter()
            .map(|set| config.batch.root.join(set))
            .collect()
    } else {
        args.dirs
    };

    let checker = BatchChecker::new(&config);
    let table = args.format == OutputFormat::Table;
    let summary = checker.check_directories_with(&dirs, |event| {
        if table {
            print_event(event);
        }
    })?;

    if !table {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }

    Ok(exit_code(&summary))
}

fn print_event(event: BatchEvent<'_>) {
    match event {
        BatchEvent::Empty(dir) => println!("No files in {}", dir.display()),
        BatchEvent::Started(dir) => println!("Checking {}", dir.display()),
        BatchEvent::File(file) => println!("{}", file.format_line()),
        BatchEvent::Skipped(skipped) => println!("SKIP {:>18}  {}", skipped.name, skipped.reason),
        BatchEvent::Finished(report) => println!("{}", report.worst_error_line()),
    }
}

fn exit_code(summary: &RunSummary) -> ExitCode {
    if summary.all_passed() {
        ExitCode::from(0)
    } else {
        ExitCode::from(2)
    }
}

fn run_file(path: &Path, config_path: Option<&Path>) -> Result<ExitCode> {
    let config = load_config(config_path)?;
    capability::verify(&config).context("startup capability check")?;

    let report = BatchChecker::new(&config)
        .check_file(path)
        .with_context(|| format!("checking {}", path.display()))?;
    println!("{}", report.format_line());

    let mut worst = WorstError::new();
    worst.fold(&report.measurement.verdict);
    println!("{}", format_worst_error(worst));

    Ok(if report.passed() {
        ExitCode::from(0)
    } else {
        ExitCode::from(2)
    })
}

fn run_synth(
    out: &Path,
    spec: ClipSpec,
    lead_in_ms: f64,
    tone: bool,
    config_path: Option<&Path>,
) -> Result<ExitCode> {
    let config = load_config(config_path)?;
    config.validate().context("validating synth configuration")?;
    if !(lead_in_ms.is_finite() && lead_in_ms >= 0.0) {
        anyhow::bail!("--lead-in-ms must be a finite value >= 0 (got {lead_in_ms})");
    }
    let sample_rate = config.analysis.sample_rate;
    let mut track = ClickTrack::for_clip(spec, config.timing.frame_rate, lead_in_ms, sample_rate);
    if tone {
        track = track.with_tone(ToneSpec::default());
    }

    let samples = track.render();
    write_wav(out, &samples, sample_rate)?;
    tracing::info!(
        "[Synth] Wrote {} ({} samples, onsets {:?} ms)",
        out.display(),
        samples.len(),
        track.onsets_ms
    );
    Ok(ExitCode::from(0))
}
