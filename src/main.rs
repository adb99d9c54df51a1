//! Cosmic Timeline - cosmic-ray telescope timestamp analysis
//!
//! # Usage
//!
//! ```bash
//! # Correct each telescope file and write decimal timestamps
//! cosmic-timeline convert scope0.txt scope1.txt --output decimal/
//!
//! # Full run: correct every channel, then scan for coincidences
//! cosmic-timeline scan scope0.txt scope1.txt scope2.txt --window 13
//!
//! # Full run report as JSON
//! cosmic-timeline scan scope*.txt --json --output run.json
//!
//! # Crystal-clock boards
//! cosmic-timeline --scale 244.1 scan *.txt
//! ```
//!
//! # Environment Variables
//!
//! - `COSMIC_TIMELINE_CONFIG`: Path to a TOML run config (default: ./timeline.toml)
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{Context, Result};
use clap::Parser;
use cosmic_timeline::config::RunConfig;
use cosmic_timeline::pipeline::{analyze_channel, analyze_run, ChannelInput, ChannelReport};
use cosmic_timeline::types::{ChannelId, Coincidence};
use std::fmt::Write as _;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "cosmic-timeline")]
#[command(about = "Timestamp correction and coincidence scanning for cosmic-ray telescope arrays")]
#[command(version)]
struct CliArgs {
    /// Path to a TOML run config (overrides COSMIC_TIMELINE_CONFIG and ./timeline.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Fine ticks per second (255 for LM555 boards, 244.1 for crystal boards)
    #[arg(long, global = true)]
    scale: Option<f64>,

    /// Widest coincidence window, in fine ticks
    #[arg(long, global = true)]
    window: Option<u32>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: SubCommand,
}

#[derive(clap::Subcommand, Debug)]
enum SubCommand {
    /// Correct each channel file and write its timestamps as decimal seconds
    Convert {
        /// One raw hex file per telescope; file order gives the channel id
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Directory for the decimal files
        #[arg(long, default_value = ".")]
        output: PathBuf,
    },

    /// Correct every channel and scan the merged timeline for coincidences
    Scan {
        /// One raw hex file per telescope; file order gives the channel id
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Write coincidences here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,

        /// Emit the full run report as JSON instead of coincidence lines
        #[arg(long)]
        json: bool,
    },
}

// ============================================================================
// Helpers
// ============================================================================

fn init_logging(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }
}

/// Load the run config and apply command-line overrides.
fn load_config(args: &CliArgs) -> Result<RunConfig> {
    let mut config = match &args.config {
        Some(path) => RunConfig::load_from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => RunConfig::load(),
    };
    if let Some(scale) = args.scale {
        config.run.scale_override = Some(scale);
    }
    if let Some(window) = args.window {
        config.run.max_window_steps = window;
    }
    Ok(config)
}

fn read_inputs(files: &[PathBuf]) -> Result<Vec<ChannelInput>> {
    files
        .iter()
        .enumerate()
        .map(|(i, path)| -> Result<ChannelInput> {
            let channel = ChannelId::try_from(i).context("too many channel files")?;
            let contents = fs::read_to_string(path)
                .with_context(|| format!("reading channel file {}", path.display()))?;
            Ok(ChannelInput::new(channel, contents.lines().map(String::from).collect()))
        })
        .collect()
}

fn print_channel_summary(path: &Path, report: &ChannelReport) {
    println!("channel {} ({})", report.channel, path.display());
    println!("  {}", report.correction);
    if report.trimmed > 0 {
        println!("  dropped {} samples before the last clock reset", report.trimmed);
    }
    for error in &report.decode_errors {
        println!("  malformed {error}");
    }
    if report.references.is_empty() {
        println!("  no usable GPS reference time");
    }
    for (i, candidate) in report.references.candidates.iter().enumerate() {
        println!("  [{i}] start {candidate}");
    }
    if report.references.overflow > 0 {
        println!(
            "  {} more distinct start times not shown",
            report.references.overflow
        );
    }
    if let Some(stats) = &report.light_curve.stats {
        println!(
            "  {:.1} s observed, {} counts, {:.4} counts/s",
            stats.observation_secs, stats.total_counts, stats.count_rate
        );
    }
}

fn write_decimal(path: &Path, report: &ChannelReport, config: &RunConfig) -> Result<()> {
    let scale = config.scale();
    let offset = config.offset_for(report.channel);
    let mut out = String::new();
    writeln!(out, "# {}", report.correction)?;
    if let Ok(best) = report.references.best() {
        writeln!(out, "# start {best}")?;
    }
    for sample in &report.correction.samples {
        writeln!(out, "{:.6}", sample.seconds(scale) + offset)?;
    }
    fs::write(path, out).with_context(|| format!("writing {}", path.display()))
}

fn write_coincidences(out: &mut dyn Write, coincidences: &[Coincidence]) -> Result<()> {
    for c in coincidences {
        writeln!(out, "{c}")?;
    }
    Ok(())
}

// ============================================================================
// Commands
// ============================================================================

fn run_convert(files: &[PathBuf], output: &Path, config: &RunConfig) -> Result<()> {
    fs::create_dir_all(output)
        .with_context(|| format!("creating output directory {}", output.display()))?;

    for (path, input) in files.iter().zip(read_inputs(files)?) {
        let report = analyze_channel(input.channel, &input.lines, config);
        print_channel_summary(path, &report);

        let stem = path
            .file_stem()
            .map_or_else(|| format!("channel{}", input.channel), |s| s.to_string_lossy().into_owned());
        let target = output.join(format!("{stem}.decimal.txt"));
        write_decimal(&target, &report, config)?;
        info!(channel = input.channel, path = %target.display(), "Wrote decimal timestamps");
    }
    Ok(())
}

fn run_scan(files: &[PathBuf], output: Option<&Path>, json: bool, config: &RunConfig) -> Result<()> {
    let inputs = read_inputs(files)?;
    let report = analyze_run(&inputs, config)?;

    if json {
        match output {
            Some(path) => {
                let file = fs::File::create(path)
                    .with_context(|| format!("creating {}", path.display()))?;
                serde_json::to_writer_pretty(file, &report).context("serializing run report")?;
            }
            None => {
                let stdout = std::io::stdout();
                let mut lock = stdout.lock();
                serde_json::to_writer_pretty(&mut lock, &report)
                    .context("serializing run report")?;
                writeln!(lock)?;
            }
        }
        return Ok(());
    }

    for (path, channel) in files.iter().zip(&report.channels) {
        print_channel_summary(path, channel);
    }

    match output {
        Some(path) => {
            let mut file = fs::File::create(path)
                .with_context(|| format!("creating {}", path.display()))?;
            write_coincidences(&mut file, &report.coincidences)?;
            if let Some(interior) = &report.interior {
                let interior_path = path.with_extension("interior.txt");
                let mut file = fs::File::create(&interior_path)
                    .with_context(|| format!("creating {}", interior_path.display()))?;
                write_coincidences(&mut file, interior)?;
            }
        }
        None => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            write_coincidences(&mut lock, &report.coincidences)?;
            if let Some(interior) = &report.interior {
                writeln!(lock, "# without perimeter channels")?;
                write_coincidences(&mut lock, interior)?;
            }
        }
    }

    println!(
        "{} coincidences among {} events",
        report.coincidences.len(),
        report.events
    );
    Ok(())
}

// ============================================================================
// Entry Point
// ============================================================================

fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_logging(args.json_logs);

    let mut config = load_config(&args)?;
    let files = match &args.command {
        SubCommand::Convert { files, .. } | SubCommand::Scan { files, .. } => files,
    };
    // One file per telescope
    config.run.channel_count = u16::try_from(files.len()).context("too many channel files")?;
    config.validate().context("invalid run config")?;
    info!(
        scale = %config.scale(),
        max_window_steps = config.run.max_window_steps,
        "Run configuration ready"
    );

    match &args.command {
        SubCommand::Convert { files, output } => run_convert(files, output, &config),
        SubCommand::Scan {
            files,
            output,
            json,
        } => run_scan(files, output.as_deref(), *json, &config),
    }
}
