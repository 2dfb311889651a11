mod inputs;
mod plot;
mod report;

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum, ValueHint};
use pace_curve::scale::scale_factor;
use pace_curve::{compute_report, DistanceUnit, MissingPolicy, Params};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::plot::{render_chart_guard, ChartKind};

#[derive(Parser, Debug)]
#[command(author, version, about = "Fastest-split pace curve CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compute the best-effort pace curve for a set of activities
    Curve(CurveArgs),
    /// Report stream statistics and scale factors per activity
    Diagnose(DiagnoseArgs),
}

#[derive(Parser, Debug)]
struct CurveArgs {
    /// FIT/GPX/stream JSON files, or activity cache directories
    #[arg(required = true, value_hint = ValueHint::AnyPath)]
    inputs: Vec<PathBuf>,

    /// Leaderboard CSV path (`-` for stdout)
    #[arg(short, long, default_value = "pace_curve.csv", value_hint = ValueHint::FilePath)]
    output: PathBuf,

    /// Also write the full split matrix as CSV
    #[arg(long, value_hint = ValueHint::FilePath)]
    matrix: Option<PathBuf>,

    /// Also write the full report as JSON
    #[arg(long, value_hint = ValueHint::FilePath)]
    json: Option<PathBuf>,

    /// Output PNG figure path (defaults next to CSV)
    #[arg(long, value_hint = ValueHint::FilePath)]
    png: Option<PathBuf>,

    /// Output SVG figure path
    #[arg(long, value_hint = ValueHint::FilePath)]
    svg: Option<PathBuf>,

    /// Disable plot generation
    #[arg(long, action = ArgAction::SetTrue)]
    no_plot: bool,

    /// JSON file with pipeline parameters; flags below override it
    #[arg(long, value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// Unit paces are reported in
    #[arg(long, value_enum)]
    unit: Option<UnitOpt>,

    /// Distances always evaluated (comma separated miles)
    #[arg(long)]
    distances: Option<String>,

    /// Regular grid spacing in miles (0 disables the grid)
    #[arg(long)]
    grid_step: Option<f64>,

    /// Upper bound for the regular grid in miles
    #[arg(long)]
    max_grid: Option<f64>,

    /// Relative stream/metadata disagreement that triggers rescaling
    #[arg(long)]
    scale_threshold: Option<f64>,

    /// Clamp distance streams to their running maximum
    #[arg(long, action = ArgAction::SetTrue)]
    clamp_monotonic: bool,

    /// Drop activities without usable streams from the matrix
    #[arg(long, action = ArgAction::SetTrue)]
    exclude_missing: bool,

    /// Only evaluate these sport types (comma separated)
    #[arg(long)]
    sport: Option<String>,

    /// Evaluate activities on a single thread
    #[arg(long, action = ArgAction::SetTrue)]
    serial: bool,

    /// Skip the parsed file cache under .cache/
    #[arg(long, action = ArgAction::SetTrue)]
    no_cache: bool,

    /// Verbose logging
    #[arg(long, action = ArgAction::SetTrue)]
    verbose: bool,

    /// Profile major stages with timings
    #[arg(long, action = ArgAction::SetTrue)]
    profile: bool,
}

#[derive(Parser, Debug)]
struct DiagnoseArgs {
    /// FIT/GPX/stream JSON files, or activity cache directories
    #[arg(required = true, value_hint = ValueHint::AnyPath)]
    inputs: Vec<PathBuf>,

    /// Output report path (`-` for stdout)
    #[arg(short, long, default_value = "-", value_hint = ValueHint::FilePath)]
    output: PathBuf,

    /// Verbose logging
    #[arg(long, action = ArgAction::SetTrue)]
    verbose: bool,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum UnitOpt {
    Mi,
    Km,
}

impl From<UnitOpt> for DistanceUnit {
    fn from(value: UnitOpt) -> Self {
        match value {
            UnitOpt::Mi => DistanceUnit::Miles,
            UnitOpt::Km => DistanceUnit::Kilometers,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let verbose = match &cli.command {
        Command::Curve(args) => args.verbose,
        Command::Diagnose(args) => args.verbose,
    };
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    match cli.command {
        Command::Curve(args) => handle_curve(args),
        Command::Diagnose(args) => handle_diagnose(args),
    }
}

fn build_params(args: &CurveArgs) -> Result<Params> {
    let mut params = match args.config.as_ref() {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("{} is not a valid parameter file", path.display()))?
        }
        None => Params::default(),
    };

    if let Some(unit) = args.unit {
        params.unit = unit.into();
    }
    if let Some(list) = args.distances.as_ref() {
        let distances = parse_distance_list(list)?;
        if distances.is_empty() {
            return Err(anyhow!("--distances list was empty"));
        }
        params.interesting_miles = distances;
    }
    if let Some(step) = args.grid_step {
        params.grid_step_miles = step;
    }
    if let Some(cap) = args.max_grid {
        params.max_grid_miles = Some(cap);
    }
    if let Some(threshold) = args.scale_threshold {
        params.scale_threshold = threshold;
    }
    if args.clamp_monotonic {
        params.clamp_monotonic = true;
    }
    if args.exclude_missing {
        params.missing_policy = MissingPolicy::Exclude;
    }
    if let Some(sports) = args.sport.as_ref() {
        params.sport_types = sports
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
    }
    if args.serial {
        params.parallel = false;
    }

    params.validate()?;
    Ok(params)
}

fn handle_curve(args: CurveArgs) -> Result<()> {
    let params = build_params(&args)?;
    let timed = args.profile || args.verbose;

    let t_parse = Instant::now();
    let activities = inputs::load_inputs(&args.inputs, !args.no_cache)?;
    if timed {
        info!(
            "Parse stage: {:.1} ms ({} activities)",
            t_parse.elapsed().as_secs_f64() * 1000.0,
            activities.len()
        );
    }

    let t_compute = Instant::now();
    let report = compute_report(activities, &params)?;
    if timed {
        info!(
            "Compute stage: {:.1} ms ({} targets)",
            t_compute.elapsed().as_secs_f64() * 1000.0,
            report.best.rows.len()
        );
    }
    let covered = report.best.leaderboard().count();
    info!(
        "Curve computed: {} of {} distances covered, params {}",
        covered,
        report.best.rows.len(),
        &report.params_hash[..12]
    );
    if report.diagnostics.failed() > 0 {
        warn!(
            "{} activities had no usable streams: {}",
            report.diagnostics.failed(),
            report
                .diagnostics
                .failed_ids()
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    let t_csv = Instant::now();
    report::write_leaderboard(&report, &args.output)?;
    if args.output.as_os_str() != "-" {
        info!("Wrote leaderboard CSV: {}", args.output.display());
    }
    if let Some(path) = args.matrix.as_ref() {
        report::write_split_matrix(&report, path)?;
        info!("Wrote split matrix: {}", path.display());
    }
    if let Some(path) = args.json.as_ref() {
        report::write_json(&report, path)?;
        info!("Wrote report JSON: {}", path.display());
    }
    if timed {
        info!(
            "Output stage: {:.1} ms",
            t_csv.elapsed().as_secs_f64() * 1000.0
        );
    }

    if !args.no_plot {
        let t_plot = Instant::now();
        let png = args.png.clone().or_else(|| {
            (args.output.as_os_str() != "-").then(|| args.output.with_extension("png"))
        });
        if let Some(path) = png.as_ref() {
            write_plot(&report.best, path, ChartKind::Png);
        }
        if let Some(path) = args.svg.as_ref() {
            write_plot(&report.best, path, ChartKind::Svg);
        }
        if timed {
            info!(
                "Plot stage: {:.1} ms",
                t_plot.elapsed().as_secs_f64() * 1000.0
            );
        }
    }

    Ok(())
}

fn write_plot(curve: &pace_curve::BestEffortCurve, path: &Path, kind: ChartKind) {
    let label = match kind {
        ChartKind::Png => "PNG",
        ChartKind::Svg => "SVG",
    };
    match render_chart_guard(curve, path, kind) {
        Ok(()) => info!("Wrote plot: {}", path.display()),
        Err(err) => warn!("Skipping {} render ({}): {}", label, path.display(), err),
    }
}

fn handle_diagnose(args: DiagnoseArgs) -> Result<()> {
    let activities = inputs::load_inputs(&args.inputs, false)?;
    let mut report = String::new();

    for activity in &activities {
        let summary = &activity.summary;
        writeln!(report, "ACTIVITY: {}", summary.id)?;
        if let Some(name) = summary.name.as_ref() {
            writeln!(report, "  name: {name}")?;
        }
        if let Some(sport) = summary.sport_type.as_ref() {
            writeln!(report, "  sport: {sport}")?;
        }
        writeln!(
            report,
            "  reported_total_m: {:.1}",
            summary.reported_total_distance
        )?;

        if let Some(err) = activity.fetch_error.as_ref() {
            writeln!(report, "  streams: fetch failed: {err}\n")?;
            continue;
        }
        let Some(streams) = activity.streams.as_ref() else {
            writeln!(report, "  streams: absent\n")?;
            continue;
        };
        writeln!(report, "  samples: {}", streams.len())?;
        writeln!(report, "  timespan_s: {}", streams.span_s())?;
        match streams.final_distance() {
            Some(total) => writeln!(report, "  stream_total_m: {total:.1}")?,
            None => writeln!(report, "  stream_total_m: n/a")?,
        }
        match scale_factor(&streams.distance, summary.reported_total_distance) {
            Some(scale) => writeln!(report, "  scale_factor: {scale:.4}")?,
            None => writeln!(report, "  scale_factor: n/a")?,
        }
        writeln!(
            report,
            "  non_monotonic_samples: {}",
            streams.monotonic_violations()
        )?;
        if let Err(err) = streams.validate() {
            writeln!(report, "  invalid: {err}")?;
        }
        report.push('\n');
    }

    if args.output.as_os_str() == "-" {
        print!("{report}");
    } else {
        fs::write(&args.output, report)
            .with_context(|| format!("failed to write {}", args.output.display()))?;
        info!("Diagnostic report written: {}", args.output.display());
    }
    Ok(())
}

fn parse_distance_list(input: &str) -> Result<Vec<f64>> {
    let mut out = Vec::new();
    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            continue;
        }
        let value: f64 = trimmed
            .parse()
            .with_context(|| format!("invalid distance '{}': expected miles", trimmed))?;
        if !(value > 0.0) || !value.is_finite() {
            return Err(anyhow!("distances must be positive, got '{}'", trimmed));
        }
        out.push(value);
    }
    Ok(out)
}
