//! lanefit-bench: CLI tool for curve-fitting experiments and diagnostics.
//!
//! Reads a whitespace-separated `x y z` point file, fits a smooth curve
//! through it with configurable parameters, and prints per-stage
//! diagnostics. Useful for:
//!
//! - Comparing the unordered pipeline against the ordered fitting modes
//! - Tuning smoothing weight, basis count, density, and outline concavity
//! - Measuring per-stage durations to identify bottlenecks
//! - Inspecting the boundary and reference line behind a bad fit
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin lanefit-bench -- [OPTIONS] <POINT_FILE>
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use lanefit_export::{
    GeoJsonMetadata, SvgLayers, SvgMetadata, XyzMetadata, parse_xyz, to_boundary_dump,
    to_geojson, to_svg, to_xyz,
};
use lanefit_pipeline::diagnostics::{Clock, PipelineDiagnostics, process_unordered_with_diagnostics};
use lanefit_pipeline::{
    ConcaveOutline, FitConfig, FitMode, FitResult, PenalizedSpline, Point3D, RecordingSink,
    ReferenceLineConfig, UnorderedResult, fit_ordered,
};

/// Curve-fitting experimentation and diagnostics for lanefit.
///
/// Runs one of the fitting paths on a point file with configurable
/// parameters and prints per-stage timing and count diagnostics.
#[derive(Parser)]
#[command(name = "lanefit-bench", version)]
struct Cli {
    /// Path to the input point file (`x y z` per line).
    point_path: PathBuf,

    /// Fitting path.
    #[arg(long, value_enum, default_value_t = Mode::Unordered)]
    mode: Mode,

    /// Smoothing weight.
    #[arg(long, default_value_t = FitConfig::DEFAULT_LAMBDA)]
    lambda: f64,

    /// Number of spline basis functions.
    #[arg(long, default_value_t = FitConfig::DEFAULT_BASIS_COUNT, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(4..))]
    basis_count: usize,

    /// Spacing between resampled points.
    #[arg(long, default_value_t = FitConfig::DEFAULT_DENSITY)]
    density: f64,

    /// Outline concavity (unordered mode).
    #[arg(long, default_value_t = FitConfig::DEFAULT_CONCAVITY)]
    concavity: f64,

    /// Sliding window size as a fraction of the boundary vertex count.
    #[arg(long, default_value_t = ReferenceLineConfig::DEFAULT_WINDOW_FRACTION)]
    window_fraction: f64,

    /// Lower clamp on the sliding window size.
    #[arg(long, default_value_t = ReferenceLineConfig::DEFAULT_MIN_WINDOW)]
    min_window: usize,

    /// Upper clamp on the sliding window size.
    #[arg(long, default_value_t = ReferenceLineConfig::DEFAULT_MAX_WINDOW)]
    max_window: usize,

    /// Windowed turning sum (degrees) that marks a turn cluster.
    #[arg(long, default_value_t = ReferenceLineConfig::DEFAULT_TURN_THRESHOLD_DEG)]
    turn_threshold: f64,

    /// Turning angle (degrees) a polar point must exceed.
    #[arg(long, default_value_t = ReferenceLineConfig::DEFAULT_POLAR_ANGLE_DEG)]
    polar_angle: f64,

    /// Polar pairs closer than this fraction of the widest pair are dropped.
    #[arg(long, default_value_t = ReferenceLineConfig::DEFAULT_SEPARATION_FRACTION)]
    separation_fraction: f64,

    /// Simplification tolerance for the reference line.
    #[arg(long, default_value_t = ReferenceLineConfig::DEFAULT_SIMPLIFY_TOLERANCE)]
    simplify_tolerance: f64,

    /// Sort points by x, then y, before fitting.
    #[arg(long)]
    sort_by_x: bool,

    /// Write the resampled curve as `x y z` text.
    #[arg(long)]
    xyz: Option<PathBuf>,

    /// Write the resampled curve as a GeoJSON feature.
    #[arg(long)]
    geojson: Option<PathBuf>,

    /// Write an SVG of the input, boundary, reference line, and curve.
    #[arg(long)]
    svg: Option<PathBuf>,

    /// Write the annotated boundary as `x y max_delta` text (unordered mode).
    #[arg(long)]
    dump_boundary: Option<PathBuf>,

    /// Number of runs for averaging.
    #[arg(long, default_value_t = 1, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    runs: usize,

    /// Output diagnostics as JSON instead of human-readable report.
    #[arg(long)]
    json: bool,

    /// Full fit config as a JSON string.
    ///
    /// When provided, all other parameter flags are ignored. The JSON
    /// must be a valid `FitConfig` serialization; missing fields take
    /// their defaults.
    #[arg(long)]
    config_json: Option<String>,
}

/// Fitting path selection.
#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Outline, reference line, projection, then fit against arc length.
    Unordered,
    /// Points in file order, fit against chord length.
    Chord,
    /// Points in file order, fit y and z against x.
    FixedAxis,
}

/// Build a [`FitConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual parameter flags are ignored.
fn config_from_cli(cli: &Cli) -> Result<FitConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    Ok(FitConfig {
        lambda: cli.lambda,
        basis_count: cli.basis_count,
        density: cli.density,
        concavity: cli.concavity,
        reference_line: ReferenceLineConfig {
            window_fraction: cli.window_fraction,
            min_window: cli.min_window,
            max_window: cli.max_window,
            turn_threshold_deg: cli.turn_threshold,
            polar_angle_deg: cli.polar_angle,
            separation_fraction: cli.separation_fraction,
            simplify_tolerance: cli.simplify_tolerance,
        },
    })
}

/// What the first run produced, kept for the output files.
enum Outcome {
    Ordered(FitResult),
    Unordered {
        result: UnorderedResult,
        sink: RecordingSink,
    },
}

impl Outcome {
    const fn curve(&self) -> &FitResult {
        match self {
            Self::Ordered(curve) => curve,
            Self::Unordered { result, .. } => &result.curve,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let text = match std::fs::read_to_string(&cli.point_path) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("Error reading {}: {e}", cli.point_path.display());
            return ExitCode::FAILURE;
        }
    };

    let mut points = match parse_xyz(&text) {
        Ok(points) => points,
        Err(e) => {
            eprintln!("Error parsing {}: {e}", cli.point_path.display());
            return ExitCode::FAILURE;
        }
    };
    if cli.sort_by_x {
        points.sort_by(|a, b| a.xy.x.total_cmp(&b.xy.x).then(a.xy.y.total_cmp(&b.xy.y)));
    }

    eprintln!(
        "Points: {} ({} points)",
        cli.point_path.display(),
        points.len(),
    );
    eprintln!("Config: {config:#?}");
    eprintln!("Runs: {}", cli.runs);
    eprintln!();

    let outcome = match cli.mode {
        Mode::Unordered => run_unordered(&cli, &points, &config),
        Mode::Chord => run_ordered(&cli, &points, &config, FitMode::ChordParametric),
        Mode::FixedAxis => run_ordered(&cli, &points, &config, FitMode::FixedAxis),
    };
    let Some(outcome) = outcome else {
        return ExitCode::FAILURE;
    };

    write_outputs(&cli, &config, &points, &outcome);
    ExitCode::SUCCESS
}

/// Run the unordered pipeline `cli.runs` times, printing diagnostics for
/// each run. Returns the first run's result.
fn run_unordered(cli: &Cli, points: &[Point3D], config: &FitConfig) -> Option<Outcome> {
    let oracle = ConcaveOutline::new(config.concavity);
    let spline = PenalizedSpline::new(config.lambda, config.basis_count);
    let mut all_diagnostics = Vec::with_capacity(cli.runs);
    let mut first = None;

    for run in 0..cli.runs {
        if cli.runs > 1 {
            eprintln!("--- Run {}/{} ---", run + 1, cli.runs);
        }

        let mut sink = RecordingSink::default();
        match process_unordered_with_diagnostics(
            points.to_vec(),
            config.clone(),
            &oracle,
            &spline,
            &StdClock,
            &mut sink,
        ) {
            Ok((result, diagnostics)) => {
                if cli.json {
                    match serde_json::to_string_pretty(&diagnostics) {
                        Ok(json) => println!("{json}"),
                        Err(e) => {
                            eprintln!("Error serializing diagnostics: {e}");
                            return None;
                        }
                    }
                } else {
                    println!("{}", diagnostics.report());
                }

                if first.is_none() {
                    first = Some(Outcome::Unordered { result, sink });
                }
                all_diagnostics.push(diagnostics);
            }
            Err(e) => {
                eprintln!("Pipeline error: {e}");
                return None;
            }
        }

        if cli.runs > 1 {
            eprintln!();
        }
    }

    if cli.runs > 1 {
        print_multi_run_summary(&all_diagnostics);
    }

    first
}

/// Run an ordered fit `cli.runs` times. Returns the first run's curve.
fn run_ordered(
    cli: &Cli,
    points: &[Point3D],
    config: &FitConfig,
    mode: FitMode,
) -> Option<Outcome> {
    let x: Vec<f64> = points.iter().map(|p| p.xy.x).collect();
    let y: Vec<f64> = points.iter().map(|p| p.xy.y).collect();
    let z: Vec<f64> = points.iter().map(|p| p.z).collect();
    let mut durations = Vec::with_capacity(cli.runs);
    let mut first = None;

    for _ in 0..cli.runs {
        let start = StdClock.now();
        match fit_ordered(&x, &y, &z, mode, config) {
            Ok(curve) => {
                let duration = StdClock.elapsed(&start);
                if cli.json {
                    let value = serde_json::json!({
                        "mode": format!("{mode:?}"),
                        "input_point_count": points.len(),
                        "output_point_count": curve.len(),
                        "duration": duration.as_secs_f64(),
                    });
                    println!("{value:#}");
                } else {
                    println!(
                        "{mode:?} fit: {} points -> {} samples in {:.3}ms",
                        points.len(),
                        curve.len(),
                        duration.as_secs_f64() * 1000.0,
                    );
                }
                durations.push(duration);
                if first.is_none() {
                    first = Some(Outcome::Ordered(curve));
                }
            }
            Err(e) => {
                eprintln!("Fit error: {e}");
                return None;
            }
        }
    }

    if cli.runs > 1 {
        println!();
        println!("Summary ({} runs)\n{}", durations.len(), "=".repeat(60));
        print_duration_stats("Total duration", &durations);
    }

    first
}

/// Write every requested output file. Failures are reported but do not
/// abort the remaining writes.
fn write_outputs(cli: &Cli, config: &FitConfig, points: &[Point3D], outcome: &Outcome) {
    let title = cli
        .point_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("bench");
    let config_value = serde_json::to_value(config).ok();
    let config_json = config_value.as_ref().map(ToString::to_string);

    if let Some(ref path) = cli.xyz {
        let metadata = XyzMetadata {
            title: Some(title),
            config_json: config_json.as_deref(),
        };
        write_file(path, "XYZ", &to_xyz(outcome.curve(), &metadata));
    }

    if let Some(ref path) = cli.geojson {
        let metadata = GeoJsonMetadata {
            name: Some(title),
            config: config_value.as_ref(),
        };
        write_file(path, "GeoJSON", &to_geojson(outcome.curve(), &metadata));
    }

    if let Some(ref path) = cli.svg {
        let layers = match outcome {
            Outcome::Ordered(curve) => SvgLayers {
                points,
                curve: Some(curve),
                ..SvgLayers::default()
            },
            Outcome::Unordered { result, .. } => SvgLayers {
                points,
                boundary: Some(&result.boundary),
                reference_line: Some(&result.reference_line),
                curve: Some(&result.curve),
            },
        };
        let metadata = SvgMetadata {
            title: Some(title),
            description: None,
            config_json: config_json.as_deref(),
        };
        write_file(path, "SVG", &to_svg(&layers, &metadata));
    }

    if let Some(ref path) = cli.dump_boundary {
        match outcome {
            Outcome::Unordered { sink, .. } => {
                write_file(path, "Boundary dump", &to_boundary_dump(&sink.boundary));
            }
            Outcome::Ordered(_) => {
                eprintln!("--dump-boundary only applies to --mode unordered; skipped");
            }
        }
    }
}

fn write_file(path: &Path, label: &str, contents: &str) {
    match std::fs::write(path, contents) {
        Ok(()) => {
            eprintln!(
                "{label} written to {} ({} bytes)",
                path.display(),
                contents.len(),
            );
        }
        Err(e) => {
            eprintln!("Error writing {label} to {}: {e}", path.display());
        }
    }
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}

/// Function pointer type for extracting a stage duration from diagnostics.
type StageExtractor = fn(&PipelineDiagnostics) -> Duration;

/// Print min / mean / max of a set of durations in milliseconds.
#[allow(clippy::cast_precision_loss)]
fn print_duration_stats(label: &str, durations: &[Duration]) {
    if durations.is_empty() {
        println!("Warning: no durations to summarize");
        return;
    }

    let ms: Vec<f64> = durations
        .iter()
        .map(|d| d.as_secs_f64() * 1000.0)
        .collect();
    let min = ms.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let max = ms.iter().copied().reduce(f64::max).unwrap_or(0.0);
    let mean = ms.iter().sum::<f64>() / ms.len() as f64;

    println!("{label}: min={min:.3}ms  mean={mean:.3}ms  max={max:.3}ms");
}

/// Print aggregated statistics across multiple runs.
#[allow(clippy::cast_precision_loss)]
fn print_multi_run_summary(all_diagnostics: &[PipelineDiagnostics]) {
    debug_assert!(!all_diagnostics.is_empty(), "no diagnostics to summarize");

    println!();
    println!(
        "Summary ({} runs)\n{}",
        all_diagnostics.len(),
        "=".repeat(60),
    );

    let totals: Vec<Duration> = all_diagnostics.iter().map(|d| d.total_duration).collect();
    print_duration_stats("Total duration", &totals);
    if totals.is_empty() {
        return;
    }

    // Per-stage means.
    println!();
    println!("{:<24} {:>12}", "Stage", "Mean (ms)");
    println!("{}", "-".repeat(40));

    let stage_extractors: &[(&str, StageExtractor)] = &[
        ("Outline", |d| d.outline.duration),
        ("Reference Line", |d| d.reference_line.duration),
        ("Projection", |d| d.projection.duration),
        ("Fit", |d| d.fit.duration),
    ];

    for (name, extractor) in stage_extractors {
        let stage_mean = all_diagnostics
            .iter()
            .map(|d| extractor(d).as_secs_f64() * 1000.0)
            .sum::<f64>()
            / all_diagnostics.len() as f64;
        println!("{name:<24} {stage_mean:>10.3}ms");
    }
}
