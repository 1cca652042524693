//! Pipeline diagnostics: intermediate-geometry sinks, plus timing and
//! counts for each stage of the unordered path.
//!
//! Two separate concerns live here:
//!
//! - [`DiagnosticSink`] receives the annotated boundary and the
//!   reference line while they are computed. It is injected explicitly;
//!   nothing is written anywhere unless the caller asks for it.
//! - [`PipelineDiagnostics`] is permanent instrumentation for threshold
//!   tuning, collected by [`process_unordered_with_diagnostics`].
//!
//! Timing goes through the [`Clock`] trait so the core stays free of
//! platform time sources. Durations are serialized as fractional seconds
//! (`f64`) for JSON compatibility, since `std::time::Duration` does not
//! implement serde traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::outline::OutlineOracle;
use crate::pipeline::{Pipeline, PipelineStage, UnorderedResult};
use crate::spline::SmoothingSpline;
use crate::types::{BoundaryVertex, FitConfig, PipelineError, Point3D, ReferenceLine};

/// Receiver for intermediate geometry of the reference-line extractor.
///
/// Both methods default to doing nothing.
pub trait DiagnosticSink {
    /// The boundary with turning angles and windowed deltas filled in.
    fn boundary(&mut self, _vertices: &[BoundaryVertex]) {}

    /// The final, simplified reference line.
    fn reference_line(&mut self, _line: &ReferenceLine) {}
}

/// A sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl DiagnosticSink for NoopSink {}

/// A sink that keeps copies of what it receives.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordingSink {
    /// Last annotated boundary received.
    pub boundary: Vec<BoundaryVertex>,
    /// Last reference line received.
    pub reference_line: Option<ReferenceLine>,
}

impl DiagnosticSink for RecordingSink {
    fn boundary(&mut self, vertices: &[BoundaryVertex]) {
        self.boundary = vertices.to_vec();
    }

    fn reference_line(&mut self, line: &ReferenceLine) {
        self.reference_line = Some(line.clone());
    }
}

/// Source of monotonic timestamps.
pub trait Clock {
    /// Opaque timestamp.
    type Instant;

    /// Current timestamp.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics collected from a single unordered-fit run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineDiagnostics {
    /// Stage 1: outline oracle.
    pub outline: StageDiagnostics,
    /// Stage 2: reference-line extraction.
    pub reference_line: StageDiagnostics,
    /// Stage 3: projection and sort.
    pub projection: StageDiagnostics,
    /// Stage 4: spline fit and resampling.
    pub fit: StageDiagnostics,
    /// Total wall-clock duration of the entire pipeline (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary counts across all stages.
    pub summary: PipelineSummary,
}

/// Diagnostics for a single pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics that vary by pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Outline metrics.
    Outline {
        /// Points handed to the oracle.
        input_point_count: usize,
        /// Boundary vertices, closing duplicate excluded.
        vertex_count: usize,
        /// Concavity passed to the oracle.
        concavity: f64,
    },
    /// Reference-line extraction metrics.
    ReferenceLine {
        /// Boundary vertices examined.
        vertex_count: usize,
        /// Sliding window size.
        window_size: usize,
        /// Turn clusters found.
        cluster_count: usize,
        /// Whether a cluster straddling index 0 was merged.
        wrapped_cluster: bool,
        /// Distinct polar points.
        polar_count: usize,
        /// Boundary indices of the chosen endpoints.
        endpoints: (usize, usize),
        /// Boundary arc vertices before simplification.
        arc_vertex_count: usize,
        /// Stations after simplification.
        station_count: usize,
        /// Arc length of the reference line.
        length: f64,
    },
    /// Projection metrics.
    Projection {
        /// Points projected.
        point_count: usize,
        /// Reference-line segments searched per point.
        segment_count: usize,
        /// Smallest arc-length coordinate.
        s_min: f64,
        /// Largest arc-length coordinate.
        s_max: f64,
        /// Points whose coordinate falls outside the line's span.
        extrapolated_count: usize,
    },
    /// Fit metrics.
    Fit {
        /// Smoothing weight.
        lambda: f64,
        /// Spline basis size.
        basis_count: usize,
        /// Resampling density.
        density: f64,
        /// Resampled points produced.
        sample_count: usize,
    },
}

/// High-level summary counts for the entire pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Input points.
    pub input_point_count: usize,
    /// Outline vertices.
    pub boundary_vertex_count: usize,
    /// Reference-line stations.
    pub station_count: usize,
    /// Resampled output points.
    pub output_point_count: usize,
}

impl PipelineDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Pipeline Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Input: {} points",
            self.summary.input_point_count
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<24} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        let stages = [
            ("Outline", &self.outline),
            ("Reference Line", &self.reference_line),
            ("Projection", &self.projection),
            ("Fit", &self.fit),
        ];
        for (name, diag) in &stages {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<24} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        lines.push(format!(
            "Boundary vertices: {}  |  Stations: {}  |  Output points: {}",
            self.summary.boundary_vertex_count,
            self.summary.station_count,
            self.summary.output_point_count,
        ));

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Outline {
            input_point_count,
            vertex_count,
            concavity,
        } => format!("{input_point_count} pts -> {vertex_count} vertices (concavity={concavity:.2})"),
        StageMetrics::ReferenceLine {
            window_size,
            cluster_count,
            wrapped_cluster,
            polar_count,
            endpoints,
            station_count,
            length,
            ..
        } => {
            let wrap = if *wrapped_cluster { " wrapped" } else { "" };
            format!(
                "window={window_size} clusters={cluster_count}{wrap} polar={polar_count} ends={}..{} stations={station_count} len={length:.2}",
                endpoints.0, endpoints.1,
            )
        }
        StageMetrics::Projection {
            point_count,
            segment_count,
            s_min,
            s_max,
            extrapolated_count,
        } => format!(
            "{point_count} pts x {segment_count} segs, s=[{s_min:.2}, {s_max:.2}] extrapolated={extrapolated_count}",
        ),
        StageMetrics::Fit {
            lambda,
            basis_count,
            density,
            sample_count,
        } => format!("lambda={lambda:e} K={basis_count} density={density} -> {sample_count} samples"),
    }
}

/// Run the unordered pipeline, timing each stage with `clock`.
///
/// `sink` receives the annotated boundary and reference line as in
/// [`Outlined::extract_reference_line`](crate::pipeline::Outlined::extract_reference_line).
///
/// # Errors
///
/// Propagates the first stage failure; no diagnostics are returned for
/// a failed run.
pub fn process_unordered_with_diagnostics<O, S, C>(
    points: Vec<Point3D>,
    config: FitConfig,
    oracle: &O,
    spline: &S,
    clock: &C,
    sink: &mut dyn DiagnosticSink,
) -> Result<(UnorderedResult, PipelineDiagnostics), PipelineError>
where
    O: OutlineOracle + ?Sized,
    S: SmoothingSpline,
    C: Clock,
{
    let input_point_count = points.len();
    let total_start = clock.now();

    let start = clock.now();
    let outlined = Pipeline::new(points, config).outline(oracle)?;
    let outline = timed(clock, &start, &outlined);

    let start = clock.now();
    let referenced = outlined.extract_reference_line(sink)?;
    let reference_line = timed(clock, &start, &referenced);

    let start = clock.now();
    let projected = referenced.project()?;
    let projection = timed(clock, &start, &projected);

    let start = clock.now();
    let fitted = projected.fit(spline)?;
    let fit = timed(clock, &start, &fitted);

    let total_duration = clock.elapsed(&total_start);
    let result = fitted.into_result();
    let summary = PipelineSummary {
        input_point_count,
        boundary_vertex_count: result.boundary.open_vertices().len(),
        station_count: result.reference_line.len(),
        output_point_count: result.curve.len(),
    };

    Ok((
        result,
        PipelineDiagnostics {
            outline,
            reference_line,
            projection,
            fit,
            total_duration,
            summary,
        },
    ))
}

/// Pair the elapsed time with the stage's metrics.
fn timed<C: Clock, T: PipelineStage>(clock: &C, start: &C::Instant, stage: &T) -> StageDiagnostics {
    StageDiagnostics {
        duration: clock.elapsed(start),
        metrics: stage.metrics(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::outline::FixedOutline;
    use crate::spline::PenalizedSpline;
    use crate::types::{BoundaryPolygon, Point};

    /// Clock that advances one millisecond per reading.
    struct TickClock(Cell<u64>);

    impl Clock for TickClock {
        type Instant = u64;

        fn now(&self) -> u64 {
            let t = self.0.get();
            self.0.set(t + 1);
            t
        }

        fn elapsed(&self, since: &u64) -> Duration {
            Duration::from_millis(self.now() - since)
        }
    }

    fn pointed_lane() -> BoundaryPolygon {
        let mut ring = Vec::new();
        for i in 0..=90 {
            ring.push(Point::new(5.0 + f64::from(i), -2.0));
        }
        ring.push(Point::new(100.0, 0.0));
        for i in 0..=90 {
            ring.push(Point::new(95.0 - f64::from(i), 2.0));
        }
        ring.push(Point::new(0.0, 0.0));
        BoundaryPolygon::new(ring)
    }

    fn lane_cloud() -> Vec<Point3D> {
        (1..100)
            .flat_map(|i| {
                let x = f64::from(i);
                [-1.0, 1.0].map(|y| Point3D::new(x, y, 0.0))
            })
            .collect()
    }

    fn sample_diagnostics() -> PipelineDiagnostics {
        let stage = |ms, metrics| StageDiagnostics {
            duration: Duration::from_millis(ms),
            metrics,
        };
        PipelineDiagnostics {
            outline: stage(
                4,
                StageMetrics::Outline {
                    input_point_count: 300,
                    vertex_count: 184,
                    concavity: 2.0,
                },
            ),
            reference_line: stage(
                2,
                StageMetrics::ReferenceLine {
                    vertex_count: 184,
                    window_size: 37,
                    cluster_count: 2,
                    wrapped_cluster: true,
                    polar_count: 2,
                    endpoints: (91, 183),
                    arc_vertex_count: 93,
                    station_count: 4,
                    length: 100.77,
                },
            ),
            projection: stage(
                3,
                StageMetrics::Projection {
                    point_count: 300,
                    segment_count: 3,
                    s_min: -0.5,
                    s_max: 101.0,
                    extrapolated_count: 7,
                },
            ),
            fit: stage(
                1,
                StageMetrics::Fit {
                    lambda: 1e-4,
                    basis_count: 30,
                    density: 1.0,
                    sample_count: 102,
                },
            ),
            total_duration: Duration::from_millis(10),
            summary: PipelineSummary {
                input_point_count: 300,
                boundary_vertex_count: 184,
                station_count: 4,
                output_point_count: 102,
            },
        }
    }

    #[test]
    fn duration_ms_converts_correctly() {
        let d = Duration::from_millis(1234);
        let ms = duration_ms(d);
        assert!((ms - 1234.0).abs() < 0.01);
    }

    #[test]
    fn noop_sink_accepts_everything() {
        let mut sink = NoopSink;
        sink.boundary(&[]);
        sink.reference_line(&ReferenceLine::new(vec![]));
    }

    #[test]
    fn recording_sink_keeps_latest() {
        let mut sink = RecordingSink::default();
        let line = ReferenceLine::from_points(&[Point::new(0.0, 0.0), Point::new(1.0, 0.0)]);
        sink.reference_line(&line);
        sink.boundary(&[BoundaryVertex {
            point: Point::new(2.0, 3.0),
            turning_angle: 45.0,
            max_delta: 90.0,
        }]);
        assert_eq!(sink.reference_line, Some(line));
        assert_eq!(sink.boundary.len(), 1);
    }

    #[test]
    fn report_lists_every_stage() {
        let report = sample_diagnostics().report();
        assert!(report.contains("Pipeline Diagnostics Report"));
        assert!(report.contains("Reference Line"));
        assert!(report.contains("clusters=2 wrapped"));
        assert!(report.contains("ends=91..183"));
        assert!(report.contains("extrapolated=7"));
        assert!(report.contains("102 samples"));
    }

    #[test]
    fn diagnostics_serialize_durations_as_seconds() {
        let diag = sample_diagnostics();
        let json = serde_json::to_value(&diag).unwrap();
        assert_eq!(json["total_duration"], serde_json::json!(0.01));
        let back: PipelineDiagnostics = serde_json::from_value(json).unwrap();
        assert_eq!(back, diag);
    }

    #[test]
    fn negative_duration_is_rejected() {
        let mut json = serde_json::to_value(sample_diagnostics()).unwrap();
        json["total_duration"] = serde_json::json!(-1.0);
        assert!(serde_json::from_value::<PipelineDiagnostics>(json).is_err());
    }

    #[test]
    fn process_collects_every_stage() {
        let clock = TickClock(Cell::new(0));
        let mut sink = RecordingSink::default();
        let (result, diag) = process_unordered_with_diagnostics(
            lane_cloud(),
            FitConfig::default(),
            &FixedOutline(pointed_lane()),
            &PenalizedSpline::default(),
            &clock,
            &mut sink,
        )
        .unwrap();

        assert_eq!(sink.boundary.len(), 184);
        assert_eq!(sink.reference_line.as_ref(), Some(&result.reference_line));

        assert_eq!(diag.summary.input_point_count, 198);
        assert_eq!(diag.summary.boundary_vertex_count, 184);
        assert_eq!(diag.summary.output_point_count, result.curve.len());
        assert!(matches!(diag.outline.metrics, StageMetrics::Outline { .. }));
        assert!(matches!(
            diag.reference_line.metrics,
            StageMetrics::ReferenceLine {
                cluster_count: 2,
                ..
            }
        ));
        assert!(matches!(
            diag.projection.metrics,
            StageMetrics::Projection {
                point_count: 198,
                ..
            }
        ));
        assert!(matches!(diag.fit.metrics, StageMetrics::Fit { .. }));
        // Each stage reads the clock twice; the total spans all of them.
        assert_eq!(diag.outline.duration, Duration::from_millis(1));
        assert!(diag.total_duration > diag.fit.duration);
    }

    #[test]
    fn process_propagates_stage_failures() {
        let clock = TickClock(Cell::new(0));
        let err = process_unordered_with_diagnostics(
            lane_cloud(),
            FitConfig::default(),
            &FixedOutline(BoundaryPolygon::new(vec![])),
            &PenalizedSpline::default(),
            &clock,
            &mut NoopSink,
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::DegenerateGeometry { .. }));
    }
}
