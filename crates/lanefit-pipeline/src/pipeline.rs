//! Incremental unordered-fit pipeline: advance stage-by-stage, inspecting
//! each intermediate result before continuing.
//!
//! Unlike [`crate::fit_unordered`] which runs everything in one call,
//! [`Pipeline`] lets the caller drive execution one step at a time:
//!
//! ```rust
//! # use lanefit_pipeline::{ConcaveOutline, FitConfig, NoopSink, PenalizedSpline, Pipeline, PipelineError, Point3D};
//! # fn run(points: Vec<Point3D>) -> Result<(), PipelineError> {
//! let config = FitConfig::default();
//! let oracle = ConcaveOutline::new(config.concavity);
//! let spline = PenalizedSpline::new(config.lambda, config.basis_count);
//! let result = Pipeline::new(points, config)
//!     .outline(&oracle)?
//!     .extract_reference_line(&mut NoopSink)?
//!     .project()?
//!     .fit(&spline)?
//!     .into_result();
//! # Ok(())
//! # }
//! ```
//!
//! Each stage method consumes `self` and returns the next pipeline state,
//! carrying all previously computed intermediates. Every transition is
//! fallible and aborts with no partial output.

use crate::diagnostics::{DiagnosticSink, StageMetrics};
use crate::fit::fit_with_parameter;
use crate::outline::OutlineOracle;
use crate::projection::project_points;
use crate::reference_line::{Extraction, ExtractionReport, extract_reference_line};
use crate::spline::SmoothingSpline;
use crate::types::{
    BoundaryPolygon, FitConfig, FitResult, PipelineError, Point, Point3D, ProjectedPoint,
    ReferenceLine, Stage,
};

/// Everything the unordered path produced.
#[derive(Debug, Clone, PartialEq)]
pub struct UnorderedResult {
    /// Outline returned by the oracle.
    pub boundary: BoundaryPolygon,
    /// Discovered, simplified reference line.
    pub reference_line: ReferenceLine,
    /// Input points with their arc-length coordinate, sorted by it.
    pub projected: Vec<ProjectedPoint>,
    /// Resampled curve.
    pub curve: FitResult,
}

// ───────────────────────── Stage 0: Pending ──────────────────────────

/// Pipeline state before any processing has occurred.
///
/// Call [`outline`](Self::outline) to advance to the next stage.
#[must_use = "pipeline stages are consumed by advancing, call .outline() to continue"]
#[derive(Debug, Clone)]
pub struct Pending {
    config: FitConfig,
    points: Vec<Point3D>,
}

impl Pending {
    /// The input points.
    #[must_use]
    pub fn points(&self) -> &[Point3D] {
        &self.points
    }

    /// The configuration the pipeline will run with.
    #[must_use]
    pub const fn config(&self) -> &FitConfig {
        &self.config
    }

    /// Validate the input and compute the planar outline of the points.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] for an out-of-range
    /// configuration, [`PipelineError::InputShape`] for fewer than 3
    /// points, and [`PipelineError::DegenerateGeometry`] tagged
    /// [`Stage::Outline`] when the oracle returns fewer than 3 vertices.
    pub fn outline<O: OutlineOracle + ?Sized>(self, oracle: &O) -> Result<Outlined, PipelineError> {
        self.config.validate()?;
        if self.points.len() < 3 {
            return Err(PipelineError::InputShape {
                reason: format!(
                    "{} points given, at least 3 required for an unordered fit",
                    self.points.len()
                ),
            });
        }

        let planar: Vec<Point> = self.points.iter().map(|p| p.xy).collect();
        let boundary = oracle.outline(&planar);
        let vertex_count = boundary.open_vertices().len();
        log::debug!(
            "outline: {} points -> {vertex_count} boundary vertices",
            planar.len()
        );
        if vertex_count < 3 {
            return Err(PipelineError::degenerate(
                Stage::Outline,
                format!(
                    "outline has {vertex_count} vertices from {} points (need 3)",
                    planar.len()
                ),
            ));
        }

        Ok(Outlined {
            config: self.config,
            points: self.points,
            boundary,
        })
    }
}

// ───────────────────────── Stage 1: Outlined ─────────────────────────

/// Pipeline state after the outline oracle ran.
///
/// Call [`extract_reference_line`](Self::extract_reference_line) to
/// advance to the next stage.
#[must_use = "pipeline stages are consumed by advancing, call .extract_reference_line() to continue"]
#[derive(Debug, Clone)]
pub struct Outlined {
    config: FitConfig,
    points: Vec<Point3D>,
    boundary: BoundaryPolygon,
}

impl Outlined {
    /// The outline of the input points.
    #[must_use]
    pub const fn boundary(&self) -> &BoundaryPolygon {
        &self.boundary
    }

    /// Discover the reference line on the outline.
    ///
    /// `sink` receives the annotated boundary and the final line.
    ///
    /// # Errors
    ///
    /// Propagates [`extract_reference_line`] failures.
    pub fn extract_reference_line(
        self,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<Referenced, PipelineError> {
        let extraction = extract_reference_line(&self.boundary, &self.config.reference_line, sink)?;
        Ok(Referenced {
            config: self.config,
            points: self.points,
            boundary: self.boundary,
            extraction,
        })
    }
}

// ───────────────────────── Stage 2: Referenced ───────────────────────

/// Pipeline state after reference-line discovery.
///
/// Call [`project`](Self::project) to advance to the next stage.
#[must_use = "pipeline stages are consumed by advancing, call .project() to continue"]
#[derive(Debug, Clone)]
pub struct Referenced {
    config: FitConfig,
    points: Vec<Point3D>,
    boundary: BoundaryPolygon,
    extraction: Extraction,
}

impl Referenced {
    /// The discovered reference line.
    #[must_use]
    pub const fn reference_line(&self) -> &ReferenceLine {
        &self.extraction.reference_line
    }

    /// Measurements taken during extraction.
    #[must_use]
    pub const fn report(&self) -> &ExtractionReport {
        &self.extraction.report
    }

    /// Project every input point onto the reference line.
    ///
    /// # Errors
    ///
    /// Propagates [`project_points`] failures.
    pub fn project(self) -> Result<Projected, PipelineError> {
        let projected = project_points(&self.extraction.reference_line, &self.points)?;
        if let (Some(first), Some(last)) = (projected.first(), projected.last()) {
            log::debug!(
                "projection: {} points, s in [{:.3}, {:.3}]",
                projected.len(),
                first.s,
                last.s
            );
        }
        Ok(Projected {
            config: self.config,
            boundary: self.boundary,
            extraction: self.extraction,
            projected,
        })
    }
}

// ───────────────────────── Stage 3: Projected ────────────────────────

/// Pipeline state after projection, points sorted by arc length.
///
/// Call [`fit`](Self::fit) to advance to the final stage.
#[must_use = "pipeline stages are consumed by advancing, call .fit() to continue"]
#[derive(Debug, Clone)]
pub struct Projected {
    config: FitConfig,
    boundary: BoundaryPolygon,
    extraction: Extraction,
    projected: Vec<ProjectedPoint>,
}

impl Projected {
    /// Points with their arc-length coordinate, ascending.
    #[must_use]
    pub fn projected(&self) -> &[ProjectedPoint] {
        &self.projected
    }

    /// Fit each coordinate against arc length and resample.
    ///
    /// # Errors
    ///
    /// Propagates spline and resampling failures.
    pub fn fit<S: SmoothingSpline>(self, spline: &S) -> Result<Fitted, PipelineError> {
        let s: Vec<f64> = self.projected.iter().map(|p| p.s).collect();
        let x: Vec<f64> = self.projected.iter().map(|p| p.point.xy.x).collect();
        let y: Vec<f64> = self.projected.iter().map(|p| p.point.xy.y).collect();
        let z: Vec<f64> = self.projected.iter().map(|p| p.point.z).collect();
        let curve = fit_with_parameter(&s, &x, &y, &z, self.config.density, spline)?;
        Ok(Fitted {
            config: self.config,
            boundary: self.boundary,
            extraction: self.extraction,
            projected: self.projected,
            curve,
        })
    }
}

// ───────────────────────── Stage 4: Fitted ───────────────────────────

/// Pipeline state after fitting, the final stage.
///
/// Call [`into_result`](Self::into_result) to extract the
/// [`UnorderedResult`].
#[must_use = "call .into_result() to extract the UnorderedResult"]
#[derive(Debug, Clone)]
pub struct Fitted {
    config: FitConfig,
    boundary: BoundaryPolygon,
    extraction: Extraction,
    projected: Vec<ProjectedPoint>,
    curve: FitResult,
}

impl Fitted {
    /// The resampled curve.
    #[must_use]
    pub const fn curve(&self) -> &FitResult {
        &self.curve
    }

    /// Consume the pipeline and return every intermediate.
    #[must_use]
    pub fn into_result(self) -> UnorderedResult {
        UnorderedResult {
            boundary: self.boundary,
            reference_line: self.extraction.reference_line,
            projected: self.projected,
            curve: self.curve,
        }
    }
}

// ──────────────────────── PipelineStage trait ─────────────────────────

/// Uniform access to the metadata of a completed stage.
///
/// [`Pending`] has not processed anything and does not implement it.
pub trait PipelineStage {
    /// Human-readable name of this stage.
    const NAME: &str;

    /// One-based position of this stage (`1` for [`Outlined`] through
    /// `4` for [`Fitted`]).
    const INDEX: usize;

    /// Metrics describing the work done to reach this state.
    fn metrics(&self) -> StageMetrics;
}

impl PipelineStage for Outlined {
    const NAME: &str = "outline";
    const INDEX: usize = 1;

    fn metrics(&self) -> StageMetrics {
        StageMetrics::Outline {
            input_point_count: self.points.len(),
            vertex_count: self.boundary.open_vertices().len(),
            concavity: self.config.concavity,
        }
    }
}

impl PipelineStage for Referenced {
    const NAME: &str = "reference line";
    const INDEX: usize = 2;

    fn metrics(&self) -> StageMetrics {
        let report = &self.extraction.report;
        StageMetrics::ReferenceLine {
            vertex_count: report.vertex_count,
            window_size: report.window_size,
            cluster_count: report.cluster_count,
            wrapped_cluster: report.wrapped_cluster,
            polar_count: report.polar_indices.len(),
            endpoints: report.endpoints,
            arc_vertex_count: report.arc_vertex_count,
            station_count: self.extraction.reference_line.len(),
            length: self.extraction.reference_line.length(),
        }
    }
}

impl PipelineStage for Projected {
    const NAME: &str = "projection";
    const INDEX: usize = 3;

    fn metrics(&self) -> StageMetrics {
        let length = self.extraction.reference_line.length();
        StageMetrics::Projection {
            point_count: self.projected.len(),
            segment_count: self.extraction.reference_line.len().saturating_sub(1),
            s_min: self.projected.first().map_or(0.0, |p| p.s),
            s_max: self.projected.last().map_or(0.0, |p| p.s),
            extrapolated_count: self
                .projected
                .iter()
                .filter(|p| p.s < 0.0 || p.s > length)
                .count(),
        }
    }
}

impl PipelineStage for Fitted {
    const NAME: &str = "fit";
    const INDEX: usize = 4;

    fn metrics(&self) -> StageMetrics {
        StageMetrics::Fit {
            lambda: self.config.lambda,
            basis_count: self.config.basis_count,
            density: self.config.density,
            sample_count: self.curve.len(),
        }
    }
}

// ───────────────────────── Pipeline entry point ──────────────────────

/// Entry point for the incremental unordered-fit pipeline.
///
/// Each stage method consumes the current state and returns the next,
/// making it a compile-time error to skip stages or call them out of
/// order.
pub struct Pipeline;

impl Pipeline {
    /// Create a new pipeline from points and config.
    ///
    /// No processing is performed. Call
    /// [`.outline()`](Pending::outline) to begin.
    #[allow(clippy::new_ret_no_self)]
    pub const fn new(points: Vec<Point3D>, config: FitConfig) -> Pending {
        Pending { config, points }
    }
}
