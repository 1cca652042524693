//! lanefit-pipeline: smooth 3D curve fitting through lane point clouds
//! (sans-IO).
//!
//! Two ordered paths fit a penalized spline against chord length or a
//! fixed axis. The unordered path induces an ordering first:
//! concave outline -> reference line (turning-angle heuristic) ->
//! projection onto the reference line -> fit against arc length.
//! Every path resamples the curve at a fixed spatial density.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! coordinate slices and returns structured data. Text and vector
//! formats live in `lanefit-export`.

pub mod diagnostics;
pub mod fit;
pub mod geometry;
pub mod outline;
pub mod pipeline;
pub mod projection;
pub mod reference_line;
pub mod simplify;
pub mod spline;
pub mod types;

pub use diagnostics::{DiagnosticSink, NoopSink, RecordingSink};
pub use outline::{ConcaveOutline, FixedOutline, OutlineOracle};
pub use pipeline::{Pipeline, UnorderedResult};
pub use spline::{Curve, PenalizedSpline, SmoothingSpline};
pub use types::{
    BoundaryPolygon, BoundaryVertex, FitConfig, FitMode, FitResult, PipelineError, Point,
    Point3D, Polyline, ProjectedPoint, ReferenceLine, ReferenceLineConfig, Stage, Station,
};

/// Fit a curve through points given in travel order.
///
/// [`FitMode::ChordParametric`] fits `x(s)`, `y(s)`, `z(s)` against
/// cumulative planar chord length; [`FitMode::FixedAxis`] fits `y(x)`
/// and `z(x)`. Only `lambda`, `basis_count`, and `density` of `config`
/// are used.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] for an out-of-range config,
/// [`PipelineError::InputShape`] for mismatched arrays or fewer than 2
/// points, and [`PipelineError::DegenerateGeometry`] tagged
/// [`Stage::Resample`] when the span rounds to zero samples.
pub fn fit_ordered(
    x: &[f64],
    y: &[f64],
    z: &[f64],
    mode: FitMode,
    config: &FitConfig,
) -> Result<FitResult, PipelineError> {
    config.validate()?;
    let spline = PenalizedSpline::new(config.lambda, config.basis_count);
    match mode {
        FitMode::ChordParametric => fit::fit_chord_parametric(x, y, z, config.density, &spline),
        FitMode::FixedAxis => fit::fit_fixed_axis(x, y, z, config.density, &spline),
    }
}

/// Fit a curve through an unordered point cloud.
///
/// Uses [`ConcaveOutline`] with `config.concavity` and
/// [`PenalizedSpline`]. See [`fit_unordered_with`] to supply other
/// collaborators or keep the intermediates.
///
/// # Errors
///
/// Returns [`PipelineError::InputShape`] for mismatched arrays or fewer
/// than 3 points, and any stage failure of the unordered pipeline.
pub fn fit_unordered(
    x: &[f64],
    y: &[f64],
    z: &[f64],
    config: &FitConfig,
) -> Result<FitResult, PipelineError> {
    let oracle = ConcaveOutline::new(config.concavity);
    let spline = PenalizedSpline::new(config.lambda, config.basis_count);
    fit_unordered_with(x, y, z, config, &oracle, &spline, &mut NoopSink).map(|r| r.curve)
}

/// Fit a curve through an unordered point cloud with explicit
/// collaborators, returning every intermediate.
///
/// # Errors
///
/// Same as [`fit_unordered`].
pub fn fit_unordered_with<O, S>(
    x: &[f64],
    y: &[f64],
    z: &[f64],
    config: &FitConfig,
    oracle: &O,
    spline: &S,
    sink: &mut dyn DiagnosticSink,
) -> Result<UnorderedResult, PipelineError>
where
    O: OutlineOracle + ?Sized,
    S: SmoothingSpline,
{
    let points = points_from_xyz(x, y, z, 3)?;
    Ok(Pipeline::new(points, config.clone())
        .outline(oracle)?
        .extract_reference_line(sink)?
        .project()?
        .fit(spline)?
        .into_result())
}

/// Zip coordinate arrays into points after checking their shape.
///
/// # Errors
///
/// Returns [`PipelineError::InputShape`] for mismatched arrays or fewer
/// than `min_len` points.
pub fn points_from_xyz(
    x: &[f64],
    y: &[f64],
    z: &[f64],
    min_len: usize,
) -> Result<Vec<Point3D>, PipelineError> {
    fit::check_shape(x, y, z, min_len)?;
    Ok(x
        .iter()
        .zip(y)
        .zip(z)
        .map(|((&x, &y), &z)| Point3D::new(x, y, z))
        .collect())
}
