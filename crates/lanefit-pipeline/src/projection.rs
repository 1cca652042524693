//! Point projection: assign each input point an arc-length coordinate on
//! the reference line, then order the points by it.
//!
//! Every point is measured against every reference-line segment
//! (O(points × segments)); the nearest segment wins and the point gets
//! `s = s(segment start) + ds`. Offsets are not clamped to the segment,
//! so points before the first station or past the last one receive `s`
//! values outside the line's span.
//!
//! With the `parallel` feature the per-point scan runs on rayon's pool.
//! The scan is read-only over the reference line and the sort happens
//! afterwards, so the output does not depend on the feature.

use crate::geometry::distance_to_segment;
use crate::types::{PipelineError, Point3D, ProjectedPoint, ReferenceLine, Stage};

/// Project `points` onto `line` and sort them by arc-length coordinate.
///
/// Ties keep input order.
///
/// # Errors
///
/// Returns [`PipelineError::DegenerateGeometry`] tagged
/// [`Stage::Projection`] when the line has fewer than 2 stations, and
/// [`PipelineError::ProjectionInvariant`] if the output size differs from
/// the input size.
pub fn project_points(
    line: &ReferenceLine,
    points: &[Point3D],
) -> Result<Vec<ProjectedPoint>, PipelineError> {
    if line.len() < 2 {
        return Err(PipelineError::degenerate(
            Stage::Projection,
            format!("reference line has {} stations (need 2)", line.len()),
        ));
    }

    let mut projected = scan(line, points);
    projected.sort_by(|a, b| a.s.total_cmp(&b.s));

    if projected.len() != points.len() {
        return Err(PipelineError::ProjectionInvariant {
            expected: points.len(),
            actual: projected.len(),
        });
    }

    let outside = projected
        .iter()
        .filter(|p| p.s < 0.0 || p.s > line.length())
        .count();
    if outside > 0 {
        log::warn!(
            "projection: {outside} of {} points extrapolate beyond the reference line span [0, {:.3}]",
            projected.len(),
            line.length(),
        );
    }

    Ok(projected)
}

/// Arc-length coordinate of a single point on `line`.
///
/// The first segment with the globally smallest distance wins.
#[must_use]
pub fn project_point(line: &ReferenceLine, point: Point3D) -> ProjectedPoint {
    let mut best_s = 0.0;
    let mut best_distance = f64::INFINITY;
    for pair in line.stations().windows(2) {
        let (start, end) = (pair[0], pair[1]);
        let hit = distance_to_segment(point.xy, start.point, end.point);
        if hit.distance < best_distance {
            best_distance = hit.distance;
            best_s = start.s + hit.ds;
        }
    }
    ProjectedPoint { point, s: best_s }
}

#[cfg(not(feature = "parallel"))]
fn scan(line: &ReferenceLine, points: &[Point3D]) -> Vec<ProjectedPoint> {
    points.iter().map(|&p| project_point(line, p)).collect()
}

#[cfg(feature = "parallel")]
fn scan(line: &ReferenceLine, points: &[Point3D]) -> Vec<ProjectedPoint> {
    use rayon::prelude::*;

    points.par_iter().map(|&p| project_point(line, p)).collect()
}
