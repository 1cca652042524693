//! Fitting modes and uniform resampling.
//!
//! Three ways to turn coordinate samples into a resampled curve:
//!
//! - [`fit_chord_parametric`]: parameter is cumulative planar chord
//!   length in input order.
//! - [`fit_fixed_axis`]: `y` and `z` are fitted as functions of `x`.
//! - [`fit_with_parameter`]: the caller supplies the parameter (the
//!   projector's arc-length coordinates on the unordered path).
//!
//! Every mode resamples at `round(span / density) + 1` evenly spaced
//! parameter values, both ends included.

use crate::spline::{Curve, SmoothingSpline};
use crate::types::{FitResult, PipelineError, Stage};

/// Largest number of resampling steps a single fit will produce.
pub const MAX_RESAMPLE_STEPS: usize = 1 << 24;

/// Check that the coordinate arrays have equal length and at least
/// `min_len` entries.
///
/// # Errors
///
/// Returns [`PipelineError::InputShape`] describing the mismatch.
pub fn check_shape(x: &[f64], y: &[f64], z: &[f64], min_len: usize) -> Result<(), PipelineError> {
    if x.len() != y.len() || x.len() != z.len() {
        return Err(PipelineError::InputShape {
            reason: format!(
                "coordinate arrays differ in length (x={}, y={}, z={})",
                x.len(),
                y.len(),
                z.len()
            ),
        });
    }
    if x.len() < min_len {
        return Err(PipelineError::InputShape {
            reason: format!("{} points given, at least {min_len} required", x.len()),
        });
    }
    Ok(())
}

/// Cumulative planar distance along the points in input order, starting
/// at 0.
#[must_use]
pub fn chord_lengths(x: &[f64], y: &[f64]) -> Vec<f64> {
    let mut s = 0.0;
    let mut out = Vec::with_capacity(x.len());
    for (i, (&xi, &yi)) in x.iter().zip(y).enumerate() {
        if i > 0 {
            s += (xi - x[i - 1]).hypot(yi - y[i - 1]);
        }
        out.push(s);
    }
    out
}

/// Evenly spaced sample positions over `[start, end]`.
///
/// Produces `round((end - start) / density) + 1` values with the last
/// one equal to `end`.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] for a non-positive density
/// and [`PipelineError::DegenerateGeometry`] tagged [`Stage::Resample`]
/// when the span rounds to zero steps or to more than
/// [`MAX_RESAMPLE_STEPS`].
pub fn resample_positions(start: f64, end: f64, density: f64) -> Result<Vec<f64>, PipelineError> {
    if !(density.is_finite() && density > 0.0) {
        return Err(PipelineError::InvalidConfig(format!(
            "density must be positive and finite, got {density}"
        )));
    }
    let span = end - start;
    let steps = (span / density).round();
    if !(steps.is_finite() && steps >= 1.0) {
        return Err(PipelineError::degenerate(
            Stage::Resample,
            format!("span {span:.6} at density {density} rounds to {steps} steps"),
        ));
    }
    #[allow(clippy::cast_precision_loss)]
    let max_steps = MAX_RESAMPLE_STEPS as f64;
    if steps > max_steps {
        return Err(PipelineError::degenerate(
            Stage::Resample,
            format!(
                "span {span:.6} at density {density} needs {steps} steps (limit {MAX_RESAMPLE_STEPS})"
            ),
        ));
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let count = steps as usize;
    let step = span / steps;
    let mut positions: Vec<f64> = (0..count)
        .map(|i| {
            #[allow(clippy::cast_precision_loss)]
            let i = i as f64;
            step.mul_add(i, start)
        })
        .collect();
    positions.push(end);
    Ok(positions)
}

/// Fit `x(s)`, `y(s)`, `z(s)` against cumulative chord length and
/// resample over `[0, s_max]`.
///
/// # Errors
///
/// Returns [`PipelineError::InputShape`] for mismatched or too-short
/// arrays, and propagates spline and resampling failures.
pub fn fit_chord_parametric<S: SmoothingSpline>(
    x: &[f64],
    y: &[f64],
    z: &[f64],
    density: f64,
    spline: &S,
) -> Result<FitResult, PipelineError> {
    check_shape(x, y, z, 2)?;
    let s = chord_lengths(x, y);
    fit_with_parameter(&s, x, y, z, density, spline)
}

/// Fit `y(x)` and `z(x)` and resample over `[x_min, x_max]`.
///
/// # Errors
///
/// Returns [`PipelineError::InputShape`] for mismatched or too-short
/// arrays and [`PipelineError::DegenerateGeometry`] tagged
/// [`Stage::Resample`] when the x range rounds to zero steps.
pub fn fit_fixed_axis<S: SmoothingSpline>(
    x: &[f64],
    y: &[f64],
    z: &[f64],
    density: f64,
    spline: &S,
) -> Result<FitResult, PipelineError> {
    check_shape(x, y, z, 2)?;
    let (x_min, x_max) = x
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let positions = resample_positions(x_min, x_max, density)?;

    let fy = spline.fit(x, y)?;
    let fz = spline.fit(x, z)?;

    log::debug!(
        "fit: fixed axis over x=[{x_min:.3}, {x_max:.3}], {} samples",
        positions.len()
    );
    Ok(FitResult {
        y: positions.iter().map(|&t| fy.evaluate(t)).collect(),
        z: positions.iter().map(|&t| fz.evaluate(t)).collect(),
        x: positions,
    })
}

/// Fit each coordinate against a caller-supplied parameter and resample
/// over `[0, s_max]`.
///
/// Parameters may be unsorted and may fall below 0; the curve
/// extrapolates linearly where samples do not reach.
///
/// # Errors
///
/// Returns [`PipelineError::InputShape`] when `params` does not match
/// the coordinate arrays, and propagates spline and resampling failures.
pub fn fit_with_parameter<S: SmoothingSpline>(
    params: &[f64],
    x: &[f64],
    y: &[f64],
    z: &[f64],
    density: f64,
    spline: &S,
) -> Result<FitResult, PipelineError> {
    check_shape(x, y, z, 1)?;
    if params.len() != x.len() {
        return Err(PipelineError::InputShape {
            reason: format!("{} parameters for {} points", params.len(), x.len()),
        });
    }
    let s_max = params.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let positions = resample_positions(0.0, s_max, density)?;

    let fx = spline.fit(params, x)?;
    let fy = spline.fit(params, y)?;
    let fz = spline.fit(params, z)?;

    log::debug!(
        "fit: parametric over s=[0, {s_max:.3}], {} samples",
        positions.len()
    );
    Ok(FitResult {
        x: positions.iter().map(|&t| fx.evaluate(t)).collect(),
        y: positions.iter().map(|&t| fy.evaluate(t)).collect(),
        z: positions.iter().map(|&t| fz.evaluate(t)).collect(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::spline::PenalizedSpline;

    #[test]
    fn chord_lengths_accumulate_planar_distance() {
        let s = chord_lengths(&[0.0, 3.0, 3.0], &[0.0, 0.0, 4.0]);
        assert_eq!(s, vec![0.0, 3.0, 7.0]);
    }

    #[test]
    fn chord_lengths_of_empty_input() {
        assert!(chord_lengths(&[], &[]).is_empty());
    }

    #[test]
    fn resample_positions_include_both_ends() {
        let positions = resample_positions(2.0, 5.0, 1.0).unwrap();
        assert_eq!(positions, vec![2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn resample_step_divides_span_evenly() {
        // 10 / 3 rounds to 3 steps of 10/3 each.
        let positions = resample_positions(0.0, 10.0, 3.0).unwrap();
        assert_eq!(positions.len(), 4);
        assert!((positions[1] - 10.0 / 3.0).abs() < 1e-12);
        assert!((positions[3] - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn resample_zero_span_is_degenerate() {
        let err = resample_positions(1.0, 1.2, 1.0).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::DegenerateGeometry {
                stage: Stage::Resample,
                ..
            }
        ));
    }

    #[test]
    fn resample_rejects_oversized_sample_count() {
        let err = resample_positions(0.0, 1.0, 1e-300).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::DegenerateGeometry {
                stage: Stage::Resample,
                ..
            }
        ));
        // One step past the limit at an ordinary density.
        #[allow(clippy::cast_precision_loss)]
        let span = (MAX_RESAMPLE_STEPS + 1) as f64;
        assert!(resample_positions(0.0, span, 1.0).is_err());
    }

    #[test]
    fn resample_rejects_non_positive_density() {
        assert!(matches!(
            resample_positions(0.0, 10.0, 0.0).unwrap_err(),
            PipelineError::InvalidConfig(_)
        ));
        assert!(matches!(
            resample_positions(0.0, 10.0, -1.0).unwrap_err(),
            PipelineError::InvalidConfig(_)
        ));
    }

    #[test]
    fn fixed_axis_round_trip() {
        let spline = PenalizedSpline::new(1e-8, 30);
        let result = fit_fixed_axis(
            &[0.0, 1.0, 2.0, 3.0],
            &[0.0; 4],
            &[0.0; 4],
            1.0,
            &spline,
        )
        .unwrap();
        assert_eq!(result.x, vec![0.0, 1.0, 2.0, 3.0]);
        assert!(result.y.iter().all(|v| v.abs() < 1e-9));
        assert!(result.z.iter().all(|v| v.abs() < 1e-9));
    }

    #[test]
    fn fixed_axis_degenerate_range_fails() {
        let spline = PenalizedSpline::default();
        let err = fit_fixed_axis(&[4.0, 4.0, 4.0], &[0.0, 1.0, 2.0], &[0.0; 3], 1.0, &spline)
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::DegenerateGeometry {
                stage: Stage::Resample,
                ..
            }
        ));
    }

    #[test]
    fn chord_parametric_follows_a_straight_line() {
        let x: Vec<f64> = (0..=10).map(f64::from).collect();
        let y: Vec<f64> = x.iter().map(|v| 2.0 * v).collect();
        let z: Vec<f64> = x.iter().map(|v| 0.5 * v).collect();
        let result =
            fit_chord_parametric(&x, &y, &z, 1.0, &PenalizedSpline::default()).unwrap();

        // 10·√5 ≈ 22.36 rounds to 22 steps.
        assert_eq!(result.len(), 23);
        let last = result.points().last().unwrap();
        assert!((last.xy.x - 10.0).abs() < 1e-4);
        assert!((last.xy.y - 20.0).abs() < 1e-4);
        assert!((last.z - 5.0).abs() < 1e-4);
        let first = result.points().next().unwrap();
        assert!(first.xy.x.abs() < 1e-4 && first.xy.y.abs() < 1e-4);
    }

    #[test]
    fn shape_errors_are_reported() {
        let spline = PenalizedSpline::default();
        assert!(matches!(
            fit_chord_parametric(&[0.0, 1.0], &[0.0], &[0.0, 1.0], 1.0, &spline).unwrap_err(),
            PipelineError::InputShape { .. }
        ));
        assert!(matches!(
            fit_fixed_axis(&[0.0], &[0.0], &[0.0], 1.0, &spline).unwrap_err(),
            PipelineError::InputShape { .. }
        ));
    }

    #[test]
    fn supplied_parameter_resamples_from_zero() {
        // Samples start before 0; the output still starts at s = 0 and
        // ends at the largest parameter.
        let params = [-2.0, 0.0, 2.0, 4.0, 6.0];
        let x = [-2.0, 0.0, 2.0, 4.0, 6.0];
        let y = [1.0; 5];
        let z = [0.0; 5];
        let result =
            fit_with_parameter(&params, &x, &y, &z, 2.0, &PenalizedSpline::new(1e-4, 8)).unwrap();
        assert_eq!(result.len(), 4);
        assert!(result.x[0].abs() < 1e-4);
        assert!((result.x[3] - 6.0).abs() < 1e-4);
        assert!(result.y.iter().all(|v| (v - 1.0).abs() < 1e-4));
    }

    #[test]
    fn supplied_parameter_must_match_points() {
        let err = fit_with_parameter(
            &[0.0, 1.0],
            &[0.0, 1.0, 2.0],
            &[0.0; 3],
            &[0.0; 3],
            1.0,
            &PenalizedSpline::default(),
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::InputShape { .. }));
    }
}
