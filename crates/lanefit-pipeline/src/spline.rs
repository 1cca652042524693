//! Penalized cubic B-spline smoothing.
//!
//! [`SmoothingSpline`] is the capability the fitting modes depend on:
//! fit a smooth curve to `(parameter, value)` samples and hand back
//! something [`Curve`] can evaluate. [`PenalizedSpline`] is the default
//! implementation.
//!
//! The basis is `K` uniform cubic B-splines over `[t_min, t_max]`
//! (`K - 3` knot intervals). Coefficients minimise
//!
//! ```text
//! (1/n) Σ (f(tᵢ) - yᵢ)²  +  λ · m³ · Σ (Δ²c)²
//! ```
//!
//! where `m = K - 3` and `Δ²c` are second differences of the
//! coefficients. The `m³` factor makes the penalty approximate
//! `∫₀¹ f''(τ)² dτ` on the normalised parameter, so `λ` means the same
//! thing whatever the sample range. The normal equations are solved by
//! Cholesky factorization with a small ridge so that data leaving some
//! basis functions unsupported still yields a unique solution.

use nalgebra::{DMatrix, DVector};

use crate::types::PipelineError;

/// Smallest basis that spans a cubic on one knot interval.
pub const MIN_BASIS_COUNT: usize = 4;

/// Relative ridge added to the normal-equation diagonal.
const RIDGE: f64 = 1e-10;

/// A fitted curve that can be evaluated anywhere on the real line.
pub trait Curve {
    /// Value of the curve at parameter `t`.
    fn evaluate(&self, t: f64) -> f64;
}

/// Strategy for fitting a smooth curve to parameter/value samples.
pub trait SmoothingSpline {
    /// The curve type produced by [`fit`](Self::fit).
    type Curve: Curve;

    /// Fit a curve through `(params[i], values[i])`.
    ///
    /// Parameters need not be sorted or distinct.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InputShape`] when the slices differ in
    /// length or are empty, and [`PipelineError::SplineSolve`] when the
    /// samples are not finite or the system cannot be factorized.
    fn fit(&self, params: &[f64], values: &[f64]) -> Result<Self::Curve, PipelineError>;
}

/// Penalized least-squares cubic B-spline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PenalizedSpline {
    /// Smoothing weight λ (non-negative).
    pub lambda: f64,
    /// Number of basis functions K (at least [`MIN_BASIS_COUNT`]).
    pub basis_count: usize,
}

impl PenalizedSpline {
    /// Create a spline fitter.
    #[must_use]
    pub const fn new(lambda: f64, basis_count: usize) -> Self {
        Self {
            lambda,
            basis_count,
        }
    }

    fn check(&self) -> Result<(), PipelineError> {
        if !(self.lambda.is_finite() && self.lambda >= 0.0) {
            return Err(PipelineError::InvalidConfig(format!(
                "lambda must be non-negative and finite, got {}",
                self.lambda
            )));
        }
        if self.basis_count < MIN_BASIS_COUNT {
            return Err(PipelineError::InvalidConfig(format!(
                "basis_count must be at least {MIN_BASIS_COUNT}, got {}",
                self.basis_count
            )));
        }
        Ok(())
    }
}

impl Default for PenalizedSpline {
    fn default() -> Self {
        Self::new(
            crate::types::FitConfig::DEFAULT_LAMBDA,
            crate::types::FitConfig::DEFAULT_BASIS_COUNT,
        )
    }
}

impl SmoothingSpline for PenalizedSpline {
    type Curve = BSplineCurve;

    fn fit(&self, params: &[f64], values: &[f64]) -> Result<BSplineCurve, PipelineError> {
        self.check()?;
        if params.len() != values.len() {
            return Err(PipelineError::InputShape {
                reason: format!(
                    "{} parameters for {} values",
                    params.len(),
                    values.len()
                ),
            });
        }
        if params.is_empty() {
            return Err(PipelineError::InputShape {
                reason: "no samples to fit".to_owned(),
            });
        }
        if params.iter().chain(values).any(|v| !v.is_finite()) {
            return Err(PipelineError::SplineSolve {
                reason: "samples contain non-finite values".to_owned(),
            });
        }

        let (start, end) = params
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &t| {
                (lo.min(t), hi.max(t))
            });

        #[allow(clippy::cast_precision_loss)]
        let n = params.len() as f64;
        let k = self.basis_count;

        if end <= start {
            let mean = values.iter().sum::<f64>() / n;
            log::debug!("spline: degenerate domain at t={start}, fitting constant {mean}");
            return Ok(BSplineCurve {
                start,
                end,
                coefficients: vec![mean; k],
            });
        }

        let curve = BSplineCurve {
            start,
            end,
            coefficients: vec![0.0; k],
        };

        let mut normal = DMatrix::<f64>::zeros(k, k);
        let mut rhs = DVector::<f64>::zeros(k);
        for (&t, &y) in params.iter().zip(values) {
            let (first, weights) = curve.basis(t);
            for (a, &wa) in weights.iter().enumerate() {
                rhs[first + a] += wa * y / n;
                for (b, &wb) in weights.iter().enumerate() {
                    normal[(first + a, first + b)] += wa * wb / n;
                }
            }
        }

        let intervals = k - (MIN_BASIS_COUNT - 1);
        #[allow(clippy::cast_precision_loss)]
        let penalty = self.lambda * (intervals as f64).powi(3);
        for i in 0..k - 2 {
            let stencil = [(i, 1.0), (i + 1, -2.0), (i + 2, 1.0)];
            for &(a, wa) in &stencil {
                for &(b, wb) in &stencil {
                    normal[(a, b)] += penalty * wa * wb;
                }
            }
        }

        #[allow(clippy::cast_precision_loss)]
        let mean_diag = normal.diagonal().sum() / k as f64;
        let ridge = RIDGE * mean_diag.max(f64::MIN_POSITIVE);
        for i in 0..k {
            normal[(i, i)] += ridge;
        }

        let cholesky = normal
            .cholesky()
            .ok_or_else(|| PipelineError::SplineSolve {
                reason: format!("normal equations for K={k} are not positive definite"),
            })?;
        let coefficients = cholesky.solve(&rhs);
        if coefficients.iter().any(|c| !c.is_finite()) {
            return Err(PipelineError::SplineSolve {
                reason: "solution contains non-finite coefficients".to_owned(),
            });
        }

        Ok(BSplineCurve {
            coefficients: coefficients.iter().copied().collect(),
            ..curve
        })
    }
}

/// A uniform cubic B-spline on `[start, end]`, extended linearly beyond.
#[derive(Debug, Clone, PartialEq)]
pub struct BSplineCurve {
    start: f64,
    end: f64,
    coefficients: Vec<f64>,
}

impl BSplineCurve {
    /// Lower end of the fitted domain.
    #[must_use]
    pub const fn start(&self) -> f64 {
        self.start
    }

    /// Upper end of the fitted domain.
    #[must_use]
    pub const fn end(&self) -> f64 {
        self.end
    }

    /// Basis coefficients.
    #[must_use]
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    fn intervals(&self) -> usize {
        self.coefficients.len() - (MIN_BASIS_COUNT - 1)
    }

    fn spacing(&self) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let m = self.intervals() as f64;
        (self.end - self.start) / m
    }

    /// Locate `t` (clamped to the domain) and return the index of the
    /// first supporting basis function and the local offset in `[0, 1]`.
    fn locate(&self, t: f64) -> (usize, f64) {
        let m = self.intervals();
        let global = ((t - self.start) / self.spacing()).clamp(0.0, usize_to_f64(m));
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let interval = (global.floor() as usize).min(m - 1);
        (interval, global - usize_to_f64(interval))
    }

    /// Supporting basis functions at `t`: first index and the four weights.
    fn basis(&self, t: f64) -> (usize, [f64; 4]) {
        let (first, u) = self.locate(t);
        let v = 1.0 - u;
        let u2 = u * u;
        let u3 = u2 * u;
        (
            first,
            [
                v * v * v / 6.0,
                3.0f64.mul_add(u3, -6.0 * u2) / 6.0 + 4.0 / 6.0,
                (-3.0f64).mul_add(u3, 3.0 * u2) / 6.0 + (3.0 * u + 1.0) / 6.0,
                u3 / 6.0,
            ],
        )
    }

    fn value_inside(&self, t: f64) -> f64 {
        let (first, weights) = self.basis(t);
        weights
            .iter()
            .zip(&self.coefficients[first..first + 4])
            .map(|(w, c)| w * c)
            .sum()
    }

    fn slope_inside(&self, t: f64) -> f64 {
        let (first, u) = self.locate(t);
        let v = 1.0 - u;
        let weights = [
            -v * v / 2.0,
            3.0f64.mul_add(u * u, -4.0 * u) / 2.0,
            (-3.0f64).mul_add(u * u, 2.0 * u + 1.0) / 2.0,
            u * u / 2.0,
        ];
        let sum: f64 = weights
            .iter()
            .zip(&self.coefficients[first..first + 4])
            .map(|(w, c)| w * c)
            .sum();
        sum / self.spacing()
    }
}

impl Curve for BSplineCurve {
    fn evaluate(&self, t: f64) -> f64 {
        if self.end <= self.start {
            return self.coefficients.first().copied().unwrap_or(0.0);
        }
        if t < self.start {
            let slope = self.slope_inside(self.start);
            return slope.mul_add(t - self.start, self.value_inside(self.start));
        }
        if t > self.end {
            let slope = self.slope_inside(self.end);
            return slope.mul_add(t - self.end, self.value_inside(self.end));
        }
        self.value_inside(t)
    }
}

#[allow(clippy::cast_precision_loss)]
const fn usize_to_f64(v: usize) -> f64 {
    v as f64
}
