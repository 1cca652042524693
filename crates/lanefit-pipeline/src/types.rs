//! Shared types for the lanefit curve fitting pipeline.

use serde::{Deserialize, Serialize};

/// A 2D point in the ground plane (typically UTM metres).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Easting.
    pub x: f64,
    /// Northing.
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point.
    ///
    /// Avoids the square root for comparison purposes.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.mul_add(dx, dy * dy)
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        self.distance_squared(other).sqrt()
    }
}

/// A ground point with elevation.
///
/// Elevation is payload only: boundary and projection geometry look at
/// [`xy`](Self::xy) and carry `z` through to the fit untouched.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point3D {
    /// Planar position.
    pub xy: Point,
    /// Elevation.
    pub z: f64,
}

impl Point3D {
    /// Create a new 3D point.
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            xy: Point::new(x, y),
            z,
        }
    }
}

/// A sequence of connected points forming an open path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polyline(Vec<Point>);

impl Polyline {
    /// Create a new polyline from a vector of points.
    #[must_use]
    pub const fn new(points: Vec<Point>) -> Self {
        Self(points)
    }

    /// Returns `true` if the polyline has no points.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of points in the polyline.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns the first point, if any.
    #[must_use]
    pub fn first(&self) -> Option<&Point> {
        self.0.first()
    }

    /// Returns the last point, if any.
    #[must_use]
    pub fn last(&self) -> Option<&Point> {
        self.0.last()
    }

    /// Returns a slice of all points.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.0
    }

    /// Consumes the polyline and returns the underlying vector of points.
    #[must_use]
    pub fn into_points(self) -> Vec<Point> {
        self.0
    }
}

/// Ordered outline of a point set, logically closed.
///
/// The winding direction is whatever the outline oracle produced. The
/// closing vertex may or may not repeat the first one; consumers go
/// through [`open_vertices`](Self::open_vertices) to get the ring without
/// the duplicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundaryPolygon(Vec<Point>);

impl BoundaryPolygon {
    /// Create a boundary from its vertices in ring order.
    #[must_use]
    pub const fn new(vertices: Vec<Point>) -> Self {
        Self(vertices)
    }

    /// Number of stored vertices, including a repeated closing vertex.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the boundary has no vertices.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// All stored vertices.
    #[must_use]
    pub fn vertices(&self) -> &[Point] {
        &self.0
    }

    /// The ring without a repeated closing vertex.
    #[must_use]
    pub fn open_vertices(&self) -> &[Point] {
        match (self.0.first(), self.0.last()) {
            (Some(first), Some(last)) if self.0.len() > 1 && first == last => {
                &self.0[..self.0.len() - 1]
            }
            _ => &self.0,
        }
    }
}

/// A boundary vertex annotated by the reference-line extractor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundaryVertex {
    /// Vertex position.
    pub point: Point,
    /// Signed turning angle at this vertex, in degrees.
    pub turning_angle: f64,
    /// Largest absolute windowed turning sum (mod 360) starting here, in degrees.
    pub max_delta: f64,
}

/// A reference-line vertex with its arc-length coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Station {
    /// Vertex position.
    pub point: Point,
    /// Cumulative arc length from the start of the line.
    pub s: f64,
}

/// The discovered travel axis through an unordered point cloud.
///
/// Stations are ordered with non-decreasing `s` starting at 0. After
/// simplification the stored `s` values still measure the unsimplified
/// boundary arc, so the gap between two stations can exceed their
/// straight-line distance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceLine(Vec<Station>);

impl ReferenceLine {
    /// Wrap stations that already carry their arc-length coordinate.
    #[must_use]
    pub const fn new(stations: Vec<Station>) -> Self {
        Self(stations)
    }

    /// Build a reference line from points, assigning cumulative
    /// Euclidean arc length with `s[0] = 0`.
    #[must_use]
    pub fn from_points(points: &[Point]) -> Self {
        let mut s = 0.0;
        let mut prev: Option<Point> = None;
        let stations = points
            .iter()
            .map(|&point| {
                if let Some(p) = prev {
                    s += p.distance(point);
                }
                prev = Some(point);
                Station { point, s }
            })
            .collect();
        Self(stations)
    }

    /// Number of stations.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the line has no stations.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// All stations in order.
    #[must_use]
    pub fn stations(&self) -> &[Station] {
        &self.0
    }

    /// Arc-length coordinate of the last station (0 when empty).
    #[must_use]
    pub fn length(&self) -> f64 {
        self.0.last().map_or(0.0, |st| st.s)
    }

    /// The station positions as a plain polyline.
    #[must_use]
    pub fn to_polyline(&self) -> Polyline {
        Polyline::new(self.0.iter().map(|st| st.point).collect())
    }
}

/// An input point with the arc-length coordinate of its nearest
/// reference-line position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectedPoint {
    /// The original point.
    pub point: Point3D,
    /// Arc-length coordinate; may fall outside `[0, line length]`.
    pub s: f64,
}

/// Resampled curve as three equal-length coordinate sequences in
/// increasing parametric order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    /// Resampled x coordinates.
    pub x: Vec<f64>,
    /// Resampled y coordinates.
    pub y: Vec<f64>,
    /// Resampled z coordinates.
    pub z: Vec<f64>,
}

impl FitResult {
    /// Number of resampled points.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.x.len()
    }

    /// Returns `true` if no points were produced.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Iterate the resampled points.
    pub fn points(&self) -> impl Iterator<Item = Point3D> + '_ {
        self.x
            .iter()
            .zip(&self.y)
            .zip(&self.z)
            .map(|((&x, &y), &z)| Point3D::new(x, y, z))
    }

    /// The planar projection of the curve.
    #[must_use]
    pub fn to_polyline(&self) -> Polyline {
        Polyline::new(self.points().map(|p| p.xy).collect())
    }
}

/// How the ordered fitting path parameterizes its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FitMode {
    /// Fit x(s), y(s), z(s) against cumulative chord length in input order.
    #[default]
    ChordParametric,
    /// Fit y(x) and z(x) directly against the x coordinate.
    FixedAxis,
}

/// Thresholds for the reference-line extractor.
///
/// Angles are in degrees; lengths share the input's spatial units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceLineConfig {
    /// Sliding window size as a fraction of the boundary vertex count.
    pub window_fraction: f64,
    /// Lower clamp on the sliding window size.
    pub min_window: usize,
    /// Upper clamp on the sliding window size.
    pub max_window: usize,
    /// Windowed turning sum above which a vertex joins a turn cluster.
    pub turn_threshold_deg: f64,
    /// Turning angle a polar point candidate must exceed.
    pub polar_angle_deg: f64,
    /// Polar pairs closer than this fraction of the widest pair are discarded.
    pub separation_fraction: f64,
    /// Douglas-Peucker tolerance applied to the extracted boundary arc.
    pub simplify_tolerance: f64,
}

impl ReferenceLineConfig {
    /// Default [`window_fraction`](Self::window_fraction).
    pub const DEFAULT_WINDOW_FRACTION: f64 = 0.2;
    /// Default [`min_window`](Self::min_window).
    pub const DEFAULT_MIN_WINDOW: usize = 10;
    /// Default [`max_window`](Self::max_window).
    pub const DEFAULT_MAX_WINDOW: usize = 100;
    /// Default [`turn_threshold_deg`](Self::turn_threshold_deg).
    pub const DEFAULT_TURN_THRESHOLD_DEG: f64 = 160.0;
    /// Default [`polar_angle_deg`](Self::polar_angle_deg).
    pub const DEFAULT_POLAR_ANGLE_DEG: f64 = 100.0;
    /// Default [`separation_fraction`](Self::separation_fraction).
    pub const DEFAULT_SEPARATION_FRACTION: f64 = 0.2;
    /// Default [`simplify_tolerance`](Self::simplify_tolerance).
    pub const DEFAULT_SIMPLIFY_TOLERANCE: f64 = 0.3;

    /// Check threshold ranges.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] naming the first field
    /// that is out of range.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !(self.window_fraction.is_finite() && self.window_fraction > 0.0) {
            return Err(PipelineError::InvalidConfig(format!(
                "window_fraction must be positive, got {}",
                self.window_fraction
            )));
        }
        if self.min_window < 2 || self.min_window > self.max_window {
            return Err(PipelineError::InvalidConfig(format!(
                "window bounds must satisfy 2 <= min_window <= max_window, got {}..{}",
                self.min_window, self.max_window
            )));
        }
        if !(0.0..=1.0).contains(&self.separation_fraction) {
            return Err(PipelineError::InvalidConfig(format!(
                "separation_fraction must be within [0, 1], got {}",
                self.separation_fraction
            )));
        }
        if !(self.simplify_tolerance.is_finite() && self.simplify_tolerance >= 0.0) {
            return Err(PipelineError::InvalidConfig(format!(
                "simplify_tolerance must be non-negative, got {}",
                self.simplify_tolerance
            )));
        }
        if !(self.turn_threshold_deg.is_finite() && self.polar_angle_deg.is_finite()) {
            return Err(PipelineError::InvalidConfig(
                "angle thresholds must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ReferenceLineConfig {
    fn default() -> Self {
        Self {
            window_fraction: Self::DEFAULT_WINDOW_FRACTION,
            min_window: Self::DEFAULT_MIN_WINDOW,
            max_window: Self::DEFAULT_MAX_WINDOW,
            turn_threshold_deg: Self::DEFAULT_TURN_THRESHOLD_DEG,
            polar_angle_deg: Self::DEFAULT_POLAR_ANGLE_DEG,
            separation_fraction: Self::DEFAULT_SEPARATION_FRACTION,
            simplify_tolerance: Self::DEFAULT_SIMPLIFY_TOLERANCE,
        }
    }
}

/// Configuration for both fitting paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitConfig {
    /// Smoothing weight λ. Smaller values follow the points more closely.
    pub lambda: f64,

    /// Number of spline basis functions K. Larger values allow more
    /// curvature detail. Must be at least 4.
    pub basis_count: usize,

    /// Target spacing between resampled points.
    pub density: f64,

    /// Concavity passed to the outline oracle (unordered path only).
    pub concavity: f64,

    /// Reference-line extractor thresholds (unordered path only).
    pub reference_line: ReferenceLineConfig,
}

impl FitConfig {
    /// Default [`lambda`](Self::lambda).
    pub const DEFAULT_LAMBDA: f64 = 1e-4;
    /// Default [`basis_count`](Self::basis_count).
    pub const DEFAULT_BASIS_COUNT: usize = 30;
    /// Default [`density`](Self::density).
    pub const DEFAULT_DENSITY: f64 = 1.0;
    /// Default [`concavity`](Self::concavity).
    pub const DEFAULT_CONCAVITY: f64 = 5.0;

    /// Check that every field is within its documented range.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] naming the first field
    /// that is out of range.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !(self.density.is_finite() && self.density > 0.0) {
            return Err(PipelineError::InvalidConfig(format!(
                "density must be positive and finite, got {}",
                self.density
            )));
        }
        if !(self.lambda.is_finite() && self.lambda >= 0.0) {
            return Err(PipelineError::InvalidConfig(format!(
                "lambda must be non-negative and finite, got {}",
                self.lambda
            )));
        }
        if self.basis_count < crate::spline::MIN_BASIS_COUNT {
            return Err(PipelineError::InvalidConfig(format!(
                "basis_count must be at least {}, got {}",
                crate::spline::MIN_BASIS_COUNT,
                self.basis_count
            )));
        }
        if !(self.concavity.is_finite() && self.concavity > 0.0) {
            return Err(PipelineError::InvalidConfig(format!(
                "concavity must be positive and finite, got {}",
                self.concavity
            )));
        }
        self.reference_line.validate()
    }
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            lambda: Self::DEFAULT_LAMBDA,
            basis_count: Self::DEFAULT_BASIS_COUNT,
            density: Self::DEFAULT_DENSITY,
            concavity: Self::DEFAULT_CONCAVITY,
            reference_line: ReferenceLineConfig::default(),
        }
    }
}

/// The pipeline stage a failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    /// Concave outline extraction.
    Outline,
    /// Reference-line discovery.
    ReferenceLine,
    /// Point projection onto the reference line.
    Projection,
    /// Penalized spline fitting.
    Fit,
    /// Uniform resampling of the fitted curve.
    Resample,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Outline => "outline",
            Self::ReferenceLine => "reference line",
            Self::Projection => "projection",
            Self::Fit => "fit",
            Self::Resample => "resample",
        };
        f.write_str(name)
    }
}

/// Errors that can occur during fitting.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PipelineError {
    /// Coordinate arrays are mismatched or too short.
    #[error("invalid input shape: {reason}")]
    InputShape {
        /// What is wrong with the arrays.
        reason: String,
    },

    /// Fit configuration is invalid.
    #[error("invalid fit configuration: {0}")]
    InvalidConfig(String),

    /// The geometry does not support the requested operation.
    #[error("degenerate geometry in {stage} stage: {reason}")]
    DegenerateGeometry {
        /// Stage that rejected the geometry.
        stage: Stage,
        /// The offending measurement.
        reason: String,
    },

    /// Projection produced a different number of points than it received.
    #[error("projection produced {actual} points from {expected} inputs")]
    ProjectionInvariant {
        /// Number of input points.
        expected: usize,
        /// Number of projected points.
        actual: usize,
    },

    /// The penalized spline system could not be solved.
    #[error("spline solve failed: {reason}")]
    SplineSolve {
        /// Why the solve failed.
        reason: String,
    },
}

impl PipelineError {
    pub(crate) fn degenerate(stage: Stage, reason: impl Into<String>) -> Self {
        Self::DegenerateGeometry {
            stage,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    // --- Point tests ---

    #[test]
    fn point_distance_squared() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert!((a.distance_squared(b) - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn point_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert!((a.distance(b) - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn point3d_composes_planar_point() {
        let p = Point3D::new(1.0, 2.0, 3.0);
        assert_eq!(p.xy, Point::new(1.0, 2.0));
        assert!((p.z - 3.0).abs() < f64::EPSILON);
    }

    // --- Polyline tests ---

    #[test]
    fn polyline_empty() {
        let pl = Polyline::new(vec![]);
        assert!(pl.is_empty());
        assert!(pl.first().is_none());
        assert!(pl.last().is_none());
    }

    #[test]
    fn polyline_first_and_last() {
        let pl = Polyline::new(vec![
            Point::new(1.0, 2.0),
            Point::new(3.0, 4.0),
            Point::new(5.0, 6.0),
        ]);
        assert_eq!(pl.first(), Some(&Point::new(1.0, 2.0)));
        assert_eq!(pl.last(), Some(&Point::new(5.0, 6.0)));
    }

    // --- BoundaryPolygon tests ---

    #[test]
    fn open_vertices_drops_repeated_closing_vertex() {
        let boundary = BoundaryPolygon::new(vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, 0.0),
        ]);
        assert_eq!(boundary.len(), 4);
        assert_eq!(boundary.open_vertices().len(), 3);
    }

    #[test]
    fn open_vertices_keeps_unclosed_ring() {
        let boundary = BoundaryPolygon::new(vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
        ]);
        assert_eq!(boundary.open_vertices().len(), 3);
    }

    // --- ReferenceLine tests ---

    #[test]
    fn reference_line_cumulative_arc_length() {
        let line = ReferenceLine::from_points(&[
            Point::new(0.0, 0.0),
            Point::new(3.0, 0.0),
            Point::new(3.0, 4.0),
        ]);
        let s: Vec<f64> = line.stations().iter().map(|st| st.s).collect();
        assert_eq!(s, vec![0.0, 3.0, 7.0]);
        assert!((line.length() - 7.0).abs() < f64::EPSILON);
    }

    // --- FitResult tests ---

    #[test]
    fn fit_result_points_zip_coordinates() {
        let result = FitResult {
            x: vec![0.0, 1.0],
            y: vec![2.0, 3.0],
            z: vec![4.0, 5.0],
        };
        let points: Vec<Point3D> = result.points().collect();
        assert_eq!(
            points,
            vec![Point3D::new(0.0, 2.0, 4.0), Point3D::new(1.0, 3.0, 5.0)]
        );
        assert_eq!(result.to_polyline().len(), 2);
    }

    // --- FitConfig tests ---

    #[test]
    fn fit_config_defaults() {
        let config = FitConfig::default();
        assert!((config.lambda - 1e-4).abs() < f64::EPSILON);
        assert_eq!(config.basis_count, 30);
        assert!((config.density - 1.0).abs() < f64::EPSILON);
        assert_eq!(config.reference_line.min_window, 10);
        assert_eq!(config.reference_line.max_window, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn fit_config_rejects_non_positive_density() {
        let config = FitConfig {
            density: 0.0,
            ..FitConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(PipelineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn fit_config_rejects_small_basis() {
        let config = FitConfig {
            basis_count: 3,
            ..FitConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(PipelineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn reference_line_config_rejects_inverted_window_bounds() {
        let config = ReferenceLineConfig {
            min_window: 50,
            max_window: 20,
            ..ReferenceLineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(PipelineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn fit_config_partial_json_fills_defaults() {
        let config: FitConfig = serde_json::from_str(r#"{"density": 0.5}"#).unwrap();
        assert!((config.density - 0.5).abs() < f64::EPSILON);
        assert_eq!(config.basis_count, FitConfig::DEFAULT_BASIS_COUNT);
    }

    // --- PipelineError tests ---

    #[test]
    fn degenerate_error_names_stage() {
        let err = PipelineError::degenerate(Stage::ReferenceLine, "1 turn cluster (need 2)");
        assert_eq!(
            err.to_string(),
            "degenerate geometry in reference line stage: 1 turn cluster (need 2)",
        );
    }

    #[test]
    fn projection_invariant_display() {
        let err = PipelineError::ProjectionInvariant {
            expected: 5,
            actual: 4,
        };
        assert_eq!(err.to_string(), "projection produced 4 points from 5 inputs");
    }
}
