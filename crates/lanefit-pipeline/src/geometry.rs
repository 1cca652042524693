//! Geometric primitives: vector algebra on [`Point`], turning angles, and
//! point-to-line / point-to-segment distances.
//!
//! The boundary policies of [`distance_to_segment`] drive the ordering
//! produced by projection, so they are pinned by tests below.

use std::ops::{Add, Div, Mul, Sub};

use crate::types::{BoundaryVertex, Point, Point3D, Station};

/// Segments shorter than this are treated as a single point.
pub const DEGENERATE_LENGTH: f64 = 1e-12;

impl Add for Point {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point {
    type Output = Self;

    fn mul(self, factor: f64) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }
}

impl Div<f64> for Point {
    type Output = Self;

    fn div(self, factor: f64) -> Self {
        Self::new(self.x / factor, self.y / factor)
    }
}

impl Point {
    /// Dot product, treating both points as vectors.
    #[must_use]
    pub fn dot(self, other: Self) -> f64 {
        self.x.mul_add(other.x, self.y * other.y)
    }

    /// 2D scalar cross product (z component of the 3D cross product).
    #[must_use]
    pub fn cross(self, other: Self) -> f64 {
        self.x.mul_add(other.y, -(self.y * other.x))
    }

    /// Vector length.
    #[must_use]
    pub fn norm(self) -> f64 {
        self.x.hypot(self.y)
    }
}

/// Anything with a planar position.
///
/// Lets the simplifier and projector run over annotated vertices without
/// stripping their payload first.
pub trait Located {
    /// Planar position.
    fn location(&self) -> Point;
}

impl Located for Point {
    fn location(&self) -> Point {
        *self
    }
}

impl Located for Point3D {
    fn location(&self) -> Point {
        self.xy
    }
}

impl Located for Station {
    fn location(&self) -> Point {
        self.point
    }
}

impl Located for BoundaryVertex {
    fn location(&self) -> Point {
        self.point
    }
}

/// Signed turning angle at `vertex`, in radians within `[-π, π]`.
///
/// Measures the angle between the incoming edge (`front` → `vertex`) and
/// the outgoing edge (`vertex` → `back`). Positive when the path turns
/// counter-clockwise. A zero-length edge yields 0 rather than NaN.
#[must_use]
pub fn turning_angle(front: Point, vertex: Point, back: Point) -> f64 {
    let incoming = vertex - front;
    let outgoing = back - vertex;
    let denom = incoming.norm() * outgoing.norm();
    if denom < DEGENERATE_LENGTH * DEGENERATE_LENGTH {
        return 0.0;
    }
    let sign = if incoming.cross(outgoing) < 0.0 {
        -1.0
    } else {
        1.0
    };
    let cos = (incoming.dot(outgoing) / denom).clamp(-1.0, 1.0);
    sign * cos.acos()
}

/// Unsigned distance from `p` to the infinite line through `a` and `b`.
///
/// Uses |cross(p-a, b-a)| / |b-a|. When `a` and `b` coincide, returns
/// the distance from `p` to `a`.
#[must_use]
pub fn distance_to_line(p: Point, a: Point, b: Point) -> f64 {
    let ab = b - a;
    let length = ab.norm();
    if length < DEGENERATE_LENGTH {
        return p.distance(a);
    }
    ((p - a).cross(ab) / length).abs()
}

/// Distance from a point to a segment, plus the clamped arc offset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentDistance {
    /// Distance to the closest point of the segment.
    pub distance: f64,
    /// Offset along the segment direction measured from its start.
    ///
    /// Negative when the foot of the perpendicular falls before the
    /// start, and larger than the segment length when it falls past the
    /// end.
    pub ds: f64,
}

/// Distance from `p` to the segment `p0`–`p1` with its arc offset.
///
/// - Foot inside the segment: perpendicular distance, `ds` is the
///   projected offset from `p0`.
/// - Foot before `p0`: distance to `p0`, `ds` is the negative signed
///   offset.
/// - Foot past `p1`: distance to `p1`, `ds` is the segment length minus
///   the trailing projection (so it exceeds the segment length).
/// - Degenerate segment: distance to `p0`, `ds = 0`.
#[must_use]
pub fn distance_to_segment(p: Point, p0: Point, p1: Point) -> SegmentDistance {
    let a = p - p0;
    let c = p1 - p;
    let b = p1 - p0;
    let length = b.norm();
    if length < DEGENERATE_LENGTH {
        return SegmentDistance {
            distance: p.distance(p0),
            ds: 0.0,
        };
    }

    let dot_ab = a.dot(b);
    let dot_cb = c.dot(b);
    if dot_ab >= 0.0 && dot_cb >= 0.0 {
        SegmentDistance {
            distance: (a.cross(b) / length).abs(),
            ds: dot_ab / length,
        }
    } else if dot_ab < 0.0 {
        SegmentDistance {
            distance: p.distance(p0),
            ds: dot_ab / length,
        }
    } else {
        SegmentDistance {
            distance: p.distance(p1),
            ds: length - dot_cb / length,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::{FRAC_PI_2, PI};

    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-10
    }

    #[test]
    fn vector_algebra() {
        let a = Point::new(1.0, 2.0);
        let b = Point::new(3.0, -1.0);
        assert_eq!(a + b, Point::new(4.0, 1.0));
        assert_eq!(a - b, Point::new(-2.0, 3.0));
        assert_eq!(a * 2.0, Point::new(2.0, 4.0));
        assert_eq!(b / 2.0, Point::new(1.5, -0.5));
        assert!(approx(a.dot(b), 1.0));
        assert!(approx(a.cross(b), -7.0));
        assert!(approx(Point::new(3.0, 4.0).norm(), 5.0));
    }

    #[test]
    fn turning_angle_left_turn_is_positive() {
        let angle = turning_angle(
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
        );
        assert!(approx(angle, FRAC_PI_2), "got {angle}");
    }

    #[test]
    fn turning_angle_right_turn_is_negative() {
        let angle = turning_angle(
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, -1.0),
        );
        assert!(approx(angle, -FRAC_PI_2), "got {angle}");
    }

    #[test]
    fn turning_angle_straight_is_zero() {
        let angle = turning_angle(
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(2.0, 0.0),
        );
        assert!(approx(angle, 0.0));
    }

    #[test]
    fn turning_angle_reversal_is_pi() {
        let angle = turning_angle(
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(0.0, 0.0),
        );
        assert!(approx(angle.abs(), PI));
    }

    #[test]
    fn turning_angle_degenerate_edge_is_zero() {
        let angle = turning_angle(
            Point::new(1.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(2.0, 3.0),
        );
        assert!(approx(angle, 0.0));
        assert!(!angle.is_nan());
    }

    #[test]
    fn distance_to_line_on_axis() {
        let d = distance_to_line(
            Point::new(1.0, 3.0),
            Point::new(0.0, 0.0),
            Point::new(2.0, 0.0),
        );
        assert!(approx(d, 3.0));
    }

    #[test]
    fn distance_to_line_is_unbounded_past_endpoints() {
        // Point beyond the segment end still measures to the infinite line.
        let d = distance_to_line(
            Point::new(10.0, 2.0),
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
        );
        assert!(approx(d, 2.0));
    }

    #[test]
    fn distance_to_line_coincident_endpoints() {
        let d = distance_to_line(
            Point::new(3.0, 4.0),
            Point::new(0.0, 0.0),
            Point::new(0.0, 0.0),
        );
        assert!(approx(d, 5.0));
    }

    #[test]
    fn segment_foot_inside() {
        let r = distance_to_segment(
            Point::new(2.0, 1.5),
            Point::new(0.0, 0.0),
            Point::new(4.0, 0.0),
        );
        assert!(approx(r.distance, 1.5));
        assert!(approx(r.ds, 2.0));
    }

    #[test]
    fn segment_foot_before_start_gives_negative_offset() {
        let r = distance_to_segment(
            Point::new(-3.0, 4.0),
            Point::new(0.0, 0.0),
            Point::new(4.0, 0.0),
        );
        assert!(approx(r.distance, 5.0));
        assert!(approx(r.ds, -3.0));
    }

    #[test]
    fn segment_foot_past_end_exceeds_length() {
        let r = distance_to_segment(
            Point::new(6.0, 0.0),
            Point::new(0.0, 0.0),
            Point::new(4.0, 0.0),
        );
        assert!(approx(r.distance, 2.0));
        assert!(approx(r.ds, 6.0));
    }

    #[test]
    fn segment_degenerate_measures_to_start() {
        let r = distance_to_segment(
            Point::new(3.0, 4.0),
            Point::new(0.0, 0.0),
            Point::new(0.0, 0.0),
        );
        assert!(approx(r.distance, 5.0));
        assert!(approx(r.ds, 0.0));
    }

    #[test]
    fn located_reads_planar_position() {
        let p = Point3D::new(1.0, 2.0, 9.0);
        assert_eq!(p.location(), Point::new(1.0, 2.0));
        let st = Station {
            point: Point::new(5.0, 6.0),
            s: 1.0,
        };
        assert_eq!(st.location(), Point::new(5.0, 6.0));
    }
}
