//! Outline extraction: point set -> ordered boundary polygon.
//!
//! This module defines the [`OutlineOracle`] trait so the reference-line
//! extractor never depends on a particular hull algorithm, and the
//! [`ConcaveOutline`] default backed by `geo`'s concave hull.

use geo::concave_hull::ConcaveHullOptions;
use geo::{ConcaveHull, Coord, MultiPoint};

use crate::types::{BoundaryPolygon, Point};

/// Trait for outline strategies.
///
/// Input: planar points in any order.
/// Output: the ring enclosing them. Degenerate input (fewer than three
/// distinct points, all collinear) may produce fewer than 3 vertices;
/// callers treat that as failure.
pub trait OutlineOracle {
    /// Compute the outline of `points`.
    fn outline(&self, points: &[Point]) -> BoundaryPolygon;
}

/// Concave hull via [`geo::ConcaveHull`].
///
/// `concavity` follows geo's convention: smaller values hug the points
/// more tightly, larger values approach the convex hull. Edges are split
/// regardless of length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConcaveOutline {
    /// Relative concavity of the hull.
    pub concavity: f64,
}

impl ConcaveOutline {
    /// Create an outline oracle with the given concavity.
    #[must_use]
    pub const fn new(concavity: f64) -> Self {
        Self { concavity }
    }
}

impl Default for ConcaveOutline {
    fn default() -> Self {
        Self::new(crate::types::FitConfig::DEFAULT_CONCAVITY)
    }
}

impl OutlineOracle for ConcaveOutline {
    fn outline(&self, points: &[Point]) -> BoundaryPolygon {
        if points.len() < 3 {
            return BoundaryPolygon::new(points.to_vec());
        }

        let multi: MultiPoint<f64> = points
            .iter()
            .map(|p| geo::Point::from(Coord { x: p.x, y: p.y }))
            .collect();
        let hull = multi.concave_hull_with_options(ConcaveHullOptions {
            concavity: self.concavity,
            length_threshold: 0.0,
        });
        let vertices = hull
            .exterior()
            .coords()
            .map(|c| Point::new(c.x, c.y))
            .collect();
        BoundaryPolygon::new(vertices)
    }
}

/// An oracle that returns a fixed boundary regardless of input.
///
/// Useful when the outline is already known (surveyed lane edges) or to
/// drive the extractor with a hand-built polygon.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedOutline(pub BoundaryPolygon);

impl OutlineOracle for FixedOutline {
    fn outline(&self, _points: &[Point]) -> BoundaryPolygon {
        self.0.clone()
    }
}
