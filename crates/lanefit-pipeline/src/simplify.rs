//! Path simplification using the Ramer-Douglas-Peucker algorithm.
//!
//! Reduces point count by removing points that are within a given
//! tolerance of the chord between the endpoints of their span. Works on
//! any [`Located`] item so reference-line stations keep their arc-length
//! coordinate through simplification.

use crate::geometry::{Located, distance_to_line};
use crate::types::Polyline;

/// Simplify a sequence of located items using Ramer-Douglas-Peucker.
///
/// Items within `tolerance` of the chord between their span's endpoints
/// are removed. The first and last items are always kept, and the output
/// preserves input order. Sequences with fewer than 3 items are returned
/// unchanged.
///
/// Re-applying with the same tolerance returns the input unchanged.
#[must_use = "returns the simplified sequence"]
pub fn simplify_items<T: Located + Clone>(items: &[T], tolerance: f64) -> Vec<T> {
    if items.len() < 3 {
        return items.to_vec();
    }

    let mut kept = vec![false; items.len()];
    kept[0] = true;
    kept[items.len() - 1] = true;

    rdp_recurse(items, 0, items.len() - 1, tolerance, &mut kept);

    items
        .iter()
        .zip(&kept)
        .filter(|&(_, k)| *k)
        .map(|(item, _)| item.clone())
        .collect()
}

/// Simplify a single polyline using the Ramer-Douglas-Peucker algorithm.
#[must_use = "returns the simplified polyline"]
pub fn simplify(polyline: &Polyline, tolerance: f64) -> Polyline {
    Polyline::new(simplify_items(polyline.points(), tolerance))
}

/// Recursive step of the Ramer-Douglas-Peucker algorithm.
///
/// Finds the item between `start` and `end` farthest from the line
/// through them. If that distance exceeds `tolerance`, the item is kept
/// and both sub-spans are processed recursively.
fn rdp_recurse<T: Located>(
    items: &[T],
    start: usize,
    end: usize,
    tolerance: f64,
    kept: &mut [bool],
) {
    if end <= start + 1 {
        return;
    }

    let a = items[start].location();
    let b = items[end].location();
    let mut max_dist = 0.0;
    let mut max_idx = start;

    for (i, item) in items.iter().enumerate().take(end).skip(start + 1) {
        let d = distance_to_line(item.location(), a, b);
        if d > max_dist {
            max_dist = d;
            max_idx = i;
        }
    }

    if max_dist > tolerance {
        kept[max_idx] = true;
        rdp_recurse(items, start, max_idx, tolerance, kept);
        rdp_recurse(items, max_idx, end, tolerance, kept);
    }
}
