//! Reference-line discovery: boundary polygon -> directed travel axis.
//!
//! A lane-shaped outline has two long, nearly straight flanks joined by
//! rounded or pointed ends. Each end is a short stretch of boundary whose
//! turning angles add up to roughly 180°, while the flanks contribute
//! almost nothing. The extractor finds those ends and returns one flank
//! as the reference line.
//!
//! # Algorithm overview
//!
//! 1. **Turning angles:** signed turning angle (degrees) at every vertex
//!    using cyclic neighbors.
//! 2. **Windowed sums:** for each vertex, the largest absolute running
//!    sum (mod 360) of the turning angles of the next `sws - 1` vertices.
//! 3. **Turn clusters:** vertices whose windowed sum exceeds the turn
//!    threshold, grouped into runs with index gaps of at most
//!    `ceil(sws / 2)`. A run that wraps past the last index is merged with
//!    the run at the start of the ring.
//! 4. **Polar points:** per cluster, the sharpest vertex within `sws`
//!    vertices after the cluster midpoint, or a fixed offset when no
//!    vertex is sharp enough.
//! 5. **Endpoints:** the farthest pair of well-separated polar points.
//! 6. **Arc:** the boundary between the endpoints in ascending index
//!    order, stationed by cumulative arc length and simplified.

use std::collections::BTreeSet;

use crate::diagnostics::DiagnosticSink;
use crate::geometry::turning_angle;
use crate::simplify::simplify_items;
use crate::types::{
    BoundaryPolygon, BoundaryVertex, PipelineError, Point, ReferenceLine, ReferenceLineConfig,
    Stage,
};

/// A discovered reference line together with the measurements taken on
/// the way, for logging and diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    /// The simplified, stationed reference line.
    pub reference_line: ReferenceLine,
    /// Intermediate measurements.
    pub report: ExtractionReport,
}

/// Measurements taken while extracting a reference line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionReport {
    /// Boundary vertices after dropping the closing duplicate.
    pub vertex_count: usize,
    /// Sliding window size.
    pub window_size: usize,
    /// Number of turn clusters.
    pub cluster_count: usize,
    /// Whether a cluster straddling index 0 was merged.
    pub wrapped_cluster: bool,
    /// Boundary indices of the distinct polar points, ascending.
    pub polar_indices: Vec<usize>,
    /// Boundary indices of the chosen endpoints, ascending.
    pub endpoints: (usize, usize),
    /// Vertices on the boundary arc before simplification.
    pub arc_vertex_count: usize,
}

/// Discover the reference line of a closed boundary.
///
/// The boundary is copied; the caller's polygon is never annotated.
/// `sink` receives the annotated boundary and the final line.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] when `config` fails
/// [`ReferenceLineConfig::validate`], and
/// [`PipelineError::DegenerateGeometry`] tagged
/// [`Stage::ReferenceLine`] when the boundary has fewer than 3 vertices,
/// fewer than 2 turn clusters or polar points are found, no polar pair
/// survives the separation filter, or the simplified line has fewer than
/// 2 points.
pub fn extract_reference_line(
    boundary: &BoundaryPolygon,
    config: &ReferenceLineConfig,
    sink: &mut dyn DiagnosticSink,
) -> Result<Extraction, PipelineError> {
    config.validate()?;
    let ring = boundary.open_vertices();
    let n = ring.len();
    if n < 3 {
        return Err(PipelineError::degenerate(
            Stage::ReferenceLine,
            format!("boundary has {n} vertices (need at least 3)"),
        ));
    }

    let mut vertices = annotate_turning_angles(ring);
    let sws = window_size(n, config);
    accumulate_window_deltas(&mut vertices, sws);
    sink.boundary(&vertices);

    let selected: Vec<usize> = vertices
        .iter()
        .enumerate()
        .filter(|(_, v)| v.max_delta > config.turn_threshold_deg)
        .map(|(i, _)| i)
        .collect();

    let gap = sws.div_ceil(2);
    let (clusters, wrapped_cluster) = cluster_indices(&selected, gap, n);
    log::debug!(
        "reference line: {n} vertices, window {sws}, {} selected, {} clusters",
        selected.len(),
        clusters.len(),
    );
    if wrapped_cluster {
        log::warn!("reference line: merged a turn cluster straddling boundary index 0");
    }
    if clusters.len() < 2 {
        return Err(PipelineError::degenerate(
            Stage::ReferenceLine,
            format!(
                "{} turn clusters above {}° (need 2) on {n} vertices with window {sws}",
                clusters.len(),
                config.turn_threshold_deg,
            ),
        ));
    }

    let polar_indices: Vec<usize> = clusters
        .iter()
        .map(|cluster| polar_point(&vertices, cluster, sws, config.polar_angle_deg))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    if polar_indices.len() < 2 {
        return Err(PipelineError::degenerate(
            Stage::ReferenceLine,
            format!(
                "{} distinct polar points from {} clusters (need 2)",
                polar_indices.len(),
                clusters.len(),
            ),
        ));
    }

    let (start, end) = select_endpoints(ring, &polar_indices, config.separation_fraction)?;
    log::debug!(
        "reference line: polar points {polar_indices:?}, endpoints ({start}, {end})"
    );

    let arc = &ring[start..=end];
    let stationed = ReferenceLine::from_points(arc);
    let simplified = simplify_items(stationed.stations(), config.simplify_tolerance);
    if simplified.len() < 2 {
        return Err(PipelineError::degenerate(
            Stage::ReferenceLine,
            format!(
                "simplified reference line has {} points (need 2)",
                simplified.len()
            ),
        ));
    }
    let reference_line = ReferenceLine::new(simplified);
    log::debug!(
        "reference line: {} arc vertices -> {} stations, length {:.3}",
        arc.len(),
        reference_line.len(),
        reference_line.length(),
    );
    sink.reference_line(&reference_line);

    Ok(Extraction {
        reference_line,
        report: ExtractionReport {
            vertex_count: n,
            window_size: sws,
            cluster_count: clusters.len(),
            wrapped_cluster,
            polar_indices,
            endpoints: (start, end),
            arc_vertex_count: arc.len(),
        },
    })
}

/// Signed turning angle in degrees at every vertex of a ring.
///
/// Neighbors wrap cyclically. `max_delta` is left at 0.
#[must_use]
pub fn annotate_turning_angles(ring: &[Point]) -> Vec<BoundaryVertex> {
    let n = ring.len();
    ring.iter()
        .enumerate()
        .map(|(i, &point)| {
            let front = ring[(i + n - 1) % n];
            let back = ring[(i + 1) % n];
            BoundaryVertex {
                point,
                turning_angle: turning_angle(front, point, back).to_degrees(),
                max_delta: 0.0,
            }
        })
        .collect()
}

/// Sliding window size: `round(fraction * n)` clamped to the configured
/// bounds.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn window_size(n: usize, config: &ReferenceLineConfig) -> usize {
    let raw = (config.window_fraction * n as f64).round() as usize;
    raw.clamp(config.min_window, config.max_window)
}

/// Fill `max_delta` for every vertex.
///
/// Sums the turning angles of the `sws - 1` vertices following each
/// vertex (cyclically) and records the largest absolute running sum
/// modulo 360.
pub fn accumulate_window_deltas(vertices: &mut [BoundaryVertex], sws: usize) {
    let n = vertices.len();
    if n == 0 {
        return;
    }
    let deltas: Vec<f64> = (0..n)
        .map(|i| {
            let mut sum = 0.0;
            let mut max_delta = 0.0_f64;
            for j in 1..sws {
                sum += vertices[(i + j) % n].turning_angle;
                max_delta = max_delta.max((sum % 360.0).abs());
            }
            max_delta
        })
        .collect();
    for (vertex, delta) in vertices.iter_mut().zip(deltas) {
        vertex.max_delta = delta;
    }
}

/// Group ascending indices into runs whose consecutive members differ by
/// at most `gap`.
///
/// When the first run begins within `gap` of the ring start and the last
/// run ends within `gap` of the ring end (measured across index 0 of a
/// ring of `n` vertices), the two are merged into one cluster listed in
/// cyclic order. Returns the clusters and whether a merge happened.
#[must_use]
pub fn cluster_indices(selected: &[usize], gap: usize, n: usize) -> (Vec<Vec<usize>>, bool) {
    let mut clusters: Vec<Vec<usize>> = Vec::new();
    for &index in selected {
        match clusters.last_mut() {
            Some(run) if run.last().is_some_and(|&prev| index - prev <= gap) => run.push(index),
            _ => clusters.push(vec![index]),
        }
    }

    if clusters.len() >= 2 {
        let head_start = clusters.first().and_then(|c| c.first()).copied();
        let tail_end = clusters.last().and_then(|c| c.last()).copied();
        if let (Some(head_start), Some(tail_end)) = (head_start, tail_end)
            && head_start + n - tail_end <= gap
        {
            let head = clusters.remove(0);
            if let Some(tail) = clusters.last_mut() {
                tail.extend(head);
            }
            return (clusters, true);
        }
    }

    (clusters, false)
}

/// Representative vertex of a turn cluster.
///
/// Scans the `sws - 1` vertices after the cluster midpoint for the one
/// with the largest |turning angle| above `polar_angle_deg`. Falls back
/// to `midpoint + ceil(sws / 2)` when none qualifies.
fn polar_point(
    vertices: &[BoundaryVertex],
    cluster: &[usize],
    sws: usize,
    polar_angle_deg: f64,
) -> usize {
    let n = vertices.len();
    let midpoint = cluster[(cluster.len() - 1) / 2];

    let mut best: Option<(usize, f64)> = None;
    for k in 1..sws {
        let id = (midpoint + k) % n;
        let angle = vertices[id].turning_angle.abs();
        if angle > polar_angle_deg && best.is_none_or(|(_, a)| angle > a) {
            best = Some((id, angle));
        }
    }

    best.map_or_else(
        || {
            let fallback = (midpoint + sws.div_ceil(2)) % n;
            log::warn!(
                "reference line: no vertex above {polar_angle_deg}° after index {midpoint}, \
                 using fallback index {fallback}"
            );
            fallback
        },
        |(id, _)| id,
    )
}

/// Choose the farthest pair of well-separated polar points.
///
/// Any pair closer than `separation_fraction` times the widest pair
/// disqualifies both of its points from every pair. Returns the
/// surviving farthest pair in ascending index order.
fn select_endpoints(
    ring: &[Point],
    polar_indices: &[usize],
    separation_fraction: f64,
) -> Result<(usize, usize), PipelineError> {
    let mut pairs = Vec::new();
    for (i, &a) in polar_indices.iter().enumerate() {
        for &b in &polar_indices[i + 1..] {
            pairs.push((a, b, ring[a].distance(ring[b])));
        }
    }

    let widest = pairs.iter().map(|&(_, _, d)| d).fold(0.0_f64, f64::max);
    let threshold = widest * separation_fraction;
    let disqualified: BTreeSet<usize> = pairs
        .iter()
        .filter(|&&(_, _, d)| d < threshold)
        .flat_map(|&(a, b, _)| [a, b])
        .collect();

    pairs
        .iter()
        .filter(|&&(a, b, d)| d > 0.0 && !disqualified.contains(&a) && !disqualified.contains(&b))
        .max_by(|x, y| x.2.total_cmp(&y.2))
        .map(|&(a, b, _)| (a.min(b), a.max(b)))
        .ok_or_else(|| {
            PipelineError::degenerate(
                Stage::ReferenceLine,
                format!(
                    "no polar pair separated by at least {threshold:.3} among {} polar points ({} disqualified)",
                    polar_indices.len(),
                    disqualified.len(),
                ),
            )
        })
}
