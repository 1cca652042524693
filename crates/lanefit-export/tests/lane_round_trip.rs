//! Integration test: parse a point file, fit it on every path, and export
//! the results in each format.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::fmt::Write;

use lanefit_export::{
    GeoJsonMetadata, SvgLayers, SvgMetadata, XyzMetadata, parse_xyz, to_boundary_dump,
    to_geojson_value, to_svg, to_xyz,
};
use lanefit_pipeline::{
    BoundaryPolygon, FitConfig, FitMode, FixedOutline, PenalizedSpline, Point, RecordingSink,
    fit_ordered, fit_unordered_with,
};

/// Three rows of points along a 100-unit lane, written out of order.
fn lane_file() -> String {
    let mut text = String::from("# synthetic lane\n");
    for i in 0..99 {
        let x = f64::from((i * 37) % 99 + 1);
        for y in [-1.5, 0.0, 1.5] {
            let _ = writeln!(text, "{x} {y} {}", 0.1 * x);
        }
    }
    text
}

/// Lane outline with pointed ends at (100, 0) and (0, 0).
fn pointed_lane() -> BoundaryPolygon {
    let mut ring = Vec::new();
    for i in 0..=90 {
        ring.push(Point::new(5.0 + f64::from(i), -2.0));
    }
    ring.push(Point::new(100.0, 0.0));
    for i in 0..=90 {
        ring.push(Point::new(95.0 - f64::from(i), 2.0));
    }
    ring.push(Point::new(0.0, 0.0));
    BoundaryPolygon::new(ring)
}

fn columns(points: &[lanefit_pipeline::Point3D]) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    (
        points.iter().map(|p| p.xy.x).collect(),
        points.iter().map(|p| p.xy.y).collect(),
        points.iter().map(|p| p.z).collect(),
    )
}

#[test]
fn fixed_axis_fit_exports_to_xyz() {
    let mut points = parse_xyz(&lane_file()).unwrap();
    assert_eq!(points.len(), 297);
    points.sort_by(|a, b| a.xy.x.total_cmp(&b.xy.x));
    let (x, y, z) = columns(&points);

    let curve = fit_ordered(&x, &y, &z, FitMode::FixedAxis, &FitConfig::default()).unwrap();
    // x spans [1, 99] at density 1.
    assert_eq!(curve.len(), 99);

    let config_json = serde_json::to_string(&FitConfig::default()).unwrap();
    let text = to_xyz(
        &curve,
        &XyzMetadata {
            title: Some("synthetic"),
            config_json: Some(&config_json),
        },
    );
    let reparsed = parse_xyz(&text).unwrap();
    assert_eq!(reparsed.len(), curve.len());
    for (p, q) in reparsed.iter().zip(curve.points()) {
        assert!((p.xy.x - q.xy.x).abs() < 1e-6);
        assert!((p.z - q.z).abs() < 1e-6);
        assert!(p.xy.y.abs() < 1e-3, "y={}", p.xy.y);
    }
}

#[test]
fn unordered_fit_exports_to_every_format() {
    let points = parse_xyz(&lane_file()).unwrap();
    let (x, y, z) = columns(&points);

    let mut sink = RecordingSink::default();
    let result = fit_unordered_with(
        &x,
        &y,
        &z,
        &FitConfig::default(),
        &FixedOutline(pointed_lane()),
        &PenalizedSpline::default(),
        &mut sink,
    )
    .expect("unordered fit should succeed");

    assert_eq!(result.projected.len(), points.len());
    assert!(result.curve.len() > 90);

    // Travel starts at the (100, 0) tip: z falls along the curve.
    let first = result.curve.points().next().unwrap();
    let last = result.curve.points().last().unwrap();
    assert!(first.z > last.z);

    let dump = to_boundary_dump(&sink.boundary);
    assert_eq!(dump.lines().count(), sink.boundary.len());
    assert_eq!(sink.boundary.len(), pointed_lane().open_vertices().len());

    let geojson = to_geojson_value(&result.curve, &GeoJsonMetadata::default());
    assert_eq!(
        geojson["geometry"]["coordinates"].as_array().unwrap().len(),
        result.curve.len()
    );

    let svg = to_svg(
        &SvgLayers {
            points: &points,
            boundary: Some(&result.boundary),
            reference_line: Some(&result.reference_line),
            curve: Some(&result.curve),
        },
        &SvgMetadata {
            title: Some("synthetic"),
            ..SvgMetadata::default()
        },
    );
    assert!(svg.contains("id=\"boundary\""));
    assert!(svg.contains("id=\"reference-line\""));
    assert!(svg.contains("id=\"curve\""));
    assert_eq!(svg.matches("<circle").count(), points.len());
}
