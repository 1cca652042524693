//! Whitespace-separated `x y z` text: point-file parsing, resampled
//! curve output, and the boundary dump.
//!
//! Lines beginning with `#` are metadata comments. The parser skips
//! them, along with blank lines and lines carrying fewer than three
//! fields. Fields past the third are ignored.
//!
//! These are pure functions with no I/O -- they take and return
//! strings.

use std::fmt::Write;

use lanefit_pipeline::{BoundaryVertex, FitResult, Point3D};

/// Errors from [`parse_xyz`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// A coordinate field is not a number.
    #[error("line {line}: invalid number {field:?}")]
    InvalidNumber {
        /// One-based line number.
        line: usize,
        /// The offending field.
        field: String,
    },
}

/// Metadata to embed as `#`-prefixed comment lines at the top of the
/// output.
#[derive(Debug, Clone, Default)]
pub struct XyzMetadata<'a> {
    /// Source filename, emitted as `# Source: <title>`.
    pub title: Option<&'a str>,

    /// Full `FitConfig` JSON, emitted as `# Config: <json>`.
    pub config_json: Option<&'a str>,
}

/// Parse a point file.
///
/// Each data line holds at least three whitespace-separated numbers;
/// shorter lines are skipped.
///
/// # Errors
///
/// Returns [`ParseError::InvalidNumber`] naming the first line whose
/// first three fields do not all parse as `f64`.
pub fn parse_xyz(text: &str) -> Result<Vec<Point3D>, ParseError> {
    let mut points = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = trimmed.split_whitespace().take(3).collect();
        let [x, y, z] = fields[..] else {
            continue;
        };
        let parse = |field: &str| {
            field
                .parse::<f64>()
                .map_err(|_| ParseError::InvalidNumber {
                    line: index + 1,
                    field: field.to_owned(),
                })
        };
        points.push(Point3D::new(parse(x)?, parse(y)?, parse(z)?));
    }
    Ok(points)
}

/// Serialize a resampled curve, one `x y z` line per point.
///
/// Coordinates are written with six decimal places.
#[must_use]
pub fn to_xyz(curve: &FitResult, metadata: &XyzMetadata<'_>) -> String {
    let mut out = String::new();
    write_header(&mut out, metadata);
    for p in curve.points() {
        let _ = writeln!(out, "{:.6} {:.6} {:.6}", p.xy.x, p.xy.y, p.z);
    }
    out
}

/// Serialize an annotated boundary, one `x y max_delta` line per
/// vertex.
#[must_use]
pub fn to_boundary_dump(vertices: &[BoundaryVertex]) -> String {
    let mut out = String::new();
    for v in vertices {
        let _ = writeln!(out, "{:.6} {:.6} {:.6}", v.point.x, v.point.y, v.max_delta);
    }
    out
}

fn write_header(out: &mut String, metadata: &XyzMetadata<'_>) {
    if let Some(title) = metadata.title {
        let _ = writeln!(out, "# Source: {title}");
    }
    if let Some(config_json) = metadata.config_json {
        let _ = writeln!(out, "# Config: {config_json}");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use lanefit_pipeline::Point;

    use super::*;

    #[test]
    fn parses_three_columns() {
        let points = parse_xyz("1 2 3\n4.5 -6 7e1\n").unwrap();
        assert_eq!(
            points,
            vec![Point3D::new(1.0, 2.0, 3.0), Point3D::new(4.5, -6.0, 70.0)]
        );
    }

    #[test]
    fn skips_short_blank_and_comment_lines() {
        let text = "# header\n\n1 2\n  3 4 5  \n9\n";
        let points = parse_xyz(text).unwrap();
        assert_eq!(points, vec![Point3D::new(3.0, 4.0, 5.0)]);
    }

    #[test]
    fn ignores_extra_columns_and_tabs() {
        let points = parse_xyz("1\t2\t3\t99 foo\n").unwrap();
        assert_eq!(points, vec![Point3D::new(1.0, 2.0, 3.0)]);
    }

    #[test]
    fn invalid_number_names_the_line() {
        let err = parse_xyz("1 2 3\n4 five 6\n").unwrap_err();
        assert_eq!(
            err,
            ParseError::InvalidNumber {
                line: 2,
                field: "five".to_owned(),
            }
        );
        assert_eq!(err.to_string(), "line 2: invalid number \"five\"");
    }

    #[test]
    fn writes_six_decimals() {
        let curve = FitResult {
            x: vec![0.0, 1.5],
            y: vec![2.0, -3.25],
            z: vec![0.1, 0.0],
        };
        let text = to_xyz(&curve, &XyzMetadata::default());
        assert_eq!(
            text,
            "0.000000 2.000000 0.100000\n1.500000 -3.250000 0.000000\n"
        );
    }

    #[test]
    fn header_lines_are_skipped_on_reparse() {
        let curve = FitResult {
            x: vec![1.0],
            y: vec![2.0],
            z: vec![3.0],
        };
        let metadata = XyzMetadata {
            title: Some("lane 7"),
            config_json: Some(r#"{"lambda":0.0001}"#),
        };
        let text = to_xyz(&curve, &metadata);
        assert!(text.starts_with("# Source: lane 7\n# Config: {"));
        assert_eq!(parse_xyz(&text).unwrap(), vec![Point3D::new(1.0, 2.0, 3.0)]);
    }

    #[test]
    fn boundary_dump_writes_max_delta() {
        let text = to_boundary_dump(&[BoundaryVertex {
            point: Point::new(1.0, 2.0),
            turning_angle: 30.0,
            max_delta: 175.5,
        }]);
        assert_eq!(text, "1.000000 2.000000 175.500000\n");
    }
}
