//! SVG export serializer.
//!
//! Renders the layers of an unordered fit (input points, boundary
//! polygon, reference line, resampled curve) into one SVG document using
//! the [`svg`] crate for document construction, XML escaping, and path
//! data formatting.
//!
//! World coordinates are y-up; the document is y-down, so every layer is
//! mapped through the same flip before emission. Strokes use
//! `vector-effect="non-scaling-stroke"` so line widths stay in screen
//! pixels regardless of the lane's extent.
//!
//! Optional [`SvgMetadata`] embeds `<title>` and `<desc>` elements for
//! accessibility and to help file managers identify exported files.
//!
//! This is a pure function with no I/O -- it returns a `String`.

use svg::Document;
use svg::node::element::path::Data;
use svg::node::element::{Circle, Description, Element, Group, Path, Title};
use svg::node::{Node, Text, Value};

use lanefit_pipeline::{BoundaryPolygon, FitResult, Point, Point3D, Polyline, ReferenceLine};

/// Rendered size of the longer document side, in pixels.
const DOCUMENT_SIZE_PX: f64 = 1000.0;
/// Margin around the drawing as a fraction of the longer extent.
const MARGIN_FRACTION: f64 = 0.05;
/// Smallest margin in world units, for near-degenerate extents.
const MIN_MARGIN: f64 = 1.0;

const BOUNDARY_COLOR: &str = "#888888";
const REFERENCE_COLOR: &str = "#d62728";
const CURVE_COLOR: &str = "#1f77b4";
const POINT_COLOR: &str = "#444444";

/// Metadata to embed in the SVG document.
///
/// All fields are optional. When present, a `<title>` and/or `<desc>`
/// element is emitted immediately after the opening `<svg>` tag.
///
/// Text values are XML-escaped automatically by the `svg` crate.
#[derive(Debug, Clone, Default)]
pub struct SvgMetadata<'a> {
    /// Document title, emitted as `<title>`.
    ///
    /// Typically the source point-file name.
    pub title: Option<&'a str>,

    /// Document description, emitted as `<desc>`.
    pub description: Option<&'a str>,

    /// Serialized `FitConfig`, emitted inside a `<metadata>` element
    /// wrapped in a namespaced `<lanefit:config>` element.
    pub config_json: Option<&'a str>,
}

/// The geometry to draw. Absent layers are skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct SvgLayers<'a> {
    /// Input cloud, drawn as dots (plan view, `z` ignored).
    pub points: &'a [Point3D],

    /// Concave outline, drawn as a closed grey path.
    pub boundary: Option<&'a BoundaryPolygon>,

    /// Reference line, drawn in red.
    pub reference_line: Option<&'a ReferenceLine>,

    /// Resampled curve, drawn in blue.
    pub curve: Option<&'a FitResult>,
}

impl SvgLayers<'_> {
    fn all_points(&self) -> impl Iterator<Item = Point> + '_ {
        let cloud = self.points.iter().map(|p| p.xy);
        let boundary = self
            .boundary
            .into_iter()
            .flat_map(|b| b.vertices().iter().copied());
        let reference = self
            .reference_line
            .into_iter()
            .flat_map(|r| r.stations().iter().map(|s| s.point));
        let curve = self.curve.into_iter().flat_map(|c| c.points().map(|p| p.xy));
        cloud.chain(boundary).chain(reference).chain(curve)
    }
}

/// World-to-document mapping: translate to the margin box and flip y.
#[derive(Debug, Clone, Copy)]
struct Frame {
    min_x: f64,
    max_y: f64,
    margin: f64,
    width: f64,
    height: f64,
}

impl Frame {
    fn enclosing(points: impl Iterator<Item = Point>) -> Self {
        let mut min = Point::new(f64::INFINITY, f64::INFINITY);
        let mut max = Point::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
        for p in points.filter(|p| p.x.is_finite() && p.y.is_finite()) {
            min = Point::new(min.x.min(p.x), min.y.min(p.y));
            max = Point::new(max.x.max(p.x), max.y.max(p.y));
        }
        if min.x > max.x {
            min = Point::new(0.0, 0.0);
            max = min;
        }
        let extent = (max.x - min.x).max(max.y - min.y);
        let margin = (extent * MARGIN_FRACTION).max(MIN_MARGIN);
        Self {
            min_x: min.x,
            max_y: max.y,
            margin,
            width: 2.0f64.mul_add(margin, max.x - min.x),
            height: 2.0f64.mul_add(margin, max.y - min.y),
        }
    }

    fn map(&self, p: Point) -> (f64, f64) {
        (p.x - self.min_x + self.margin, self.max_y - p.y + self.margin)
    }

    /// Pixel size with the longer side at [`DOCUMENT_SIZE_PX`].
    fn pixel_size(&self) -> (f64, f64) {
        if self.width >= self.height {
            (DOCUMENT_SIZE_PX, DOCUMENT_SIZE_PX * self.height / self.width)
        } else {
            (DOCUMENT_SIZE_PX * self.width / self.height, DOCUMENT_SIZE_PX)
        }
    }
}

/// Build an SVG path `d` attribute string from a polyline.
///
/// Uses `M` for the first point and `L` for subsequent points.
/// Returns an empty string for polylines with fewer than 2 points.
///
/// Coordinates are emitted as given; no axis flip is applied.
///
/// # Examples
///
/// ```
/// use lanefit_pipeline::{Point, Polyline};
/// use lanefit_export::build_path_data;
///
/// let polyline = Polyline::new(vec![
///     Point::new(10.0, 20.0),
///     Point::new(30.0, 40.0),
/// ]);
/// let d = build_path_data(&polyline);
/// assert_eq!(d, "M10,20 L30,40");
/// ```
#[must_use]
pub fn build_path_data(polyline: &Polyline) -> String {
    path_data(polyline.points(), |p| (p.x, p.y), false)
        .map(|data| String::from(Value::from(data)))
        .unwrap_or_default()
}

fn path_data(points: &[Point], map: impl Fn(Point) -> (f64, f64), close: bool) -> Option<Data> {
    let (first, rest) = points.split_first()?;
    if rest.is_empty() {
        return None;
    }
    let mut data = Data::new().move_to(map(*first));
    for p in rest {
        data = data.line_to(map(*p));
    }
    Some(if close { data.close() } else { data })
}

fn stroked_path(data: Data, color: &str, width: f64, id: &str) -> Path {
    Path::new()
        .set("id", id)
        .set("d", data)
        .set("fill", "none")
        .set("stroke", color)
        .set("stroke-width", width)
        .set("vector-effect", "non-scaling-stroke")
}

/// Serialize the given layers into an SVG document string.
///
/// Layers are drawn back to front: points, boundary, reference line,
/// curve. The `viewBox` encloses every drawn coordinate plus a margin.
///
/// # Examples
///
/// ```
/// use lanefit_pipeline::FitResult;
/// use lanefit_export::{SvgLayers, SvgMetadata, to_svg};
///
/// let curve = FitResult {
///     x: vec![0.0, 10.0],
///     y: vec![0.0, 0.0],
///     z: vec![0.0, 0.0],
/// };
/// let layers = SvgLayers {
///     curve: Some(&curve),
///     ..SvgLayers::default()
/// };
/// let metadata = SvgMetadata {
///     title: Some("lane-12"),
///     ..SvgMetadata::default()
/// };
/// let svg = to_svg(&layers, &metadata);
/// assert!(svg.contains("<title>lane-12</title>"));
/// assert!(svg.contains(r#"id="curve""#));
/// ```
#[must_use]
pub fn to_svg(layers: &SvgLayers<'_>, metadata: &SvgMetadata<'_>) -> String {
    let frame = Frame::enclosing(layers.all_points());
    let (width_px, height_px) = frame.pixel_size();
    let map = |p: Point| frame.map(p);

    let mut doc = Document::new()
        .set("width", width_px)
        .set("height", height_px)
        .set("viewBox", (0.0, 0.0, frame.width, frame.height))
        .set("preserveAspectRatio", "xMidYMid meet");

    if let Some(title) = metadata.title {
        doc = doc.add(Title::new(title));
    }

    if let Some(description) = metadata.description {
        doc = doc.add(Description::new().add(Text::new(description)));
    }

    if let Some(config_json) = metadata.config_json {
        let mut config_el = Element::new("lanefit:config");
        config_el.assign("xmlns:lanefit", "https://lanefit.dev/ns/1");
        config_el.append(Text::new(config_json));
        let mut metadata_el = Element::new("metadata");
        metadata_el.append(config_el);
        doc = doc.add(metadata_el);
    }

    if !layers.points.is_empty() {
        // Dot radius in world units, a fixed share of the drawing.
        let radius = frame.width.max(frame.height) / 400.0;
        let mut group = Group::new().set("id", "points").set("fill", POINT_COLOR);
        for p in layers.points {
            let (cx, cy) = map(p.xy);
            group = group.add(Circle::new().set("cx", cx).set("cy", cy).set("r", radius));
        }
        doc = doc.add(group);
    }

    if let Some(data) = layers
        .boundary
        .and_then(|b| path_data(b.open_vertices(), map, true))
    {
        doc = doc.add(stroked_path(data, BOUNDARY_COLOR, 1.0, "boundary"));
    }

    if let Some(data) = layers
        .reference_line
        .and_then(|r| path_data(r.to_polyline().points(), map, false))
    {
        doc = doc.add(stroked_path(data, REFERENCE_COLOR, 1.5, "reference-line"));
    }

    if let Some(data) = layers
        .curve
        .and_then(|c| path_data(c.to_polyline().points(), map, false))
    {
        doc = doc.add(stroked_path(data, CURVE_COLOR, 2.0, "curve"));
    }

    // The svg crate omits the XML declaration, so we prepend it.
    format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{doc}\n")
}
