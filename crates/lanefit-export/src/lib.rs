//! lanefit-export: Pure format serializers (sans-IO)
//!
//! Reads whitespace-separated point files and writes fit results as
//! `x y z` text, GeoJSON, and SVG. Every function takes and returns
//! strings or values; file handling belongs to the caller.

pub mod geojson;
pub mod svg;
pub mod xyz;

pub use geojson::{GeoJsonMetadata, to_geojson, to_geojson_value};
pub use svg::{SvgLayers, SvgMetadata, build_path_data, to_svg};
pub use xyz::{ParseError, XyzMetadata, parse_xyz, to_boundary_dump, to_xyz};
