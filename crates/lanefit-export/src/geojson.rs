//! GeoJSON export: the resampled curve as a `Feature` with a 3D
//! `LineString` geometry.
//!
//! Coordinates are written in the fit's own units; no CRS is declared.

use lanefit_pipeline::FitResult;
use serde_json::{Value, json};

/// Properties to attach to the feature.
#[derive(Debug, Clone, Default)]
pub struct GeoJsonMetadata<'a> {
    /// Emitted as the `name` property.
    pub name: Option<&'a str>,

    /// Emitted verbatim as the `config` property.
    pub config: Option<&'a Value>,
}

/// Build the GeoJSON `Feature` value for a curve.
#[must_use]
pub fn to_geojson_value(curve: &FitResult, metadata: &GeoJsonMetadata<'_>) -> Value {
    let coordinates: Vec<[f64; 3]> = curve.points().map(|p| [p.xy.x, p.xy.y, p.z]).collect();

    let mut properties = serde_json::Map::new();
    if let Some(name) = metadata.name {
        properties.insert("name".to_owned(), json!(name));
    }
    if let Some(config) = metadata.config {
        properties.insert("config".to_owned(), config.clone());
    }
    properties.insert("point_count".to_owned(), json!(curve.len()));

    json!({
        "type": "Feature",
        "geometry": {
            "type": "LineString",
            "coordinates": coordinates,
        },
        "properties": properties,
    })
}

/// Serialize a curve as a GeoJSON `Feature` string.
#[must_use]
pub fn to_geojson(curve: &FitResult, metadata: &GeoJsonMetadata<'_>) -> String {
    to_geojson_value(curve, metadata).to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn curve() -> FitResult {
        FitResult {
            x: vec![0.0, 1.0],
            y: vec![2.0, 3.0],
            z: vec![4.0, 5.0],
        }
    }

    #[test]
    fn feature_has_linestring_geometry() {
        let value = to_geojson_value(&curve(), &GeoJsonMetadata::default());
        assert_eq!(value["type"], "Feature");
        assert_eq!(value["geometry"]["type"], "LineString");
        assert_eq!(
            value["geometry"]["coordinates"],
            json!([[0.0, 2.0, 4.0], [1.0, 3.0, 5.0]])
        );
        assert_eq!(value["properties"]["point_count"], 2);
    }

    #[test]
    fn metadata_becomes_properties() {
        let config = json!({"lambda": 0.001});
        let metadata = GeoJsonMetadata {
            name: Some("lane 3"),
            config: Some(&config),
        };
        let value = to_geojson_value(&curve(), &metadata);
        assert_eq!(value["properties"]["name"], "lane 3");
        assert_eq!(value["properties"]["config"]["lambda"], 0.001);
    }

    #[test]
    fn string_output_parses_back() {
        let text = to_geojson(&curve(), &GeoJsonMetadata::default());
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["geometry"]["coordinates"][1][2], 5.0);
    }

    #[test]
    fn empty_curve_has_no_coordinates() {
        let value = to_geojson_value(&FitResult::default(), &GeoJsonMetadata::default());
        assert_eq!(value["geometry"]["coordinates"], json!([]));
    }
}
