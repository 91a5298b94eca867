// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Geometry layer built from the geometry feed.
//!
//! Each feed row carries a GeoJSON-like payload in its `geometry` column. The
//! payload may be a `FeatureCollection`, a single `Feature`, a bare geometry
//! object or just a coordinate array; [`parse_geometry_payload`] normalises all
//! four into a list of [`GeometryFeature`]s. Geometry is never subject to the
//! spatial filter.

use log::{info, warn};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::feed::GeometryRow;
use crate::geo::GeoPoint;

/// Errors that can occur while parsing a geometry payload.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("geometry payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported geometry type: {0}")]
    UnsupportedType(String),

    #[error("invalid coordinates for {kind}")]
    InvalidCoordinates { kind: &'static str },

    #[error("payload is neither a feature, a geometry nor a coordinate array")]
    Unrecognised,
}

/// A typed geometry. Positions are stored as [`GeoPoint`]s; GeoJSON's
/// `[longitude, latitude]` order is resolved while parsing.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(GeoPoint),
    MultiPoint(Vec<GeoPoint>),
    LineString(Vec<GeoPoint>),
    MultiLineString(Vec<Vec<GeoPoint>>),
    Polygon(Vec<Vec<GeoPoint>>),
    MultiPolygon(Vec<Vec<Vec<GeoPoint>>>),
}

impl Geometry {
    /// GeoJSON type name.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Geometry::Point(_) => "Point",
            Geometry::MultiPoint(_) => "MultiPoint",
            Geometry::LineString(_) => "LineString",
            Geometry::MultiLineString(_) => "MultiLineString",
            Geometry::Polygon(_) => "Polygon",
            Geometry::MultiPolygon(_) => "MultiPolygon",
        }
    }

    /// Parse `coordinates` as geometry of type `kind`.
    pub fn from_coordinates(kind: &str, coordinates: &Value) -> Result<Self, GeometryError> {
        let geometry = match kind {
            "Point" => position(coordinates).map(Geometry::Point),
            "MultiPoint" => positions(coordinates).map(Geometry::MultiPoint),
            "LineString" => positions(coordinates).map(Geometry::LineString),
            "MultiLineString" => rings(coordinates).map(Geometry::MultiLineString),
            "Polygon" => rings(coordinates).map(Geometry::Polygon),
            "MultiPolygon" => polygons(coordinates).map(Geometry::MultiPolygon),
            other => return Err(GeometryError::UnsupportedType(other.to_string())),
        };
        geometry.ok_or(GeometryError::InvalidCoordinates {
            kind: static_kind(kind),
        })
    }

    fn from_object(object: &Map<String, Value>) -> Result<Self, GeometryError> {
        let kind = object
            .get("type")
            .and_then(Value::as_str)
            .ok_or(GeometryError::Unrecognised)?;
        let coordinates = object.get("coordinates").unwrap_or(&Value::Null);
        Self::from_coordinates(kind, coordinates)
    }
}

fn static_kind(kind: &str) -> &'static str {
    match kind {
        "Point" => "Point",
        "MultiPoint" => "MultiPoint",
        "LineString" => "LineString",
        "MultiLineString" => "MultiLineString",
        "Polygon" => "Polygon",
        _ => "MultiPolygon",
    }
}

fn position(value: &Value) -> Option<GeoPoint> {
    let coords = value.as_array()?;
    let longitude = coords.first()?.as_f64()?;
    let latitude = coords.get(1)?.as_f64()?;
    GeoPoint::checked(latitude, longitude)
}

fn positions(value: &Value) -> Option<Vec<GeoPoint>> {
    value.as_array()?.iter().map(position).collect()
}

fn rings(value: &Value) -> Option<Vec<Vec<GeoPoint>>> {
    value.as_array()?.iter().map(positions).collect()
}

fn polygons(value: &Value) -> Option<Vec<Vec<Vec<GeoPoint>>>> {
    value.as_array()?.iter().map(rings).collect()
}

/// Infer the geometry kind of a bare coordinate array from the nesting depth
/// of its first element.
fn infer_kind(coordinates: &[Value]) -> &'static str {
    let depth1 = coordinates.first();
    if depth1.is_some_and(Value::is_number) {
        return "Point";
    }
    let depth2 = depth1.and_then(Value::as_array).and_then(|a| a.first());
    if depth2.is_some_and(Value::is_number) {
        return "LineString";
    }
    let depth3 = depth2.and_then(Value::as_array).and_then(|a| a.first());
    if depth3.is_some_and(Value::is_number) {
        return "Polygon";
    }
    "MultiPolygon"
}

/// A geometry with display properties.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryFeature {
    pub geometry: Geometry,
    pub properties: Map<String, Value>,
}

impl GeometryFeature {
    #[must_use]
    pub fn new(geometry: Geometry) -> Self {
        Self {
            geometry,
            properties: Map::new(),
        }
    }

    fn from_object(object: &Map<String, Value>) -> Result<Option<Self>, GeometryError> {
        let geometry = match object.get("geometry") {
            Some(Value::Object(geometry)) => Geometry::from_object(geometry)?,
            // GeoJSON allows features without geometry; there is nothing to draw.
            _ => return Ok(None),
        };
        let properties = match object.get("properties") {
            Some(Value::Object(properties)) => properties.clone(),
            _ => Map::new(),
        };
        Ok(Some(Self {
            geometry,
            properties,
        }))
    }

    /// Replace the feature's properties with the display name and description.
    pub fn stamp(&mut self, name: &str, description: &str) {
        self.properties = Map::new();
        self.properties.insert("name".to_string(), Value::from(name));
        self.properties.insert("description".to_string(), Value::from(description));
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.property("name")
    }

    #[must_use]
    pub fn description(&self) -> &str {
        self.property("description")
    }

    fn property(&self, key: &str) -> &str {
        self.properties.get(key).and_then(Value::as_str).unwrap_or_default()
    }
}

/// Normalise a serialized geometry payload into a list of features.
pub fn parse_geometry_payload(raw: &str) -> Result<Vec<GeometryFeature>, GeometryError> {
    let value: Value = serde_json::from_str(raw)?;
    normalise(&value)
}

fn normalise(value: &Value) -> Result<Vec<GeometryFeature>, GeometryError> {
    match value {
        Value::Object(object) => match object.get("type").and_then(Value::as_str) {
            Some("FeatureCollection") => {
                let features = object
                    .get("features")
                    .and_then(Value::as_array)
                    .ok_or(GeometryError::Unrecognised)?;
                let mut parsed = Vec::with_capacity(features.len());
                for feature in features {
                    let object = feature.as_object().ok_or(GeometryError::Unrecognised)?;
                    parsed.extend(GeometryFeature::from_object(object)?);
                }
                Ok(parsed)
            }
            Some("Feature") => Ok(GeometryFeature::from_object(object)?.into_iter().collect()),
            Some(_) => Ok(vec![GeometryFeature::new(Geometry::from_object(object)?)]),
            None => Err(GeometryError::Unrecognised),
        },
        Value::Array(coordinates) if !coordinates.is_empty() => {
            let kind = infer_kind(coordinates);
            Ok(vec![GeometryFeature::new(Geometry::from_coordinates(kind, value)?)])
        }
        _ => Err(GeometryError::Unrecognised),
    }
}

/// Summary of a geometry feed load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GeometryLoadReport {
    pub features: usize,
    pub excluded_rows: usize,
    pub invalid_rows: usize,
}

/// Polygon/line features drawn beneath the points.
#[derive(Debug, Default)]
pub struct GeometryLayer {
    features: Vec<GeometryFeature>,
    hovered: Option<usize>,
    selected: Option<usize>,
    generation: u64,
}

impl GeometryLayer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all features with those of the included rows.
    ///
    /// Rows whose `include` column is not `y` are skipped; rows with an
    /// unreadable payload are skipped with a warning.
    pub fn load(&mut self, rows: &[GeometryRow]) -> GeometryLoadReport {
        let mut features = Vec::new();
        let mut report = GeometryLoadReport::default();

        for row in rows {
            if row.include != "y" {
                report.excluded_rows += 1;
                continue;
            }
            match parse_geometry_payload(&row.geometry) {
                Ok(parsed) => {
                    for mut feature in parsed {
                        feature.stamp(&row.name, &row.description);
                        features.push(feature);
                    }
                }
                Err(e) => {
                    warn!("Skipping geometry row '{}': {}", row.name, e);
                    report.invalid_rows += 1;
                }
            }
        }

        report.features = features.len();
        self.features = features;
        self.hovered = None;
        self.selected = None;
        self.generation += 1;

        info!(
            "Loaded {} geometry features ({} rows excluded, {} invalid)",
            report.features, report.excluded_rows, report.invalid_rows
        );
        report
    }

    /// Incremented on every load.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn features(&self) -> &[GeometryFeature] {
        &self.features
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&GeometryFeature> {
        self.features.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn set_hovered(&mut self, index: Option<usize>) {
        self.hovered = index.filter(|i| *i < self.features.len());
    }

    #[must_use]
    pub fn hovered(&self) -> Option<usize> {
        self.hovered
    }

    pub fn set_selected(&mut self, index: Option<usize>) {
        self.selected = index.filter(|i| *i < self.features.len());
    }

    #[must_use]
    pub fn selected(&self) -> Option<usize> {
        self.selected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(include: &str, name: &str, geometry: &str) -> GeometryRow {
        GeometryRow {
            include: include.to_string(),
            name: name.to_string(),
            description: format!("{name} description"),
            geometry: geometry.to_string(),
        }
    }

    #[test]
    fn test_feature_collection_returns_all_features() {
        let raw = r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","properties":{"k":1},"geometry":{"type":"Point","coordinates":[-0.1,51.5]}},
            {"type":"Feature","geometry":{"type":"LineString","coordinates":[[0,0],[1,1]]}}
        ]}"#;
        let features = parse_geometry_payload(raw).unwrap();
        assert_eq!(features.len(), 2);
        assert_eq!(features[0].geometry, Geometry::Point(GeoPoint::new(51.5, -0.1)));
        assert_eq!(features[0].properties.get("k"), Some(&Value::from(1)));
        assert_eq!(features[1].geometry.kind(), "LineString");
    }

    #[test]
    fn test_single_feature_is_singleton() {
        let raw = r#"{"type":"Feature","geometry":{"type":"Polygon","coordinates":[[[0,0],[1,0],[1,1],[0,0]]]}}"#;
        let features = parse_geometry_payload(raw).unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].geometry.kind(), "Polygon");
    }

    #[test]
    fn test_bare_geometry_is_wrapped() {
        let raw = r#"{"type":"MultiPoint","coordinates":[[0,0],[2,1]]}"#;
        let features = parse_geometry_payload(raw).unwrap();
        assert_eq!(
            features[0].geometry,
            Geometry::MultiPoint(vec![GeoPoint::new(0.0, 0.0), GeoPoint::new(1.0, 2.0)])
        );
        assert!(features[0].properties.is_empty());
    }

    #[test]
    fn test_bare_coordinates_infer_kind_from_depth() {
        let cases = [
            ("[-0.1, 51.5]", "Point"),
            ("[[0,0],[1,1]]", "LineString"),
            ("[[[0,0],[1,0],[1,1],[0,0]]]", "Polygon"),
            ("[[[[0,0],[1,0],[1,1],[0,0]]]]", "MultiPolygon"),
        ];
        for (raw, kind) in cases {
            let features = parse_geometry_payload(raw).unwrap();
            assert_eq!(features.len(), 1, "{raw}");
            assert_eq!(features[0].geometry.kind(), kind, "{raw}");
        }
    }

    #[test]
    fn test_invalid_payloads() {
        assert!(matches!(parse_geometry_payload("not json"), Err(GeometryError::Json(_))));
        assert!(matches!(parse_geometry_payload("{}"), Err(GeometryError::Unrecognised)));
        assert!(matches!(parse_geometry_payload("[]"), Err(GeometryError::Unrecognised)));
        assert!(matches!(
            parse_geometry_payload(r#"{"type":"Circle","coordinates":[0,0]}"#),
            Err(GeometryError::UnsupportedType(_))
        ));
        assert!(matches!(
            parse_geometry_payload(r#"{"type":"Point","coordinates":["a","b"]}"#),
            Err(GeometryError::InvalidCoordinates { kind: "Point" })
        ));
    }

    #[test]
    fn test_layer_skips_excluded_and_invalid_rows() {
        let rows = vec![
            row("y", "Park", "[[[0,0],[1,0],[1,1],[0,0]]]"),
            row("n", "Hidden", "[0,0]"),
            row("", "Blank include", "[0,0]"),
            row("y", "Broken", "{oops"),
            row("y", "Route", r#"{"type":"FeatureCollection","features":[
                {"type":"Feature","geometry":{"type":"LineString","coordinates":[[0,0],[1,1]]}},
                {"type":"Feature","geometry":{"type":"Point","coordinates":[1,1]}}
            ]}"#),
        ];
        let mut layer = GeometryLayer::new();
        let report = layer.load(&rows);

        assert_eq!(
            report,
            GeometryLoadReport {
                features: 3,
                excluded_rows: 2,
                invalid_rows: 1
            }
        );
        assert_eq!(layer.features()[0].name(), "Park");
        assert_eq!(layer.features()[2].name(), "Route");
        assert_eq!(layer.features()[2].description(), "Route description");
    }

    #[test]
    fn test_stamp_replaces_payload_properties() {
        let raw = r#"{"type":"Feature","properties":{"name":"old","extra":true},"geometry":{"type":"Point","coordinates":[0,0]}}"#;
        let mut layer = GeometryLayer::new();
        layer.load(&[GeometryRow {
            include: "y".to_string(),
            name: "new".to_string(),
            description: "desc".to_string(),
            geometry: raw.to_string(),
        }]);
        let feature = &layer.features()[0];
        assert_eq!(feature.name(), "new");
        assert!(!feature.properties.contains_key("extra"));
    }

    #[test]
    fn test_reload_resets_hover_and_selection() {
        let mut layer = GeometryLayer::new();
        layer.load(&[row("y", "A", "[0,0]")]);
        layer.set_hovered(Some(0));
        layer.set_selected(Some(0));
        layer.set_selected(Some(5));
        assert_eq!(layer.selected(), None);

        layer.set_selected(Some(0));
        assert_eq!(layer.generation(), 1);
        layer.load(&[row("y", "B", "[1,1]")]);
        assert_eq!(layer.hovered(), None);
        assert_eq!(layer.selected(), None);
        assert_eq!(layer.generation(), 2);
    }
}
