//! GeoJSON payload parsing
//!
//! The backend ships query results as a serialized GeoJSON document (usually a
//! FeatureCollection produced by GeoPandas). Only the parts the overlay
//! renderer needs are modelled: geometries, properties and the feature id.

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::geo::LatLng;

#[derive(Error, Debug)]
pub enum GeoJsonError {
    #[error("Invalid GeoJSON payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("GeoJSON object has no type member")]
    MissingType,
    #[error("Unsupported GeoJSON type: {0}")]
    UnknownType(String),
}

/// A single `[lng, lat, (alt)]` position
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(try_from = "Vec<f64>")]
pub struct Position {
    pub lng: f64,
    pub lat: f64,
    pub alt: Option<f64>,
}

impl TryFrom<Vec<f64>> for Position {
    type Error = String;

    fn try_from(ordinates: Vec<f64>) -> Result<Self, Self::Error> {
        match ordinates.as_slice() {
            [lng, lat] => Ok(Self {
                lng: *lng,
                lat: *lat,
                alt: None,
            }),
            [lng, lat, alt, ..] => Ok(Self {
                lng: *lng,
                lat: *lat,
                alt: Some(*alt),
            }),
            _ => Err(format!(
                "position needs at least 2 ordinates, got {}",
                ordinates.len()
            )),
        }
    }
}

impl From<Position> for LatLng {
    fn from(p: Position) -> Self {
        LatLng::new(p.lat, p.lng)
    }
}

/// GeoJSON geometry object
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point {
        coordinates: Position,
    },
    MultiPoint {
        coordinates: Vec<Position>,
    },
    LineString {
        coordinates: Vec<Position>,
    },
    MultiLineString {
        coordinates: Vec<Vec<Position>>,
    },
    Polygon {
        coordinates: Vec<Vec<Position>>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Vec<Position>>>,
    },
    GeometryCollection {
        geometries: Vec<Geometry>,
    },
}

impl Geometry {
    /// Every position in the geometry, in document order
    pub fn positions(&self) -> Vec<Position> {
        let mut out = Vec::new();
        self.collect_positions(&mut out);
        out
    }

    fn collect_positions(&self, out: &mut Vec<Position>) {
        match self {
            Geometry::Point { coordinates } => out.push(*coordinates),
            Geometry::MultiPoint { coordinates } | Geometry::LineString { coordinates } => {
                out.extend_from_slice(coordinates)
            }
            Geometry::MultiLineString { coordinates } | Geometry::Polygon { coordinates } => {
                coordinates.iter().for_each(|ring| out.extend_from_slice(ring))
            }
            Geometry::MultiPolygon { coordinates } => coordinates
                .iter()
                .flatten()
                .for_each(|ring| out.extend_from_slice(ring)),
            Geometry::GeometryCollection { geometries } => {
                geometries.iter().for_each(|g| g.collect_positions(out))
            }
        }
    }
}

/// GeoJSON feature
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Feature {
    /// Null geometries are legal and simply produce nothing on the map
    #[serde(default)]
    pub geometry: Option<Geometry>,
    #[serde(default)]
    pub properties: Option<Map<String, Value>>,
    #[serde(default)]
    pub id: Option<Value>,
}

impl Feature {
    fn bare(geometry: Geometry) -> Self {
        Self {
            geometry: Some(geometry),
            properties: None,
            id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FeatureCollection {
    #[serde(default)]
    pub features: Vec<Feature>,
}

/// Any top-level GeoJSON document
#[derive(Debug, Clone, PartialEq)]
pub enum GeoJson {
    FeatureCollection(FeatureCollection),
    Feature(Feature),
    Geometry(Geometry),
}

impl GeoJson {
    /// Parse a serialized GeoJSON document
    pub fn parse(payload: &str) -> Result<Self, GeoJsonError> {
        let value: Value = serde_json::from_str(payload)?;
        Self::from_value(value)
    }

    /// Convert an already-decoded JSON value
    pub fn from_value(value: Value) -> Result<Self, GeoJsonError> {
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or(GeoJsonError::MissingType)?
            .to_string();

        match kind.as_str() {
            "FeatureCollection" => Ok(Self::FeatureCollection(serde_json::from_value(value)?)),
            "Feature" => Ok(Self::Feature(serde_json::from_value(value)?)),
            "Point" | "MultiPoint" | "LineString" | "MultiLineString" | "Polygon"
            | "MultiPolygon" | "GeometryCollection" => {
                Ok(Self::Geometry(serde_json::from_value(value)?))
            }
            _ => Err(GeoJsonError::UnknownType(kind)),
        }
    }

    /// Flatten the document into its features
    pub fn into_features(self) -> Vec<Feature> {
        match self {
            GeoJson::FeatureCollection(fc) => fc.features,
            GeoJson::Feature(f) => vec![f],
            GeoJson::Geometry(g) => vec![Feature::bare(g)],
        }
    }
}
