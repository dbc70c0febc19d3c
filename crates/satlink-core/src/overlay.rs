//! Overlay construction and the single live overlay slot
//!
//! A backend payload is turned into an [`Overlay`]: styled shapes grouped by
//! feature, each feature optionally carrying a popup. The [`OverlayRenderer`]
//! keeps at most one overlay attached to the map at any time.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cell::RefCell;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{OverlayConfig, PopupConfig};
use crate::geo::{Bounds, LatLng};
use crate::geojson::{GeoJson, GeoJsonError, Geometry, Position};
use crate::markup::Markup;
use crate::ports::MapSurface;

#[derive(Error, Debug)]
pub enum OverlayError {
    #[error(transparent)]
    GeoJson(#[from] GeoJsonError),
    #[error("Malformed geometry in feature {feature}: {reason}")]
    MalformedGeometry { feature: usize, reason: String },
    #[error("Map rejected overlay: {0}")]
    Attach(String),
}

/// Stroke and fill for lines and polygons
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathStyle {
    pub color: String,
    pub weight: f64,
    pub opacity: f64,
    pub fill_color: String,
    pub fill_opacity: f64,
}

impl Default for PathStyle {
    fn default() -> Self {
        Self {
            color: "#f59e0b".to_string(), // amber
            weight: 2.0,
            opacity: 0.8,
            fill_color: "#f59e0b".to_string(),
            fill_opacity: 0.1,
        }
    }
}

/// Circle marker used for point features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerStyle {
    /// Radius in screen pixels, constant across zoom levels
    pub radius: f64,
    pub color: String,
    pub weight: f64,
    pub opacity: f64,
    pub fill_color: String,
    pub fill_opacity: f64,
    pub interactive: bool,
}

impl Default for MarkerStyle {
    fn default() -> Self {
        Self {
            radius: 8.0,
            color: "#f59e0b".to_string(),
            weight: 2.0,
            opacity: 1.0,
            fill_color: "#000".to_string(),
            fill_opacity: 0.9,
            interactive: true,
        }
    }
}

/// A drawable map primitive
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    CircleMarker { center: LatLng, style: MarkerStyle },
    Polyline { path: Vec<LatLng>, style: PathStyle },
    /// First ring is the outline, the rest are holes
    Polygon { rings: Vec<Vec<LatLng>>, style: PathStyle },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PopupRow {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PopupOptions {
    pub max_width: u32,
    pub min_width: u32,
    pub class_name: String,
}

/// Property popup attached to a feature
#[derive(Debug, Clone, PartialEq)]
pub struct Popup {
    /// Rows shown, after the presentation filter
    pub rows: Vec<PopupRow>,
    pub html: Markup,
    pub options: PopupOptions,
}

impl Popup {
    /// Build the popup for a feature's properties
    ///
    /// Keys on the exclusion list and null or empty-string values are not
    /// displayed. Returns `None` for an empty property map.
    pub fn from_properties(properties: &Map<String, Value>, config: &PopupConfig) -> Option<Self> {
        if properties.is_empty() {
            return None;
        }

        let rows: Vec<PopupRow> = properties
            .iter()
            .filter(|(key, _)| !config.is_excluded(key))
            .filter_map(|(key, value)| {
                display_value(value).map(|value| PopupRow {
                    label: key.clone(),
                    value,
                })
            })
            .collect();

        let mut html = Markup::trusted(format!(
            r#"<div class="popup-header"><span>{}</span></div>"#,
            Markup::escape(&config.title)
        ));
        html.push_static(r#"<div class="popup-body">"#);
        for row in &rows {
            html.push_static(r#"<div class="data-row"><span class="data-label">"#);
            html.push(&Markup::escape(&row.label));
            html.push_static(r#"</span><span class="data-value">"#);
            html.push(&Markup::escape(&row.value));
            html.push_static("</span></div>");
        }
        html.push_static("</div>");

        Some(Self {
            rows,
            html,
            options: PopupOptions {
                max_width: config.max_width,
                min_width: config.min_width,
                class_name: config.class_name.clone(),
            },
        })
    }

    pub fn row(&self, label: &str) -> Option<&str> {
        self.rows
            .iter()
            .find(|r| r.label == label)
            .map(|r| r.value.as_str())
    }
}

/// Text shown for a property value, `None` when it should be hidden
fn display_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(_) | Value::Object(_) => Some(value.to_string()),
    }
}

/// Shapes and popup derived from one feature
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayFeature {
    pub shapes: Vec<Shape>,
    pub popup: Option<Popup>,
}

/// Everything drawn for one backend payload
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    pub features: Vec<OverlayFeature>,
    pub bounds: Bounds,
}

impl Overlay {
    /// Build an overlay from a parsed document
    pub fn from_geojson(
        doc: GeoJson,
        overlay: &OverlayConfig,
        popup: &PopupConfig,
    ) -> Result<Self, OverlayError> {
        let mut features = Vec::new();
        let mut bounds = Bounds::empty();

        for (index, feature) in doc.into_features().into_iter().enumerate() {
            let mut shapes = Vec::new();
            if let Some(geometry) = &feature.geometry {
                push_shapes(geometry, overlay, &mut shapes).map_err(|reason| {
                    OverlayError::MalformedGeometry {
                        feature: index,
                        reason,
                    }
                })?;
                let mut feature_bounds = Bounds::empty();
                for position in geometry.positions() {
                    feature_bounds.extend(position.into());
                }
                bounds.union(&feature_bounds);
            }

            let popup = feature
                .properties
                .as_ref()
                .and_then(|props| Popup::from_properties(props, popup));

            features.push(OverlayFeature { shapes, popup });
        }

        Ok(Self { features, bounds })
    }

    /// Parse and build in one step
    pub fn parse(
        payload: &str,
        overlay: &OverlayConfig,
        popup: &PopupConfig,
    ) -> Result<Self, OverlayError> {
        Self::from_geojson(GeoJson::parse(payload)?, overlay, popup)
    }

    pub fn shape_count(&self) -> usize {
        self.features.iter().map(|f| f.shapes.len()).sum()
    }

    pub fn popups(&self) -> impl Iterator<Item = &Popup> {
        self.features.iter().filter_map(|f| f.popup.as_ref())
    }
}

fn to_latlng(position: &Position) -> Result<LatLng, String> {
    if !(-90.0..=90.0).contains(&position.lat) {
        return Err(format!("latitude {} out of range", position.lat));
    }
    Ok(LatLng::new(position.lat, position.lng))
}

fn to_path(positions: &[Position], min_len: usize, what: &str) -> Result<Vec<LatLng>, String> {
    if positions.len() < min_len {
        return Err(format!(
            "{} needs at least {} positions, got {}",
            what,
            min_len,
            positions.len()
        ));
    }
    positions.iter().map(to_latlng).collect()
}

fn to_rings(rings: &[Vec<Position>]) -> Result<Vec<Vec<LatLng>>, String> {
    if rings.is_empty() {
        return Err("polygon has no rings".to_string());
    }
    rings.iter().map(|ring| to_path(ring, 3, "polygon ring")).collect()
}

fn push_shapes(
    geometry: &Geometry,
    config: &OverlayConfig,
    out: &mut Vec<Shape>,
) -> Result<(), String> {
    match geometry {
        Geometry::Point { coordinates } => out.push(Shape::CircleMarker {
            center: to_latlng(coordinates)?,
            style: config.marker.clone(),
        }),
        Geometry::MultiPoint { coordinates } => {
            for point in coordinates {
                out.push(Shape::CircleMarker {
                    center: to_latlng(point)?,
                    style: config.marker.clone(),
                });
            }
        }
        Geometry::LineString { coordinates } => out.push(Shape::Polyline {
            path: to_path(coordinates, 2, "line")?,
            style: config.style.clone(),
        }),
        Geometry::MultiLineString { coordinates } => {
            for line in coordinates {
                out.push(Shape::Polyline {
                    path: to_path(line, 2, "line")?,
                    style: config.style.clone(),
                });
            }
        }
        Geometry::Polygon { coordinates } => out.push(Shape::Polygon {
            rings: to_rings(coordinates)?,
            style: config.style.clone(),
        }),
        Geometry::MultiPolygon { coordinates } => {
            for polygon in coordinates {
                out.push(Shape::Polygon {
                    rings: to_rings(polygon)?,
                    style: config.style.clone(),
                });
            }
        }
        Geometry::GeometryCollection { geometries } => {
            for inner in geometries {
                push_shapes(inner, config, out)?;
            }
        }
    }
    Ok(())
}

/// Result of a successful draw
#[derive(Debug, Clone, PartialEq)]
pub struct DrawOutcome {
    pub features: usize,
    pub shapes: usize,
    /// Bounds the viewport was fitted to, if any
    pub fitted: Option<Bounds>,
}

/// Owner of the single live overlay on a map
pub struct OverlayRenderer<L> {
    overlay: OverlayConfig,
    popup: PopupConfig,
    live: RefCell<Option<L>>,
}

impl<L> OverlayRenderer<L> {
    pub fn new(overlay: OverlayConfig, popup: PopupConfig) -> Self {
        Self {
            overlay,
            popup,
            live: RefCell::new(None),
        }
    }

    pub fn is_live(&self) -> bool {
        self.live.borrow().is_some()
    }

    /// Remove the live overlay, if any
    pub fn clear<M: MapSurface<Layer = L>>(&self, map: &M) {
        let previous = self.live.borrow_mut().take();
        if let Some(layer) = previous {
            map.detach(layer);
            debug!("Removed previous overlay");
        }
    }

    /// Replace the live overlay with one built from `payload`
    ///
    /// The previous overlay is always released first. Nothing is attached
    /// unless the whole payload builds, so a failure leaves the map with no
    /// overlay rather than a partial one.
    pub fn draw<M: MapSurface<Layer = L>>(
        &self,
        map: &M,
        payload: &str,
    ) -> Result<DrawOutcome, OverlayError> {
        self.clear(map);

        let overlay = Overlay::parse(payload, &self.overlay, &self.popup)?;
        info!(
            features = overlay.features.len(),
            shapes = overlay.shape_count(),
            "SAT-LINK: Rendering tactical data"
        );

        let layer = map.attach(&overlay)?;
        *self.live.borrow_mut() = Some(layer);

        let fitted = if overlay.bounds.is_valid() {
            map.fit_bounds(overlay.bounds, self.overlay.fit_padding);
            Some(overlay.bounds)
        } else {
            debug!("Overlay has no valid bounds, viewport left unchanged");
            None
        };

        Ok(DrawOutcome {
            features: overlay.features.len(),
            shapes: overlay.shape_count(),
            fitted,
        })
    }
}
