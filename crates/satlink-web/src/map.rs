//! Leaflet-backed map surface

use js_sys::Array;
use satlink_core::config::{MapConfig, TileLayerConfig};
use satlink_core::overlay::{Popup, Shape};
use satlink_core::{Bounds, LatLng, MapSurface, MarkerStyle, Overlay, OverlayError, PathStyle, Viewport};
use serde_json::{json, Value};
use tracing::{debug, info};
use wasm_bindgen::JsValue;

use crate::leaflet;

/// The page's single map
pub struct LeafletMap {
    map: leaflet::Map,
}

/// An overlay attached to the map
pub struct LeafletLayer(leaflet::FeatureGroup);

impl LeafletMap {
    /// Create the map in `container_id` with both base layers and the zoom control
    pub fn create(container_id: &str, config: &MapConfig) -> Result<Self, JsValue> {
        let map = leaflet::new_map(container_id, &leaflet::to_js(&map_options(config))?)?;
        map.set_view(&leaflet::latlng(config.initial_center()), config.zoom);

        // Imagery below, semi-transparent labels on top
        for layer in [&config.imagery, &config.labels] {
            leaflet::tile_layer(&layer.url, &leaflet::to_js(&tile_options(layer))?).add_to(&map);
        }

        leaflet::zoom_control(&leaflet::to_js(
            &json!({ "position": config.zoom_control_position }),
        )?)
        .add_to(&map);

        info!(
            lat = config.center_lat,
            lng = config.center_lng,
            zoom = config.zoom,
            "Map initialized"
        );
        Ok(Self { map })
    }

    pub fn inner(&self) -> &leaflet::Map {
        &self.map
    }

    fn shape_layer(shape: &Shape) -> Result<leaflet::Layer, JsValue> {
        match shape {
            Shape::CircleMarker { center, style } => {
                leaflet::circle_marker(&leaflet::latlng(*center), &leaflet::to_js(&marker_options(style))?)
            }
            Shape::Polyline { path, style } => {
                leaflet::polyline(&leaflet::latlngs(path).into(), &leaflet::to_js(&path_options(style))?)
            }
            Shape::Polygon { rings, style } => {
                let rings: Array = rings.iter().map(|ring| leaflet::latlngs(ring)).collect();
                leaflet::polygon(&rings.into(), &leaflet::to_js(&path_options(style))?)
            }
        }
    }
}

impl MapSurface for LeafletMap {
    type Layer = LeafletLayer;

    fn attach(&self, overlay: &Overlay) -> Result<LeafletLayer, OverlayError> {
        let to_err = |e: JsValue| OverlayError::Attach(format!("{:?}", e));

        // Build the whole group before it touches the map
        let group = leaflet::feature_group();
        for feature in &overlay.features {
            let popup_options = match &feature.popup {
                Some(popup) => Some(leaflet::to_js(&popup_options(popup)).map_err(to_err)?),
                None => None,
            };
            for shape in &feature.shapes {
                let layer = Self::shape_layer(shape).map_err(to_err)?;
                if let (Some(popup), Some(options)) = (&feature.popup, &popup_options) {
                    layer.bind_popup(popup.html.as_str(), options);
                }
                group.add_layer(&layer);
            }
        }

        group.add_to(&self.map);
        debug!(shapes = overlay.shape_count(), "Overlay attached");
        Ok(LeafletLayer(group))
    }

    fn detach(&self, layer: LeafletLayer) {
        self.map.remove_layer(&layer.0);
    }

    fn fit_bounds(&self, bounds: Bounds, padding: [u32; 2]) {
        let corners = Array::of2(
            &leaflet::latlng(bounds.south_west()),
            &leaflet::latlng(bounds.north_east()),
        );
        match leaflet::to_js(&json!({ "padding": padding })) {
            Ok(options) => {
                self.map.fit_bounds(&corners.into(), &options);
            }
            Err(e) => tracing::warn!(error = ?e, "Failed to build fitBounds options"),
        }
    }

    fn viewport(&self) -> Viewport {
        let center = self.map.get_center();
        let bounds = self.map.get_bounds();
        Viewport {
            center: LatLng::new(center.lat(), center.lng()),
            zoom: self.map.get_zoom(),
            bounds: Bounds::new(
                bounds.get_west(),
                bounds.get_south(),
                bounds.get_east(),
                bounds.get_north(),
            ),
        }
    }
}

/// `L.map` options; default chrome is replaced by the HUD
fn map_options(config: &MapConfig) -> Value {
    json!({
        "zoomControl": false,
        "attributionControl": false,
        "dragging": config.dragging,
        "scrollWheelZoom": config.scroll_wheel_zoom,
        "tap": config.tap,
        "inertia": config.inertia,
        "worldCopyJump": config.world_copy_jump,
    })
}

fn tile_options(layer: &TileLayerConfig) -> Value {
    let mut options = json!({ "maxZoom": layer.max_zoom });
    if let Some(subdomains) = &layer.subdomains {
        options["subdomains"] = json!(subdomains);
    }
    if let Some(opacity) = layer.opacity {
        options["opacity"] = json!(opacity);
    }
    options
}

fn path_options(style: &PathStyle) -> Value {
    json!({
        "color": style.color,
        "weight": style.weight,
        "opacity": style.opacity,
        "fillColor": style.fill_color,
        "fillOpacity": style.fill_opacity,
    })
}

fn marker_options(style: &MarkerStyle) -> Value {
    json!({
        "radius": style.radius,
        "color": style.color,
        "weight": style.weight,
        "opacity": style.opacity,
        "fillColor": style.fill_color,
        "fillOpacity": style.fill_opacity,
        "interactive": style.interactive,
    })
}

fn popup_options(popup: &Popup) -> Value {
    json!({
        "maxWidth": popup.options.max_width,
        "minWidth": popup.options.min_width,
        "className": popup.options.class_name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use satlink_core::config::{OverlayConfig, PopupConfig};

    #[test]
    fn test_map_options_disable_default_chrome() {
        let options = map_options(&MapConfig::default());
        assert_eq!(options["zoomControl"], json!(false));
        assert_eq!(options["attributionControl"], json!(false));
        assert_eq!(options["tap"], json!(false));
        assert_eq!(options["inertia"], json!(true));
        assert_eq!(options["worldCopyJump"], json!(true));
    }

    #[test]
    fn test_tile_options() {
        let config = MapConfig::default();
        let imagery = tile_options(&config.imagery);
        assert_eq!(imagery, json!({ "maxZoom": 19 }));

        let labels = tile_options(&config.labels);
        assert_eq!(labels["subdomains"], json!("abcd"));
        assert_eq!(labels["opacity"], json!(0.6));
    }

    #[test]
    fn test_style_options_use_leaflet_names() {
        let overlay = OverlayConfig::default();
        let path = path_options(&overlay.style);
        assert_eq!(path["fillColor"], json!("#f59e0b"));
        assert_eq!(path["fillOpacity"], json!(0.1));

        let marker = marker_options(&overlay.marker);
        assert_eq!(marker["radius"], json!(8.0));
        assert_eq!(marker["fillColor"], json!("#000"));
        assert_eq!(marker["interactive"], json!(true));
    }

    #[test]
    fn test_popup_options() {
        let props = serde_json::from_str(r#"{"label":"Tank"}"#).unwrap();
        let popup = Popup::from_properties(&props, &PopupConfig::default()).unwrap();
        assert_eq!(
            popup_options(&popup),
            json!({ "maxWidth": 320, "minWidth": 220, "className": "military-popup-container" })
        );
    }
}
