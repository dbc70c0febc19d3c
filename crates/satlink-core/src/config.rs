//! Console configuration
//!
//! Every section has defaults matching the stock console page, so an empty
//! document (or no document at all) yields a working setup.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::info;

use crate::geo::LatLng;
use crate::overlay::{MarkerStyle, PathStyle};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse console configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid console configuration: {0}")]
    Invalid(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsoleConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub map: MapConfig,
    #[serde(default)]
    pub overlay: OverlayConfig,
    #[serde(default)]
    pub popup: PopupConfig,
    #[serde(default)]
    pub messages: MessagesConfig,
    #[serde(default)]
    pub timing: TimingConfig,
}

impl ConsoleConfig {
    /// Parse configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: ConsoleConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.backend.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("backend.base_url is empty".to_string()));
        }
        if self.timing.invalidate_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "timing.invalidate_interval_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Where the intelligence backend lives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL (e.g., "http://localhost:8000")
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_chat_path")]
    pub chat_path: String,
    #[serde(default = "default_scan_path")]
    pub scan_path: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            chat_path: default_chat_path(),
            scan_path: default_scan_path(),
        }
    }
}

impl BackendConfig {
    /// Config pointing at another backend address, keeping the endpoint paths
    ///
    /// Accepts a full URL or a bare `host:port`.
    pub fn with_address(addr: &str) -> Self {
        let base_url = if addr.starts_with("http://") || addr.starts_with("https://") {
            addr.to_string()
        } else {
            format!("http://{}", addr)
        };
        Self {
            base_url,
            ..Self::default()
        }
    }

    pub fn chat_url(&self) -> String {
        join_url(&self.base_url, &self.chat_path)
    }

    pub fn scan_url(&self) -> String {
        join_url(&self.base_url, &self.scan_path)
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_chat_path() -> String {
    "/api/chat".to_string()
}

fn default_scan_path() -> String {
    "/api/scan".to_string()
}

/// Map widget setup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapConfig {
    #[serde(default = "default_center_lat")]
    pub center_lat: f64,
    #[serde(default = "default_center_lng")]
    pub center_lng: f64,
    #[serde(default = "default_zoom")]
    pub zoom: f64,
    #[serde(default = "default_true")]
    pub dragging: bool,
    #[serde(default = "default_true")]
    pub scroll_wheel_zoom: bool,
    #[serde(default = "default_true")]
    pub inertia: bool,
    #[serde(default = "default_true")]
    pub world_copy_jump: bool,
    /// Leaflet's legacy tap handler; off because it breaks touch dragging
    #[serde(default)]
    pub tap: bool,
    /// Screen corner for the zoom control
    #[serde(default = "default_zoom_position")]
    pub zoom_control_position: String,
    #[serde(default = "default_imagery_layer")]
    pub imagery: TileLayerConfig,
    #[serde(default = "default_label_layer")]
    pub labels: TileLayerConfig,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            center_lat: default_center_lat(),
            center_lng: default_center_lng(),
            zoom: default_zoom(),
            dragging: true,
            scroll_wheel_zoom: true,
            inertia: true,
            world_copy_jump: true,
            tap: false,
            zoom_control_position: default_zoom_position(),
            imagery: default_imagery_layer(),
            labels: default_label_layer(),
        }
    }
}

impl MapConfig {
    /// Where the map opens
    pub fn initial_center(&self) -> LatLng {
        LatLng::new(self.center_lat, self.center_lng)
    }
}

fn default_center_lat() -> f64 {
    45.4642
}

fn default_center_lng() -> f64 {
    9.1900
}

fn default_zoom() -> f64 {
    13.0
}

fn default_true() -> bool {
    true
}

fn default_zoom_position() -> String {
    "bottomright".to_string()
}

/// One tile source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileLayerConfig {
    /// URL template with `{z}`, `{x}`, `{y}` (and optionally `{s}`, `{r}`)
    pub url: String,
    #[serde(default = "default_max_zoom")]
    pub max_zoom: u8,
    #[serde(default)]
    pub subdomains: Option<String>,
    #[serde(default)]
    pub opacity: Option<f64>,
}

fn default_max_zoom() -> u8 {
    19
}

fn default_imagery_layer() -> TileLayerConfig {
    TileLayerConfig {
        url: "https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/{z}/{y}/{x}".to_string(),
        max_zoom: default_max_zoom(),
        subdomains: None,
        opacity: None,
    }
}

fn default_label_layer() -> TileLayerConfig {
    TileLayerConfig {
        url: "https://{s}.basemaps.cartocdn.com/light_only_labels/{z}/{x}/{y}{r}.png".to_string(),
        max_zoom: default_max_zoom(),
        subdomains: Some("abcd".to_string()),
        opacity: Some(0.6),
    }
}

/// Overlay styling and viewport fitting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayConfig {
    #[serde(default)]
    pub style: PathStyle,
    #[serde(default)]
    pub marker: MarkerStyle,
    /// Pixel padding (x, y) applied when fitting the map to new data
    #[serde(default = "default_fit_padding")]
    pub fit_padding: [u32; 2],
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            style: PathStyle::default(),
            marker: MarkerStyle::default(),
            fit_padding: default_fit_padding(),
        }
    }
}

fn default_fit_padding() -> [u32; 2] {
    [100, 100]
}

/// Feature popup layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopupConfig {
    #[serde(default = "default_popup_title")]
    pub title: String,
    #[serde(default = "default_popup_max_width")]
    pub max_width: u32,
    #[serde(default = "default_popup_min_width")]
    pub min_width: u32,
    #[serde(default = "default_popup_class")]
    pub class_name: String,
    /// Property keys never shown in popups
    #[serde(default = "default_excluded_fields")]
    pub excluded_fields: Vec<String>,
}

impl Default for PopupConfig {
    fn default() -> Self {
        Self {
            title: default_popup_title(),
            max_width: default_popup_max_width(),
            min_width: default_popup_min_width(),
            class_name: default_popup_class(),
            excluded_fields: default_excluded_fields(),
        }
    }
}

impl PopupConfig {
    pub fn is_excluded(&self, key: &str) -> bool {
        self.excluded_fields.iter().any(|f| f == key)
    }
}

fn default_popup_title() -> String {
    "TARGET DATA".to_string()
}

fn default_popup_max_width() -> u32 {
    320
}

fn default_popup_min_width() -> u32 {
    220
}

fn default_popup_class() -> String {
    "military-popup-container".to_string()
}

fn default_excluded_fields() -> Vec<String> {
    vec!["id".to_string(), "geom".to_string()]
}

/// Fixed transcript texts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagesConfig {
    #[serde(default = "default_scan_started")]
    pub scan_started: String,
    #[serde(default = "default_scan_empty")]
    pub scan_empty: String,
    #[serde(default = "default_chat_error")]
    pub chat_error: String,
    #[serde(default = "default_scan_error")]
    pub scan_error: String,
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            scan_started: default_scan_started(),
            scan_empty: default_scan_empty(),
            chat_error: default_chat_error(),
            scan_error: default_scan_error(),
        }
    }
}

fn default_scan_started() -> String {
    "STARTING OPTIC SCANNING...".to_string()
}

fn default_scan_empty() -> String {
    "Scan complete. No threats detected.".to_string()
}

fn default_chat_error() -> String {
    "ERR_SIGNAL_LOST: Unable to reach central command.".to_string()
}

fn default_scan_error() -> String {
    "SCAN_ERROR: Sensors offline.".to_string()
}

/// Page timers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Period of the map layout invalidation
    #[serde(default = "default_invalidate_interval")]
    pub invalidate_interval_ms: u32,
    /// Delay before the page loader starts fading
    #[serde(default = "default_loader_delay")]
    pub loader_delay_ms: u32,
    /// Fade duration before the page loader is removed
    #[serde(default = "default_loader_fade")]
    pub loader_fade_ms: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            invalidate_interval_ms: default_invalidate_interval(),
            loader_delay_ms: default_loader_delay(),
            loader_fade_ms: default_loader_fade(),
        }
    }
}

fn default_invalidate_interval() -> u32 {
    2000
}

fn default_loader_delay() -> u32 {
    1500
}

fn default_loader_fade() -> u32 {
    600
}

/// Load configuration from file, falling back to defaults when it is missing
pub fn load_config(path: &Path) -> Result<ConsoleConfig> {
    if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config = ConsoleConfig::from_toml(&content)
            .with_context(|| format!("Failed to load {}", path.display()))?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Ok(ConsoleConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_match_stock_page() {
        let config = ConsoleConfig::default();
        assert_eq!(config.backend.chat_url(), "http://localhost:8000/api/chat");
        assert_eq!(config.backend.scan_url(), "http://localhost:8000/api/scan");
        assert_eq!(config.map.zoom, 13.0);
        assert_eq!(config.map.initial_center(), LatLng::new(45.4642, 9.19));
        assert_eq!(config.map.zoom_control_position, "bottomright");
        assert_eq!(config.map.labels.opacity, Some(0.6));
        assert_eq!(config.overlay.fit_padding, [100, 100]);
        assert!(config.popup.is_excluded("id"));
        assert!(!config.popup.is_excluded("label"));
        assert_eq!(config.timing.invalidate_interval_ms, 2000);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let toml = r#"
[backend]
base_url = "http://10.0.0.5:9000/"

[popup]
excluded_fields = ["id", "uuid"]
"#;
        let config = ConsoleConfig::from_toml(toml).unwrap();
        assert_eq!(config.backend.chat_url(), "http://10.0.0.5:9000/api/chat");
        assert!(config.popup.is_excluded("uuid"));
        assert!(!config.popup.is_excluded("geom"));
        assert_eq!(config.popup.title, "TARGET DATA");
        assert_eq!(config.map, MapConfig::default());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = ConsoleConfig::from_toml("[backend]\nbase_url = \"\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = ConsoleConfig::from_toml("[timing]\ninvalidate_interval_ms = \"soon\"\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_with_address() {
        assert_eq!(
            BackendConfig::with_address("192.168.1.20:8000").scan_url(),
            "http://192.168.1.20:8000/api/scan"
        );
        assert_eq!(
            BackendConfig::with_address("https://intel.example.com").chat_url(),
            "https://intel.example.com/api/chat"
        );
    }

    #[test]
    fn test_load_config_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("satlink.toml");

        // Missing file falls back to defaults
        let config = load_config(&path).unwrap();
        assert_eq!(config, ConsoleConfig::default());

        std::fs::write(&path, "[messages]\nscan_error = \"SENSORS DOWN\"\n").unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.messages.scan_error, "SENSORS DOWN");
        assert_eq!(config.messages.chat_error, MessagesConfig::default().chat_error);
    }
}
