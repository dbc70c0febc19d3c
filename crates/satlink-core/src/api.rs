//! Backend wire types and the backend port

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geo::Viewport;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("Transport failure: {0}")]
    Transport(String),
    #[error("Backend returned HTTP {0}")]
    Status(u16),
    #[error("Failed to decode response: {0}")]
    Decode(String),
}

/// Body of `POST /api/chat`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

/// Response of `POST /api/chat`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub text: String,
    /// Serialized GeoJSON document, when the query produced geometry
    #[serde(default)]
    pub geojson: Option<String>,
}

impl ChatResponse {
    /// The GeoJSON payload, ignoring blank strings
    pub fn overlay_payload(&self) -> Option<&str> {
        self.geojson.as_deref().filter(|p| !p.trim().is_empty())
    }
}

/// Body of `POST /api/scan`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRequest {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
    /// Integral tile zoom level
    pub zoom: u8,
}

impl ScanRequest {
    /// Snapshot the visible region
    pub fn from_viewport(viewport: &Viewport) -> Self {
        Self {
            west: viewport.bounds.west,
            south: viewport.bounds.south,
            east: viewport.bounds.east,
            north: viewport.bounds.north,
            zoom: viewport.zoom.round().clamp(0.0, u8::MAX as f64) as u8,
        }
    }
}

/// Response of `POST /api/scan`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanResponse {
    #[serde(default)]
    pub text: Option<String>,
}

/// The intelligence backend
///
/// Implementations must report non-success HTTP statuses as
/// [`ApiError::Status`] rather than trying to decode the body.
#[allow(async_fn_in_trait)]
pub trait Backend {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ApiError>;
    async fn scan(&self, request: &ScanRequest) -> Result<ScanResponse, ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{Bounds, LatLng};

    #[test]
    fn test_chat_response_tolerates_missing_fields() {
        let resp: ChatResponse = serde_json::from_str(r#"{"text":"Nothing","geojson":null}"#).unwrap();
        assert_eq!(resp.text, "Nothing");
        assert_eq!(resp.overlay_payload(), None);

        let resp: ChatResponse = serde_json::from_str(r#"{"geojson":"  "}"#).unwrap();
        assert_eq!(resp.text, "");
        assert_eq!(resp.overlay_payload(), None);
    }

    #[test]
    fn test_scan_request_from_viewport() {
        let viewport = Viewport {
            center: LatLng::new(45.46, 9.19),
            zoom: 13.4,
            bounds: Bounds::new(9.1, 45.4, 9.3, 45.5),
        };
        let request = ScanRequest::from_viewport(&viewport);
        assert_eq!(request.zoom, 13);

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"west": 9.1, "south": 45.4, "east": 9.3, "north": 45.5, "zoom": 13})
        );
    }
}
