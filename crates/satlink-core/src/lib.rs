//! SAT-LINK Core - Map overlay, transcript and request flows
//!
//! This crate holds everything the SAT-LINK console does that does not depend
//! on a browser:
//! - GeoJSON parsing and overlay construction (styled shapes and popups)
//! - The chat transcript and its HTML rendering
//! - Chat and viewport-scan request flows behind injected view/map/backend ports
//! - Console configuration

pub mod api;
pub mod busy;
pub mod config;
pub mod console;
pub mod geo;
pub mod geojson;
pub mod headless;
pub mod markup;
pub mod overlay;
pub mod ports;
pub mod transcript;
pub mod viewport;

pub use api::{ApiError, Backend, ChatRequest, ChatResponse, ScanRequest, ScanResponse};
pub use busy::{BusyGuard, BusyTracker};
pub use config::{load_config, BackendConfig, ConfigError, ConsoleConfig, MapConfig};
pub use console::{Console, FlowOutcome};
pub use geo::{Bounds, LatLng, Viewport};
pub use geojson::{GeoJson, GeoJsonError};
pub use markup::{escape_html, Markup};
pub use overlay::{DrawOutcome, MarkerStyle, Overlay, OverlayError, OverlayRenderer, PathStyle, Popup, Shape};
pub use ports::{BusyView, ConsoleView, HudSlot, HudView, InputSource, MapSurface, TranscriptView};
pub use transcript::{ChatMessage, Sender, Transcript, TranscriptEntry};
pub use viewport::ViewportController;
