//! Backend access from the browser

use gloo_net::http::Request;
use satlink_core::{
    ApiError, Backend, BackendConfig, ChatRequest, ChatResponse, ScanRequest, ScanResponse,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Backend reached with `fetch`
pub struct GlooBackend {
    chat_url: String,
    scan_url: String,
}

impl GlooBackend {
    pub fn new(config: &BackendConfig) -> Self {
        Self {
            chat_url: config.chat_url(),
            scan_url: config.scan_url(),
        }
    }

    async fn post<Req, Resp>(&self, url: &str, body: &Req) -> Result<Resp, ApiError>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        debug!(url = %url, "POST");
        let response = Request::post(url)
            .json(body)
            .map_err(|e| ApiError::Transport(e.to_string()))?
            .send()
            .await
            .map_err(|e| {
                warn!(url = %url, error = %e, "Backend unreachable");
                ApiError::Transport(e.to_string())
            })?;

        if !response.ok() {
            warn!(url = %url, status = response.status(), "Backend returned error status");
            return Err(ApiError::Status(response.status()));
        }

        response
            .json::<Resp>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}

impl Backend for GlooBackend {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ApiError> {
        self.post(&self.chat_url, request).await
    }

    async fn scan(&self, request: &ScanRequest) -> Result<ScanResponse, ApiError> {
        self.post(&self.scan_url, request).await
    }
}

/// Backend config for this page: `?backend=host:port` overrides the base URL
pub fn backend_from_browser(default: &BackendConfig) -> BackendConfig {
    let search = web_sys::window()
        .and_then(|window| window.location().search().ok())
        .unwrap_or_default();
    backend_from_query(default, &search)
}

fn backend_from_query(default: &BackendConfig, search: &str) -> BackendConfig {
    match parse_query_param(search, "backend") {
        Some(addr) if !addr.is_empty() => {
            info!(backend = %addr, "Using backend from URL parameter");
            BackendConfig {
                base_url: BackendConfig::with_address(&addr).base_url,
                ..default.clone()
            }
        }
        _ => default.clone(),
    }
}

fn parse_query_param(search: &str, param: &str) -> Option<String> {
    let search = search.trim_start_matches('?');
    for pair in search.split('&') {
        let mut parts = pair.splitn(2, '=');
        if let (Some(key), Some(value)) = (parts.next(), parts.next()) {
            if key == param {
                return Some(value.replace("%3A", ":").replace("%2F", "/"));
            }
        }
    }
    None
}
