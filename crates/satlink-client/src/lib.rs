//! SAT-LINK Client - Native HTTP access to the intelligence backend
//!
//! [`HttpBackend`] implements the core [`Backend`] port with `reqwest`, for
//! headless consoles and tooling outside the browser.

use anyhow::{Context, Result};
use satlink_core::{
    ApiError, Backend, BackendConfig, ChatRequest, ChatResponse, ScanRequest, ScanResponse,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

/// Backend reached over HTTP
///
/// Requests carry no client-side deadline; they run until the backend
/// answers or the connection fails.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    chat_url: String,
    scan_url: String,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            chat_url: config.chat_url(),
            scan_url: config.scan_url(),
        })
    }

    pub fn chat_url(&self) -> &str {
        &self.chat_url
    }

    pub fn scan_url(&self) -> &str {
        &self.scan_url
    }

    async fn post<Req, Resp>(&self, url: &str, body: &Req) -> Result<Resp, ApiError>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        debug!(url = %url, "POST");
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                warn!(url = %url, error = %e, "Backend unreachable");
                ApiError::Transport(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(url = %url, status = status.as_u16(), "Backend returned error status");
            return Err(ApiError::Status(status.as_u16()));
        }

        response.json::<Resp>().await.map_err(|e| {
            if e.is_decode() {
                ApiError::Decode(e.to_string())
            } else {
                ApiError::Transport(e.to_string())
            }
        })
    }
}

impl Backend for HttpBackend {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ApiError> {
        self.post(&self.chat_url, request).await
    }

    async fn scan(&self, request: &ScanRequest) -> Result<ScanResponse, ApiError> {
        self.post(&self.scan_url, request).await
    }
}
