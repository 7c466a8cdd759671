//! Client for the Wi-Fi network configuration service.
//!
//! The service is a small HTTP API running next to Moonraker. It is
//! independent of the WebSocket connection and shares no state with it.

use klipper_proto::{
    ApiResponse, HttpValidationError, NetworkScanResult, NetworkStatus, WifiConnectionRequest,
    WifiConnectionResult, WifiNetwork,
};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::DEFAULT_NETWORK_API_URL;
use crate::error::LinkError;

const STATUS_PATH: &str = "/api/wifi/status";
const NETWORKS_PATH: &str = "/api/wifi/networks";
const CONNECT_PATH: &str = "/api/wifi/connect";
const DISCONNECT_PATH: &str = "/api/wifi/disconnect";

/// HTTP client for the network configuration service.
#[derive(Debug, Clone)]
pub struct NetworkApi {
    base_url: String,
    client: Client,
}

impl Default for NetworkApi {
    fn default() -> Self {
        Self::new(DEFAULT_NETWORK_API_URL)
    }
}

impl NetworkApi {
    /// Create a client for the service at `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a client reusing an existing `reqwest` client.
    #[must_use]
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, client }
    }

    /// Base URL requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Current adapter, address and signal information.
    pub async fn get_network_status(&self) -> Result<NetworkStatus, LinkError> {
        self.execute(self.request(Method::GET, STATUS_PATH)).await
    }

    /// Networks visible to the adapter, wrapped as a scan result.
    pub async fn scan_networks(&self) -> Result<NetworkScanResult, LinkError> {
        let networks = self.get_available_networks().await?;
        Ok(NetworkScanResult { networks })
    }

    /// Networks visible to the adapter.
    pub async fn get_available_networks(&self) -> Result<Vec<WifiNetwork>, LinkError> {
        self.execute(self.request(Method::GET, NETWORKS_PATH)).await
    }

    /// Join a network.
    pub async fn connect_to_network(
        &self,
        request: &WifiConnectionRequest,
    ) -> Result<WifiConnectionResult, LinkError> {
        debug!(ssid = %request.ssid, "Connecting to network");
        self.execute(self.request(Method::POST, CONNECT_PATH).json(request)).await
    }

    /// Leave the current network.
    pub async fn disconnect_network(&self) -> Result<ApiResponse, LinkError> {
        self.execute(self.request(Method::POST, DISCONNECT_PATH)).await
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{path}", self.base_url))
            .header(CONTENT_TYPE, "application/json")
    }

    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, LinkError> {
        let response = request.send().await.map_err(request_error)?;
        let status = response.status();
        let url = response.url().to_string();
        debug!(url = %url, status = status.as_u16(), "Response received");

        if !status.is_success() {
            // The status line alone still yields a usable error.
            let body = response.bytes().await.unwrap_or_else(|e| {
                debug!(url = %url, error = %e, "Failed to read error response body");
                Default::default()
            });
            return Err(status_error(status, &body));
        }

        let body = response.bytes().await.map_err(request_error)?;
        debug!(url = %url, bytes = body.len(), "Response body read");
        serde_json::from_slice(&body).map_err(|e| LinkError::Api {
            status: Some(status.as_u16()),
            message: format!("Network request failed: {e}"),
            detail: None,
        })
    }
}

/// Error for a non-success response.
///
/// Uses the first validation message when the body carries one, and
/// `HTTP <code> - <reason>` otherwise.
fn status_error(status: StatusCode, body: &[u8]) -> LinkError {
    let detail = serde_json::from_slice::<HttpValidationError>(body).ok();
    let message = detail
        .as_ref()
        .and_then(HttpValidationError::first_message)
        .filter(|msg| !msg.is_empty())
        .map_or_else(
            || {
                format!(
                    "HTTP {} - {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or_default()
                )
            },
            str::to_string,
        );

    LinkError::Api {
        status: Some(status.as_u16()),
        message,
        detail,
    }
}

fn request_error(e: reqwest::Error) -> LinkError {
    if e.is_connect() {
        return LinkError::ServiceUnreachable;
    }
    LinkError::Api {
        status: e.status().map(|s| s.as_u16()),
        message: format!("Network request failed: {e}"),
        detail: None,
    }
}
