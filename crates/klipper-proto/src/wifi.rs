//! Request and response shapes of the Wi-Fi network configuration API.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One segment of a validation error location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum LocSegment {
    /// Field name.
    Field(String),
    /// Array index.
    Index(i64),
}

/// A single request validation failure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationError {
    /// Location of the offending value.
    pub loc: Vec<LocSegment>,
    /// Message.
    pub msg: String,
    /// Error type tag.
    #[serde(rename = "type")]
    pub kind: String,
}

/// Error body returned by the API for rejected requests.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct HttpValidationError {
    /// Individual failures.
    #[serde(default)]
    pub detail: Vec<ValidationError>,
}

impl HttpValidationError {
    /// Message of the first failure, if any.
    #[must_use]
    pub fn first_message(&self) -> Option<&str> {
        self.detail.first().map(|d| d.msg.as_str())
    }
}

/// A visible wireless network.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WifiNetwork {
    /// Network name.
    pub ssid: String,
    /// Signal strength as reported by the adapter.
    pub signal_strength: i32,
    /// Security mode, e.g. `WPA2`.
    pub security: String,
    /// Channel frequency.
    pub frequency: f64,
    /// Whether the SSID is hidden.
    pub is_hidden: bool,
}

/// Request to join a network.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WifiConnectionRequest {
    /// Network name.
    pub ssid: String,
    /// Passphrase, `None` for open networks.
    pub password: Option<String>,
}

/// Outcome of a join request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WifiConnectionResult {
    /// Whether the join succeeded.
    pub success: bool,
    /// Network that was requested.
    pub ssid: String,
    /// Human-readable outcome.
    pub message: String,
    /// Adapter status after the attempt.
    pub status: String,
    /// Connection active after the attempt.
    pub current_connection: Option<String>,
    /// Connection active before the attempt.
    pub previous_connection: Option<String>,
}

/// Network adapter details.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdapterInfo {
    /// Device name, e.g. `wlan0`.
    pub device: String,
    /// Device type.
    #[serde(rename = "type")]
    pub kind: String,
    /// Device state.
    pub state: String,
    /// Active connection name.
    pub connection: String,
}

/// Addresses assigned to the adapter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IpInfo {
    /// IPv4 address.
    pub ipv4: String,
    /// IPv6 address.
    pub ipv6: String,
    /// Hardware address.
    pub mac: String,
}

/// Signal summary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SignalInfo {
    /// Current signal level.
    pub current_signal: i32,
    /// Number of visible networks.
    pub available_networks: u32,
    /// Descriptive signal range.
    pub signal_range: String,
    /// Signal level of the active connection.
    pub current_connection_signal: i32,
    /// SSID of the active connection.
    pub current_ssid: String,
}

/// Full network status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NetworkStatus {
    /// Adapter details.
    pub adapter: AdapterInfo,
    /// Address details.
    pub ip: IpInfo,
    /// Signal details.
    pub signal_info: SignalInfo,
}

/// Result of a network scan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct NetworkScanResult {
    /// Visible networks.
    pub networks: Vec<WifiNetwork>,
}

/// Generic API acknowledgement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiResponse<T = Value> {
    /// Whether the operation succeeded.
    pub success: bool,
    /// Optional payload.
    #[serde(default = "Option::default")]
    pub data: Option<T>,
    /// Validation failures, if any.
    #[serde(default)]
    pub error: Option<HttpValidationError>,
    /// Optional message.
    #[serde(default)]
    pub message: Option<String>,
}
