//! Client configuration.
//!
//! Configuration is resolved in layers:
//! - built-in defaults,
//! - an optional TOML file,
//! - environment variables (`MOONRAKER_HOST`, `MOONRAKER_PORT`, ...).
//!
//! The WebSocket and HTTP URLs of the Moonraker host are derived from host and
//! port unless given explicitly.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::LinkError;
use crate::websocket::ConnectionConfig;

/// Default Moonraker host.
pub const DEFAULT_MOONRAKER_HOST: &str = "192.168.1.20";
/// Default Moonraker port.
pub const DEFAULT_MOONRAKER_PORT: u32 = 7125;
/// Default printer display name.
pub const DEFAULT_PRINTER_NAME: &str = "Discovery";
/// Default connection timeout in milliseconds.
pub const DEFAULT_CONNECTION_TIMEOUT_MS: u64 = 5000;
/// Default base URL of the network configuration service.
pub const DEFAULT_NETWORK_API_URL: &str = "http://discovery.local:8000";

/// Environment variable overriding `moonraker_host`.
pub const MOONRAKER_HOST_ENV: &str = "MOONRAKER_HOST";
/// Environment variable overriding `moonraker_port`.
pub const MOONRAKER_PORT_ENV: &str = "MOONRAKER_PORT";
/// Environment variable overriding `moonraker_ws_url`.
pub const MOONRAKER_WS_URL_ENV: &str = "MOONRAKER_WS_URL";
/// Environment variable overriding `moonraker_api_url`.
pub const MOONRAKER_API_URL_ENV: &str = "MOONRAKER_API_URL";
/// Environment variable overriding `printer_name`.
pub const PRINTER_NAME_ENV: &str = "PRINTER_NAME";
/// Environment variable overriding `connection_timeout_ms`.
pub const CONNECTION_TIMEOUT_ENV: &str = "CONNECTION_TIMEOUT";
/// Environment variable overriding `network_api_url`.
pub const NETWORK_API_URL_ENV: &str = "NETWORK_API_URL";

/// Settings for reaching the printer host and the network service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct KlipperConfig {
    /// Moonraker host name or address.
    pub moonraker_host: String,
    /// Moonraker port.
    pub moonraker_port: u32,
    /// Explicit WebSocket URL; derived from host and port when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moonraker_ws_url: Option<String>,
    /// Explicit HTTP URL; derived from host and port when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moonraker_api_url: Option<String>,
    /// Display name of the printer.
    pub printer_name: String,
    /// Timeout for opening the WebSocket, in milliseconds. Zero disables it.
    pub connection_timeout_ms: u64,
    /// Base URL of the network configuration service.
    pub network_api_url: String,
}

impl Default for KlipperConfig {
    fn default() -> Self {
        Self {
            moonraker_host: DEFAULT_MOONRAKER_HOST.to_string(),
            moonraker_port: DEFAULT_MOONRAKER_PORT,
            moonraker_ws_url: None,
            moonraker_api_url: None,
            printer_name: DEFAULT_PRINTER_NAME.to_string(),
            connection_timeout_ms: DEFAULT_CONNECTION_TIMEOUT_MS,
            network_api_url: DEFAULT_NETWORK_API_URL.to_string(),
        }
    }
}

impl KlipperConfig {
    /// Resolve configuration from an optional file and the process environment,
    /// then validate it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, an environment
    /// value is malformed, or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, LinkError> {
        let config = Self::resolve(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve configuration like [`load`](Self::load) without validating it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or an
    /// environment value is malformed.
    pub fn resolve(path: Option<&Path>) -> Result<Self, LinkError> {
        let base = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        base.with_overrides(|key| std::env::var(key).ok())
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LinkError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            LinkError::Config(format!(
                "failed to read config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;

        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn from_toml(content: &str) -> Result<Self, LinkError> {
        toml::from_str(content).map_err(|e| LinkError::Config(format!("invalid TOML: {e}")))
    }

    /// Build configuration from defaults and the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric variable cannot be parsed.
    pub fn from_env() -> Result<Self, LinkError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from defaults and a variable lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric variable cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, LinkError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::default().with_overrides(lookup)
    }

    /// Apply every variable present in `lookup` on top of this configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric variable cannot be parsed.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, LinkError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup(MOONRAKER_HOST_ENV) {
            self.moonraker_host = host;
        }
        if let Some(port) = lookup(MOONRAKER_PORT_ENV) {
            self.moonraker_port = port.trim().parse().map_err(|_| {
                LinkError::Config(format!("{MOONRAKER_PORT_ENV} must be a number, got '{port}'"))
            })?;
        }
        if let Some(url) = lookup(MOONRAKER_WS_URL_ENV) {
            self.moonraker_ws_url = Some(url);
        }
        if let Some(url) = lookup(MOONRAKER_API_URL_ENV) {
            self.moonraker_api_url = Some(url);
        }
        if let Some(name) = lookup(PRINTER_NAME_ENV) {
            self.printer_name = name;
        }
        if let Some(timeout) = lookup(CONNECTION_TIMEOUT_ENV) {
            self.connection_timeout_ms = timeout.trim().parse().map_err(|_| {
                LinkError::Config(format!(
                    "{CONNECTION_TIMEOUT_ENV} must be a number of milliseconds, got '{timeout}'"
                ))
            })?;
        }
        if let Some(url) = lookup(NETWORK_API_URL_ENV) {
            self.network_api_url = url;
        }
        Ok(self)
    }

    /// WebSocket endpoint of the Moonraker host.
    #[must_use]
    pub fn ws_url(&self) -> String {
        match explicit(self.moonraker_ws_url.as_deref()) {
            Some(url) => url.to_string(),
            None => format!(
                "ws://{}:{}/websocket",
                self.moonraker_host, self.moonraker_port
            ),
        }
    }

    /// HTTP endpoint of the Moonraker host.
    #[must_use]
    pub fn api_url(&self) -> String {
        match explicit(self.moonraker_api_url.as_deref()) {
            Some(url) => url.to_string(),
            None => format!("http://{}:{}", self.moonraker_host, self.moonraker_port),
        }
    }

    /// Timeout for opening the WebSocket, `None` when disabled.
    #[must_use]
    pub const fn connection_timeout(&self) -> Option<Duration> {
        if self.connection_timeout_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.connection_timeout_ms))
        }
    }

    /// Connection settings for the WebSocket service.
    #[must_use]
    pub fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig::new(self.ws_url()).with_open_timeout(self.connection_timeout())
    }

    /// Every problem with this configuration, empty when valid.
    #[must_use]
    pub fn validation_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.moonraker_host.trim().is_empty() {
            errors.push("Moonraker host is required".to_string());
        }

        if self.moonraker_port == 0 || self.moonraker_port > 65535 {
            errors.push("Moonraker port must be between 1 and 65535".to_string());
        }

        if self.connection_timeout_ms != 0 && self.connection_timeout_ms < 1000 {
            errors.push("Connection timeout should be at least 1000ms".to_string());
        }

        match Url::parse(&self.ws_url()) {
            Ok(url) if url.scheme() == "ws" => {}
            Ok(_) => errors.push("Moonraker WebSocket URL must start with ws://".to_string()),
            Err(e) => errors.push(format!("Moonraker WebSocket URL is invalid: {e}")),
        }

        if let Err(e) = Url::parse(&self.network_api_url) {
            errors.push(format!("Network API URL is invalid: {e}"));
        }

        errors
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error listing every problem found.
    pub fn validate(&self) -> Result<(), LinkError> {
        let errors = self.validation_errors();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(LinkError::Config(errors.join("; ")))
        }
    }
}

/// Explicit URLs count only when non-empty.
fn explicit(url: Option<&str>) -> Option<&str> {
    url.filter(|u| !u.trim().is_empty())
}
