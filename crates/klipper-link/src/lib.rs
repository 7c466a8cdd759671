//! # klipper-link
//!
//! Client for a Klipper printer host running Moonraker.
//!
//! - [`websocket`]: the persistent WebSocket connection, with bounded
//!   reconnection, observable connection state and the printer status
//!   snapshot.
//! - [`network_api`]: the HTTP client for the Wi-Fi configuration service.
//! - [`config`]: configuration from defaults, TOML and the environment.

#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod network_api;
pub mod websocket;

pub use config::KlipperConfig;
pub use error::LinkError;
pub use network_api::NetworkApi;
pub use websocket::{
    ConnectHandle, ConnectionConfig, KlipperService, Phase, ReconnectConfig, StatePublisher,
    StateReader,
};
