//! # klipper-proto
//!
//! Wire types for talking to a Moonraker host: the JSON frames carried over
//! the persistent WebSocket, the status values published to consumers, and
//! the request/response shapes of the Wi-Fi network configuration API.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod frame;
pub mod status;
pub mod wifi;

pub use error::ProtoError;
pub use frame::{
    Inbound, InboundFrame, RequestFrame, RpcError, SERVER_INFO_METHOD, STATUS_UPDATE_METHOD,
};
pub use status::{ConnectionStatus, PrinterStatus};
pub use wifi::{
    ApiResponse, HttpValidationError, NetworkScanResult, NetworkStatus, ValidationError,
    WifiConnectionRequest, WifiConnectionResult, WifiNetwork,
};
