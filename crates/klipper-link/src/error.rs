//! Error types for klipper-link.

use klipper_proto::HttpValidationError;
use thiserror::Error;

/// Message reported when the network configuration service cannot be reached.
pub const SERVICE_UNREACHABLE_MESSAGE: &str =
    "Failed to connect to the network service. Please check if the service is running.";

/// Errors that can occur in klipper-link operations.
#[derive(Debug, Error)]
pub enum LinkError {
    /// Opening the Moonraker connection failed.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The pending connect was cancelled by an explicit disconnect.
    #[error("disconnected before the connection opened")]
    Disconnected,

    /// The connection actor is no longer running.
    #[error("connection service stopped")]
    ServiceStopped,

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// The network configuration API rejected or failed a request.
    #[error("{message}")]
    Api {
        /// HTTP status, when a response was received.
        status: Option<u16>,
        /// Human-readable message.
        message: String,
        /// Validation details returned by the API.
        detail: Option<HttpValidationError>,
    },

    /// The network configuration API could not be reached.
    #[error("Failed to connect to the network service. Please check if the service is running.")]
    ServiceUnreachable,

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Protocol error.
    #[error("protocol error: {0}")]
    Protocol(#[from] klipper_proto::ProtoError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_error_display() {
        let err = LinkError::Connection("connection refused".to_string());
        assert_eq!(err.to_string(), "connection failed: connection refused");
    }

    #[test]
    fn test_config_error_display() {
        let err = LinkError::Config("invalid moonraker_port".to_string());
        assert_eq!(err.to_string(), "configuration error: invalid moonraker_port");
    }

    #[test]
    fn test_api_error_displays_message_only() {
        let err = LinkError::Api {
            status: Some(422),
            message: "field required".to_string(),
            detail: None,
        };
        assert_eq!(err.to_string(), "field required");
    }

    #[test]
    fn test_service_unreachable_display() {
        assert_eq!(
            LinkError::ServiceUnreachable.to_string(),
            SERVICE_UNREACHABLE_MESSAGE
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: LinkError = io_err.into();
        assert!(err.to_string().contains("io error"));
    }

    #[test]
    fn test_protocol_error_conversion() {
        let err: LinkError = klipper_proto::ProtoError::Decoding("bad frame".to_string()).into();
        assert_eq!(err.to_string(), "protocol error: decoding error: bad frame");
    }
}
