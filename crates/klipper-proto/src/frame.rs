//! Frames exchanged with Moonraker over the WebSocket.
//!
//! Outbound traffic is always a [`RequestFrame`]. Inbound text is decoded
//! into an [`InboundFrame`] and then classified into an [`Inbound`] variant,
//! so downstream code dispatches on variants rather than raw fields.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::ProtoError;
use crate::status::PrinterStatus;

/// Method name of pushed printer status updates.
pub const STATUS_UPDATE_METHOD: &str = "notify_status_update";

/// Method name of the host information request.
pub const SERVER_INFO_METHOD: &str = "server.info";

/// A request sent to Moonraker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequestFrame {
    /// Remote method to invoke.
    pub method: String,
    /// Request identifier, unique per frame.
    pub id: String,
    /// Optional named parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Map<String, Value>>,
}

impl RequestFrame {
    /// Create a request with a fresh identifier and no parameters.
    #[must_use]
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            id: Uuid::new_v4().to_string(),
            params: None,
        }
    }

    /// Attach named parameters.
    #[must_use]
    pub fn with_params(mut self, params: Map<String, Value>) -> Self {
        self.params = Some(params);
        self
    }

    /// The `server.info` request issued after every successful open.
    #[must_use]
    pub fn server_info() -> Self {
        Self::new(SERVER_INFO_METHOD)
    }

    /// Serialize to JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, ProtoError> {
        serde_json::to_string(self).map_err(|e| ProtoError::Encoding(e.to_string()))
    }

    /// Deserialize from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails.
    pub fn from_json(json: &str) -> Result<Self, ProtoError> {
        serde_json::from_str(json).map_err(|e| ProtoError::Decoding(e.to_string()))
    }
}

/// Error object carried by a failed response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct RpcError {
    /// Error code.
    pub code: i64,
    /// Human-readable message.
    pub message: String,
}

/// One decoded inbound message, before classification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct InboundFrame {
    /// Correlation id. Numeric ids are accepted and kept as strings.
    #[serde(
        default,
        deserialize_with = "id_as_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    /// Method name for notifications.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Notification parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    /// Successful response payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Failed response payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

fn id_as_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(id)) => Some(id),
        Some(Value::Number(id)) => Some(id.to_string()),
        _ => None,
    })
}

impl InboundFrame {
    /// Decode one wire message.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a JSON object of the frame shape.
    pub fn from_json(json: &str) -> Result<Self, ProtoError> {
        serde_json::from_str(json).map_err(|e| ProtoError::Decoding(e.to_string()))
    }

    /// Classify the frame into a known shape.
    #[must_use]
    pub fn classify(self) -> Inbound {
        match self.method {
            Some(method) if method == STATUS_UPDATE_METHOD => Inbound::StatusUpdate(
                PrinterStatus::new(self.params.unwrap_or(Value::Null)),
            ),
            Some(method) => Inbound::Notification {
                method,
                params: self.params,
            },
            None => match (self.id, self.result, self.error) {
                (id, _, Some(error)) => Inbound::Failure { id, error },
                (Some(id), Some(result), None) => Inbound::Response { id, result },
                _ => Inbound::Unrecognized,
            },
        }
    }
}

/// A classified inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Full printer status snapshot.
    StatusUpdate(PrinterStatus),
    /// Successful response to one of our requests.
    Response {
        /// Id of the request being answered.
        id: String,
        /// Response payload.
        result: Value,
    },
    /// Failed response.
    Failure {
        /// Id of the request being answered, if any.
        id: Option<String>,
        /// Error details.
        error: RpcError,
    },
    /// Notification with a method we do not consume.
    Notification {
        /// Method name.
        method: String,
        /// Raw parameters.
        params: Option<Value>,
    },
    /// Anything that matches no known shape.
    Unrecognized,
}

impl Inbound {
    /// Decode and classify one wire message.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a JSON object of the frame shape.
    pub fn from_json(json: &str) -> Result<Self, ProtoError> {
        InboundFrame::from_json(json).map(InboundFrame::classify)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    #[test]
    fn test_server_info_request_shape() {
        let frame = RequestFrame::server_info();
        let value: Value = serde_json::from_str(&frame.to_json().expect("serialize"))
            .expect("valid json");

        assert_eq!(value["method"], "server.info");
        assert_eq!(value["id"], frame.id.as_str());
        assert!(value.get("params").is_none());
    }

    #[test]
    fn test_request_ids_are_unique() {
        let a = RequestFrame::server_info();
        let b = RequestFrame::server_info();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_request_with_params() {
        let mut params = Map::new();
        params.insert("script".to_string(), json!("G28"));
        let frame = RequestFrame::new("printer.gcode.script").with_params(params);

        let json = frame.to_json().expect("serialize");
        let parsed = RequestFrame::from_json(&json).expect("parse");
        assert_eq!(parsed, frame);
        assert_eq!(
            parsed.params.and_then(|p| p.get("script").cloned()),
            Some(json!("G28"))
        );
    }

    #[test]
    fn test_status_update_classified() {
        let text = json!({
            "method": "notify_status_update",
            "params": {
                "state": "ready",
                "state_message": "",
                "hostname": "h",
                "klipper_path": "/p",
                "config_file": "/c",
                "software_version": "v1",
                "cpu_usage": 3.2
            }
        })
        .to_string();

        match Inbound::from_json(&text).expect("decode") {
            Inbound::StatusUpdate(status) => {
                assert_eq!(status.state(), "ready");
                assert_eq!(status.hostname(), "h");
                assert!((status.cpu_usage() - 3.2).abs() < f64::EPSILON);
            }
            other => unreachable!("expected StatusUpdate, got {other:?}"),
        }
    }

    #[test]
    fn test_status_update_missing_fields_default() {
        let text = r#"{"method":"notify_status_update","params":{"state":"startup"}}"#;
        match Inbound::from_json(text).expect("decode") {
            Inbound::StatusUpdate(status) => {
                assert_eq!(status.state(), "startup");
                assert_eq!(status.hostname(), "");
                assert_eq!(status.cpu_usage(), 0.0);
            }
            other => unreachable!("expected StatusUpdate, got {other:?}"),
        }
    }

    #[test_case(json!({"state": "ready", "state_message": null}) ; "null field")]
    #[test_case(json!({"state": "ready", "cpu_usage": "high"}) ; "wrong field type")]
    #[test_case(json!([{"state": "ready"}, 12.5]) ; "array params")]
    #[test_case(json!("ready") ; "scalar params")]
    fn test_status_update_keeps_params_as_received(params: Value) {
        let text = json!({"method": "notify_status_update", "params": params}).to_string();
        assert_eq!(
            Inbound::from_json(&text).expect("decode"),
            Inbound::StatusUpdate(PrinterStatus::new(params))
        );
    }

    #[test]
    fn test_status_update_without_params_is_null_snapshot() {
        let text = r#"{"method":"notify_status_update"}"#;
        assert_eq!(
            Inbound::from_json(text).expect("decode"),
            Inbound::StatusUpdate(PrinterStatus::new(Value::Null))
        );
    }

    #[test_case(r#"{}"# ; "empty object")]
    #[test_case(r#"{"id":"7"}"# ; "id without result")]
    fn test_unrecognized_shapes(text: &str) {
        assert_eq!(
            Inbound::from_json(text).expect("decode"),
            Inbound::Unrecognized
        );
    }

    #[test]
    fn test_other_method_is_notification() {
        let inbound = Inbound::from_json(r#"{"method":"unknown_method"}"#).expect("decode");
        assert_eq!(
            inbound,
            Inbound::Notification {
                method: "unknown_method".to_string(),
                params: None,
            }
        );
    }

    #[test]
    fn test_response_with_numeric_id() {
        let inbound =
            Inbound::from_json(r#"{"id":42,"result":{"klippy_state":"ready"}}"#).expect("decode");
        assert_eq!(
            inbound,
            Inbound::Response {
                id: "42".to_string(),
                result: json!({"klippy_state": "ready"}),
            }
        );
    }

    #[test]
    fn test_error_response() {
        let inbound = Inbound::from_json(
            r#"{"id":"abc","error":{"code":-32601,"message":"Method not found"}}"#,
        )
        .expect("decode");
        assert_eq!(
            inbound,
            Inbound::Failure {
                id: Some("abc".to_string()),
                error: RpcError {
                    code: -32601,
                    message: "Method not found".to_string(),
                },
            }
        );
    }

    #[test_case("not json" ; "plain text")]
    #[test_case("[1,2,3]" ; "array")]
    #[test_case(r#"{"method":5}"# ; "method not a string")]
    fn test_malformed_text_fails_decoding(text: &str) {
        let err = Inbound::from_json(text).expect_err("should fail");
        assert!(matches!(err, ProtoError::Decoding(_)));
    }
}
