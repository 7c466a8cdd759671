//! Values published to status consumers.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Last-known printer status, as pushed by `notify_status_update`.
///
/// The payload is stored exactly as received, without validation, and
/// serializes back to it unchanged. Typed accessors read the well-known
/// fields leniently: a missing or mistyped field yields its default. When the
/// payload is an array (`[{...}, eventtime]`), fields are read from its first
/// object element.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(transparent)]
pub struct PrinterStatus {
    params: Value,
}

impl PrinterStatus {
    /// Wrap a raw payload.
    #[must_use]
    pub const fn new(params: Value) -> Self {
        Self { params }
    }

    /// The payload as received.
    #[must_use]
    pub const fn params(&self) -> &Value {
        &self.params
    }

    /// Take the payload as received.
    #[must_use]
    pub fn into_params(self) -> Value {
        self.params
    }

    /// Object the typed accessors read from, if any.
    #[must_use]
    pub fn fields(&self) -> Option<&Map<String, Value>> {
        match &self.params {
            Value::Object(fields) => Some(fields),
            Value::Array(items) => items.first().and_then(Value::as_object),
            _ => None,
        }
    }

    /// Raw value of one field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields().and_then(|fields| fields.get(key))
    }

    fn text(&self, key: &str) -> &str {
        self.get(key).and_then(Value::as_str).unwrap_or_default()
    }

    /// Klippy state (`ready`, `startup`, `shutdown`, `error`).
    #[must_use]
    pub fn state(&self) -> &str {
        self.text("state")
    }

    /// Human-readable state message.
    #[must_use]
    pub fn state_message(&self) -> &str {
        self.text("state_message")
    }

    /// Host name of the printer controller.
    #[must_use]
    pub fn hostname(&self) -> &str {
        self.text("hostname")
    }

    /// Klipper installation path.
    #[must_use]
    pub fn klipper_path(&self) -> &str {
        self.text("klipper_path")
    }

    /// Active printer configuration file.
    #[must_use]
    pub fn config_file(&self) -> &str {
        self.text("config_file")
    }

    /// Klipper software version.
    #[must_use]
    pub fn software_version(&self) -> &str {
        self.text("software_version")
    }

    /// Host CPU usage in percent.
    #[must_use]
    pub fn cpu_usage(&self) -> f64 {
        self.get("cpu_usage")
            .and_then(Value::as_f64)
            .unwrap_or_default()
    }
}

/// Observable state of the persistent connection.
///
/// At most one of `connected` and `connecting` is true; both false means the
/// client is idle or has given up.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ConnectionStatus {
    /// A connection is open.
    pub connected: bool,
    /// A connection is being opened or a retry is pending.
    pub connecting: bool,
    /// Last error, if the most recent transition was a failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ConnectionStatus {
    /// Idle, no error.
    #[must_use]
    pub const fn disconnected() -> Self {
        Self {
            connected: false,
            connecting: false,
            error: None,
        }
    }

    /// Opening or waiting to retry.
    #[must_use]
    pub const fn connecting() -> Self {
        Self {
            connected: false,
            connecting: true,
            error: None,
        }
    }

    /// Open.
    #[must_use]
    pub const fn connected() -> Self {
        Self {
            connected: true,
            connecting: false,
            error: None,
        }
    }

    /// Not connected because of an error.
    #[must_use]
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            connected: false,
            connecting: false,
            error: Some(error.into()),
        }
    }
}
