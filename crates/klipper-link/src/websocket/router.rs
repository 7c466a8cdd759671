//! Inbound message routing.

use klipper_proto::{Inbound, PrinterStatus};
use tracing::{debug, error, warn};

use super::publisher::StatePublisher;

/// Decodes inbound text and applies it to the printer status snapshot.
///
/// Only status updates change state. Everything else is logged and dropped.
#[derive(Debug, Clone)]
pub struct MessageRouter {
    printer: StatePublisher<Option<PrinterStatus>>,
}

impl MessageRouter {
    /// Route into the given snapshot cell.
    #[must_use]
    pub const fn new(printer: StatePublisher<Option<PrinterStatus>>) -> Self {
        Self { printer }
    }

    /// Decode one text frame and route it.
    ///
    /// Malformed payloads are logged and otherwise ignored.
    pub fn handle_text(&self, text: &str) {
        match Inbound::from_json(text) {
            Ok(inbound) => self.route(inbound),
            Err(e) => error!(error = %e, "Failed to parse WebSocket message"),
        }
    }

    /// Apply one classified frame.
    pub fn route(&self, inbound: Inbound) {
        match inbound {
            Inbound::StatusUpdate(status) => {
                debug!(state = %status.state(), "Printer status update");
                self.printer.set(Some(status));
            }
            Inbound::Response { id, .. } => {
                debug!(id = %id, "Response received");
            }
            Inbound::Failure { id, error } => {
                warn!(
                    id = ?id,
                    code = error.code,
                    message = %error.message,
                    "Request failed"
                );
            }
            Inbound::Notification { method, .. } => {
                debug!(method = %method, "Ignoring notification");
            }
            Inbound::Unrecognized => {
                debug!("Ignoring unrecognized message");
            }
        }
    }

    /// The snapshot cell this router writes.
    #[must_use]
    pub const fn printer(&self) -> &StatePublisher<Option<PrinterStatus>> {
        &self.printer
    }
}
