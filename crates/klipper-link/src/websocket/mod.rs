//! Moonraker WebSocket client.
//!
//! Manages the persistent connection between this client and the Moonraker
//! host, including bounded reconnection with a linear backoff, routing of
//! pushed printer status, and the observable connection state.
//!
//! The lifecycle lives in [`ConnectionMachine`], a synchronous state machine
//! that turns inputs into effects. [`KlipperService`] runs the machine on a
//! single Tokio task together with the [`Transport`], so every transition is
//! processed one at a time.

mod events;
mod machine;
mod publisher;
mod reconnect;
mod router;
mod service;
mod state;
mod transport;

// Re-export public types
pub use events::{EventSink, TransportEvent};
pub use machine::{
    CONNECTION_FAILED, ConnectionMachine, Effect, Input, Outcome, RETRIES_EXHAUSTED,
};
pub use publisher::{StatePublisher, StateReader, SubscriptionId};
pub use reconnect::ReconnectConfig;
pub use router::MessageRouter;
pub use service::{ConnectHandle, KlipperService};
pub use state::{AtomicPhase, Phase};
pub use transport::{ConnectionConfig, Transport, WsTransport};
