//! WebSocket transport.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

use super::events::{EventSink, TransportEvent};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Reason reported when the peer goes away without a close reason.
const CONNECTION_CLOSED: &str = "connection closed";

/// Where and how to open the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    endpoint_url: String,
    open_timeout: Option<Duration>,
}

impl ConnectionConfig {
    /// Connect to `endpoint_url` with no open timeout.
    #[must_use]
    pub fn new(endpoint_url: impl Into<String>) -> Self {
        Self {
            endpoint_url: endpoint_url.into(),
            open_timeout: None,
        }
    }

    /// Give up on an open that has not completed within `timeout`.
    #[must_use]
    pub const fn with_open_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.open_timeout = timeout;
        self
    }

    /// WebSocket endpoint.
    #[must_use]
    pub fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }

    /// Open timeout, if any.
    #[must_use]
    pub const fn open_timeout(&self) -> Option<Duration> {
        self.open_timeout
    }
}

/// A message transport driven by the connection service.
///
/// Implementations report everything that happens after `open` through the
/// given [`EventSink`]. A failed open reports `Errored` followed by `Closed`.
/// `close` is silent: no events are reported for a connection closed locally.
pub trait Transport: Send + 'static {
    /// Start opening a connection, replacing any existing one.
    fn open(&mut self, sink: EventSink);

    /// Send one text frame. Dropped with a warning when not open.
    fn send(&mut self, text: String);

    /// Close the current connection, if any.
    fn close(&mut self);

    /// Whether a connection is currently open.
    fn is_open(&self) -> bool;
}

struct Link {
    outgoing: mpsc::UnboundedSender<Message>,
    open: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

/// [`Transport`] over `tokio-tungstenite`.
///
/// Each open spawns one task that owns the socket. Dropping the outgoing
/// channel tells the task to send a close frame and exit.
pub struct WsTransport {
    config: ConnectionConfig,
    link: Option<Link>,
}

impl WsTransport {
    /// Create a transport for the given endpoint.
    #[must_use]
    pub const fn new(config: ConnectionConfig) -> Self {
        Self { config, link: None }
    }

    /// Endpoint configuration.
    #[must_use]
    pub const fn config(&self) -> &ConnectionConfig {
        &self.config
    }
}

impl std::fmt::Debug for WsTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsTransport")
            .field("config", &self.config)
            .field("open", &self.is_open())
            .finish()
    }
}

impl Transport for WsTransport {
    fn open(&mut self, sink: EventSink) {
        if self.is_open() {
            debug!("WebSocket already open");
            return;
        }
        self.close();

        let (outgoing, rx) = mpsc::unbounded_channel();
        let open = Arc::new(AtomicBool::new(false));
        let task = tokio::spawn(run_link(
            self.config.clone(),
            sink,
            rx,
            Arc::clone(&open),
        ));

        self.link = Some(Link {
            outgoing,
            open,
            task,
        });
    }

    fn send(&mut self, text: String) {
        match &self.link {
            Some(link) if link.open.load(Ordering::SeqCst) => {
                if link.outgoing.send(Message::Text(text.into())).is_err() {
                    warn!("WebSocket writer gone, dropping message");
                }
            }
            _ => warn!("WebSocket not connected, dropping message"),
        }
    }

    fn close(&mut self) {
        if let Some(link) = self.link.take() {
            link.open.store(false, Ordering::SeqCst);
            // Dropping the sender makes the task close the socket and exit.
            drop(link.outgoing);
            debug!(finished = link.task.is_finished(), "WebSocket link released");
        }
    }

    fn is_open(&self) -> bool {
        self.link
            .as_ref()
            .is_some_and(|link| link.open.load(Ordering::SeqCst))
    }
}

impl Drop for WsTransport {
    fn drop(&mut self) {
        self.close();
    }
}

async fn open_stream(config: &ConnectionConfig) -> Result<WsStream, String> {
    let connect = tokio_tungstenite::connect_async(config.endpoint_url());
    let result = match config.open_timeout() {
        Some(timeout) => tokio::time::timeout(timeout, connect)
            .await
            .map_err(|_| format!("connection timed out after {}ms", timeout.as_millis()))?,
        None => connect.await,
    };
    result.map(|(stream, _)| stream).map_err(|e| e.to_string())
}

async fn run_link(
    config: ConnectionConfig,
    sink: EventSink,
    mut outgoing: mpsc::UnboundedReceiver<Message>,
    open: Arc<AtomicBool>,
) {
    debug!(url = %config.endpoint_url(), "Opening WebSocket");

    let stream = tokio::select! {
        result = open_stream(&config) => match result {
            Ok(stream) => stream,
            Err(reason) => {
                sink.emit(TransportEvent::Errored(reason.clone()));
                sink.emit(TransportEvent::Closed(reason));
                return;
            }
        },
        // Closed locally before the handshake finished.
        None = outgoing.recv() => return,
    };

    open.store(true, Ordering::SeqCst);
    sink.emit(TransportEvent::Opened);

    let (mut write, mut read) = stream.split();

    let reason = loop {
        tokio::select! {
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    sink.emit(TransportEvent::Message(text.as_str().to_owned()));
                }
                Some(Ok(Message::Close(frame))) => {
                    break match frame {
                        Some(frame) if !frame.reason.is_empty() => {
                            frame.reason.as_str().to_owned()
                        }
                        _ => CONNECTION_CLOSED.to_string(),
                    };
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    let reason = e.to_string();
                    sink.emit(TransportEvent::Errored(reason.clone()));
                    break reason;
                }
                None => break CONNECTION_CLOSED.to_string(),
            },
            message = outgoing.recv() => match message {
                Some(message) => {
                    if let Err(e) = write.send(message).await {
                        warn!(error = %e, "Failed to send WebSocket message");
                    }
                }
                None => {
                    open.store(false, Ordering::SeqCst);
                    if let Err(e) = write.send(Message::Close(None)).await {
                        debug!(error = %e, "Close frame not sent");
                    }
                    return;
                }
            },
        }
    };

    open.store(false, Ordering::SeqCst);
    debug!(reason = %reason, "WebSocket closed");
    sink.emit(TransportEvent::Closed(reason));
}
