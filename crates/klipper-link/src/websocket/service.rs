//! The Moonraker connection service.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::task::{Context, Poll};

use klipper_proto::{ConnectionStatus, PrinterStatus, RequestFrame};
use tokio::sync::{mpsc, oneshot};
use tokio::time::Sleep;
use tracing::{debug, error, info, warn};

use crate::error::LinkError;

use super::events::{EventSink, TransportEvent};
use super::machine::{ConnectionMachine, Effect, Input, Outcome};
use super::publisher::{StatePublisher, StateReader};
use super::reconnect::ReconnectConfig;
use super::router::MessageRouter;
use super::state::{AtomicPhase, Phase};
use super::transport::{ConnectionConfig, Transport, WsTransport};

enum Command {
    Connect(oneshot::Sender<Outcome>),
    Disconnect,
    Send(RequestFrame),
}

/// Resolves once the connect request it was returned for settles.
///
/// Resolves `Ok(())` when the connection opens (or was already open), and an
/// error when the open fails, the socket closes first, or `disconnect()` is
/// called before it opened.
#[must_use = "the connect result is only observable by awaiting the handle"]
#[derive(Debug)]
pub struct ConnectHandle {
    rx: oneshot::Receiver<Outcome>,
}

impl Future for ConnectHandle {
    type Output = Result<(), LinkError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|outcome| match outcome {
            Ok(outcome) => outcome.into_result(),
            Err(_) => Err(LinkError::ServiceStopped),
        })
    }
}

/// Client for one Moonraker endpoint.
///
/// All lifecycle work happens on a background task that owns the transport
/// and the reconnection state. This handle only sends it commands, so every
/// method returns immediately. Dropping the handle stops the task and closes
/// the connection.
///
/// Must be created inside a Tokio runtime.
pub struct KlipperService {
    commands: mpsc::UnboundedSender<Command>,
    connection: StateReader<ConnectionStatus>,
    printer: StateReader<Option<PrinterStatus>>,
    phase: Arc<AtomicPhase>,
    attempts: Arc<AtomicU32>,
    endpoint_url: String,
}

impl KlipperService {
    /// Create a service with the default reconnection policy.
    #[must_use]
    pub fn new(config: ConnectionConfig) -> Self {
        Self::with_reconnect_config(config, ReconnectConfig::default())
    }

    /// Create a service with a custom reconnection policy.
    #[must_use]
    pub fn with_reconnect_config(config: ConnectionConfig, reconnect: ReconnectConfig) -> Self {
        let endpoint_url = config.endpoint_url().to_string();
        Self::with_transport(endpoint_url, reconnect, WsTransport::new(config))
    }

    /// Create a service over any [`Transport`].
    #[must_use]
    pub fn with_transport<T: Transport>(
        endpoint_url: impl Into<String>,
        reconnect: ReconnectConfig,
        transport: T,
    ) -> Self {
        let (commands, commands_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let connection = StatePublisher::new(ConnectionStatus::disconnected());
        let printer = StatePublisher::new(None);
        let connection_reader = connection.reader();
        let printer_reader = printer.reader();
        let phase = Arc::new(AtomicPhase::new(Phase::Idle));
        let attempts = Arc::new(AtomicU32::new(0));

        let actor = Actor {
            machine: ConnectionMachine::new(reconnect),
            transport,
            router: MessageRouter::new(printer),
            connection,
            phase: Arc::clone(&phase),
            attempts: Arc::clone(&attempts),
            commands: commands_rx,
            events_tx,
            events_rx,
            epoch: 0,
            retry: None,
            waiters: Vec::new(),
        };
        tokio::spawn(actor.run());

        Self {
            commands,
            connection: connection_reader,
            printer: printer_reader,
            phase,
            attempts,
            endpoint_url: endpoint_url.into(),
        }
    }

    /// Start connecting. The returned handle settles with the outcome.
    pub fn connect(&self) -> ConnectHandle {
        let (tx, rx) = oneshot::channel();
        // If the actor is gone `tx` is dropped and the handle reports it.
        let _ = self.commands.send(Command::Connect(tx));
        ConnectHandle { rx }
    }

    /// Close the connection and stop any reconnection.
    pub fn disconnect(&self) {
        if self.commands.send(Command::Disconnect).is_err() {
            debug!("Disconnect after service stopped");
        }
    }

    /// Send a request, best effort. Dropped with a warning when not connected.
    pub fn send(&self, frame: RequestFrame) {
        if self.commands.send(Command::Send(frame)).is_err() {
            warn!("Klipper service stopped, dropping message");
        }
    }

    /// Ask the host for its `server.info`.
    pub fn request_server_info(&self) {
        self.send(RequestFrame::server_info());
    }

    /// Current connection status.
    #[must_use]
    pub fn connection_status(&self) -> ConnectionStatus {
        self.connection.get()
    }

    /// Last printer status pushed by the host.
    #[must_use]
    pub fn printer_status(&self) -> Option<PrinterStatus> {
        self.printer.get()
    }

    /// Observable connection status. Only the service writes it.
    #[must_use]
    pub const fn connection(&self) -> &StateReader<ConnectionStatus> {
        &self.connection
    }

    /// Observable printer status snapshot. Only the service writes it.
    #[must_use]
    pub const fn printer(&self) -> &StateReader<Option<PrinterStatus>> {
        &self.printer
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase.load()
    }

    /// Reconnection attempts since the last successful open.
    #[must_use]
    pub fn reconnect_attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Check if the connection is open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.phase() == Phase::Connected
    }

    /// Endpoint this service connects to.
    #[must_use]
    pub fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }
}

impl std::fmt::Debug for KlipperService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KlipperService")
            .field("endpoint_url", &self.endpoint_url)
            .field("phase", &self.phase())
            .field("reconnect_attempts", &self.reconnect_attempts())
            .finish_non_exhaustive()
    }
}

struct PendingRetry {
    token: u64,
    sleep: Pin<Box<Sleep>>,
}

struct Actor<T> {
    machine: ConnectionMachine,
    transport: T,
    router: MessageRouter,
    connection: StatePublisher<ConnectionStatus>,
    phase: Arc<AtomicPhase>,
    attempts: Arc<AtomicU32>,
    commands: mpsc::UnboundedReceiver<Command>,
    events_tx: mpsc::UnboundedSender<(u64, TransportEvent)>,
    events_rx: mpsc::UnboundedReceiver<(u64, TransportEvent)>,
    /// Epoch of the current transport open; events from older ones are stale.
    epoch: u64,
    retry: Option<PendingRetry>,
    waiters: Vec<oneshot::Sender<Outcome>>,
}

async fn retry_elapsed(retry: &mut Option<PendingRetry>) -> u64 {
    match retry {
        Some(pending) => {
            pending.sleep.as_mut().await;
            pending.token
        }
        None => std::future::pending().await,
    }
}

impl<T: Transport> Actor<T> {
    async fn run(mut self) {
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Connect(reply)) => {
                        self.waiters.push(reply);
                        self.apply(Input::Connect);
                    }
                    Some(Command::Disconnect) => self.apply(Input::Disconnect),
                    Some(Command::Send(frame)) => self.send(&frame),
                    None => break,
                },
                Some((epoch, event)) = self.events_rx.recv() => self.on_event(epoch, event),
                token = retry_elapsed(&mut self.retry) => {
                    self.retry = None;
                    self.apply(Input::RetryElapsed(token));
                }
            }
        }

        self.transport.close();
        debug!("Klipper service stopped");
    }

    fn on_event(&mut self, epoch: u64, event: TransportEvent) {
        if epoch != self.epoch {
            debug!(epoch, current = self.epoch, "Dropping stale transport event");
            return;
        }

        match event {
            TransportEvent::Opened => {
                info!("Connected to Klipper");
                self.apply(Input::Opened);
            }
            TransportEvent::Message(text) => self.router.handle_text(&text),
            TransportEvent::Errored(reason) => {
                warn!(reason = %reason, "WebSocket error");
                self.apply(Input::Errored(reason));
            }
            TransportEvent::Closed(reason) => {
                info!(reason = %reason, "Disconnected from Klipper");
                self.apply(Input::Closed(reason));
            }
        }
    }

    fn apply(&mut self, input: Input) {
        let effects = self.machine.step(input);
        self.phase.store(self.machine.phase());
        self.attempts.store(self.machine.attempts(), Ordering::SeqCst);

        for effect in effects {
            self.execute(effect);
        }
    }

    fn execute(&mut self, effect: Effect) {
        match effect {
            Effect::Publish(status) => self.connection.set(status),
            Effect::ClearSnapshot => self.router.printer().set(None),
            Effect::Open => {
                self.epoch += 1;
                let sink = EventSink::new(self.epoch, self.events_tx.clone());
                self.transport.open(sink);
            }
            Effect::Close => {
                self.epoch += 1;
                self.transport.close();
            }
            Effect::Send(frame) => self.send(&frame),
            Effect::ScheduleRetry {
                token,
                attempt,
                delay,
            } => {
                info!(
                    attempt,
                    max_attempts = ?self.machine.config().max_attempts,
                    delay_ms = delay.as_millis(),
                    "Attempting to reconnect"
                );
                self.retry = Some(PendingRetry {
                    token,
                    sleep: Box::pin(tokio::time::sleep(delay)),
                });
            }
            Effect::CancelRetry => {
                if self.retry.take().is_some() {
                    debug!("Pending reconnection cancelled");
                }
            }
            Effect::Settle(outcome) => {
                if let Outcome::Failed(reason) = &outcome {
                    error!(reason = %reason, "Failed to connect to Klipper");
                }
                for waiter in self.waiters.drain(..) {
                    // The caller may have dropped its handle.
                    let _ = waiter.send(outcome.clone());
                }
            }
        }
    }

    fn send(&mut self, frame: &RequestFrame) {
        match frame.to_json() {
            Ok(json) => {
                debug!(method = %frame.method, id = %frame.id, "Sending request");
                self.transport.send(json);
            }
            Err(e) => error!(error = %e, method = %frame.method, "Failed to encode request"),
        }
    }
}
