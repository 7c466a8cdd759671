//! Connection lifecycle state machine.
//!
//! [`ConnectionMachine::step`] consumes one [`Input`] and returns the
//! [`Effect`]s the caller must carry out, in order. The machine does no I/O
//! and keeps no timers, so every transition can be exercised directly.

use std::time::Duration;

use klipper_proto::{ConnectionStatus, RequestFrame};

use crate::error::LinkError;

use super::reconnect::ReconnectConfig;
use super::state::Phase;

/// Error recorded when the transport reports a failure.
pub const CONNECTION_FAILED: &str = "Connection failed";

/// Error recorded once every retry has failed.
pub const RETRIES_EXHAUSTED: &str = "Unable to connect to Klipper";

/// Inputs driving the machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Caller asked to connect.
    Connect,
    /// Caller asked to disconnect.
    Disconnect,
    /// Transport opened.
    Opened,
    /// Transport reported an error.
    Errored(String),
    /// Transport closed without being asked to.
    Closed(String),
    /// The retry timer with this token elapsed.
    RetryElapsed(u64),
}

/// How pending connect handles are settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The connection is open.
    Opened,
    /// The transport failed while opening.
    Failed(String),
    /// The transport closed before it opened.
    ClosedBeforeOpen(String),
    /// `disconnect()` was called first.
    Cancelled,
}

impl Outcome {
    /// Result delivered to a waiting caller.
    ///
    /// # Errors
    ///
    /// Every outcome except `Opened` maps to a [`LinkError`].
    pub fn into_result(self) -> Result<(), LinkError> {
        match self {
            Self::Opened => Ok(()),
            Self::Failed(reason) | Self::ClosedBeforeOpen(reason) => {
                Err(LinkError::Connection(reason))
            }
            Self::Cancelled => Err(LinkError::Disconnected),
        }
    }
}

/// Work the owner of the machine must perform.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Write this value to the connection status cell.
    Publish(ConnectionStatus),
    /// Reset the printer status snapshot.
    ClearSnapshot,
    /// Open the transport.
    Open,
    /// Close the transport.
    Close,
    /// Send a frame, best effort.
    Send(RequestFrame),
    /// Start the retry timer; report `RetryElapsed(token)` when it fires.
    ScheduleRetry {
        /// Token identifying this timer.
        token: u64,
        /// Attempt number the timer starts.
        attempt: u32,
        /// Time to wait.
        delay: Duration,
    },
    /// Drop any pending retry timer.
    CancelRetry,
    /// Settle every pending connect handle.
    Settle(Outcome),
}

/// The connection lifecycle and reconnection policy.
#[derive(Debug, Clone)]
pub struct ConnectionMachine {
    config: ReconnectConfig,
    phase: Phase,
    attempts: u32,
    retry_token: u64,
}

impl ConnectionMachine {
    /// Create an idle machine.
    #[must_use]
    pub const fn new(config: ReconnectConfig) -> Self {
        Self {
            config,
            phase: Phase::Idle,
            attempts: 0,
            retry_token: 0,
        }
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Reconnection attempts since the last successful open.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Reconnection settings.
    #[must_use]
    pub const fn config(&self) -> &ReconnectConfig {
        &self.config
    }

    /// Apply one input.
    pub fn step(&mut self, input: Input) -> Vec<Effect> {
        match input {
            Input::Connect => self.on_connect(),
            Input::Disconnect => self.on_disconnect(),
            Input::Opened => self.on_opened(),
            Input::Errored(reason) => self.on_errored(reason),
            Input::Closed(reason) => self.on_closed(reason),
            Input::RetryElapsed(token) => self.on_retry_elapsed(token),
        }
    }

    fn on_connect(&mut self) -> Vec<Effect> {
        match self.phase {
            Phase::Connected => vec![Effect::Settle(Outcome::Opened)],
            // Join the open already in flight.
            Phase::Connecting => Vec::new(),
            Phase::Retrying(_) => {
                self.retry_token += 1;
                self.phase = Phase::Connecting;
                vec![
                    Effect::CancelRetry,
                    Effect::Publish(ConnectionStatus::connecting()),
                    Effect::Open,
                ]
            }
            Phase::Idle | Phase::Failed => {
                self.attempts = 0;
                self.phase = Phase::Connecting;
                vec![Effect::Publish(ConnectionStatus::connecting()), Effect::Open]
            }
        }
    }

    fn on_opened(&mut self) -> Vec<Effect> {
        if self.phase != Phase::Connecting {
            return Vec::new();
        }

        self.phase = Phase::Connected;
        self.attempts = 0;
        vec![
            Effect::Publish(ConnectionStatus::connected()),
            Effect::Send(RequestFrame::server_info()),
            Effect::Settle(Outcome::Opened),
        ]
    }

    fn on_errored(&mut self, reason: String) -> Vec<Effect> {
        match self.phase {
            Phase::Connecting | Phase::Connected => vec![
                Effect::Publish(ConnectionStatus::failed(CONNECTION_FAILED)),
                Effect::Settle(Outcome::Failed(reason)),
            ],
            Phase::Idle | Phase::Retrying(_) | Phase::Failed => Vec::new(),
        }
    }

    fn on_closed(&mut self, reason: String) -> Vec<Effect> {
        let mut effects = match self.phase {
            Phase::Connecting => vec![Effect::Settle(Outcome::ClosedBeforeOpen(reason))],
            Phase::Connected => Vec::new(),
            Phase::Idle | Phase::Retrying(_) | Phase::Failed => return Vec::new(),
        };

        if self.config.should_reconnect(self.attempts) {
            self.attempts += 1;
            self.retry_token += 1;
            self.phase = Phase::Retrying(self.attempts);
            effects.push(Effect::Publish(ConnectionStatus::connecting()));
            effects.push(Effect::ScheduleRetry {
                token: self.retry_token,
                attempt: self.attempts,
                delay: self.config.delay_for_attempt(self.attempts),
            });
        } else {
            self.phase = Phase::Failed;
            effects.push(Effect::Publish(ConnectionStatus::failed(RETRIES_EXHAUSTED)));
        }
        effects
    }

    fn on_retry_elapsed(&mut self, token: u64) -> Vec<Effect> {
        match self.phase {
            Phase::Retrying(_) if token == self.retry_token => {
                self.phase = Phase::Connecting;
                vec![Effect::Publish(ConnectionStatus::connecting()), Effect::Open]
            }
            _ => Vec::new(),
        }
    }

    fn on_disconnect(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        if matches!(self.phase, Phase::Retrying(_)) {
            self.retry_token += 1;
            effects.push(Effect::CancelRetry);
        }

        self.phase = Phase::Idle;
        self.attempts = 0;
        effects.extend([
            Effect::Close,
            Effect::Publish(ConnectionStatus::disconnected()),
            Effect::ClearSnapshot,
            Effect::Settle(Outcome::Cancelled),
        ]);
        effects
    }
}

impl Default for ConnectionMachine {
    fn default() -> Self {
        Self::new(ReconnectConfig::default())
    }
}
