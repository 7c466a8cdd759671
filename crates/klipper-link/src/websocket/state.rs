//! Connection lifecycle phases.

use std::sync::atomic::{AtomicU64, Ordering};

/// Phase of the connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Not connected and not trying to.
    Idle,
    /// Opening the transport.
    Connecting,
    /// Transport open.
    Connected,
    /// Waiting to start retry attempt `n`.
    Retrying(u32),
    /// Gave up after exhausting retries.
    Failed,
}

impl Phase {
    const fn tag(self) -> u64 {
        match self {
            Self::Idle => 0,
            Self::Connecting => 1,
            Self::Connected => 2,
            Self::Retrying(_) => 3,
            Self::Failed => 4,
        }
    }
}

/// Atomic wrapper for the lifecycle phase, readable from any thread.
#[derive(Debug)]
pub struct AtomicPhase(AtomicU64);

impl AtomicPhase {
    /// Create a new atomic phase.
    #[must_use]
    pub const fn new(phase: Phase) -> Self {
        Self(AtomicU64::new(Self::encode(phase)))
    }

    const fn encode(phase: Phase) -> u64 {
        let attempt = match phase {
            Phase::Retrying(n) => n as u64,
            _ => 0,
        };
        (phase.tag() << 32) | attempt
    }

    /// Load the current phase.
    #[must_use]
    pub fn load(&self) -> Phase {
        let raw = self.0.load(Ordering::SeqCst);
        match raw >> 32 {
            0 => Phase::Idle,
            1 => Phase::Connecting,
            2 => Phase::Connected,
            3 => Phase::Retrying((raw & u64::from(u32::MAX)) as u32),
            _ => Phase::Failed,
        }
    }

    /// Store a new phase.
    pub fn store(&self, phase: Phase) {
        self.0.store(Self::encode(phase), Ordering::SeqCst);
    }
}
