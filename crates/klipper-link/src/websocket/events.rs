//! Transport event types.

use tokio::sync::mpsc;

/// Low-level events reported by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Connection established.
    Opened,
    /// Text frame received.
    Message(String),
    /// Transport error. A failed open is always followed by `Closed`.
    Errored(String),
    /// Connection gone.
    Closed(String),
}

/// Where a transport reports the events of one open attempt.
///
/// Every open gets a sink tagged with a fresh epoch; the receiver drops events
/// whose epoch is no longer current.
#[derive(Debug, Clone)]
pub struct EventSink {
    epoch: u64,
    tx: mpsc::UnboundedSender<(u64, TransportEvent)>,
}

impl EventSink {
    /// Create a sink for the given epoch.
    #[must_use]
    pub const fn new(epoch: u64, tx: mpsc::UnboundedSender<(u64, TransportEvent)>) -> Self {
        Self { epoch, tx }
    }

    /// Epoch this sink reports for.
    #[must_use]
    pub const fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Report an event. Returns `false` if nobody is listening any more.
    pub fn emit(&self, event: TransportEvent) -> bool {
        self.tx.send((self.epoch, event)).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_tags_events_with_epoch() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = EventSink::new(4, tx);

        assert_eq!(sink.epoch(), 4);
        assert!(sink.emit(TransportEvent::Opened));
        assert!(sink.emit(TransportEvent::Message("{}".to_string())));

        assert_eq!(rx.try_recv().ok(), Some((4, TransportEvent::Opened)));
        assert_eq!(
            rx.try_recv().ok(),
            Some((4, TransportEvent::Message("{}".to_string())))
        );
    }

    #[test]
    fn test_emit_after_receiver_dropped() {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = EventSink::new(1, tx);
        drop(rx);

        assert!(!sink.emit(TransportEvent::Closed("connection closed".to_string())));
    }
}
