//! Observable state cell with synchronous, ordered notification.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, ReentrantMutex, RwLock};

/// Identifies one subscription on a [`StatePublisher`] or [`StateReader`].
pub type SubscriptionId = u64;

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Shared<T> {
    value: RwLock<T>,
    subscribers: Mutex<Vec<(SubscriptionId, Callback<T>)>>,
    next_id: AtomicU64,
    /// Serializes `set` so notifications for one value finish before the next
    /// value is written. Reentrant so a subscriber may itself call `set`.
    writer: ReentrantMutex<()>,
}

impl<T: Clone> Shared<T> {
    fn get(&self) -> T {
        self.value.read().clone()
    }

    fn subscribe(&self, callback: Callback<T>) -> SubscriptionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers.lock().push((id, callback));
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.lock();
        let before = subscribers.len();
        subscribers.retain(|(existing, _)| *existing != id);
        subscribers.len() != before
    }

    fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

/// A shared mutable cell that notifies subscribers on every write.
///
/// `set` overwrites the value and then calls every current subscriber in
/// subscription order with the new value, on the calling thread, before
/// returning. Identical consecutive values are still delivered.
///
/// Cloning yields another writable handle to the same cell. Hand out a
/// [`StateReader`] to code that should only observe it.
pub struct StatePublisher<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for StatePublisher<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for StatePublisher<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatePublisher")
            .field("value", &*self.shared.value.read())
            .field("subscribers", &self.shared.subscribers.lock().len())
            .finish()
    }
}

impl<T: Clone + Send + Sync + 'static> StatePublisher<T> {
    /// Create a cell holding `initial`.
    #[must_use]
    pub fn new(initial: T) -> Self {
        Self {
            shared: Arc::new(Shared {
                value: RwLock::new(initial),
                subscribers: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
                writer: ReentrantMutex::new(()),
            }),
        }
    }

    /// Read-only handle to this cell.
    #[must_use]
    pub fn reader(&self) -> StateReader<T> {
        StateReader {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.shared.get()
    }

    /// Overwrite the value and notify every subscriber.
    pub fn set(&self, value: T) {
        let _writer = self.shared.writer.lock();

        *self.shared.value.write() = value.clone();

        // Snapshot the list so callbacks can subscribe or unsubscribe.
        let callbacks: Vec<Callback<T>> = self
            .shared
            .subscribers
            .lock()
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();

        for callback in callbacks {
            callback(&value);
        }
    }

    /// Register a callback for future writes.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.shared.subscribe(Arc::new(callback))
    }

    /// Remove a subscription. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.shared.unsubscribe(id)
    }

    /// Number of registered subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.shared.subscriber_count()
    }
}

/// Observe-only handle to a [`StatePublisher`] cell.
///
/// Sees every write made through the publisher and may subscribe to it, but
/// cannot write.
pub struct StateReader<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for StateReader<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for StateReader<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateReader")
            .field("value", &*self.shared.value.read())
            .field("subscribers", &self.shared.subscribers.lock().len())
            .finish()
    }
}

impl<T: Clone + Send + Sync + 'static> StateReader<T> {
    /// Current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.shared.get()
    }

    /// Register a callback for future writes.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.shared.subscribe(Arc::new(callback))
    }

    /// Remove a subscription. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.shared.unsubscribe(id)
    }

    /// Number of registered subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.shared.subscriber_count()
    }
}
