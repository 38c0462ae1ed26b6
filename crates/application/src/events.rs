//! Publish/subscribe channel for API events.
//!
//! Delivery is synchronous and best-effort: `emit` calls every subscriber
//! registered at that moment and returns. Nothing is buffered for
//! subscribers that register later.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use fleetgate_domain::ApiEvent;
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::{debug, trace};

type Handler = Arc<dyn Fn(&ApiEvent) + Send + Sync>;

/// Handle returned by [`EventDispatcher::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Default)]
struct Subscribers {
    next_id: AtomicU64,
    handlers: RwLock<Vec<(SubscriptionId, Handler)>>,
}

/// Process-wide event fan-out.
///
/// Cloning is cheap; all clones share the same subscriber list.
#[derive(Clone, Default)]
pub struct EventDispatcher {
    subscribers: Arc<Subscribers>,
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl EventDispatcher {
    /// Creates a dispatcher with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler. Registering the same closure twice delivers
    /// every event to it twice.
    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&ApiEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.subscribers.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers.handlers.write().push((id, Arc::new(handler)));
        id
    }

    /// Registers a channel subscriber for async consumers.
    ///
    /// The subscription ends when the receiver is dropped and the next
    /// event fails to send, or when `unsubscribe` is called.
    pub fn channel(&self) -> (SubscriptionId, mpsc::UnboundedReceiver<ApiEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.subscribe(move |event| {
            if tx.send(event.clone()).is_err() {
                trace!(event = event.name(), "Event receiver dropped");
            }
        });
        (id, rx)
    }

    /// Removes a handler. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.subscribers.handlers.write();
        let before = handlers.len();
        handlers.retain(|(existing, _)| *existing != id);
        handlers.len() != before
    }

    /// Publishes an event to every current subscriber.
    ///
    /// Handlers run on the caller's thread, outside the subscriber lock, so
    /// a handler may itself subscribe or unsubscribe. Returns the number of
    /// handlers called.
    pub fn emit(&self, event: &ApiEvent) -> usize {
        let handlers: Vec<Handler> = self
            .subscribers
            .handlers
            .read()
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect();

        if handlers.is_empty() {
            trace!(event = event.name(), "No subscribers, event dropped");
            return 0;
        }

        debug!(event = event.name(), subscribers = handlers.len(), "Emitting event");
        for handler in &handlers {
            handler(event);
        }
        handlers.len()
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.handlers.read().len()
    }
}
