//! Event delivery to subscribed callbacks.
//!
//! Thread-safe registry of event subscribers. A subscriber is either
//! global (receives everything) or bound to a window (receives broadcasts
//! plus that window's scoped events). Callbacks run synchronously on the
//! emitting thread and must not block.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::events::{AuthorityEvent, EventScope};
use crate::tree::WindowId;

/// A unique identifier for a subscription.
pub type SubscriptionId = u64;

/// Callback function type for authority events.
pub type EventCallback = Arc<dyn Fn(&AuthorityEvent) + Send + Sync>;

struct Subscriber {
    window: Option<WindowId>,
    callback: EventCallback,
}

/// Thread-safe event fan-out with scope-aware routing.
pub struct EventBus {
    subscribers: RwLock<HashMap<SubscriptionId, Subscriber>>,
    next_id: AtomicU64,
}

impl EventBus {
    /// Create a new empty bus.
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Subscribe to every event. Returns an id for [`unsubscribe`].
    ///
    /// [`unsubscribe`]: EventBus::unsubscribe
    pub fn subscribe(&self, callback: EventCallback) -> SubscriptionId {
        self.insert(None, callback)
    }

    /// Subscribe to broadcasts plus events scoped to `window`.
    pub fn subscribe_window(&self, window: WindowId, callback: EventCallback) -> SubscriptionId {
        self.insert(Some(window), callback)
    }

    fn insert(&self, window: Option<WindowId>, callback: EventCallback) -> SubscriptionId {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.subscribers
            .write()
            .unwrap()
            .insert(id, Subscriber { window, callback });
        id
    }

    /// Remove a subscription. Returns `true` if it existed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscribers.write().unwrap().remove(&id).is_some()
    }

    /// Deliver an event to every subscriber its scope reaches.
    ///
    /// Callbacks are invoked synchronously in an undefined order. A
    /// panicking callback does not affect the others.
    pub fn emit(&self, event: &AuthorityEvent) {
        let scope = event.scope();
        let subscribers = self.subscribers.read().unwrap();
        for subscriber in subscribers.values() {
            let reached = match (scope, subscriber.window) {
                (EventScope::Broadcast, _) => true,
                (EventScope::Window(_), None) => true,
                (EventScope::Window(w), Some(bound)) => w == bound,
            };
            if !reached {
                continue;
            }
            let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                (subscriber.callback)(event);
            }));
        }
    }

    /// Number of active subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().unwrap().len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .field("next_id", &self.next_id.load(Ordering::SeqCst))
            .finish()
    }
}
