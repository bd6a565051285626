//! Change notifications.
//!
//! Events are queued while the store write lock is held and delivered after
//! it is released, by whichever caller finds the bus idle. Listeners therefore
//! never run under a store lock and may call back into the simulator; events
//! they cause are appended to the queue and delivered after the current one.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tokio::sync::broadcast;

/// What happened to a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    /// Container created.
    Create,
    /// Container started.
    Start,
    /// Stop accepted, container is going down.
    Die,
    /// Container stopped.
    Stop,
    /// Container removed.
    Destroy,
    /// Image removal accepted.
    Untag,
    /// Image removed.
    Delete,
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Create => "create",
            Self::Start => "start",
            Self::Die => "die",
            Self::Stop => "stop",
            Self::Destroy => "destroy",
            Self::Untag => "untag",
            Self::Delete => "delete",
        };
        f.write_str(s)
    }
}

/// A `{status, id}` notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// What happened.
    pub status: EventStatus,
    /// Full ID of the affected container or image.
    pub id: String,
}

impl Event {
    /// Creates a new event.
    #[must_use]
    pub fn new(status: EventStatus, id: impl Into<String>) -> Self {
        Self {
            status,
            id: id.into(),
        }
    }
}

/// Handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Listener = Arc<dyn Fn(&Event) + Send + Sync>;

/// Listener registry with synchronous fan-out.
pub struct EventBus {
    listeners: RwLock<BTreeMap<SubscriptionId, Listener>>,
    next_id: AtomicU64,
    sender: broadcast::Sender<Event>,
    queue: Mutex<VecDeque<(Event, Vec<Listener>)>>,
    draining: AtomicBool,
}

impl EventBus {
    /// Creates a new event bus. `capacity` bounds the broadcast backlog
    /// kept for slow [`watch`](Self::watch) receivers.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            listeners: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            sender,
            queue: Mutex::new(VecDeque::new()),
            draining: AtomicBool::new(false),
        }
    }

    /// Registers a listener for every future event.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, Arc::new(listener));
        id
    }

    /// Removes a listener. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .is_some()
    }

    /// Returns a broadcast receiver for async consumers.
    #[must_use]
    pub fn watch(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Publishes an event to every current listener.
    pub fn publish(&self, event: Event) {
        self.enqueue(event);
        self.flush();
    }

    /// Queues an event for the listeners registered right now.
    pub(crate) fn enqueue(&self, event: Event) {
        let targets: Vec<Listener> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back((event, targets));
    }

    fn pop(&self) -> Option<(Event, Vec<Listener>)> {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }

    /// Delivers queued events unless another caller is already doing so.
    ///
    /// A panicking listener unwinds out of this call, but the bus stays
    /// usable: remaining events are delivered by the next flush.
    pub(crate) fn flush(&self) {
        loop {
            if self.draining.swap(true, Ordering::AcqRel) {
                return;
            }
            {
                let _guard = DrainGuard(&self.draining);
                while let Some((event, targets)) = self.pop() {
                    tracing::debug!(status = %event.status, id = %event.id, "event");
                    for listener in &targets {
                        listener(&event);
                    }
                    let _ = self.sender.send(event);
                }
            }

            // An event queued between the last pop and the guard releasing
            // the flag would otherwise wait for the next publish.
            let empty = self
                .queue
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .is_empty();
            if empty {
                return;
            }
        }
    }
}

/// Clears the draining flag when delivery ends, including by unwinding.
struct DrainGuard<'a>(&'a AtomicBool);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listener_count())
            .finish_non_exhaustive()
    }
}
