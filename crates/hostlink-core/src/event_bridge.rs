//! Host Event Bridge - typed pub/sub for events pushed by the host process
//!
//! The host adapter feeds [`HostEvent`]s into a [`HostEventSender`]. The
//! bridge's dispatch loop ([`HostEventBridge::run`]) drains them in receipt
//! order and invokes every registration for the event's kind, synchronously
//! and in registration order. Handlers that need async work spawn it
//! themselves; dispatch never waits on it.
//!
//! Registrations return an explicit [`Subscription`] handle. Unsubscribing is
//! idempotent and safe after the bridge itself has been dropped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::{HostEvent, HostEventKind};

/// Callback invoked once per event occurrence
pub type HostEventHandler = Arc<dyn Fn(&HostEvent) + Send + Sync>;

struct Registration {
    id: Uuid,
    kind: HostEventKind,
    handler: HostEventHandler,
}

struct BridgeInner {
    registrations: RwLock<Vec<Registration>>,
    shutdown: CancellationToken,
}

/// Typed publish/subscribe bridge for host events
#[derive(Clone)]
pub struct HostEventBridge {
    inner: Arc<BridgeInner>,
}

impl HostEventBridge {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BridgeInner {
                registrations: RwLock::new(Vec::new()),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Register `handler` for every future occurrence of `kind`.
    pub fn register<F>(&self, kind: HostEventKind, handler: F) -> Subscription
    where
        F: Fn(&HostEvent) + Send + Sync + 'static,
    {
        let id = Uuid::new_v4();
        self.inner.registrations.write().push(Registration {
            id,
            kind,
            handler: Arc::new(handler),
        });

        debug!(event = %kind, subscription = %id, "[HostBridge] Registered handler");

        Subscription {
            id,
            kind,
            bridge: Arc::downgrade(&self.inner),
            active: AtomicBool::new(true),
        }
    }

    /// Deliver one event to every registration for its kind.
    ///
    /// Returns the number of handlers invoked. Handlers run outside the
    /// registration lock, so they may register or unsubscribe.
    pub fn publish(&self, event: &HostEvent) -> usize {
        let kind = event.kind();
        let handlers: Vec<HostEventHandler> = self
            .inner
            .registrations
            .read()
            .iter()
            .filter(|r| r.kind == kind)
            .map(|r| r.handler.clone())
            .collect();

        if handlers.is_empty() {
            debug!(event = %kind, "[HostBridge] No handlers for event");
            return 0;
        }

        debug!(event = %kind, handlers = handlers.len(), "[HostBridge] Dispatching");
        for handler in &handlers {
            handler(event);
        }
        handlers.len()
    }

    /// Number of live registrations for `kind`
    pub fn handler_count(&self, kind: HostEventKind) -> usize {
        self.inner
            .registrations
            .read()
            .iter()
            .filter(|r| r.kind == kind)
            .count()
    }

    /// Dispatch loop.
    ///
    /// Drains `receiver` in receipt order until the channel closes or
    /// [`shutdown`](Self::shutdown) is called.
    pub async fn run(&self, mut receiver: mpsc::UnboundedReceiver<HostEvent>) {
        info!("[HostBridge] Dispatch loop started");
        loop {
            tokio::select! {
                biased;
                _ = self.inner.shutdown.cancelled() => {
                    debug!("[HostBridge] Shutdown requested");
                    break;
                }
                next = receiver.recv() => match next {
                    Some(event) => {
                        self.publish(&event);
                    }
                    None => {
                        debug!("[HostBridge] Host event channel closed");
                        break;
                    }
                },
            }
        }
        info!("[HostBridge] Dispatch loop stopped");
    }

    /// Stop the dispatch loop. In-flight handler work is not affected.
    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }
}

impl Default for HostEventBridge {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle for one registration.
///
/// Dropping it does not unregister; call [`unsubscribe`](Self::unsubscribe)
/// or convert it with [`unsubscribe_on_drop`](Self::unsubscribe_on_drop).
pub struct Subscription {
    id: Uuid,
    kind: HostEventKind,
    bridge: Weak<BridgeInner>,
    active: AtomicBool,
}

impl Subscription {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> HostEventKind {
        self.kind
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Stop future deliveries to this registration.
    ///
    /// Returns `true` only for the call that actually removed it.
    pub fn unsubscribe(&self) -> bool {
        if !self.active.swap(false, Ordering::AcqRel) {
            return false;
        }

        if let Some(inner) = self.bridge.upgrade() {
            inner.registrations.write().retain(|r| r.id != self.id);
            debug!(event = %self.kind, subscription = %self.id, "[HostBridge] Unregistered handler");
        }
        true
    }

    pub fn unsubscribe_on_drop(self) -> SubscriptionGuard {
        SubscriptionGuard(self)
    }
}

/// Unsubscribes when dropped
pub struct SubscriptionGuard(Subscription);

impl SubscriptionGuard {
    pub fn subscription(&self) -> &Subscription {
        &self.0
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.0.unsubscribe();
    }
}

/// Producer handle given to the host adapter
#[derive(Clone)]
pub struct HostEventSender {
    sender: mpsc::UnboundedSender<HostEvent>,
}

impl HostEventSender {
    /// Queue an event. Returns `false` once the dispatch loop is gone.
    pub fn send(&self, event: HostEvent) -> bool {
        self.sender.send(event).is_ok()
    }

    /// Queue a named host message; unknown names are dropped.
    pub fn send_wire(&self, name: &str, payload: Value) -> bool {
        match HostEvent::from_wire(name, payload) {
            Some(event) => self.send(event),
            None => false,
        }
    }
}

/// Create the host event channel
pub fn host_event_channel() -> (HostEventSender, mpsc::UnboundedReceiver<HostEvent>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (HostEventSender { sender }, receiver)
}
