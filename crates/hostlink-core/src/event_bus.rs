//! Event Bus - outgoing shell notifications
//!
//! Everything the controller wants the presentation layer to know about
//! (session changes, install prompts, forwarded installs, ambient changes)
//! flows through this bus as a [`ShellEvent`].
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                 Event Bus (broadcast channel)                   │
//! │                                                                 │
//! │  Producers:                    Consumers:                       │
//! │  ├─ SessionSynchronizer        ├─ UI bridge (→ webview)         │
//! │  ├─ InstallStaging             └─ tests / diagnostics           │
//! │  └─ AmbientWatchers                                             │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::domain::ShellEvent;

/// Default channel capacity for the event bus
pub const DEFAULT_CAPACITY: usize = 256;

/// Central hub for shell event distribution
///
/// Every subscriber receives its own copy of every event emitted after it
/// subscribed.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ShellEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// A zero capacity is bumped to 1 (broadcast channels reject 0)
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Get a sender for emitting events
    pub fn sender(&self) -> EventSender {
        EventSender::new(self.sender.clone())
    }

    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver::new(self.sender.subscribe())
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Cheaply cloneable handle used by producers
#[derive(Clone)]
pub struct EventSender {
    sender: broadcast::Sender<ShellEvent>,
}

impl EventSender {
    fn new(sender: broadcast::Sender<ShellEvent>) -> Self {
        Self { sender }
    }

    /// Emit an event.
    ///
    /// Returns the number of receivers; 0 when nobody listens (not an error).
    pub fn emit(&self, event: ShellEvent) -> usize {
        let type_name = event.type_name();
        match self.sender.send(event) {
            Ok(count) => {
                debug!(
                    event_type = type_name,
                    receivers = count,
                    "[EventBus] Emitted event"
                );
                count
            }
            Err(_) => {
                debug!(event_type = type_name, "[EventBus] No receivers for event");
                0
            }
        }
    }

    /// Emit and warn when nobody is listening.
    ///
    /// Used for events the user must see (confirmation prompts).
    pub fn emit_or_warn(&self, event: ShellEvent) {
        let type_name = event.type_name();
        if self.emit(event) == 0 {
            warn!(
                event_type = type_name,
                "[EventBus] Event emitted but no receivers listening"
            );
        }
    }

    pub fn has_subscribers(&self) -> bool {
        self.sender.receiver_count() > 0
    }
}

/// Consumer side of the bus
pub struct EventReceiver {
    receiver: broadcast::Receiver<ShellEvent>,
}

impl EventReceiver {
    fn new(receiver: broadcast::Receiver<ShellEvent>) -> Self {
        Self { receiver }
    }

    /// Receive the next event.
    ///
    /// Returns `None` once the channel is closed. Lag is logged and skipped.
    pub async fn recv(&mut self) -> Option<ShellEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(
                        skipped_events = skipped,
                        "[EventBus] Receiver lagged, skipped {} events", skipped
                    );
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("[EventBus] Channel closed");
                    return None;
                }
            }
        }
    }

    pub fn try_recv(&mut self) -> Option<ShellEvent> {
        match self.receiver.try_recv() {
            Ok(event) => Some(event),
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                warn!(
                    skipped_events = skipped,
                    "[EventBus] Receiver lagged on try_recv"
                );
                self.receiver.try_recv().ok()
            }
            Err(_) => None,
        }
    }

    /// Drain everything currently buffered
    pub fn drain(&mut self) -> Vec<ShellEvent> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}

pub type SharedEventBus = Arc<EventBus>;

pub fn create_shared_event_bus(capacity: usize) -> SharedEventBus {
    Arc::new(EventBus::with_capacity(capacity))
}
