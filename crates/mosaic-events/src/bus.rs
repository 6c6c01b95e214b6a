//! Event bus for broadcasting orchestrator events to subscribers.

use std::sync::Arc;

use mosaic_core::AppName;
use tokio::sync::broadcast;
use tracing::{trace, warn};

use crate::event::MosaicEvent;

/// Default channel capacity for the event bus.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Broadcast bus for [`MosaicEvent`]s.
///
/// Cloning the bus yields another handle onto the same channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Arc<MosaicEvent>>,
    capacity: usize,
}

impl EventBus {
    /// Create a new event bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new event bus with specified capacity.
    ///
    /// A capacity of zero is raised to one.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, _) = broadcast::channel(capacity);
        Self { sender, capacity }
    }

    /// Publish an event.
    ///
    /// Returns the number of receivers that got the event. Publishing with
    /// no receivers is not an error.
    pub fn publish(&self, event: MosaicEvent) -> usize {
        let event_type = event.event_type();
        match self.sender.send(Arc::new(event)) {
            Ok(count) => {
                trace!(event_type, receiver_count = count, "Event published");
                count
            },
            Err(_) => {
                trace!(event_type, "No receivers for event");
                0
            },
        }
    }

    /// Subscribe to every event.
    #[must_use]
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver::new(self.sender.subscribe(), None)
    }

    /// Subscribe to events concerning one application.
    ///
    /// Events without an application (route changes, state changes) are
    /// filtered out.
    #[must_use]
    pub fn subscribe_app(&self, app: AppName) -> EventReceiver {
        EventReceiver::new(self.sender.subscribe(), Some(app))
    }

    /// Number of live receivers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Get the channel capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiver for events from the event bus.
pub struct EventReceiver {
    receiver: broadcast::Receiver<Arc<MosaicEvent>>,
    app: Option<AppName>,
}

impl EventReceiver {
    fn new(receiver: broadcast::Receiver<Arc<MosaicEvent>>, app: Option<AppName>) -> Self {
        Self { receiver, app }
    }

    fn matches(&self, event: &MosaicEvent) -> bool {
        match &self.app {
            None => true,
            Some(app) => event.app() == Some(app),
        }
    }

    /// Receive the next matching event.
    ///
    /// Returns `None` once the bus is dropped. Lagging receivers skip the
    /// overwritten events and keep going.
    pub async fn recv(&mut self) -> Option<Arc<MosaicEvent>> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.matches(&event) => return Some(event),
                Ok(_) => {},
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    warn!(skipped = count, "Event receiver lagged, events dropped");
                },
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Receive the next matching event without waiting.
    pub fn try_recv(&mut self) -> Option<Arc<MosaicEvent>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.matches(&event) => return Some(event),
                Ok(_) => {},
                Err(broadcast::error::TryRecvError::Lagged(count)) => {
                    warn!(skipped = count, "Event receiver lagged, events dropped");
                },
                Err(
                    broadcast::error::TryRecvError::Empty | broadcast::error::TryRecvError::Closed,
                ) => return None,
            }
        }
    }

    /// Drain every event currently buffered.
    pub fn drain(&mut self) -> Vec<Arc<MosaicEvent>> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}
