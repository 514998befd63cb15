//! Event broadcast bridge.
//!
//! Forwards every event appended to a core [`EventLog`] onto a tokio
//! broadcast channel so async consumers can follow the log. Slow receivers
//! lag and lose the oldest events; the log itself is unaffected.
//!
//! [`EventLog`]: opsintel_core::EventLog

use opsintel_core::{Event, EventSubscriber};
use tokio::sync::broadcast;

pub const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub struct EventBroadcaster {
    sender: broadcast::Sender<Event>,
}

impl EventBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventSubscriber for EventBroadcaster {
    fn on_event(&self, event: &Event) {
        // No receivers is not an error
        if self.sender.send(event.clone()).is_err() {
            tracing::trace!(event_id = %event.id, "No broadcast receivers");
        }
    }
}
