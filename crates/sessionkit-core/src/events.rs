//! Session lifecycle events.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

/// Capacity of the event bus; slow subscribers lag past this.
const EVENT_BUS_CAPACITY: usize = 16;

/// Broadcast when a session has been forcibly ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct TerminationEvent {
    pub reason: String,
}

/// Fire-and-forget event dispatch.
pub trait EventSink: Send + Sync {
    fn broadcast(&self, event: &TerminationEvent) -> Result<()>;
}

/// In-process event bus over a tokio broadcast channel.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<TerminationEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_BUS_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TerminationEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for EventBus {
    /// Delivering to nobody is not an error.
    fn broadcast(&self, event: &TerminationEvent) -> Result<()> {
        match self.tx.send(event.clone()) {
            Ok(receivers) => debug!(reason = %event.reason, receivers, "Termination event sent"),
            Err(_) => debug!(reason = %event.reason, "No listeners for termination event"),
        }
        Ok(())
    }
}
