//! Same-tab channel: in-process event bus for one execution context.
//!
//! Slot writes are invisible to the context that made them, so publishers
//! also dispatch every signal here for listeners living alongside them.

use helios_core::{ContextId, InvalidationSignal};
use tokio::sync::broadcast;
use tracing::debug;

/// Broadcast bus scoped to one context.
#[derive(Clone)]
pub struct SameTabBus {
    context: ContextId,
    tx: broadcast::Sender<InvalidationSignal>,
}

impl SameTabBus {
    /// Create a bus whose listeners buffer up to `capacity` signals before
    /// they start lagging.
    pub fn new(context: ContextId, capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { context, tx }
    }

    pub fn context(&self) -> ContextId {
        self.context
    }

    /// Deliver a signal to every current listener.
    ///
    /// Non-blocking. With no listeners the signal is simply dropped.
    pub fn dispatch(&self, signal: InvalidationSignal) {
        let topic = signal.topic.clone();
        match self.tx.send(signal) {
            Ok(receivers) => {
                debug!(context = %self.context, topic = %topic, receivers, "Same-tab signal dispatched");
            }
            Err(_) => {
                debug!(context = %self.context, topic = %topic, "No same-tab listeners");
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<InvalidationSignal> {
        self.tx.subscribe()
    }

    pub fn listener_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
