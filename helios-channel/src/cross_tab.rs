//! Cross-tab channel: invalidation signals carried through a shared slot store.

use std::sync::Arc;

use chrono::Utc;
use helios_core::{ContextId, EmittedAt, HeliosResult, InvalidationSignal, Topic};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::slot::{SlotChange, SlotKey, SlotStore};

/// One context's endpoint on a shared slot store.
#[derive(Clone)]
pub struct CrossTabChannel {
    context: ContextId,
    prefix: String,
    store: Arc<dyn SlotStore>,
}

impl CrossTabChannel {
    pub fn new(context: ContextId, prefix: impl Into<String>, store: Arc<dyn SlotStore>) -> Self {
        Self {
            context,
            prefix: prefix.into(),
            store,
        }
    }

    pub fn context(&self) -> ContextId {
        self.context
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn key_for(&self, topic: &Topic) -> SlotKey {
        SlotKey::for_topic(&self.prefix, topic)
    }

    /// Store the signal's `emitted_at` under the topic's slot. Observers in
    /// other contexts see the change; this context does not.
    pub async fn publish(&self, signal: &InvalidationSignal) -> HeliosResult<()> {
        let key = self.key_for(&signal.topic);
        self.store
            .write(self.context, &key, &signal.emitted_at.to_slot_value())
            .await
    }

    /// Last value left in the topic's slot, if any.
    pub async fn pending(&self, topic: &Topic) -> HeliosResult<Option<String>> {
        self.store.read(&self.key_for(topic)).await
    }

    /// Remove the topic's slot value. Returns whether one was present.
    pub async fn clear(&self, topic: &Topic) -> HeliosResult<bool> {
        self.store.remove(self.context, &self.key_for(topic)).await
    }

    /// Start observing changes written by other contexts.
    pub fn observe(&self) -> CrossTabObserver {
        CrossTabObserver {
            context: self.context,
            prefix: self.prefix.clone(),
            rx: self.store.changes(),
        }
    }
}

/// What an observer hands back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observed {
    Signal(InvalidationSignal),
    /// The observer fell behind and `skipped` changes were lost.
    Lagged { skipped: u64 },
}

/// Receiving half of a [`CrossTabChannel`].
pub struct CrossTabObserver {
    context: ContextId,
    prefix: String,
    rx: broadcast::Receiver<SlotChange>,
}

impl CrossTabObserver {
    /// Wait for the next signal from another context.
    ///
    /// Skips this context's own writes, removals and keys outside the
    /// channel's prefix. Returns `None` once the store is gone.
    pub async fn recv(&mut self) -> Option<Observed> {
        loop {
            match self.rx.recv().await {
                Ok(change) => {
                    if let Some(signal) = self.accept(change) {
                        return Some(Observed::Signal(signal));
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(context = %self.context, skipped, "Cross-tab observer lagged");
                    return Some(Observed::Lagged { skipped });
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    fn accept(&self, change: SlotChange) -> Option<InvalidationSignal> {
        if change.writer == self.context {
            return None;
        }
        let topic = change.key.topic_under(&self.prefix)?;
        let value = change.new_value?;

        // Any value change is the trigger, whatever it holds.
        let emitted_at = value.parse::<EmittedAt>().unwrap_or_else(|_| {
            warn!(key = %change.key, value = %value, "Unparsable slot value, using receive time");
            EmittedAt::from_millis(Utc::now().timestamp_millis())
        });

        debug!(
            context = %self.context,
            topic = %topic,
            emitted_at = emitted_at.as_millis(),
            "Cross-tab signal observed"
        );
        Some(InvalidationSignal::new(topic, emitted_at))
    }
}
