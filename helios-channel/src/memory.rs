//! In-process slot store.
//!
//! Shared by every context of one process through an `Arc`. Used by tests and
//! by deployments where all viewers and editors run in the same process.

use std::collections::HashMap;

use async_trait::async_trait;
use helios_core::{ContextId, HeliosResult};
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

use crate::slot::{SlotChange, SlotKey, SlotRecord, SlotStore};

/// Slot store backed by a `HashMap`.
///
/// Uses tokio::sync::RwLock for safe async access. Changes are broadcast
/// while the write lock is held, so observers see them in write order.
#[derive(Debug)]
pub struct InMemorySlotStore {
    slots: RwLock<HashMap<SlotKey, SlotRecord>>,
    tx: broadcast::Sender<SlotChange>,
}

impl InMemorySlotStore {
    /// Create a store whose observers buffer up to `capacity` changes.
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self {
            slots: RwLock::new(HashMap::new()),
            tx,
        }
    }

    /// Number of slots currently holding a value.
    pub async fn len(&self) -> usize {
        self.slots.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.slots.read().await.is_empty()
    }

    fn announce(&self, change: SlotChange) {
        let key = change.key.clone();
        match self.tx.send(change) {
            Ok(receivers) => debug!(key = %key, receivers, "Slot change broadcast"),
            Err(_) => debug!(key = %key, "No observers for slot change"),
        }
    }
}

impl Default for InMemorySlotStore {
    fn default() -> Self {
        Self::new(64)
    }
}

#[async_trait]
impl SlotStore for InMemorySlotStore {
    async fn read(&self, key: &SlotKey) -> HeliosResult<Option<String>> {
        let slots = self.slots.read().await;
        Ok(slots.get(key).and_then(|record| record.value.clone()))
    }

    async fn write(&self, writer: ContextId, key: &SlotKey, value: &str) -> HeliosResult<()> {
        let mut slots = self.slots.write().await;
        if slots
            .get(key)
            .and_then(|record| record.value.as_deref())
            .is_some_and(|current| current == value)
        {
            return Ok(());
        }

        let record = SlotRecord::new(writer, Some(value.to_string()));
        let change = SlotChange::from_record(key.clone(), &record);
        slots.insert(key.clone(), record);
        self.announce(change);
        Ok(())
    }

    async fn remove(&self, writer: ContextId, key: &SlotKey) -> HeliosResult<bool> {
        let mut slots = self.slots.write().await;
        if slots.remove(key).is_none() {
            return Ok(false);
        }
        self.announce(SlotChange {
            key: key.clone(),
            new_value: None,
            writer,
        });
        Ok(true)
    }

    fn changes(&self) -> broadcast::Receiver<SlotChange> {
        self.tx.subscribe()
    }
}
