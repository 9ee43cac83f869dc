//! Slot store abstraction for the cross-tab channel.
//!
//! A slot store is an origin-scoped key/value map whose changes can be
//! observed. Every write carries the writer's [`ContextId`]; observers use it
//! to ignore their own writes, matching how shared browser storage never
//! notifies the tab that performed the write.
//!
//! # Key Format
//!
//! Keys follow `{prefix}:{topic}`. Build them through [`SlotKey::for_topic`]
//! rather than by hand.
//!
//! # Change Semantics
//!
//! - Writing the value a slot already holds is not a change.
//! - Removing a slot produces a change with `new_value: None`.
//! - Multiple writers overwrite each other without coordination.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use helios_core::{ChannelError, ContextId, HeliosResult, Topic};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Well-known key of the slot that carries one topic's signals.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotKey(String);

impl SlotKey {
    pub fn for_topic(prefix: &str, topic: &Topic) -> Self {
        Self(format!("{prefix}:{topic}"))
    }

    /// Rebuild a key read back from storage.
    pub fn parse(raw: &str) -> Result<Self, ChannelError> {
        match raw.split_once(':') {
            Some((prefix, topic)) if !prefix.is_empty() && Topic::new(topic).is_ok() => {
                Ok(Self(raw.to_string()))
            }
            _ => Err(ChannelError::InvalidKey {
                key: raw.to_string(),
                reason: "expected {prefix}:{topic}".to_string(),
            }),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Topic part of the key, if this key belongs to `prefix`.
    pub fn topic_under(&self, prefix: &str) -> Option<Topic> {
        let (p, topic) = self.0.split_once(':')?;
        if p != prefix {
            return None;
        }
        Topic::new(topic).ok()
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stored form of one slot.
///
/// `value: None` is a tombstone left by a removal, so that other processes
/// polling the store can notice it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotRecord {
    pub value: Option<String>,
    pub writer: ContextId,
    pub written_at: DateTime<Utc>,
    /// Unique per write; lets pollers detect rewrites.
    pub stamp: Uuid,
    /// On tombstones, the value the removal replaced.
    #[serde(default)]
    pub cleared: Option<ClearedValue>,
}

/// Value (and its writer) removed by a tombstone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearedValue {
    pub value: String,
    pub writer: ContextId,
}

impl SlotRecord {
    pub fn new(writer: ContextId, value: Option<String>) -> Self {
        Self {
            value,
            writer,
            written_at: Utc::now(),
            stamp: Uuid::now_v7(),
            cleared: None,
        }
    }

    /// Tombstone replacing `previous`.
    pub fn tombstone(writer: ContextId, previous: &SlotRecord) -> Self {
        let cleared = previous.value.clone().map(|value| ClearedValue {
            value,
            writer: previous.writer,
        });
        Self {
            cleared,
            ..Self::new(writer, None)
        }
    }
}

/// A change observed on the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotChange {
    pub key: SlotKey,
    pub new_value: Option<String>,
    pub writer: ContextId,
}

impl SlotChange {
    pub fn from_record(key: SlotKey, record: &SlotRecord) -> Self {
        Self {
            key,
            new_value: record.value.clone(),
            writer: record.writer,
        }
    }
}

/// Shared, observable key/value slots.
///
/// Implementations must be safe to share across tasks and must broadcast a
/// [`SlotChange`] for every effective write or removal.
#[async_trait]
pub trait SlotStore: Send + Sync {
    /// Current value of a slot, or `None` if it is unset.
    async fn read(&self, key: &SlotKey) -> HeliosResult<Option<String>>;

    /// Set a slot. Writing the current value again is a no-op.
    async fn write(&self, writer: ContextId, key: &SlotKey, value: &str) -> HeliosResult<()>;

    /// Clear a slot. Returns whether a value was present.
    async fn remove(&self, writer: ContextId, key: &SlotKey) -> HeliosResult<bool>;

    /// Subscribe to all future changes, from every writer.
    fn changes(&self) -> broadcast::Receiver<SlotChange>;
}
