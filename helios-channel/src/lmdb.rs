//! LMDB-backed slot store shared between processes.
//!
//! Uses the heed crate (Rust bindings for LMDB). Every process that opens the
//! same directory sees the same slots, which makes this the cross-process
//! counterpart of origin-scoped browser storage.
//!
//! # Change Detection
//!
//! LMDB has no change notifications. Writes made through this handle are
//! broadcast immediately; writes made by other processes are picked up by
//! [`LmdbSlotStore::poll_changes`], usually driven by
//! [`LmdbSlotStore::spawn_poller`]. Each record carries a unique `stamp`, and
//! the store remembers the last stamp it has announced per key.
//!
//! # Record Format
//!
//! Key: UTF-8 slot key. Value: JSON-encoded [`SlotRecord`]. Removals are
//! stored as tombstones (`value: null`) so pollers can observe them.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions, RoTxn, RwTxn};
use helios_core::{ChannelError, ContextId, HeliosResult};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::slot::{SlotChange, SlotKey, SlotRecord, SlotStore};

fn txn_err(e: heed::Error) -> ChannelError {
    ChannelError::Transaction {
        reason: e.to_string(),
    }
}

fn poisoned() -> ChannelError {
    ChannelError::Transaction {
        reason: "slot snapshot lock poisoned".to_string(),
    }
}

#[derive(Debug, Clone)]
struct Seen {
    stamp: Uuid,
    value: Option<String>,
}

impl Seen {
    fn of(record: &SlotRecord) -> Self {
        Self {
            stamp: record.stamp,
            value: record.value.clone(),
        }
    }
}

/// Slot store persisted in an LMDB environment.
///
/// # Example
///
/// ```ignore
/// let store = Arc::new(LmdbSlotStore::open("/var/lib/helios/slots", 16, 64)?);
/// let poller = store.spawn_poller(Duration::from_millis(250));
/// ```
pub struct LmdbSlotStore {
    env: Env,
    db: Database<Bytes, Bytes>,
    /// Last announced record per key.
    seen: Mutex<HashMap<SlotKey, Seen>>,
    tx: broadcast::Sender<SlotChange>,
}

impl LmdbSlotStore {
    /// Open (or create) a slot store.
    ///
    /// # Arguments
    ///
    /// * `path` - Directory holding the LMDB files
    /// * `max_size_mb` - Maximum map size in megabytes
    /// * `capacity` - Changes buffered per observer before it lags
    ///
    /// Records already present are treated as seen, so opening a store never
    /// replays old signals.
    pub fn open<P: AsRef<Path>>(
        path: P,
        max_size_mb: usize,
        capacity: usize,
    ) -> Result<Self, ChannelError> {
        let display_path = path.as_ref().display().to_string();
        std::fs::create_dir_all(&path).map_err(|e| ChannelError::StoreOpen {
            path: display_path.clone(),
            reason: e.to_string(),
        })?;

        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(max_size_mb * 1024 * 1024)
                .max_dbs(1)
                .open(path.as_ref())
        }
        .map_err(|e| ChannelError::StoreOpen {
            path: display_path,
            reason: e.to_string(),
        })?;

        let mut wtxn = env.write_txn().map_err(txn_err)?;
        let db: Database<Bytes, Bytes> = env.create_database(&mut wtxn, None).map_err(txn_err)?;
        wtxn.commit().map_err(txn_err)?;

        let (tx, _rx) = broadcast::channel(capacity.max(1));
        let store = Self {
            env,
            db,
            seen: Mutex::new(HashMap::new()),
            tx,
        };

        let existing = store.scan()?;
        {
            let mut seen = store.seen.lock().map_err(|_| poisoned())?;
            for (key, record) in existing {
                seen.insert(key, Seen::of(&record));
            }
        }

        Ok(store)
    }

    fn decode(bytes: &[u8]) -> Result<SlotRecord, ChannelError> {
        serde_json::from_slice(bytes).map_err(|e| ChannelError::Serialization {
            reason: e.to_string(),
        })
    }

    fn get_record(&self, txn: &RoTxn, key: &SlotKey) -> Result<Option<SlotRecord>, ChannelError> {
        match self.db.get(txn, key.as_str().as_bytes()).map_err(txn_err)? {
            Some(bytes) => Self::decode(bytes).map(Some),
            None => Ok(None),
        }
    }

    /// Stage a record inside `wtxn` without announcing it.
    fn put_record(&self, wtxn: &mut RwTxn, key: &SlotKey, record: &SlotRecord) -> Result<(), ChannelError> {
        let bytes = serde_json::to_vec(record).map_err(|e| ChannelError::Serialization {
            reason: e.to_string(),
        })?;
        self.db
            .put(wtxn, key.as_str().as_bytes(), &bytes)
            .map_err(txn_err)
    }

    fn current_record(&self, key: &SlotKey) -> Result<Option<SlotRecord>, ChannelError> {
        let rtxn = self.env.read_txn().map_err(txn_err)?;
        self.get_record(&rtxn, key)
    }

    /// Collect every well-formed record. Malformed entries are skipped.
    fn scan(&self) -> Result<Vec<(SlotKey, SlotRecord)>, ChannelError> {
        let rtxn = self.env.read_txn().map_err(txn_err)?;
        let iter = self.db.iter(&rtxn).map_err(txn_err)?;

        let mut records = Vec::new();
        for result in iter {
            let (raw_key, raw_value) = match result {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable slot entry");
                    continue;
                }
            };
            let key = std::str::from_utf8(raw_key)
                .map_err(|e| ChannelError::InvalidKey {
                    key: String::from_utf8_lossy(raw_key).into_owned(),
                    reason: e.to_string(),
                })
                .and_then(SlotKey::parse);
            match (key, Self::decode(raw_value)) {
                (Ok(key), Ok(record)) => records.push((key, record)),
                (Err(e), _) | (_, Err(e)) => warn!(error = %e, "Skipping malformed slot entry"),
            }
        }
        Ok(records)
    }

    /// Write (or tombstone) a slot and announce it. Returns false when the
    /// slot already held `value`.
    ///
    /// The compare and the put share one write transaction. LMDB serializes
    /// writers across processes, so a foreign write can never land between
    /// reading the current record and replacing it. A current record this
    /// handle never announced is announced first.
    fn apply(
        &self,
        writer: ContextId,
        key: &SlotKey,
        value: Option<&str>,
    ) -> Result<bool, ChannelError> {
        let mut seen = self.seen.lock().map_err(|_| poisoned())?;
        let mut wtxn = self.env.write_txn().map_err(txn_err)?;

        let current = self.get_record(&wtxn, key)?;
        let current_value = current.as_ref().and_then(|record| record.value.as_deref());
        if current_value == value {
            return Ok(false);
        }

        let record = match (value, &current) {
            (Some(value), _) => SlotRecord::new(writer, Some(value.to_string())),
            (None, Some(previous)) => SlotRecord::tombstone(writer, previous),
            (None, None) => return Ok(false),
        };
        self.put_record(&mut wtxn, key, &record)?;
        wtxn.commit().map_err(txn_err)?;

        let unannounced = current.filter(|previous| {
            previous.value.is_some()
                && seen.get(key).map_or(true, |s| s.stamp != previous.stamp)
        });
        seen.insert(key.clone(), Seen::of(&record));
        drop(seen);

        if let Some(previous) = unannounced {
            debug!(key = %key, "Announcing foreign write found while writing");
            self.announce(SlotChange::from_record(key.clone(), &previous));
        }
        self.announce(SlotChange::from_record(key.clone(), &record));
        Ok(true)
    }

    fn announce(&self, change: SlotChange) {
        let key = change.key.clone();
        match self.tx.send(change) {
            Ok(receivers) => debug!(key = %key, receivers, "Slot change broadcast"),
            Err(_) => debug!(key = %key, "No observers for slot change"),
        }
    }

    /// Scan the store for writes this handle has not announced yet and
    /// broadcast them. Returns the number of changes found.
    ///
    /// A tombstone whose cleared value was never announced here (another
    /// process wrote and cleared it between two polls) first yields that
    /// value, so the signal is not lost.
    pub fn poll_changes(&self) -> HeliosResult<usize> {
        let mut seen = self.seen.lock().map_err(|_| poisoned())?;
        let records = self.scan()?;

        let mut changes = Vec::new();
        for (key, record) in records {
            let previous = seen.get(&key);
            if previous.is_some_and(|p| p.stamp == record.stamp) {
                continue;
            }
            if let Some(cleared) = &record.cleared {
                let announced = previous.and_then(|p| p.value.as_deref());
                if announced != Some(cleared.value.as_str()) {
                    changes.push(SlotChange {
                        key: key.clone(),
                        new_value: Some(cleared.value.clone()),
                        writer: cleared.writer,
                    });
                }
            }
            seen.insert(key.clone(), Seen::of(&record));
            changes.push(SlotChange::from_record(key, &record));
        }
        drop(seen);

        let found = changes.len();
        for change in changes {
            self.announce(change);
        }
        Ok(found)
    }

    /// Poll for foreign writes every `interval` until the store is dropped.
    pub fn spawn_poller(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let store = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(store) = store.upgrade() else {
                    debug!("Slot store dropped, stopping poller");
                    break;
                };
                match store.poll_changes() {
                    Ok(0) => {}
                    Ok(found) => debug!(found, "Picked up foreign slot changes"),
                    Err(e) => warn!(error = %e, "Slot poll failed"),
                }
            }
        })
    }
}

#[async_trait]
impl SlotStore for LmdbSlotStore {
    async fn read(&self, key: &SlotKey) -> HeliosResult<Option<String>> {
        let record = self.current_record(key)?;
        Ok(record.and_then(|record| record.value))
    }

    async fn write(&self, writer: ContextId, key: &SlotKey, value: &str) -> HeliosResult<()> {
        self.apply(writer, key, Some(value))?;
        Ok(())
    }

    async fn remove(&self, writer: ContextId, key: &SlotKey) -> HeliosResult<bool> {
        Ok(self.apply(writer, key, None)?)
    }

    fn changes(&self) -> broadcast::Receiver<SlotChange> {
        self.tx.subscribe()
    }
}
