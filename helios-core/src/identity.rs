//! Execution-context identity and the logical clock behind `EmittedAt`.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Identifies one execution context (a viewer or admin "tab").
///
/// Cross-tab slot writes carry the writer's context so that the writing
/// context never observes its own change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextId(Uuid);

impl ContextId {
    /// Create a fresh, timestamp-sortable context id.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ContextId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Emission timestamp of an invalidation signal, in milliseconds since the
/// Unix epoch.
///
/// The slot wire form is the decimal string of the inner value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmittedAt(i64);

impl EmittedAt {
    pub fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    pub fn as_millis(&self) -> i64 {
        self.0
    }

    /// Wall-clock view of this timestamp, when representable.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.0)
    }

    /// Encode for storage in a cross-tab slot.
    pub fn to_slot_value(&self) -> String {
        self.0.to_string()
    }
}

impl fmt::Display for EmittedAt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EmittedAt {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i64>()
            .map(Self)
            .map_err(|_| ValidationError::InvalidEmittedAt {
                value: s.to_string(),
            })
    }
}

/// Strictly monotonic millisecond clock.
///
/// Each tick returns `max(now, last + 1)`, so two emissions inside the same
/// millisecond (or across a wall-clock step backwards) still get distinct,
/// increasing values.
#[derive(Debug, Default)]
pub struct LogicalClock {
    last: AtomicI64,
}

impl LogicalClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the clock and return the new timestamp.
    pub fn tick(&self) -> EmittedAt {
        self.tick_at(Utc::now().timestamp_millis())
    }

    /// Advance the clock using an explicit wall-clock reading.
    pub fn tick_at(&self, now_millis: i64) -> EmittedAt {
        let mut last = self.last.load(Ordering::Relaxed);
        loop {
            let next = now_millis.max(last.saturating_add(1));
            match self
                .last
                .compare_exchange_weak(last, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return EmittedAt(next),
                Err(observed) => last = observed,
            }
        }
    }

    /// Fold in a timestamp seen from another context so the next tick
    /// lands after it.
    pub fn witness(&self, at: EmittedAt) {
        self.last.fetch_max(at.0, Ordering::AcqRel);
    }

    /// Last value handed out, if any.
    pub fn last(&self) -> Option<EmittedAt> {
        match self.last.load(Ordering::Acquire) {
            0 => None,
            value => Some(EmittedAt(value)),
        }
    }
}
