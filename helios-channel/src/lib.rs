//! HELIOS Channel - Signal Transport
//!
//! The two delivery paths for invalidation signals:
//! - the cross-tab channel, a shared observable slot store
//!   ([`InMemorySlotStore`] within a process, [`LmdbSlotStore`] across
//!   processes) wrapped per context by [`CrossTabChannel`]
//! - the same-tab channel, an in-process [`SameTabBus`]

pub mod cross_tab;
pub mod lmdb;
pub mod memory;
pub mod same_tab;
pub mod slot;

pub use cross_tab::{CrossTabChannel, CrossTabObserver, Observed};
pub use lmdb::LmdbSlotStore;
pub use memory::InMemorySlotStore;
pub use same_tab::SameTabBus;
pub use slot::{ClearedValue, SlotChange, SlotKey, SlotRecord, SlotStore};
