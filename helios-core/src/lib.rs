//! HELIOS Core - Shared Types
//!
//! Identity, topics, the invalidation signal, the content store seam and the
//! error taxonomy. Every other HELIOS crate depends on this one.

pub mod config;
pub mod content;
pub mod error;
pub mod identity;
pub mod signal;
pub mod topic;

pub use config::NotifyConfig;
pub use content::{ContentFields, ContentItem, ContentStore};
pub use error::{
    ChannelError, ConfigError, ContentError, HeliosError, HeliosResult, ValidationError,
};
pub use identity::{ContextId, EmittedAt, LogicalClock};
pub use signal::InvalidationSignal;
pub use topic::{ContentKind, Topic};
