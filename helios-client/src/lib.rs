//! HELIOS Client - content store access for the admin panel and viewers
//!
//! [`ContentClient`] talks to the external REST content store,
//! [`AdminEditor`] emits after every confirmed save and [`mount_viewer`]
//! keeps a viewer's list of one content kind fresh.

pub mod config;
pub mod content_client;
pub mod editor;
pub mod error;
pub mod viewer;

pub use config::{ClientConfig, ClientConfigError, NotifySection};
pub use content_client::{ContentClient, ContentClientError};
pub use editor::AdminEditor;
pub use error::WatchError;
pub use viewer::{mount_viewer, StoreFetcher};
