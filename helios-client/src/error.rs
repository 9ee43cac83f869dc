//! Error types for the watch binary.

use crate::config::ClientConfigError;
use crate::content_client::ContentClientError;
use helios_core::HeliosError;

#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Config(#[from] ClientConfigError),
    #[error(transparent)]
    Client(#[from] ContentClientError),
    #[error(transparent)]
    Helios(#[from] HeliosError),
    #[error("Failed to initialise logging: {0}")]
    Tracing(String),
    #[error("Unknown content kind {0:?} (expected an endpoint such as \"faqs\" or a topic such as \"faq_updated\")")]
    UnknownKind(String),
}
