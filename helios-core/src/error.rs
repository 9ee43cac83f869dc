//! Error types for HELIOS operations

use thiserror::Error;

/// Cross-tab channel and slot store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChannelError {
    #[error("Failed to open slot store at {path}: {reason}")]
    StoreOpen { path: String, reason: String },

    #[error("Slot store transaction failed: {reason}")]
    Transaction { reason: String },

    #[error("Slot record serialization failed: {reason}")]
    Serialization { reason: String },

    #[error("Invalid slot key {key}: {reason}")]
    InvalidKey { key: String, reason: String },
}

/// Content store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ContentError {
    #[error("Request to {endpoint} failed with status {status}: {message}")]
    RequestFailed {
        endpoint: String,
        status: u16,
        message: String,
    },

    #[error("Transport failure for {endpoint}: {reason}")]
    Transport { endpoint: String, reason: String },

    #[error("Invalid response from {endpoint}: {reason}")]
    InvalidResponse { endpoint: String, reason: String },

    #[error("Content not found: {endpoint}/{id}")]
    NotFound { endpoint: String, id: String },

    #[error("Fetch for {topic} did not complete: {reason}")]
    FetchAborted { topic: String, reason: String },
}

/// Validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid topic {topic:?}: {reason}")]
    InvalidTopic { topic: String, reason: String },

    #[error("Invalid emitted-at value {value:?}")]
    InvalidEmittedAt { value: String },

    #[error("Unknown topic: {topic}")]
    UnknownTopic { topic: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all HELIOS errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HeliosError {
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("Content error: {0}")]
    Content(#[from] ContentError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for HELIOS operations.
pub type HeliosResult<T> = Result<T, HeliosError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_error_display() {
        let err = ContentError::RequestFailed {
            endpoint: "achievements".to_string(),
            status: 503,
            message: "unavailable".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("achievements"));
        assert!(msg.contains("503"));
    }

    #[test]
    fn test_master_error_from_conversions() {
        let err: HeliosError = ValidationError::UnknownTopic {
            topic: "nope".to_string(),
        }
        .into();
        assert!(matches!(err, HeliosError::Validation(_)));

        let err: HeliosError = ChannelError::Transaction {
            reason: "map full".to_string(),
        }
        .into();
        assert!(err.to_string().starts_with("Channel error"));
    }
}
