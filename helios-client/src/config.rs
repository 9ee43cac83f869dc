//! Configuration loading for HELIOS clients.
//!
//! All fields are required unless explicitly marked optional. No defaults.

use helios_core::NotifyConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Base URL of the content store REST API, e.g. `https://cms.example.com/api`.
    pub content_base_url: String,
    pub request_timeout_ms: u64,
    /// Sent as `x-api-key` when present.
    pub api_key: Option<String>,
    /// Directory of the LMDB environment backing the cross-tab slots.
    pub slot_store_path: PathBuf,
    pub slot_store_max_size_mb: usize,
    /// How often the slot store is scanned for writes from other processes.
    pub slot_poll_interval_ms: u64,
    pub notify: NotifySection,
}

/// `[notify]` table. Durations are in milliseconds.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NotifySection {
    pub slot_prefix: String,
    pub bus_capacity: usize,
    pub debounce_ms: u64,
    pub refetch_delay_ms: u64,
    /// Subscriber polling fallback. Omit to disable.
    pub poll_interval_ms: Option<u64>,
    pub dedupe_window: usize,
    pub clear_marker_on_receipt: bool,
}

impl NotifySection {
    pub fn to_notify_config(&self) -> NotifyConfig {
        NotifyConfig::new()
            .with_slot_prefix(self.slot_prefix.clone())
            .with_bus_capacity(self.bus_capacity)
            .with_debounce(Duration::from_millis(self.debounce_ms))
            .with_refetch_delay(Duration::from_millis(self.refetch_delay_ms))
            .with_poll_interval(self.poll_interval_ms.map(Duration::from_millis))
            .with_dedupe_window(self.dedupe_window)
            .with_clear_marker(self.clear_marker_on_receipt)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClientConfigError {
    #[error("Missing configuration file path (use --config or HELIOS_CONFIG)")]
    MissingConfigPath,
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
    #[error("Invalid [notify] table: {0}")]
    Notify(#[from] helios_core::ConfigError),
}

impl ClientConfig {
    pub fn load() -> Result<Self, ClientConfigError> {
        let path = config_path_from_args().or_else(config_path_from_env);
        let path = path.ok_or(ClientConfigError::MissingConfigPath)?;
        let config = Self::from_path(&path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ClientConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ClientConfigError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn slot_poll_interval(&self) -> Duration {
        Duration::from_millis(self.slot_poll_interval_ms)
    }

    pub fn notify_config(&self) -> NotifyConfig {
        self.notify.to_notify_config()
    }

    pub fn validate(&self) -> Result<(), ClientConfigError> {
        let base = self.content_base_url.trim();
        if base.is_empty() {
            return Err(ClientConfigError::InvalidValue {
                field: "content_base_url",
                reason: "must not be empty".to_string(),
            });
        }
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ClientConfigError::InvalidValue {
                field: "content_base_url",
                reason: "must start with http:// or https://".to_string(),
            });
        }
        if self.request_timeout_ms == 0 {
            return Err(ClientConfigError::InvalidValue {
                field: "request_timeout_ms",
                reason: "must be > 0".to_string(),
            });
        }
        if self.api_key.as_deref().is_some_and(|key| key.trim().is_empty()) {
            return Err(ClientConfigError::InvalidValue {
                field: "api_key",
                reason: "must not be blank when set".to_string(),
            });
        }
        if self.slot_store_path.as_os_str().is_empty() {
            return Err(ClientConfigError::InvalidValue {
                field: "slot_store_path",
                reason: "must not be empty".to_string(),
            });
        }
        if self.slot_store_max_size_mb == 0 {
            return Err(ClientConfigError::InvalidValue {
                field: "slot_store_max_size_mb",
                reason: "must be > 0".to_string(),
            });
        }
        if self.slot_poll_interval_ms == 0 {
            return Err(ClientConfigError::InvalidValue {
                field: "slot_poll_interval_ms",
                reason: "must be > 0".to_string(),
            });
        }
        self.notify_config().validate()?;
        Ok(())
    }
}

fn config_path_from_env() -> Option<PathBuf> {
    std::env::var("HELIOS_CONFIG").ok().map(PathBuf::from)
}

fn config_path_from_args() -> Option<PathBuf> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args.next().map(PathBuf::from);
        }
    }
    None
}
