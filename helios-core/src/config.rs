//! Notification tuning shared by publishers and subscribers.

use std::time::Duration;

use crate::error::ConfigError;

/// Configuration for channels, publishers and subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyConfig {
    /// Namespace prepended to every cross-tab slot key (`{prefix}:{topic}`).
    pub slot_prefix: String,
    /// Buffered events per broadcast receiver before it lags.
    pub bus_capacity: usize,
    /// Triggers arriving within this window coalesce into one re-fetch.
    pub debounce: Duration,
    /// Delay before a signal-triggered re-fetch, to let the content store
    /// settle after the write.
    pub refetch_delay: Duration,
    /// Periodic re-fetch fallback. `None` disables polling.
    pub poll_interval: Option<Duration>,
    /// How many recently processed `emitted_at` values a subscriber remembers.
    pub dedupe_window: usize,
    /// Remove the slot value after a subscriber consumes it.
    pub clear_marker_on_receipt: bool,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            slot_prefix: "helios".to_string(),
            bus_capacity: 64,
            debounce: Duration::ZERO,
            refetch_delay: Duration::ZERO,
            poll_interval: None,
            dedupe_window: 16,
            clear_marker_on_receipt: true,
        }
    }
}

impl NotifyConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_slot_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.slot_prefix = prefix.into();
        self
    }

    pub fn with_bus_capacity(mut self, capacity: usize) -> Self {
        self.bus_capacity = capacity;
        self
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_refetch_delay(mut self, delay: Duration) -> Self {
        self.refetch_delay = delay;
        self
    }

    pub fn with_poll_interval(mut self, interval: Option<Duration>) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_dedupe_window(mut self, window: usize) -> Self {
        self.dedupe_window = window;
        self
    }

    pub fn with_clear_marker(mut self, clear: bool) -> Self {
        self.clear_marker_on_receipt = clear;
        self
    }

    /// Time a signal-triggered re-fetch waits before starting.
    pub fn settle_delay(&self) -> Duration {
        self.debounce.max(self.refetch_delay)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.slot_prefix.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "slot_prefix".to_string(),
            });
        }
        if self
            .slot_prefix
            .chars()
            .any(|c| !c.is_ascii_graphic() || c == ':')
        {
            return Err(ConfigError::InvalidValue {
                field: "slot_prefix".to_string(),
                value: self.slot_prefix.clone(),
                reason: "must be ASCII without whitespace or ':'".to_string(),
            });
        }
        if self.bus_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "bus_capacity".to_string(),
                value: "0".to_string(),
                reason: "must be > 0".to_string(),
            });
        }
        if self.dedupe_window == 0 {
            return Err(ConfigError::InvalidValue {
                field: "dedupe_window".to_string(),
                value: "0".to_string(),
                reason: "must be > 0".to_string(),
            });
        }
        if self.poll_interval == Some(Duration::ZERO) {
            return Err(ConfigError::InvalidValue {
                field: "poll_interval".to_string(),
                value: "0ms".to_string(),
                reason: "must be > 0 when set".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(NotifyConfig::default().validate().is_ok());
    }

    #[test]
    fn test_settle_delay_takes_larger_window() {
        let config = NotifyConfig::new()
            .with_debounce(Duration::from_millis(50))
            .with_refetch_delay(Duration::from_millis(200));
        assert_eq!(config.settle_delay(), Duration::from_millis(200));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(NotifyConfig::new().with_slot_prefix("").validate().is_err());
        assert!(NotifyConfig::new().with_slot_prefix("a:b").validate().is_err());
        assert!(NotifyConfig::new().with_bus_capacity(0).validate().is_err());
        assert!(NotifyConfig::new().with_dedupe_window(0).validate().is_err());
        assert!(NotifyConfig::new()
            .with_poll_interval(Some(Duration::ZERO))
            .validate()
            .is_err());
    }
}
