//! Rendered state of a mounted subscriber.

use chrono::{DateTime, Utc};
use helios_core::EmittedAt;

use crate::sequencer::RequestTicket;

/// What a viewer renders: the last good content plus status flags.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState<T> {
    /// Last successfully fetched content. Survives later failures.
    pub content: Option<T>,
    /// Inline error from the most recent applied fetch, if it failed.
    pub error: Option<String>,
    /// A fetch newer than the applied one is in flight.
    pub loading: bool,
    pub loaded_at: Option<DateTime<Utc>>,
    /// Sequence number of the request whose outcome is shown (0 = none yet).
    pub applied_request: u64,
    /// Signal that triggered the applied request, if any.
    pub last_signal: Option<EmittedAt>,
}

impl<T> Default for ViewState<T> {
    fn default() -> Self {
        Self {
            content: None,
            error: None,
            loading: false,
            loaded_at: None,
            applied_request: 0,
            last_signal: None,
        }
    }
}

impl<T> ViewState<T> {
    pub fn is_loaded(&self) -> bool {
        self.content.is_some()
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    pub(crate) fn apply_success(
        &mut self,
        ticket: RequestTicket,
        content: T,
        trigger: Option<EmittedAt>,
    ) {
        self.content = Some(content);
        self.error = None;
        self.loading = false;
        self.loaded_at = Some(Utc::now());
        self.applied_request = ticket.sequence();
        if trigger.is_some() {
            self.last_signal = trigger;
        }
    }

    pub(crate) fn apply_failure(
        &mut self,
        ticket: RequestTicket,
        error: String,
        trigger: Option<EmittedAt>,
    ) {
        self.error = Some(error);
        self.loading = false;
        self.applied_request = ticket.sequence();
        if trigger.is_some() {
            self.last_signal = trigger;
        }
    }
}
