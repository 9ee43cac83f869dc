//! Bounded memory of recently processed signals.

use std::collections::VecDeque;

use helios_core::EmittedAt;

/// Remembers the last `window` distinct `emitted_at` values a subscriber
/// acted on, so the same logical signal arriving twice (once per channel,
/// or re-announced by a poller) triggers one re-fetch.
#[derive(Debug, Clone)]
pub struct SignalDeduper {
    recent: VecDeque<EmittedAt>,
    window: usize,
}

impl SignalDeduper {
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            recent: VecDeque::with_capacity(window),
            window,
        }
    }

    /// Record `emitted_at`. Returns false if it was already seen.
    pub fn observe(&mut self, emitted_at: EmittedAt) -> bool {
        if self.recent.contains(&emitted_at) {
            return false;
        }
        if self.recent.len() == self.window {
            self.recent.pop_front();
        }
        self.recent.push_back(emitted_at);
        true
    }
}
