//! Last-request-wins sequencing for re-fetches.

use std::sync::atomic::{AtomicU64, Ordering};

/// Sequence number handed to one re-fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestTicket(u64);

impl RequestTicket {
    pub fn sequence(&self) -> u64 {
        self.0
    }
}

/// Issues increasing tickets and tells whether a response is still wanted.
///
/// A response is applied only if no newer request has started since its own
/// request began, whatever order the responses arrive in.
#[derive(Debug, Default)]
pub struct RequestSequencer {
    issued: AtomicU64,
}

impl RequestSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new request.
    pub fn begin(&self) -> RequestTicket {
        RequestTicket(self.issued.fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// True if `ticket` belongs to the newest request started so far.
    pub fn is_current(&self, ticket: RequestTicket) -> bool {
        self.issued.load(Ordering::Acquire) == ticket.0
    }

    /// Number of requests started.
    pub fn issued(&self) -> u64 {
        self.issued.load(Ordering::Acquire)
    }
}
