use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Identifies one request against the metadata cache.
///
/// Request ids are handed out in increasing order. A load result is only applied to a property
/// if no request with a higher id touched that property in the meantime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RequestId(pub u64);

impl RequestId {
    /// The id of properties no request has touched yet.
    pub const ZERO: RequestId = RequestId(0);

    /// Returns the id following this one.
    pub fn next(self) -> Self {
        RequestId(self.0 + 1)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifies one aggregation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Ticket(pub u64);

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ticket {}", self.0)
    }
}

/// Hands out [`Ticket`]s and remembers the latest one.
///
/// Starting a new aggregation (for example because the selection changed) supersedes every
/// ticket issued before. Batch callbacks use [`is_current`](Self::is_current) to find out
/// whether their results are still wanted.
#[derive(Debug, Default)]
pub struct TicketCounter {
    current: AtomicU64,
}

impl TicketCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a new ticket, superseding all previous ones.
    pub fn next(&self) -> Ticket {
        Ticket(self.current.fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// The most recently issued ticket.
    pub fn current(&self) -> Ticket {
        Ticket(self.current.load(Ordering::Acquire))
    }

    /// Whether `ticket` is the most recently issued one.
    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.current() == ticket
    }
}
