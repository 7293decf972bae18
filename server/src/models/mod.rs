use thiserror::Error;

pub mod event;
pub mod scan;
pub mod ticket;
pub mod user;

pub use event::{Event, EventStatus, NewEvent, Pricing};
pub use scan::{CheckInStats, ScanOutcome, ScanRecord, TicketCounts};
pub use ticket::{CheckInStatus, Ticket, TicketState, TicketStatus};
pub use user::{Actor, NewUser, Role, User};

/// A stored or presented label that does not name any known variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}
