//! Resolves a presented ticket number to a ticket of a given event.
//!
//! The presented value comes straight off a QR code or a keyboard and is
//! treated as an opaque string.

use crate::models::ticket::MAX_TICKET_NUMBER_LEN;
use crate::models::{Event, Ticket};
use crate::store::TicketStore;
use crate::utils::{AppError, ScanRejection};

/// Trims surrounding whitespace; rejects empty input.
pub fn normalize(presented: &str) -> Result<&str, AppError> {
    let trimmed = presented.trim();
    if trimmed.is_empty() {
        return Err(AppError::ValidationError(
            "Ticket number is required".to_string(),
        ));
    }
    Ok(trimmed)
}

/// Clips a presented value for storage in the audit log.
pub fn clip_for_audit(presented: &str) -> String {
    if presented.len() <= MAX_TICKET_NUMBER_LEN {
        return presented.to_string();
    }
    let mut end = MAX_TICKET_NUMBER_LEN;
    while !presented.is_char_boundary(end) {
        end -= 1;
    }
    presented[..end].to_string()
}

/// Finds the ticket numbered `ticket_number` for `event`.
///
/// A ticket that exists for some other event is reported as `WrongEvent`
/// and nothing about it is returned.
pub async fn resolve(
    store: &dyn TicketStore,
    event: &Event,
    ticket_number: &str,
) -> Result<Ticket, AppError> {
    if ticket_number.len() > MAX_TICKET_NUMBER_LEN {
        return Err(ScanRejection::NotFound.into());
    }

    match store.find_ticket(ticket_number).await? {
        None => Err(ScanRejection::NotFound.into()),
        Some(ticket) if ticket.event_id != event.id => Err(ScanRejection::WrongEvent.into()),
        Some(ticket) => Ok(ticket),
    }
}
