use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use crate::models::ticket::generate_ticket_number;
use crate::models::{Actor, EventStatus, Role, Ticket, TicketState};
use crate::services::role_gate::{Action, RoleGate};
use crate::store::TicketStore;
use crate::utils::AppError;

pub const MAX_TICKETS_PER_BOOKING: u32 = 10;

/// Completes a booking: reserves capacity and issues `quantity` tickets to
/// the actor. Payment is settled upstream before this is called.
pub async fn book(
    store: &dyn TicketStore,
    actor: &Actor,
    event_id: Uuid,
    quantity: u32,
    now: DateTime<Utc>,
) -> Result<Vec<Ticket>, AppError> {
    if actor.role != Role::Attendee {
        return Err(AppError::Forbidden(
            "Only attendees can book tickets".to_string(),
        ));
    }
    if quantity == 0 || quantity > MAX_TICKETS_PER_BOOKING {
        return Err(AppError::ValidationError(format!(
            "Quantity must be between 1 and {MAX_TICKETS_PER_BOOKING}"
        )));
    }

    let event = store
        .get_event(event_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Event '{event_id}' was not found")))?;
    if event.status != EventStatus::Published {
        return Err(AppError::Conflict(format!(
            "Event is {} and not open for booking",
            event.status
        )));
    }

    let tickets = (0..quantity)
        .map(|_| Ticket::issue(generate_ticket_number(), event.id, actor.id, now))
        .collect();

    match store.reserve_and_issue(event.id, tickets, now).await? {
        Some(issued) => {
            info!(
                event_id = %event.id,
                attendee_id = %actor.id,
                quantity,
                "Tickets issued"
            );
            Ok(issued)
        }
        None => {
            let current = store
                .get_event(event.id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Event '{event_id}' was not found")))?;
            if current.status != EventStatus::Published {
                return Err(AppError::Conflict(format!(
                    "Event is {} and not open for booking",
                    current.status
                )));
            }
            Err(AppError::SoldOut(format!(
                "Only {} ticket(s) remaining",
                current.remaining_capacity()
            )))
        }
    }
}

/// Loads a ticket the actor is allowed to see: its holder, or whoever may
/// view check-ins for its event.
pub async fn visible_ticket(
    store: &dyn TicketStore,
    actor: &Actor,
    ticket_number: &str,
) -> Result<Ticket, AppError> {
    let not_found = || AppError::NotFound(format!("Ticket '{ticket_number}' was not found"));

    let ticket = store.find_ticket(ticket_number).await?.ok_or_else(not_found)?;
    if ticket.attendee_id == actor.id {
        return Ok(ticket);
    }

    let event = store.get_event(ticket.event_id).await?.ok_or_else(not_found)?;
    if RoleGate::permits(actor, &event, Action::ViewCheckins) {
        Ok(ticket)
    } else {
        Err(not_found())
    }
}

/// issued -> cancelled. Checked-in tickets stay checked in.
pub async fn cancel(
    store: &dyn TicketStore,
    actor: &Actor,
    ticket_number: &str,
    now: DateTime<Utc>,
) -> Result<Ticket, AppError> {
    let not_found = || AppError::NotFound(format!("Ticket '{ticket_number}' was not found"));

    let ticket = store.find_ticket(ticket_number).await?.ok_or_else(not_found)?;
    let event = store.get_event(ticket.event_id).await?.ok_or_else(not_found)?;

    // Strangers get the same answer as for a ticket that does not exist.
    let is_holder = ticket.attendee_id == actor.id && actor.role == Role::Attendee;
    if !is_holder && !RoleGate::permits(actor, &event, Action::Manage) {
        return Err(not_found());
    }

    if let Some(cancelled) = store.cancel_ticket(ticket.id, now).await? {
        info!(
            event_id = %event.id,
            ticket_number = %cancelled.ticket_number,
            actor_id = %actor.id,
            "Ticket cancelled"
        );
        return Ok(cancelled);
    }

    let current = store.get_ticket(ticket.id).await?.unwrap_or(ticket);
    let reason = match current.state() {
        TicketState::CheckedIn => "Ticket has already been checked in",
        TicketState::Cancelled => "Ticket is already cancelled",
        TicketState::Issued => "Ticket could not be cancelled, try again",
    };
    Err(AppError::Conflict(reason.to_string()))
}
