//! Orchestrates one scan: role gate, lookup, transition, audit.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{Actor, ScanOutcome, Ticket, User};
use crate::services::audit::{self, ScanAttempt};
use crate::services::role_gate::{Action, RoleGate};
use crate::services::{checkin, lookup};
use crate::store::TicketStore;
use crate::utils::{AppError, ScanRejection};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanAccepted {
    pub ticket: Ticket,
    pub attendee: Option<User>,
}

/// Scans `presented` against `event_id` on behalf of `actor`.
///
/// Every attempt that reaches a decision is written to the audit log, whether
/// it was accepted or rejected. Storage failures before a decision are not
/// audited. Once the ticket is checked in the scan is accepted, and the
/// attendee profile is only a best-effort read on top.
pub async fn scan_ticket(
    store: &dyn TicketStore,
    actor: &Actor,
    event_id: Uuid,
    presented: &str,
    now: DateTime<Utc>,
) -> Result<ScanAccepted, AppError> {
    let ticket_number = lookup::normalize(presented)?;
    let mut resolved = None;

    let result = attempt(store, actor, event_id, ticket_number, now, &mut resolved).await;

    let (outcome, result) = match result {
        Ok(ticket) => (ScanOutcome::Accepted, Ok(ticket)),
        Err(AppError::Scan(rejection)) => (rejection.outcome(), Err(rejection)),
        Err(other) => return Err(other),
    };

    audit::record(
        store,
        ScanAttempt {
            actor,
            event_id,
            ticket_number,
            ticket_id: resolved,
            outcome,
            at: now,
        },
    )
    .await;

    let ticket = result?;
    info!(
        event_id = %event_id,
        ticket_number = %ticket_number,
        actor_id = %actor.id,
        "Ticket checked in"
    );

    let attendee = match store.get_user(ticket.attendee_id).await {
        Ok(user) => user,
        Err(e) => {
            warn!(
                error = ?e,
                ticket_number = %ticket.ticket_number,
                attendee_id = %ticket.attendee_id,
                "Failed to load attendee profile for accepted scan"
            );
            None
        }
    };

    Ok(ScanAccepted { ticket, attendee })
}

async fn attempt(
    store: &dyn TicketStore,
    actor: &Actor,
    event_id: Uuid,
    ticket_number: &str,
    now: DateTime<Utc>,
    resolved: &mut Option<Uuid>,
) -> Result<Ticket, AppError> {
    let event = store
        .get_event(event_id)
        .await?
        .ok_or(ScanRejection::NotFound)?;

    RoleGate::authorize(actor, &event, Action::Scan)?;

    if !event.accepts_scans() {
        return Err(ScanRejection::EventNotOpen.into());
    }

    let ticket = lookup::resolve(store, &event, ticket_number).await?;
    *resolved = Some(ticket.id);

    checkin::check_in(store, &ticket, actor, now).await
}
