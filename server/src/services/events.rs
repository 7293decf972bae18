use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use crate::models::{Actor, Event, EventStatus, NewEvent, Pricing, Role};
use crate::services::role_gate::{Action, RoleGate};
use crate::store::TicketStore;
use crate::utils::AppError;

pub const MAX_STAFF_PER_EVENT: usize = 200;

/// Checks a draft before it is stored.
pub fn validate(input: &NewEvent) -> Result<(), AppError> {
    if input.title.trim().is_empty() {
        return Err(AppError::ValidationError("Title is required".to_string()));
    }
    if input.location.trim().is_empty() {
        return Err(AppError::ValidationError("Location is required".to_string()));
    }
    if input.end_time <= input.start_time {
        return Err(AppError::ValidationError(
            "End time must be after start time".to_string(),
        ));
    }
    if input.capacity <= 0 {
        return Err(AppError::ValidationError(
            "Capacity must be a positive number".to_string(),
        ));
    }
    if let Pricing::Paid { amount, currency } = &input.pricing {
        if *amount <= Decimal::ZERO {
            return Err(AppError::ValidationError(
                "Ticket price must be positive".to_string(),
            ));
        }
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(AppError::ValidationError(
                "Currency must be a three-letter ISO code".to_string(),
            ));
        }
    }
    Ok(())
}

pub async fn create(
    store: &dyn TicketStore,
    actor: &Actor,
    input: NewEvent,
    now: DateTime<Utc>,
) -> Result<Event, AppError> {
    if actor.role != Role::Host {
        return Err(AppError::Forbidden("Only hosts can create events".to_string()));
    }
    validate(&input)?;

    let event = store.create_event(input, now).await?;
    info!(event_id = %event.id, host_id = %event.host_id, "Event created");
    Ok(event)
}

pub async fn get(store: &dyn TicketStore, event_id: Uuid) -> Result<Event, AppError> {
    store
        .get_event(event_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Event '{event_id}' was not found")))
}

/// Loads the event and checks the actor may perform `action` on it.
pub async fn authorized(
    store: &dyn TicketStore,
    actor: &Actor,
    event_id: Uuid,
    action: Action,
) -> Result<Event, AppError> {
    let event = get(store, event_id).await?;
    RoleGate::authorize(actor, &event, action)?;
    Ok(event)
}

async fn transition(
    store: &dyn TicketStore,
    event: Event,
    from: &[EventStatus],
    to: EventStatus,
    now: DateTime<Utc>,
) -> Result<Event, AppError> {
    match store.transition_event(event.id, from, to, now).await? {
        Some(updated) => {
            info!(event_id = %updated.id, from = %event.status, to = %to, "Event status changed");
            Ok(updated)
        }
        None => {
            let current = get(store, event.id).await?;
            Err(AppError::Conflict(format!(
                "Event is {} and cannot become {}",
                current.status, to
            )))
        }
    }
}

pub async fn publish(
    store: &dyn TicketStore,
    actor: &Actor,
    event_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Event, AppError> {
    let event = authorized(store, actor, event_id, Action::Manage).await?;
    if event.end_time <= now {
        return Err(AppError::Conflict(
            "Event has already ended and cannot be published".to_string(),
        ));
    }
    transition(
        store,
        event,
        &[EventStatus::Draft],
        EventStatus::Published,
        now,
    )
    .await
}

pub async fn cancel(
    store: &dyn TicketStore,
    actor: &Actor,
    event_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Event, AppError> {
    let event = authorized(store, actor, event_id, Action::Manage).await?;
    transition(
        store,
        event,
        &[EventStatus::Draft, EventStatus::Published],
        EventStatus::Cancelled,
        now,
    )
    .await
}

/// Replaces the assigned-staff set. Duplicates are dropped and order kept.
pub async fn assign_staff(
    store: &dyn TicketStore,
    actor: &Actor,
    event_id: Uuid,
    staff: Vec<Uuid>,
    now: DateTime<Utc>,
) -> Result<Event, AppError> {
    let event = authorized(store, actor, event_id, Action::Manage).await?;

    let mut unique: Vec<Uuid> = Vec::with_capacity(staff.len());
    for id in staff {
        if id == event.host_id {
            return Err(AppError::ValidationError(
                "The host cannot be assigned as staff".to_string(),
            ));
        }
        if !unique.contains(&id) {
            unique.push(id);
        }
    }
    if unique.len() > MAX_STAFF_PER_EVENT {
        return Err(AppError::ValidationError(format!(
            "At most {MAX_STAFF_PER_EVENT} staff can be assigned"
        )));
    }

    let updated = store
        .set_event_staff(event.id, &unique, now)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Event '{event_id}' was not found")))?;
    info!(event_id = %updated.id, staff = updated.assigned_staff.len(), "Event staff updated");
    Ok(updated)
}

/// Marks published events whose end time has passed as completed.
pub async fn complete_elapsed(store: &dyn TicketStore, now: DateTime<Utc>) -> Result<u64, AppError> {
    let completed = store.complete_elapsed_events(now).await?;
    if completed > 0 {
        info!(completed, "Completed elapsed events");
    }
    Ok(completed)
}
