use axum::extract::State;
use axum::response::Response;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::models::{Actor, EventStatus, NewEvent, Pricing};
use crate::routes::AppState;
use crate::services::{audit, events, issuance, Action, RoleGate};
use crate::utils::error::AppError;
use crate::utils::response::{created, success};
use crate::utils::{AppJson, AppPath, AppQuery};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    pub title: String,
    pub description: Option<String>,
    pub location: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub capacity: i32,
    #[serde(default = "free")]
    pub pricing: Pricing,
}

fn free() -> Pricing {
    Pricing::Free
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignStaffRequest {
    pub staff: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct BookRequest {
    #[serde(default = "one")]
    pub quantity: u32,
}

fn one() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct ScanLogQuery {
    pub limit: Option<i64>,
}

pub async fn create_event(
    State(state): State<AppState>,
    actor: Actor,
    AppJson(body): AppJson<CreateEventRequest>,
) -> Result<Response, AppError> {
    let input = NewEvent {
        host_id: actor.id,
        title: body.title.trim().to_string(),
        description: body.description,
        location: body.location.trim().to_string(),
        start_time: body.start_time,
        end_time: body.end_time,
        capacity: body.capacity,
        pricing: body.pricing,
    };

    let event = events::create(state.store.as_ref(), &actor, input, Utc::now()).await?;
    Ok(created(event, "Event created"))
}

pub async fn get_event(
    State(state): State<AppState>,
    actor: Actor,
    AppPath(event_id): AppPath<Uuid>,
) -> Result<Response, AppError> {
    let event = events::get(state.store.as_ref(), event_id).await?;

    // Drafts are private to their host.
    if event.status == EventStatus::Draft && !RoleGate::permits(&actor, &event, Action::Manage) {
        return Err(AppError::NotFound(format!(
            "Event '{event_id}' was not found"
        )));
    }

    Ok(success(event, "Event retrieved"))
}

pub async fn publish_event(
    State(state): State<AppState>,
    actor: Actor,
    AppPath(event_id): AppPath<Uuid>,
) -> Result<Response, AppError> {
    let event = events::publish(state.store.as_ref(), &actor, event_id, Utc::now()).await?;
    Ok(success(event, "Event published"))
}

pub async fn cancel_event(
    State(state): State<AppState>,
    actor: Actor,
    AppPath(event_id): AppPath<Uuid>,
) -> Result<Response, AppError> {
    let event = events::cancel(state.store.as_ref(), &actor, event_id, Utc::now()).await?;
    Ok(success(event, "Event cancelled"))
}

pub async fn assign_staff(
    State(state): State<AppState>,
    actor: Actor,
    AppPath(event_id): AppPath<Uuid>,
    AppJson(body): AppJson<AssignStaffRequest>,
) -> Result<Response, AppError> {
    let event =
        events::assign_staff(state.store.as_ref(), &actor, event_id, body.staff, Utc::now())
            .await?;
    Ok(success(event, "Event staff updated"))
}

pub async fn book_tickets(
    State(state): State<AppState>,
    actor: Actor,
    AppPath(event_id): AppPath<Uuid>,
    AppJson(body): AppJson<BookRequest>,
) -> Result<Response, AppError> {
    let tickets =
        issuance::book(state.store.as_ref(), &actor, event_id, body.quantity, Utc::now()).await?;
    Ok(created(tickets, "Booking confirmed"))
}

pub async fn checkin_stats(
    State(state): State<AppState>,
    actor: Actor,
    AppPath(event_id): AppPath<Uuid>,
) -> Result<Response, AppError> {
    let event =
        events::authorized(state.store.as_ref(), &actor, event_id, Action::ViewCheckins).await?;
    let stats = audit::stats(state.store.as_ref(), &event).await?;
    Ok(success(stats, "Check-in statistics retrieved"))
}

pub async fn list_scans(
    State(state): State<AppState>,
    actor: Actor,
    AppPath(event_id): AppPath<Uuid>,
    AppQuery(query): AppQuery<ScanLogQuery>,
) -> Result<Response, AppError> {
    let event =
        events::authorized(state.store.as_ref(), &actor, event_id, Action::ViewCheckins).await?;
    let scans = audit::recent(state.store.as_ref(), event.id, query.limit).await?;
    Ok(success(scans, "Scan log retrieved"))
}
