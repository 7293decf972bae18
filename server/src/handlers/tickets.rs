use axum::extract::State;
use axum::response::Response;
use chrono::Utc;

use crate::models::Actor;
use crate::routes::AppState;
use crate::services::issuance;
use crate::utils::error::AppError;
use crate::utils::response::success;
use crate::utils::AppPath;

pub async fn get_ticket(
    State(state): State<AppState>,
    actor: Actor,
    AppPath(ticket_number): AppPath<String>,
) -> Result<Response, AppError> {
    let ticket = issuance::visible_ticket(state.store.as_ref(), &actor, &ticket_number).await?;
    Ok(success(ticket, "Ticket retrieved"))
}

pub async fn cancel_ticket(
    State(state): State<AppState>,
    actor: Actor,
    AppPath(ticket_number): AppPath<String>,
) -> Result<Response, AppError> {
    let ticket =
        issuance::cancel(state.store.as_ref(), &actor, &ticket_number, Utc::now()).await?;
    Ok(success(ticket, "Ticket cancelled"))
}
