use axum::extract::State;
use axum::response::Response;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::models::Actor;
use crate::routes::AppState;
use crate::services::scan::scan_ticket;
use crate::utils::error::AppError;
use crate::utils::response::success;
use crate::utils::AppJson;

/// Same body for QR scans and manual entry.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRequest {
    pub event_id: Uuid,
    pub ticket_number: String,
    pub scanned_by: Option<Uuid>,
}

pub async fn scan(
    State(state): State<AppState>,
    actor: Actor,
    AppJson(body): AppJson<ScanRequest>,
) -> Result<Response, AppError> {
    if body.scanned_by.is_some_and(|id| id != actor.id) {
        return Err(AppError::Forbidden(
            "scannedBy does not match the authenticated actor".to_string(),
        ));
    }

    let accepted = scan_ticket(
        state.store.as_ref(),
        &actor,
        body.event_id,
        &body.ticket_number,
        Utc::now(),
    )
    .await?;

    Ok(success(accepted, "Check-in successful"))
}
