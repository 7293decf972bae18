use axum::extract::State;
use axum::response::Response;
use chrono::Utc;
use serde::Deserialize;

use crate::models::{Actor, NewUser};
use crate::routes::AppState;
use crate::store::StoreError;
use crate::utils::error::AppError;
use crate::utils::response::created;
use crate::utils::AppJson;

#[derive(Debug, Deserialize)]
pub struct CreateProfileRequest {
    pub name: String,
    pub email: String,
}

/// Registers the profile shown to door staff when the actor's tickets are scanned.
pub async fn create_profile(
    State(state): State<AppState>,
    actor: Actor,
    AppJson(body): AppJson<CreateProfileRequest>,
) -> Result<Response, AppError> {
    let name = body.name.trim();
    let email = body.email.trim();
    if name.is_empty() {
        return Err(AppError::ValidationError("Name is required".to_string()));
    }
    if !email.contains('@') || email.len() > 254 {
        return Err(AppError::ValidationError("Email is invalid".to_string()));
    }

    let input = NewUser {
        id: actor.id,
        name: name.to_string(),
        email: email.to_string(),
    };
    let user = match state.store.create_user(input, Utc::now()).await {
        Ok(user) => user,
        Err(StoreError::Duplicate(what)) => {
            return Err(AppError::Conflict(format!("A profile with this {what} already exists")))
        }
        Err(e) => return Err(e.into()),
    };

    Ok(created(user, "Profile created"))
}
