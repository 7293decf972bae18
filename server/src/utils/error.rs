use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{error, warn};

use crate::models::ScanOutcome;
use crate::store::StoreError;
use crate::utils::response::error as error_response;

/// Reasons a scan is turned away. All are operator-recoverable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanRejection {
    #[error("No matching ticket was found for this event")]
    NotFound,

    #[error("This ticket is not valid for this event")]
    WrongEvent,

    #[error("Ticket has already been checked in")]
    AlreadyCheckedIn { checked_in_at: Option<DateTime<Utc>> },

    #[error("Ticket has been cancelled")]
    Cancelled,

    #[error("You are not authorized to scan tickets for this event")]
    Unauthorized,

    #[error("Event is not open for check-in")]
    EventNotOpen,
}

impl ScanRejection {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ScanRejection::NotFound => StatusCode::NOT_FOUND,
            ScanRejection::WrongEvent => StatusCode::CONFLICT,
            ScanRejection::AlreadyCheckedIn { .. } => StatusCode::CONFLICT,
            ScanRejection::Cancelled => StatusCode::GONE,
            ScanRejection::Unauthorized => StatusCode::FORBIDDEN,
            ScanRejection::EventNotOpen => StatusCode::CONFLICT,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ScanRejection::NotFound => "TICKET_NOT_FOUND",
            ScanRejection::WrongEvent => "WRONG_EVENT",
            ScanRejection::AlreadyCheckedIn { .. } => "ALREADY_CHECKED_IN",
            ScanRejection::Cancelled => "TICKET_CANCELLED",
            ScanRejection::Unauthorized => "SCAN_UNAUTHORIZED",
            ScanRejection::EventNotOpen => "EVENT_NOT_OPEN",
        }
    }

    pub fn outcome(&self) -> ScanOutcome {
        match self {
            ScanRejection::NotFound => ScanOutcome::RejectedNotFound,
            ScanRejection::WrongEvent => ScanOutcome::RejectedWrongEvent,
            ScanRejection::AlreadyCheckedIn { .. } => ScanOutcome::RejectedAlreadyUsed,
            ScanRejection::Cancelled => ScanOutcome::RejectedCancelled,
            ScanRejection::Unauthorized => ScanOutcome::RejectedUnauthorized,
            ScanRejection::EventNotOpen => ScanOutcome::RejectedEventNotOpen,
        }
    }

    fn details(&self) -> Option<Value> {
        match self {
            ScanRejection::AlreadyCheckedIn {
                checked_in_at: Some(at),
            } => Some(json!({ "checkedInAt": at })),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Sold out: {0}")]
    SoldOut(String),

    #[error("Scan rejected: {0}")]
    Scan(#[from] ScanRejection),

    #[error("Storage error")]
    StoreError(#[from] StoreError),

    #[error("Internal server error")]
    InternalServerError(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::AuthError(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::SoldOut(_) => StatusCode::CONFLICT,
            AppError::Scan(rejection) => rejection.status_code(),
            AppError::StoreError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::AuthError(_) => "AUTH_ERROR",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::SoldOut(_) => "SOLD_OUT",
            AppError::Scan(rejection) => rejection.code(),
            AppError::StoreError(_) => "DATABASE_ERROR",
            AppError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    /// The rejection carried by this error, if it came out of a scan.
    pub fn as_scan_rejection(&self) -> Option<&ScanRejection> {
        match self {
            AppError::Scan(rejection) => Some(rejection),
            _ => None,
        }
    }

    fn log(&self) {
        match self {
            AppError::ValidationError(msg)
            | AppError::AuthError(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg)
            | AppError::SoldOut(msg) => {
                warn!(code = self.code(), message = %msg, "Request rejected");
            }
            AppError::Scan(rejection) => {
                warn!(code = rejection.code(), "Scan rejected");
            }
            AppError::InternalServerError(msg) => {
                error!(error = ?self, message = %msg, "Application error");
            }
            AppError::StoreError(e) => {
                error!(error = ?e, "Storage error");
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        // Log internal details
        self.log();

        // Only expose high-level message to the client
        let (public_message, details) = match &self {
            AppError::ValidationError(msg)
            | AppError::AuthError(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg)
            | AppError::SoldOut(msg) => (msg.clone(), None),
            AppError::Scan(rejection) => (rejection.to_string(), rejection.details()),
            AppError::StoreError(_) => ("A database error occurred".to_string(), None),
            AppError::InternalServerError(_) => ("An internal error occurred".to_string(), None),
        };

        error_response(code, public_message, details, status)
    }
}
