use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use chrono::NaiveDateTime;
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Already checked in today")]
    AlreadyCheckedIn,

    #[error("Attendance for today is already completed")]
    AlreadyCheckedOut,

    #[error("Not checked in today")]
    NotCheckedIn,

    #[error("Check-out time {check_out} precedes check-in time {check_in}")]
    InvalidInterval {
        check_in: NaiveDateTime,
        check_out: NaiveDateTime,
    },

    #[error("Location is outside every active work location")]
    OutsideGeofence,

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Access denied")]
    AccessDenied,

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Validation(String),

    #[error("Invalid or expired reset token")]
    InvalidResetToken,

    #[error("Internal server error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    message: String,
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(what) => AppError::Conflict(format!("{} already exists", what)),
            StoreError::Unavailable(msg) => AppError::StoreUnavailable(msg),
            StoreError::Corrupt(msg) => AppError::Internal(msg),
        }
    }
}

/// Field messages, sorted so the body is stable across runs.
impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(msg) => msg.to_string(),
                    None => format!("{} is invalid", field),
                })
            })
            .collect();
        messages.sort();
        messages.dedup();
        AppError::Validation(messages.join("; "))
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::AlreadyCheckedIn
            | AppError::AlreadyCheckedOut
            | AppError::NotCheckedIn
            | AppError::Validation(_)
            | AppError::InvalidResetToken => StatusCode::BAD_REQUEST,
            AppError::InvalidInterval { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::OutsideGeofence | AppError::AccessDenied => StatusCode::FORBIDDEN,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        // backend details stay in the log
        let message = match self {
            AppError::StoreUnavailable(detail) => {
                tracing::error!(error = %detail, "Record store unavailable");
                "Service temporarily unavailable, please retry".to_string()
            }
            AppError::Internal(detail) => {
                tracing::error!(error = %detail, "Internal error");
                "Internal Server Error".to_string()
            }
            other => other.to_string(),
        };

        HttpResponse::build(self.status_code()).json(ErrorResponse { message })
    }
}
