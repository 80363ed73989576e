//! Error handling module for the running-crew backend.
//!
//! Provides the application error taxonomy with mapping to HTTP status codes and the
//! uniform `{success, code, message, data}` response envelope.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error codes as constants to avoid stringly-typed errors.
pub mod codes {
    pub const SUCCESS: &str = "SUCCESS";
    pub const INVALID_INPUT_VALUE: &str = "INVALID_INPUT_VALUE";
    pub const PASSWORD_MISMATCH: &str = "PASSWORD_MISMATCH";
    pub const AUTHENTICATION_REQUIRED: &str = "AUTHENTICATION_REQUIRED";
    pub const AUTHENTICATION_FAILED: &str = "AUTHENTICATION_FAILED";
    pub const ACCESS_DENIED: &str = "ACCESS_DENIED";
    pub const USER_NOT_FOUND: &str = "USER_NOT_FOUND";
    pub const REGION_NOT_FOUND: &str = "REGION_NOT_FOUND";
    pub const CREW_NOT_FOUND: &str = "CREW_NOT_FOUND";
    pub const CREW_MEMBER_NOT_FOUND: &str = "CREW_MEMBER_NOT_FOUND";
    pub const CREW_MEMBER_ALREADY_JOINED: &str = "CREW_MEMBER_ALREADY_JOINED";
    pub const CREW_MEMBER_LIMIT_EXCEEDED: &str = "CREW_MEMBER_LIMIT_EXCEEDED";
    pub const DUPLICATED_EMAIL: &str = "DUPLICATED_EMAIL";
    pub const DATA_CONFLICT: &str = "DATA_CONFLICT";
    pub const INTERNAL_SERVER_ERROR: &str = "INTERNAL_SERVER_ERROR";
}

/// A single rejected request field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub reason: String,
}

impl FieldError {
    pub fn new(field: &str, reason: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Application error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Referenced user, region, crew or membership does not exist.
    #[error("{message}")]
    NotFound {
        code: &'static str,
        message: String,
    },
    /// The user already holds a membership in the crew.
    #[error("user has already joined this crew")]
    AlreadyJoined,
    /// The crew has no free places left.
    #[error("crew has reached its participant limit")]
    CapacityExceeded,
    /// The acting user may not perform this operation.
    #[error("{0}")]
    AccessDenied(String),
    /// Malformed request shape or out-of-range values.
    #[error("{message}")]
    InvalidInput {
        code: &'static str,
        message: String,
        errors: Vec<FieldError>,
    },
    /// No session, or credentials were rejected.
    #[error("{message}")]
    Unauthorized {
        code: &'static str,
        message: String,
    },
    /// The request conflicts with existing data (e.g. duplicate e-mail).
    #[error("{message}")]
    Conflict {
        code: &'static str,
        message: String,
    },
    /// A storage uniqueness constraint rejected the write.
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),
    /// Database error
    #[error("database error: {0}")]
    Database(String),
    /// Session store error
    #[error("session error: {0}")]
    Session(String),
    /// Internal server error
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn user_not_found(id: &str) -> Self {
        AppError::NotFound {
            code: codes::USER_NOT_FOUND,
            message: format!("User {} not found", id),
        }
    }

    pub fn region_not_found(id: &str) -> Self {
        AppError::NotFound {
            code: codes::REGION_NOT_FOUND,
            message: format!("Region {} not found", id),
        }
    }

    pub fn crew_not_found(id: &str) -> Self {
        AppError::NotFound {
            code: codes::CREW_NOT_FOUND,
            message: format!("Crew {} not found", id),
        }
    }

    pub fn not_a_member(crew_id: &str) -> Self {
        AppError::NotFound {
            code: codes::CREW_MEMBER_NOT_FOUND,
            message: format!("Not a member of crew {}", crew_id),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        AppError::InvalidInput {
            code: codes::INVALID_INPUT_VALUE,
            message: message.into(),
            errors: Vec::new(),
        }
    }

    pub fn capacity_below_headcount(headcount: i64) -> Self {
        Self::invalid(format!(
            "maxParticipants cannot be lower than the current {} members",
            headcount
        ))
    }

    pub fn invalid_fields(errors: Vec<FieldError>) -> Self {
        AppError::InvalidInput {
            code: codes::INVALID_INPUT_VALUE,
            message: "Invalid input value".to_string(),
            errors,
        }
    }

    pub fn password_mismatch() -> Self {
        AppError::InvalidInput {
            code: codes::PASSWORD_MISMATCH,
            message: "Current password does not match".to_string(),
            errors: Vec::new(),
        }
    }

    pub fn authentication_required() -> Self {
        AppError::Unauthorized {
            code: codes::AUTHENTICATION_REQUIRED,
            message: "Login required".to_string(),
        }
    }

    pub fn authentication_failed() -> Self {
        AppError::Unauthorized {
            code: codes::AUTHENTICATION_FAILED,
            message: "Invalid email or password".to_string(),
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::AlreadyJoined => StatusCode::CONFLICT,
            AppError::CapacityExceeded => StatusCode::CONFLICT,
            AppError::AccessDenied(_) => StatusCode::FORBIDDEN,
            AppError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
            AppError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::UniqueViolation(_) => StatusCode::CONFLICT,
            AppError::Database(_) | AppError::Session(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::NotFound { code, .. }
            | AppError::InvalidInput { code, .. }
            | AppError::Unauthorized { code, .. }
            | AppError::Conflict { code, .. } => *code,
            AppError::AlreadyJoined => codes::CREW_MEMBER_ALREADY_JOINED,
            AppError::CapacityExceeded => codes::CREW_MEMBER_LIMIT_EXCEEDED,
            AppError::AccessDenied(_) => codes::ACCESS_DENIED,
            AppError::UniqueViolation(_) => codes::DATA_CONFLICT,
            AppError::Database(_) | AppError::Session(_) | AppError::Internal(_) => {
                codes::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to show to clients. Server-side failures never leak details.
    pub fn client_message(&self) -> String {
        match self {
            AppError::Database(_) | AppError::Session(_) | AppError::Internal(_) => {
                "Internal server error".to_string()
            }
            AppError::UniqueViolation(_) => "Request conflicts with existing data".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                tracing::debug!("Unique constraint violation: {}", db_err.message());
                return AppError::UniqueViolation(db_err.message().to_string());
            }
        }
        tracing::error!("Database error: {:?}", err);
        AppError::Database(err.to_string())
    }
}

impl From<tower_sessions::session::Error> for AppError {
    fn from(err: tower_sessions::session::Error) -> Self {
        tracing::error!("Session error: {:?}", err);
        AppError::Session(err.to_string())
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(err: bcrypt::BcryptError) -> Self {
        tracing::error!("Password hashing error: {:?}", err);
        AppError::Internal(format!("password hashing failed: {}", err))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::invalid(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::invalid(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::invalid(rejection.body_text())
    }
}

/// Error response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub code: String,
    pub message: String,
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,
}

impl ErrorResponse {
    pub fn new(error: &AppError) -> Self {
        let errors = match error {
            AppError::InvalidInput { errors, .. } => errors.clone(),
            _ => Vec::new(),
        };

        Self {
            success: false,
            code: error.error_code().to_string(),
            message: error.client_message(),
            data: None,
            errors,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.error_code(), "Request failed: {}", self);
        } else {
            tracing::debug!(code = self.error_code(), "Request rejected: {}", self);
        }
        (status, Json(ErrorResponse::new(&self))).into_response()
    }
}
