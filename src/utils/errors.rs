use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::gateway::GatewayError;
use crate::models::response::ErrorResponse;
use crate::workspace::WorkspaceError;

#[derive(Debug, Error, Serialize, ToSchema)]
pub enum ServiceError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Not Found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Validation Error: {0}")]
    ValidationError(String),
    #[error("Database Error: {0}")]
    DatabaseError(String),
    #[error("Internal Error: {0}")]
    InternalError(String),
}

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Conflict(_) => StatusCode::CONFLICT,
            ServiceError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ServiceError::DatabaseError(_) | ServiceError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            ServiceError::Unauthorized(msg) | ServiceError::ValidationError(msg) => {
                log::warn!("{}", self);
                msg.clone()
            }
            ServiceError::NotFound(msg) | ServiceError::Conflict(msg) => {
                log::error!("{}", self);
                msg.clone()
            }
            ServiceError::DatabaseError(_) => {
                log::error!("{}", self);
                // Don't expose database details
                "Database operation failed".to_string()
            }
            ServiceError::InternalError(_) => {
                log::error!("{}", self);
                "Something went wrong".to_string()
            }
        };
        HttpResponse::build(self.status_code()).json(ErrorResponse::new(message))
    }
}

impl From<GatewayError> for ServiceError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::NotFound(what) => ServiceError::NotFound(format!("{} not found", what)),
            GatewayError::Constraint(msg) => ServiceError::Conflict(msg),
            GatewayError::Corrupt(_) | GatewayError::Unavailable(_) | GatewayError::Database(_) => {
                ServiceError::DatabaseError(err.to_string())
            }
        }
    }
}

impl From<WorkspaceError> for ServiceError {
    fn from(err: WorkspaceError) -> Self {
        match err {
            WorkspaceError::UnknownTask(_) => ServiceError::NotFound(err.to_string()),
            WorkspaceError::InvalidIndex { .. } => ServiceError::ValidationError(err.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = err
            .field_errors()
            .into_iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| match e.message {
                    Some(ref message) => message.to_string(),
                    None => format!("{} is invalid", field),
                })
            })
            .collect();
        messages.sort();
        ServiceError::ValidationError(messages.join("; "))
    }
}

// Convert JWT errors to ServiceError
impl From<jsonwebtoken::errors::Error> for ServiceError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;
        match err.kind() {
            ErrorKind::ExpiredSignature => ServiceError::Unauthorized("Token has expired".to_string()),
            ErrorKind::InvalidAudience => ServiceError::Unauthorized("Token audience is not accepted".to_string()),
            _ => ServiceError::Unauthorized("Invalid token".to_string()),
        }
    }
}
