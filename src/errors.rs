use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::error::DbErr;
use serde::{Deserialize, Serialize};

/// Error body returned by every failing endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// HTTP status category (e.g., "Not Found", "Conflict")
    pub error: String,
    /// Human-readable error description
    pub message: String,
    /// Offending field names or venue names, when the error carries them
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
    /// RFC 3339 timestamp when the error occurred
    pub timestamp: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Venue already booked: {}", .venues.join(", "))]
    BookingConflict { venues: Vec<String> },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Document error: {0}")]
    DocumentError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl From<crate::storage::StorageError> for ServiceError {
    fn from(err: crate::storage::StorageError) -> Self {
        ServiceError::StorageError(err.to_string())
    }
}

impl From<crate::rendering::RenderError> for ServiceError {
    fn from(err: crate::rendering::RenderError) -> Self {
        ServiceError::DocumentError(err.to_string())
    }
}

impl From<crate::notifications::NotificationError> for ServiceError {
    fn from(err: crate::notifications::NotificationError) -> Self {
        use crate::notifications::NotificationError;
        match err {
            NotificationError::Database(e) => ServiceError::DatabaseError(e),
            NotificationError::NotFound(id) => {
                ServiceError::NotFound(format!("Notification {} not found", id))
            }
            other => ServiceError::InternalError(other.to_string()),
        }
    }
}

impl ServiceError {
    /// Returns the HTTP status code for this error.
    /// This is the single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::DatabaseError(_)
            | Self::StorageError(_)
            | Self::DocumentError(_)
            | Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::BookingConflict { .. } | Self::Conflict(_) | Self::InvalidStatus(_) => {
                StatusCode::CONFLICT
            }
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Internal errors return generic messages to avoid leaking implementation details.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::StorageError(_) | Self::DocumentError(_) | Self::InternalError(_) => {
                "Internal server error".to_string()
            }
            Self::InvalidStatus(_) => format!("Action not allowed: {}", self),
            _ => self.to_string(),
        }
    }

    fn details(&self) -> Vec<String> {
        match self {
            Self::BookingConflict { venues } => venues.clone(),
            _ => Vec::new(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let err = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.response_message(),
            details: self.details(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(err)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_error_status_code_mapping() {
        assert_eq!(
            ServiceError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServiceError::ValidationError("x".into()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ServiceError::BookingConflict {
                venues: vec!["Hall A".into()]
            }
            .status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServiceError::InvalidStatus("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServiceError::Forbidden("x".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ServiceError::StorageError("disk".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn response_message_hides_internal_details() {
        assert_eq!(
            ServiceError::StorageError("/var/data is read-only".into()).response_message(),
            "Internal server error"
        );
        assert_eq!(
            ServiceError::DatabaseError(DbErr::Custom("boom".into())).response_message(),
            "Database error"
        );
        assert_eq!(
            ServiceError::NotFound("Order 7".into()).response_message(),
            "Not found: Order 7"
        );
        assert_eq!(
            ServiceError::InvalidStatus("order is already confirmed".into()).response_message(),
            "Action not allowed: Invalid status: order is already confirmed"
        );
    }

    #[test]
    fn booking_conflict_names_every_venue() {
        let err = ServiceError::BookingConflict {
            venues: vec!["Hall A".into(), "Ballroom".into()],
        };
        assert_eq!(err.to_string(), "Venue already booked: Hall A, Ballroom");
        assert_eq!(err.details(), vec!["Hall A".to_string(), "Ballroom".to_string()]);
    }
}
