use crate::{
    db::errors::DbError,
    types::{Operation, Permission},
};
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Missing, malformed or expired credentials
    #[error("{message}")]
    Unauthenticated { message: String },

    /// Authenticated, but the caller's role does not grant the operation
    #[error("Insufficient permissions to {action} {resource}")]
    InsufficientPermissions {
        required: Permission,
        action: Operation,
        resource: String,
    },

    /// Authenticated, but the record belongs to someone else
    #[error("{message}")]
    Forbidden { message: String },

    #[error("{message}")]
    PaymentRequired { message: String },

    #[error("{message}")]
    BadRequest { message: String },

    #[error("{resource} not found: {id}")]
    NotFound { resource: String, id: String },

    /// A third-party service (checkout provider, model provider) failed
    #[error("{message}")]
    Upstream { message: String },

    #[error("Internal error: {operation}")]
    Internal { operation: String },

    #[error(transparent)]
    Database(#[from] DbError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn unauthenticated() -> Self {
        Error::Unauthenticated {
            message: "Could not validate credentials".to_string(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            Error::InsufficientPermissions { .. } | Error::Forbidden { .. } => StatusCode::FORBIDDEN,
            Error::PaymentRequired { .. } => StatusCode::PAYMENT_REQUIRED,
            Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::Upstream { .. } | Error::Internal { .. } | Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Database(db) => match db {
                DbError::NotFound => StatusCode::NOT_FOUND,
                DbError::UniqueViolation { .. } | DbError::ForeignKeyViolation { .. } | DbError::CheckViolation { .. } => {
                    StatusCode::BAD_REQUEST
                }
                DbError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Message safe to return to the client
    pub fn user_message(&self) -> String {
        match self {
            Error::InsufficientPermissions { .. } => "Access forbidden: insufficient permissions".to_string(),
            Error::NotFound { resource, .. } => format!("{resource} not found"),
            Error::Database(DbError::NotFound) => "Resource not found".to_string(),
            Error::Database(DbError::UniqueViolation { .. }) => "Resource already exists".to_string(),
            Error::Database(DbError::ForeignKeyViolation { .. }) => "Referenced resource does not exist".to_string(),
            Error::Database(DbError::CheckViolation { .. }) => "Request violates a data constraint".to_string(),
            Error::Internal { .. } | Error::Other(_) | Error::Database(DbError::Other(_)) => "Internal server error".to_string(),
            Error::Unauthenticated { message }
            | Error::Forbidden { message }
            | Error::PaymentRequired { message }
            | Error::BadRequest { message }
            | Error::Upstream { message } => message.clone(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, status = %status, "request rejected");
        }

        let body = Json(json!({ "detail": self.user_message() }));

        if status == StatusCode::UNAUTHORIZED {
            (status, [(header::WWW_AUTHENTICATE, "Bearer")], body).into_response()
        } else {
            (status, body).into_response()
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Resource;

    #[test]
    fn test_status_codes() {
        assert_eq!(Error::unauthenticated().status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            Error::PaymentRequired { message: "x".into() }.status_code(),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(
            Error::InsufficientPermissions {
                required: Permission::Allow(Resource::Stats, Operation::ReadAll),
                action: Operation::ReadAll,
                resource: "stats".into(),
            }
            .status_code(),
            StatusCode::FORBIDDEN
        );
        let duplicate = Error::Database(DbError::UniqueViolation {
            constraint: Some("users_email_key".into()),
            table: Some("users".into()),
            message: "duplicate".into(),
        });
        assert_eq!(duplicate.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let err = Error::Internal {
            operation: "connect to database at postgres://secret".into(),
        };
        assert_eq!(err.user_message(), "Internal server error");
    }
}
