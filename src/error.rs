use crate::gateway::GatewayError;
use crate::jobs::JobError;
use crate::registry::RegistryError;
use crate::schema::{ErrorDetails, SchemaError};
use crate::workflow::WorkflowError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value as JsonValue;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed: {0}")]
    Validation(ErrorDetails),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("unknown entity: {0}")]
    UnknownEntity(String),
    #[error("unknown collection: {0}")]
    UnknownCollection(String),
    #[error("resource not found: {0}")]
    NotFound(String),
    #[error("authentication failed")]
    AuthenticationFailed,
    #[error("destination unavailable: {0}")]
    DestinationUnavailable(String),
    #[error("{0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: JsonValue,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_)
            | Self::BadRequest(_)
            | Self::UnknownEntity(_)
            | Self::UnknownCollection(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::AuthenticationFailed | Self::DestinationUnavailable(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::InvalidId(raw) => Self::BadRequest(format!("Invalid id: {raw}")),
            GatewayError::NotFound(message) => Self::NotFound(message),
            GatewayError::DestinationUnavailable(message) => Self::DestinationUnavailable(message),
            GatewayError::AuthenticationFailed(_) => Self::AuthenticationFailed,
        }
    }
}

impl From<RegistryError> for AppError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::UnknownCollection(name) => Self::UnknownCollection(name),
            RegistryError::InvalidName(message) => Self::BadRequest(message),
        }
    }
}

impl From<SchemaError> for AppError {
    fn from(err: SchemaError) -> Self {
        match err {
            SchemaError::UnknownEntity(name) => Self::UnknownEntity(name),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<JobError> for AppError {
    fn from(err: JobError) -> Self {
        match err {
            JobError::UnknownJob(name) => Self::NotFound(format!("Job not found: {name}")),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<WorkflowError> for AppError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::MissingFile => Self::NotFound(err.to_string()),
            WorkflowError::NotConfigured => Self::Internal(err.to_string()),
            WorkflowError::Rejected(_) | WorkflowError::Unavailable => {
                Self::DestinationUnavailable(err.to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = match self {
            Self::Validation(details) => details.to_json(),
            Self::BadRequest(message) => JsonValue::String(message),
            Self::UnknownEntity(name) => JsonValue::String(format!("Unknown entity: {name}")),
            Self::UnknownCollection(name) => {
                JsonValue::String(format!("Unknown collection: {name}"))
            }
            Self::NotFound(message) => JsonValue::String(message),
            Self::AuthenticationFailed => JsonValue::String("Failed to acquire token".to_string()),
            Self::DestinationUnavailable(message) | Self::Internal(message) => {
                JsonValue::String(message)
            }
        };

        (status, Json(ErrorBody { error })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Violation;

    #[test]
    fn status_table() {
        let details: ErrorDetails =
            std::iter::once(Violation::new(vec!["email".to_string()], "x")).collect();
        assert_eq!(AppError::Validation(details).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::from(RegistryError::UnknownCollection("x".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(SchemaError::UnknownEntity("x".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(GatewayError::InvalidId("42".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(GatewayError::NotFound("x".into())).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::from(GatewayError::AuthenticationFailed("secret detail".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::from(JobError::UnknownJob("nightly".into())).status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn authentication_failures_do_not_leak_detail() {
        let err = AppError::from(GatewayError::AuthenticationFailed(
            "invalid_client: secret abc".into(),
        ));
        assert!(!err.to_string().contains("abc"));
    }
}
