//! Typed operational errors and the uniform response envelope.
//!
//! Every handler failure is an [`ApiError`] that renders through one
//! boundary: a status code plus the `{success, message, data?/errors?}`
//! envelope clients branch on. Unexpected errors are logged server-side and
//! surface as a generic message; debug builds include the error chain.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;
use utoipa::ToSchema;

/// Field-level detail attached to validation failures.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Malformed input, surfaced with optional field-level detail.
    #[error("{message}")]
    Validation {
        message: String,
        errors: Vec<FieldError>,
    },
    /// Duplicate value for a unique field.
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    NotFound(String),
    /// Missing, invalid, expired, or type-mismatched credentials.
    #[error("{0}")]
    Unauthenticated(String),
    /// Authenticated but not allowed: role, account state, or subscription.
    #[error("{0}")]
    Forbidden(String),
    /// Account is temporarily locked after repeated failed logins.
    #[error("{0}")]
    Locked(String),
    /// Unexpected failure; never leaks internals outside debug builds.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            errors: Vec::new(),
        }
    }

    pub fn fields(message: impl Into<String>, errors: Vec<FieldError>) -> Self {
        Self::Validation {
            message: message.into(),
            errors,
        }
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Locked(_) => StatusCode::LOCKED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        Self::Internal(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (message, errors) = match self {
            Self::Validation { message, errors } => {
                let errors = if errors.is_empty() { None } else { Some(errors) };
                (message, errors)
            }
            Self::Internal(err) => {
                error!("Unhandled error: {err:#}");
                let message = if cfg!(debug_assertions) {
                    format!("{err:#}")
                } else {
                    "Something went wrong".to_string()
                };
                (message, None)
            }
            Self::Conflict(message)
            | Self::NotFound(message)
            | Self::Unauthenticated(message)
            | Self::Forbidden(message)
            | Self::Locked(message) => (message, None),
        };

        let body = Envelope::<()> {
            success: false,
            message,
            data: None,
            errors,
        };
        (status, Json(body)).into_response()
    }
}

/// Uniform response envelope shared by success and failure responses.
#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
            errors: None,
        }
    }
}

impl Envelope<()> {
    /// Success with a message and no payload.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
            errors: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn status_codes_match_taxonomy() {
        assert_eq!(
            ApiError::validation("bad").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Conflict("dup".into()).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::NotFound("missing".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Unauthenticated("no".into()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Forbidden("nope".into()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(ApiError::Locked("wait".into()).status(), StatusCode::LOCKED);
        assert_eq!(
            ApiError::Internal(anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn envelope_skips_empty_fields() -> anyhow::Result<()> {
        let value = serde_json::to_value(Envelope::message("Logged out"))?;
        assert_eq!(
            value,
            serde_json::json!({"success": true, "message": "Logged out"})
        );
        Ok(())
    }

    #[test]
    fn envelope_carries_data() -> anyhow::Result<()> {
        let value = serde_json::to_value(Envelope::ok("ok", serde_json::json!({"id": 7})))?;
        assert_eq!(value["success"], serde_json::json!(true));
        assert_eq!(value["data"]["id"], serde_json::json!(7));
        Ok(())
    }

    #[test]
    fn validation_envelope_lists_field_errors() {
        let err = ApiError::fields(
            "Invalid input",
            vec![FieldError::new("email", "Invalid email address")],
        );
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
