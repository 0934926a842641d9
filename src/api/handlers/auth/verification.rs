//! Email verification endpoints.

use axum::{
    Json,
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::debug;

use crate::api::error::{ApiError, Envelope};

use super::state::AuthState;
use super::storage;
use super::types::{ResendVerificationRequest, VerificationTokenResponse};
use super::utils::{generate_one_time_token, hash_one_time_token, normalize_email, valid_email};

#[utoipa::path(
    get,
    path = "/v1/auth/verify-email/{token}",
    params(
        ("token" = String, Path, description = "Raw verification token from the email link")
    ),
    responses(
        (status = 200, description = "Email verified"),
        (status = 404, description = "Token invalid, expired, or already used")
    ),
    tag = "auth"
)]
pub async fn verify_email(
    Path(token): Path<String>,
    pool: Extension<PgPool>,
) -> Result<impl IntoResponse, ApiError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(ApiError::validation("Missing verification token"));
    }

    // Hash before lookup; raw tokens are never stored server-side. The
    // consume is a single statement, so a second attempt finds nothing.
    let digest = hash_one_time_token(token);
    match storage::consume_verification_token(&pool, &digest).await? {
        Some(id) => {
            debug!(identity = %id, "email verified");
            Ok((
                StatusCode::OK,
                Json(Envelope::message("Email verified successfully")),
            ))
        }
        None => Err(ApiError::NotFound(
            "Verification token is invalid or has expired.".to_string(),
        )),
    }
}

/// Issue a fresh verification token for an unverified account.
///
/// The response is identical whether or not the email exists, to avoid
/// account probing.
#[utoipa::path(
    post,
    path = "/v1/auth/resend-verification",
    request_body = ResendVerificationRequest,
    responses(
        (status = 200, description = "Accepted; a new link is issued when the account qualifies"),
        (status = 400, description = "Invalid email format")
    ),
    tag = "auth"
)]
pub async fn resend_verification(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<ResendVerificationRequest>>,
) -> Result<Response, ApiError> {
    let request: ResendVerificationRequest = match payload {
        Some(Json(payload)) => payload,
        None => return Err(ApiError::validation("Missing or malformed payload")),
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return Err(ApiError::validation("A valid email address is required"));
    }

    const MESSAGE: &str =
        "If an account matching this email exists, a new verification link has been issued.";

    let record = storage::lookup_by_email(&pool, &email, false).await?;
    if let Some(record) = record
        && !record.email_verified
    {
        let token = generate_one_time_token()?;
        let digest = hash_one_time_token(&token);
        storage::store_verification_token(
            &pool,
            record.id,
            &digest,
            auth_state.config().verification_token_ttl_seconds(),
        )
        .await?;

        if auth_state.config().expose_test_tokens() {
            let response = VerificationTokenResponse {
                verification_token: Some(token),
            };
            return Ok((StatusCode::OK, Json(Envelope::ok(MESSAGE, response))).into_response());
        }
    }

    Ok((StatusCode::OK, Json(Envelope::message(MESSAGE))).into_response())
}
