//! Password reset and change flows.
//!
//! Every path that replaces the hash runs through `storage::set_password`,
//! which also clears lockout/reset state and backdates `password_changed_at`
//! by one second so same-instant tokens are invalidated.

use axum::{
    Json,
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use sqlx::PgPool;
use std::sync::Arc;

use crate::api::error::{ApiError, Envelope};

use super::guard::require_auth;
use super::password::{hash_password, verify_password};
use super::session::auth_cookie_headers;
use super::state::AuthState;
use super::storage;
use super::types::{
    ChangePasswordRequest, ForgotPasswordRequest, IdentitySummary, ResetPasswordRequest,
    ResetTokenResponse, SessionResponse,
};
use super::utils::{
    generate_one_time_token, hash_one_time_token, normalize_email, valid_email, valid_password,
};

#[utoipa::path(
    post,
    path = "/v1/auth/forgot-password",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Reset token issued", body = ResetTokenResponse),
        (status = 404, description = "No account with this email")
    ),
    tag = "auth"
)]
pub async fn forgot_password(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<ForgotPasswordRequest>>,
) -> Result<Response, ApiError> {
    let request: ForgotPasswordRequest = match payload {
        Some(Json(payload)) => payload,
        None => return Err(ApiError::validation("Missing or malformed payload")),
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return Err(ApiError::validation("A valid email address is required"));
    }

    let record = storage::lookup_by_email(&pool, &email, false)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound("There is no account with this email address.".to_string())
        })?;

    let token = generate_one_time_token()?;
    let digest = hash_one_time_token(&token);
    storage::store_reset_token(
        &pool,
        record.id,
        &digest,
        auth_state.config().reset_token_ttl_seconds(),
    )
    .await?;

    const MESSAGE: &str = "Password reset token issued. Check your email.";
    if auth_state.config().expose_test_tokens() {
        let response = ResetTokenResponse {
            reset_token: Some(token),
        };
        return Ok((StatusCode::OK, Json(Envelope::ok(MESSAGE, response))).into_response());
    }
    Ok((StatusCode::OK, Json(Envelope::message(MESSAGE))).into_response())
}

#[utoipa::path(
    patch,
    path = "/v1/auth/reset-password/{token}",
    params(
        ("token" = String, Path, description = "Raw reset token from the email link")
    ),
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password replaced, new token pair issued", body = SessionResponse),
        (status = 400, description = "Invalid password or expired token")
    ),
    tag = "auth"
)]
pub async fn reset_password(
    Path(token): Path<String>,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<ResetPasswordRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let request: ResetPasswordRequest = match payload {
        Some(Json(payload)) => payload,
        None => return Err(ApiError::validation("Missing or malformed payload")),
    };
    if !valid_password(&request.password) {
        return Err(ApiError::validation(
            "Password must be at least 8 characters",
        ));
    }

    let digest = hash_one_time_token(token.trim());
    let record = storage::lookup_by_reset_digest(&pool, &digest)
        .await?
        .ok_or_else(|| ApiError::validation("Reset token is invalid or has expired"))?;

    let password_hash = hash_password(request.password).await?;
    storage::set_password(&pool, record.id, &password_hash).await?;

    // Log the user straight in with the new credential.
    let pair = auth_state.issuer().issue_pair(record.id, record.role)?;
    let cookies = auth_cookie_headers(auth_state.config(), &pair, false)?;

    let response = SessionResponse {
        token: pair.access_token,
        refresh_token: pair.refresh_token,
        identity: IdentitySummary::from(&record),
    };
    Ok((
        StatusCode::OK,
        cookies,
        Json(Envelope::ok("Password reset successfully", response)),
    ))
}

#[utoipa::path(
    patch,
    path = "/v1/auth/change-password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed, new token pair issued", body = SessionResponse),
        (status = 400, description = "Invalid new password"),
        (status = 401, description = "Not authenticated or wrong current password")
    ),
    tag = "auth"
)]
pub async fn change_password(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<ChangePasswordRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let principal = require_auth(&headers, &pool, &auth_state).await?;

    let request: ChangePasswordRequest = match payload {
        Some(Json(payload)) => payload,
        None => return Err(ApiError::validation("Missing or malformed payload")),
    };
    if !valid_password(&request.new_password) {
        return Err(ApiError::validation(
            "New password must be at least 8 characters",
        ));
    }

    let record = storage::lookup_by_id(&pool, principal.id, false)
        .await?
        .ok_or_else(|| {
            ApiError::Unauthenticated("The account no longer exists.".to_string())
        })?;

    let current_ok =
        verify_password(request.current_password, record.password_hash.clone()).await?;
    if !current_ok {
        return Err(ApiError::Unauthenticated(
            "Your current password is incorrect.".to_string(),
        ));
    }

    let password_hash = hash_password(request.new_password).await?;
    storage::set_password(&pool, record.id, &password_hash).await?;

    // The old tokens just became stale; hand back a fresh pair.
    let pair = auth_state.issuer().issue_pair(record.id, record.role)?;
    let cookies = auth_cookie_headers(auth_state.config(), &pair, false)?;

    let response = SessionResponse {
        token: pair.access_token,
        refresh_token: pair.refresh_token,
        identity: IdentitySummary::from(&record),
    };
    Ok((
        StatusCode::OK,
        cookies,
        Json(Envelope::ok("Password changed successfully", response)),
    ))
}
