//! Login with lockout enforcement.

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::debug;

use crate::api::error::{ApiError, Envelope, FieldError};

use super::lockout::{self, FailureUpdate};
use super::password::verify_password;
use super::session::auth_cookie_headers;
use super::state::AuthState;
use super::storage;
use super::types::{AccountStatus, IdentitySummary, LoginRequest, SessionResponse};
use super::utils::normalize_email;

/// Shared by the unknown-email and wrong-password paths so the transport
/// layer never reveals which one happened.
const INVALID_CREDENTIALS: &str = "Incorrect email or password.";

#[utoipa::path(
    post,
    path = "/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token pair issued and cookies set", body = SessionResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Account suspended or banned"),
        (status = 423, description = "Account locked after repeated failures")
    ),
    tag = "auth"
)]
pub async fn login(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<LoginRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let request: LoginRequest = match payload {
        Some(Json(payload)) => payload,
        None => return Err(ApiError::validation("Missing or malformed payload")),
    };

    let mut errors = Vec::new();
    if request.email.trim().is_empty() {
        errors.push(FieldError::new("email", "Email is required"));
    }
    if request.password.is_empty() {
        errors.push(FieldError::new("password", "Password is required"));
    }
    if !errors.is_empty() {
        return Err(ApiError::fields("Invalid login payload", errors));
    }

    let email = normalize_email(&request.email);
    let mut record = storage::lookup_by_email(&pool, &email, false)
        .await?
        .ok_or_else(|| ApiError::Unauthenticated(INVALID_CREDENTIALS.to_string()))?;

    // Locked accounts are rejected before the password is even checked.
    let now = Utc::now();
    if lockout::is_locked(record.locked_until, now)
        && let Some(until) = record.locked_until
    {
        let minutes = lockout::remaining_minutes(until, now);
        return Err(ApiError::Locked(format!(
            "Account is locked. Try again in {minutes} minutes."
        )));
    }

    let password_ok = verify_password(request.password, record.password_hash.clone()).await?;
    if !password_ok {
        let update = auth_state.lockout().on_failure(
            record.failed_login_attempts,
            record.locked_until,
            now,
        );
        let (attempts, locked_until) = match update {
            FailureUpdate::Counted { attempts } => (attempts, None),
            FailureUpdate::Locked {
                attempts,
                locked_until,
            } => {
                debug!(identity = %record.id, "account locked after repeated failures");
                (attempts, Some(locked_until))
            }
        };
        storage::record_login_failure(&pool, record.id, attempts, locked_until).await?;
        return Err(ApiError::Unauthenticated(INVALID_CREDENTIALS.to_string()));
    }

    match record.status {
        AccountStatus::Suspended => {
            return Err(ApiError::Forbidden(
                "This account has been suspended.".to_string(),
            ));
        }
        AccountStatus::Banned => {
            return Err(ApiError::Forbidden(
                "This account has been banned.".to_string(),
            ));
        }
        AccountStatus::PendingVerification => {
            // A verified email plus valid credentials is enough to activate.
            if record.email_verified {
                storage::promote_to_active(&pool, record.id).await?;
                record.status = AccountStatus::Active;
            }
        }
        AccountStatus::Active => {}
    }

    // Resets the failure counter, clears any expired lock, stamps the login.
    storage::record_login_success(&pool, record.id).await?;

    let pair = auth_state.issuer().issue_pair(record.id, record.role)?;
    let remember = request.remember_me.unwrap_or(false);
    let cookies = auth_cookie_headers(auth_state.config(), &pair, remember)?;

    let response = SessionResponse {
        token: pair.access_token,
        refresh_token: pair.refresh_token,
        identity: IdentitySummary::from(&record),
    };
    Ok((
        StatusCode::OK,
        cookies,
        Json(Envelope::ok("Logged in successfully", response)),
    ))
}
