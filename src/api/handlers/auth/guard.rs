//! Request guard for protected endpoints.
//!
//! Fixed check sequence, short-circuiting on the first failure:
//!
//! 1. token present (bearer header wins over cookie) — 401
//! 2. verifies as an access token — 401, message reflects the reason
//! 3. identity row still exists — 401
//! 4. identity not soft-deleted — 401
//! 5. account state allows access (`pending_verification` auto-promotes;
//!    `suspended`/`banned` are rejected) — 403
//! 6. not currently locked — 423 with remaining minutes
//! 7. token issued after the last password change — 401
//! 8. best-effort `last_active_at` touch
//!
//! On success the resolved [`Principal`] is handed to the calling handler.

use axum::http::HeaderMap;
use chrono::Utc;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::api::error::ApiError;

use super::lockout;
use super::state::AuthState;
use super::storage;
use super::tokens::{TokenError, TokenKind};
use super::types::{AccountStatus, Role};
use super::utils::extract_request_token;

/// Authenticated identity context attached to the request.
#[derive(Clone, Debug)]
pub struct Principal {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub subscription_tier: String,
    pub subscription_active: bool,
}

/// Resolve the request credentials into a principal, or reject.
pub async fn require_auth(
    headers: &HeaderMap,
    pool: &PgPool,
    state: &AuthState,
) -> Result<Principal, ApiError> {
    let Some(token) = extract_request_token(headers) else {
        return Err(ApiError::Unauthenticated(
            "You are not logged in. Please log in to get access.".to_string(),
        ));
    };

    let claims = state
        .issuer()
        .verify(&token, TokenKind::Access)
        .map_err(|err| {
            ApiError::Unauthenticated(
                match err {
                    TokenError::Expired => "Your session has expired. Please log in again.",
                    TokenError::Malformed => "Invalid authentication token.",
                    TokenError::WrongType => "An access token is required.",
                }
                .to_string(),
            )
        })?;

    // Existence and soft deletion are separate checks; the record is fetched
    // without the deleted filter so the distinction stays visible here.
    let record = storage::lookup_by_id(pool, claims.sub, true).await?;
    let Some(record) = record else {
        return Err(ApiError::Unauthenticated(
            "The account belonging to this token no longer exists.".to_string(),
        ));
    };
    if record.deleted {
        return Err(ApiError::Unauthenticated(
            "The account belonging to this token no longer exists.".to_string(),
        ));
    }

    match record.status {
        AccountStatus::Active => {}
        AccountStatus::PendingVerification => {
            // Reaching a protected endpoint with a valid token counts as verification.
            if let Err(err) = storage::promote_to_active(pool, record.id).await {
                debug!("Failed to auto-promote pending identity: {err:#}");
            }
        }
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
    }

    let now = Utc::now();
    if lockout::is_locked(record.locked_until, now)
        && let Some(until) = record.locked_until
    {
        let minutes = lockout::remaining_minutes(until, now);
        return Err(ApiError::Locked(format!(
            "Account is locked. Try again in {minutes} minutes."
        )));
    }

    if claims.iat <= record.password_changed_at.timestamp() {
        return Err(ApiError::Unauthenticated(
            "Password was changed recently. Please log in again.".to_string(),
        ));
    }

    if let Err(err) = storage::touch_last_active(pool, record.id).await {
        debug!("Failed to update last_active_at: {err:#}");
    }

    Ok(Principal {
        id: record.id,
        email: record.email,
        role: record.role,
        subscription_tier: record.subscription_tier,
        subscription_active: record.subscription_active,
    })
}

/// Same resolution as [`require_auth`], but failures yield `None` instead of
/// rejecting — for endpoints that only personalize when a session exists.
pub async fn optional_auth(
    headers: &HeaderMap,
    pool: &PgPool,
    state: &AuthState,
) -> Option<Principal> {
    require_auth(headers, pool, state).await.ok()
}

/// Post-guard role gate.
pub fn require_role(principal: &Principal, allowed: &[Role]) -> Result<(), ApiError> {
    if allowed.contains(&principal.role) {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "You do not have permission to perform this action.".to_string(),
        ))
    }
}

/// Post-guard subscription gate.
pub fn require_active_subscription(principal: &Principal) -> Result<(), ApiError> {
    if principal.subscription_active {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "An active subscription is required for this feature.".to_string(),
        ))
    }
}
