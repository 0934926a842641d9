//! Cookie contract, logout, and token refresh.

use axum::{
    Json,
    extract::Extension,
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{InvalidHeaderValue, SET_COOKIE},
    },
    response::IntoResponse,
};
use sqlx::PgPool;
use std::sync::Arc;

use crate::api::error::{ApiError, Envelope};

use super::state::{AuthConfig, AuthState};
use super::storage;
use super::tokens::{TokenError, TokenKind, TokenPair};
use super::types::{AccountStatus, IdentitySummary, RefreshRequest, SessionResponse};
use super::utils::extract_cookie;

const TOKEN_COOKIE: &str = "token";
const REFRESH_COOKIE: &str = "refreshToken";

/// Build the `token` + `refreshToken` cookie pair for a fresh login.
pub(super) fn auth_cookie_headers(
    config: &AuthConfig,
    pair: &TokenPair,
    remember: bool,
) -> Result<HeaderMap, ApiError> {
    // Remember-me stretches the cookie lifetime; the tokens themselves keep
    // their own expiries.
    let max_age = if remember {
        config.remember_cookie_ttl_seconds()
    } else {
        config.session_cookie_ttl_seconds()
    };

    let mut headers = HeaderMap::new();
    for (name, value) in [
        (TOKEN_COOKIE, pair.access_token.as_str()),
        (REFRESH_COOKIE, pair.refresh_token.as_str()),
    ] {
        let cookie = session_cookie(name, value, max_age, config.cookie_secure())
            .map_err(|err| ApiError::Internal(anyhow::anyhow!("invalid cookie value: {err}")))?;
        headers.append(SET_COOKIE, cookie);
    }
    Ok(headers)
}

fn session_cookie(
    name: &str,
    value: &str,
    max_age: i64,
    secure: bool,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie =
        format!("{name}={value}; Path=/; HttpOnly; SameSite=Strict; Max-Age={max_age}");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// Overwrite both auth cookies with a 1-second expiry.
pub(crate) fn clear_cookie_headers(config: &AuthConfig) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for name in [TOKEN_COOKIE, REFRESH_COOKIE] {
        if let Ok(cookie) = session_cookie(name, "", 1, config.cookie_secure()) {
            headers.append(SET_COOKIE, cookie);
        }
    }
    headers
}

#[utoipa::path(
    post,
    path = "/v1/auth/logout",
    responses(
        (status = 200, description = "Session cookies cleared")
    ),
    tag = "auth"
)]
pub async fn logout(auth_state: Extension<Arc<AuthState>>) -> impl IntoResponse {
    // Tokens are stateless; logout is purely a cookie overwrite.
    let headers = clear_cookie_headers(auth_state.config());
    (StatusCode::OK, headers, Json(Envelope::message("Logged out")))
}

#[utoipa::path(
    post,
    path = "/v1/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New token pair issued", body = SessionResponse),
        (status = 401, description = "Missing, invalid, or stale refresh token"),
        (status = 403, description = "Account suspended or banned")
    ),
    tag = "auth"
)]
pub async fn refresh(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<RefreshRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let request = payload.map(|Json(payload)| payload);

    // Body wins over cookie so API clients can refresh without cookies.
    let token = request
        .as_ref()
        .and_then(|request| request.refresh_token.clone())
        .or_else(|| extract_cookie(&headers, REFRESH_COOKIE))
        .ok_or_else(|| ApiError::Unauthenticated("No refresh token provided.".to_string()))?;

    let claims = auth_state
        .issuer()
        .verify(&token, TokenKind::Refresh)
        .map_err(|err| {
            ApiError::Unauthenticated(
                match err {
                    TokenError::Expired => "Your refresh token has expired. Please log in again.",
                    TokenError::Malformed => "Invalid refresh token.",
                    TokenError::WrongType => "A refresh token is required.",
                }
                .to_string(),
            )
        })?;

    let record = storage::lookup_by_id(&pool, claims.sub, false)
        .await?
        .ok_or_else(|| {
            ApiError::Unauthenticated(
                "The account belonging to this token no longer exists.".to_string(),
            )
        })?;

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
        AccountStatus::Active | AccountStatus::PendingVerification => {}
    }

    if claims.iat <= record.password_changed_at.timestamp() {
        return Err(ApiError::Unauthenticated(
            "Password was changed recently. Please log in again.".to_string(),
        ));
    }

    let pair = auth_state.issuer().issue_pair(record.id, record.role)?;
    let remember = request.and_then(|request| request.remember_me).unwrap_or(false);
    let cookies = auth_cookie_headers(auth_state.config(), &pair, remember)?;

    let response = SessionResponse {
        token: pair.access_token,
        refresh_token: pair.refresh_token,
        identity: IdentitySummary::from(&record),
    };
    Ok((
        StatusCode::OK,
        cookies,
        Json(Envelope::ok("Token refreshed", response)),
    ))
}
