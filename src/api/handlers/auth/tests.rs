//! Handler-level tests that exercise the validation and guard paths.
//!
//! Pools are created lazily and never reached: every asserted path fails
//! before the first query.

use anyhow::{Context, Result};
use axum::Json;
use axum::extract::{Extension, Path};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header::AUTHORIZATION, header::SET_COOKIE};
use axum::response::{IntoResponse, Response};
use secrecy::SecretString;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;

use super::guard::{optional_auth, require_auth};
use super::login::login;
use super::register::register;
use super::reset::change_password;
use super::session::{auth_cookie_headers, logout, refresh};
use super::state::{AuthConfig, AuthState, Environment};
use super::types::{ChangePasswordRequest, LoginRequest, RegisterRequest, RefreshRequest, Role};
use super::verification::verify_email;

fn config() -> AuthConfig {
    AuthConfig::new(
        Environment::Development,
        "https://lawdesk.app".to_string(),
        SecretString::from("handler-test-secret".to_string()),
    )
}

fn auth_state() -> Arc<AuthState> {
    Arc::new(AuthState::new(config()))
}

fn pool() -> Result<PgPool> {
    Ok(PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?)
}

fn bearer(token: &str) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {token}"))?);
    Ok(headers)
}

async fn body_json(response: Response) -> Result<serde_json::Value> {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[tokio::test]
async fn register_missing_payload() -> Result<()> {
    let response = register(Extension(pool()?), Extension(auth_state()), None)
        .await
        .into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn register_rejects_invalid_fields() -> Result<()> {
    let request = RegisterRequest {
        email: "not-an-email".to_string(),
        password: "short".to_string(),
        first_name: " ".to_string(),
        last_name: "B".to_string(),
        phone: None,
        role: Role::Litigant,
        license_number: None,
        specialization: None,
    };
    let response = register(
        Extension(pool()?),
        Extension(auth_state()),
        Some(Json(request)),
    )
    .await
    .into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await?;
    assert_eq!(body["success"], serde_json::json!(false));
    let errors = body["errors"].as_array().context("missing errors array")?;
    let fields: Vec<&str> = errors
        .iter()
        .filter_map(|error| error["field"].as_str())
        .collect();
    assert!(fields.contains(&"email"));
    assert!(fields.contains(&"password"));
    assert!(fields.contains(&"firstName"));
    Ok(())
}

#[tokio::test]
async fn register_lawyer_requires_license() -> Result<()> {
    let request = RegisterRequest {
        email: "counsel@chambers.pk".to_string(),
        password: "secret1x".to_string(),
        first_name: "A".to_string(),
        last_name: "B".to_string(),
        phone: Some("03001234567".to_string()),
        role: Role::Lawyer,
        license_number: None,
        specialization: Some("family".to_string()),
    };
    let response = register(
        Extension(pool()?),
        Extension(auth_state()),
        Some(Json(request)),
    )
    .await
    .into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await?;
    let errors = body["errors"].as_array().context("missing errors array")?;
    assert!(
        errors
            .iter()
            .any(|error| error["field"] == serde_json::json!("licenseNumber"))
    );
    Ok(())
}

#[tokio::test]
async fn login_missing_payload() -> Result<()> {
    let response = login(Extension(pool()?), Extension(auth_state()), None)
        .await
        .into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn login_empty_credentials() -> Result<()> {
    let request = LoginRequest {
        email: " ".to_string(),
        password: String::new(),
        remember_me: None,
    };
    let response = login(
        Extension(pool()?),
        Extension(auth_state()),
        Some(Json(request)),
    )
    .await
    .into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn logout_overwrites_both_cookies() -> Result<()> {
    let response = logout(Extension(auth_state())).await.into_response();
    assert_eq!(response.status(), StatusCode::OK);

    let cookies: Vec<&str> = response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .collect();
    assert_eq!(cookies.len(), 2);
    assert!(cookies.iter().any(|cookie| cookie.starts_with("token=;")));
    assert!(
        cookies
            .iter()
            .any(|cookie| cookie.starts_with("refreshToken=;"))
    );
    assert!(cookies.iter().all(|cookie| cookie.contains("Max-Age=1")));
    Ok(())
}

#[tokio::test]
async fn refresh_without_token() -> Result<()> {
    let response = refresh(
        HeaderMap::new(),
        Extension(pool()?),
        Extension(auth_state()),
        None,
    )
    .await
    .into_response();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn refresh_with_malformed_token() -> Result<()> {
    let request = RefreshRequest {
        refresh_token: Some("garbage".to_string()),
        remember_me: None,
    };
    let response = refresh(
        HeaderMap::new(),
        Extension(pool()?),
        Extension(auth_state()),
        Some(Json(request)),
    )
    .await
    .into_response();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn refresh_rejects_access_token() -> Result<()> {
    let state = auth_state();
    let pair = state.issuer().issue_pair(uuid::Uuid::new_v4(), Role::Litigant)?;

    let request = RefreshRequest {
        refresh_token: Some(pair.access_token),
        remember_me: None,
    };
    let response = refresh(
        HeaderMap::new(),
        Extension(pool()?),
        Extension(state),
        Some(Json(request)),
    )
    .await
    .into_response();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = body_json(response).await?;
    assert_eq!(
        body["message"],
        serde_json::json!("A refresh token is required.")
    );
    Ok(())
}

#[tokio::test]
async fn guard_rejects_missing_token() -> Result<()> {
    let state = auth_state();
    let err = require_auth(&HeaderMap::new(), &pool()?, &state)
        .await
        .expect_err("guard must reject a request without credentials");
    assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn guard_rejects_expired_token_with_reason() -> Result<()> {
    // Negative TTL makes every freshly issued token already expired.
    let expired_state = AuthState::new(config().with_access_token_ttl_seconds(-60));
    let pair = expired_state
        .issuer()
        .issue_pair(uuid::Uuid::new_v4(), Role::Litigant)?;

    let err = require_auth(&bearer(&pair.access_token)?, &pool()?, &expired_state)
        .await
        .expect_err("expired token must be rejected");
    assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    assert!(err.to_string().contains("expired"));
    Ok(())
}

#[tokio::test]
async fn guard_rejects_refresh_token_where_access_required() -> Result<()> {
    let state = auth_state();
    let pair = state.issuer().issue_pair(uuid::Uuid::new_v4(), Role::Clerk)?;

    let err = require_auth(&bearer(&pair.refresh_token)?, &pool()?, &state)
        .await
        .expect_err("refresh token must not pass the access guard");
    assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    assert!(err.to_string().contains("access token"));
    Ok(())
}

#[tokio::test]
async fn optional_guard_swallows_failures() -> Result<()> {
    let state = auth_state();
    assert!(optional_auth(&HeaderMap::new(), &pool()?, &state).await.is_none());
    assert!(
        optional_auth(&bearer("garbage")?, &pool()?, &state)
            .await
            .is_none()
    );
    Ok(())
}

#[tokio::test]
async fn change_password_requires_auth() -> Result<()> {
    let request = ChangePasswordRequest {
        current_password: "old-secret".to_string(),
        new_password: "new-secret".to_string(),
    };
    let response = change_password(
        HeaderMap::new(),
        Extension(pool()?),
        Extension(auth_state()),
        Some(Json(request)),
    )
    .await
    .into_response();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn verify_email_blank_token() -> Result<()> {
    let response = verify_email(Path(" ".to_string()), Extension(pool()?))
        .await
        .into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn cookie_ttl_follows_remember_me() -> Result<()> {
    let state = auth_state();
    let pair = state.issuer().issue_pair(uuid::Uuid::new_v4(), Role::Litigant)?;

    let short = auth_cookie_headers(state.config(), &pair, false)
        .map_err(|err| anyhow::anyhow!("cookie build failed: {err}"))?;
    for value in short.get_all(SET_COOKIE) {
        let cookie = value.to_str()?;
        assert!(cookie.contains("Max-Age=86400"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Strict"));
        assert!(!cookie.contains("Secure"));
    }

    let long = auth_cookie_headers(state.config(), &pair, true)
        .map_err(|err| anyhow::anyhow!("cookie build failed: {err}"))?;
    for value in long.get_all(SET_COOKIE) {
        assert!(value.to_str()?.contains("Max-Age=604800"));
    }
    Ok(())
}

#[tokio::test]
async fn production_cookies_are_secure() -> Result<()> {
    let prod_state = AuthState::new(AuthConfig::new(
        Environment::Production,
        "https://lawdesk.app".to_string(),
        SecretString::from("handler-test-secret".to_string()),
    ));
    let pair = prod_state
        .issuer()
        .issue_pair(uuid::Uuid::new_v4(), Role::Lawyer)?;

    let headers = auth_cookie_headers(prod_state.config(), &pair, false)
        .map_err(|err| anyhow::anyhow!("cookie build failed: {err}"))?;
    for value in headers.get_all(SET_COOKIE) {
        assert!(value.to_str()?.contains("; Secure"));
    }
    Ok(())
}
