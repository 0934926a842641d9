//! Authenticated self-service endpoints.
//!
//! Flow Overview:
//! 1) Resolve the request through the session guard.
//! 2) Apply allow-listed profile updates; lawyer-only fields are rejected
//!    for other roles.
//! 3) Deactivation is a soft delete plus cookie clearing.

use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use sqlx::PgPool;
use std::sync::Arc;

use crate::api::error::{ApiError, Envelope, FieldError};

use super::auth::{AuthState, require_auth};
use super::auth::session::clear_cookie_headers;
use super::auth::storage::{self, ProfileUpdate};
use super::auth::types::{IdentitySummary, Role, UpdateMeRequest};

#[utoipa::path(
    get,
    path = "/v1/me",
    responses(
        (status = 200, description = "The authenticated identity", body = IdentitySummary),
        (status = 401, description = "Missing or invalid credentials")
    ),
    tag = "me"
)]
pub async fn get_me(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> Result<impl IntoResponse, ApiError> {
    let principal = require_auth(&headers, &pool, &auth_state).await?;

    let record = storage::lookup_by_id(&pool, principal.id, false)
        .await?
        .ok_or_else(|| ApiError::NotFound("Identity not found".to_string()))?;

    Ok((
        StatusCode::OK,
        Json(Envelope::ok("OK", IdentitySummary::from(&record))),
    ))
}

#[utoipa::path(
    patch,
    path = "/v1/me",
    request_body = UpdateMeRequest,
    responses(
        (status = 200, description = "Profile updated", body = IdentitySummary),
        (status = 400, description = "Invalid update payload"),
        (status = 401, description = "Missing or invalid credentials")
    ),
    tag = "me"
)]
pub async fn update_me(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<UpdateMeRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let principal = require_auth(&headers, &pool, &auth_state).await?;

    let request: UpdateMeRequest = match payload {
        Some(Json(payload)) => payload,
        None => return Err(ApiError::validation("Missing or malformed payload")),
    };

    // Credential and status fields have their own flows; this surface only
    // touches profile data, and bar-license fields only for lawyers.
    if principal.role != Role::Lawyer {
        let mut errors = Vec::new();
        if request.license_number.is_some() {
            errors.push(FieldError::new(
                "licenseNumber",
                "Only lawyer accounts carry a license number",
            ));
        }
        if request.specialization.is_some() {
            errors.push(FieldError::new(
                "specialization",
                "Only lawyer accounts carry a specialization",
            ));
        }
        if !errors.is_empty() {
            return Err(ApiError::fields("Invalid profile update", errors));
        }
    }

    let update = ProfileUpdate {
        first_name: request.first_name,
        last_name: request.last_name,
        phone: request.phone,
        license_number: request.license_number,
        specialization: request.specialization,
    };
    if update.is_empty() {
        return Err(ApiError::validation("Nothing to update"));
    }

    let record = storage::update_profile(&pool, principal.id, &update)
        .await?
        .ok_or_else(|| ApiError::NotFound("Identity not found".to_string()))?;

    Ok((
        StatusCode::OK,
        Json(Envelope::ok("Profile updated", IdentitySummary::from(&record))),
    ))
}

#[utoipa::path(
    delete,
    path = "/v1/me",
    responses(
        (status = 200, description = "Account deactivated (soft delete)"),
        (status = 401, description = "Missing or invalid credentials")
    ),
    tag = "me"
)]
pub async fn delete_me(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> Result<impl IntoResponse, ApiError> {
    let principal = require_auth(&headers, &pool, &auth_state).await?;

    storage::soft_delete(&pool, principal.id).await?;

    // The record stays for audit; the session cookies do not.
    let cookies = clear_cookie_headers(auth_state.config());
    Ok((
        StatusCode::OK,
        cookies,
        Json(Envelope::message("Account deactivated")),
    ))
}
