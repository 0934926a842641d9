//! Registration.

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};
use sqlx::PgPool;
use std::sync::Arc;

use crate::api::error::{ApiError, Envelope, FieldError};

use super::password::hash_password;
use super::state::AuthState;
use super::storage::{self, NewIdentity, RegisterOutcome};
use super::types::{IdentitySummary, RegisterRequest, RegisterResponse, Role};
use super::utils::{
    generate_one_time_token, hash_one_time_token, normalize_email, valid_email, valid_password,
};

#[utoipa::path(
    post,
    path = "/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Identity created in pending_verification state", body = RegisterResponse),
        (status = 400, description = "Validation error"),
        (status = 409, description = "Email or license number already registered")
    ),
    tag = "auth"
)]
pub async fn register(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<RegisterRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let request: RegisterRequest = match payload {
        Some(Json(payload)) => payload,
        None => return Err(ApiError::validation("Missing or malformed payload")),
    };

    let email = normalize_email(&request.email);
    let mut errors = Vec::new();
    if !valid_email(&email) {
        errors.push(FieldError::new("email", "A valid email address is required"));
    }
    if !valid_password(&request.password) {
        errors.push(FieldError::new(
            "password",
            "Password must be at least 8 characters",
        ));
    }
    if request.first_name.trim().is_empty() {
        errors.push(FieldError::new("firstName", "First name is required"));
    }
    if request.last_name.trim().is_empty() {
        errors.push(FieldError::new("lastName", "Last name is required"));
    }
    let license_number = request
        .license_number
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string);
    if request.role == Role::Lawyer && license_number.is_none() {
        errors.push(FieldError::new(
            "licenseNumber",
            "A bar license number is required for lawyer accounts",
        ));
    }
    if !errors.is_empty() {
        return Err(ApiError::fields("Invalid registration payload", errors));
    }

    let password_hash = hash_password(request.password).await?;

    let new = NewIdentity {
        email,
        password_hash,
        role: request.role,
        first_name: request.first_name.trim().to_string(),
        last_name: request.last_name.trim().to_string(),
        phone: request.phone,
        license_number,
        specialization: request.specialization,
    };

    // The raw token goes out in the (stubbed) verification email; only its
    // digest is persisted, together with the identity row.
    let token = generate_one_time_token()?;
    let digest = hash_one_time_token(&token);
    let ttl = auth_state.config().verification_token_ttl_seconds();

    let record = match storage::insert_identity(&pool, &new, &digest, ttl).await? {
        RegisterOutcome::Created(record) => record,
        RegisterOutcome::EmailConflict => {
            return Err(ApiError::Conflict(
                "An account with this email already exists.".to_string(),
            ));
        }
        RegisterOutcome::LicenseConflict => {
            return Err(ApiError::Conflict(
                "This license number is already registered.".to_string(),
            ));
        }
    };

    let response = RegisterResponse {
        identity: IdentitySummary::from(record.as_ref()),
        verification_token: auth_state
            .config()
            .expose_test_tokens()
            .then_some(token),
    };

    Ok((
        StatusCode::CREATED,
        Json(Envelope::ok(
            "Registration successful. Verify your email to activate the account.",
            response,
        )),
    ))
}
