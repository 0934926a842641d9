//! Administrative identity listing.

use axum::{
    Json,
    extract::{Extension, Query},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use serde::Deserialize;
use sqlx::PgPool;
use std::sync::Arc;
use utoipa::IntoParams;

use crate::api::error::{ApiError, Envelope};

use super::auth::{AuthState, require_auth, require_role};
use super::auth::storage;
use super::auth::types::{IdentitySummary, Role};

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 100;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListParams {
    /// Maximum rows to return (1-100, default 50).
    limit: Option<i64>,
    /// Include soft-deleted identities.
    include_deleted: Option<bool>,
}

#[utoipa::path(
    get,
    path = "/v1/identities",
    params(ListParams),
    responses(
        (status = 200, description = "Most recent identities", body = [IdentitySummary]),
        (status = 401, description = "Missing or invalid credentials"),
        (status = 403, description = "Caller is not an administrator")
    ),
    tag = "identities"
)]
pub async fn list_identities(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let principal = require_auth(&headers, &pool, &auth_state).await?;
    require_role(&principal, &[Role::Admin])?;

    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let include_deleted = params.include_deleted.unwrap_or(false);

    let records = storage::list_identities(&pool, limit, include_deleted).await?;
    let identities: Vec<IdentitySummary> = records.iter().map(IdentitySummary::from).collect();

    Ok((StatusCode::OK, Json(Envelope::ok("OK", identities))))
}
