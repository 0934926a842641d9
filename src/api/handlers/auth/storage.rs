//! Database access for identity records.
//!
//! Every lookup takes an explicit `include_deleted` flag; soft-delete
//! filtering is visible at each call site rather than injected invisibly.
//! Counter and activity writes are system bookkeeping and bypass the
//! `updated_at` stamp on purpose.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::Instrument;
use uuid::Uuid;

use super::types::{AccountStatus, Role};
use super::utils::unique_constraint;

const EMAIL_CONSTRAINT: &str = "identities_email_unique";
const LICENSE_CONSTRAINT: &str = "identities_license_number_unique";

const IDENTITY_COLUMNS: &str = "id, email, password_hash, role::text AS role, \
     status::text AS status, first_name, last_name, phone, license_number, \
     specialization, subscription_tier, subscription_active, email_verified, \
     failed_login_attempts, locked_until, password_changed_at, deleted, \
     created_at, updated_at";

/// Full identity row. Never serialized to clients; see `IdentitySummary`.
#[derive(Debug, Clone)]
pub(crate) struct IdentityRecord {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub status: AccountStatus,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub license_number: Option<String>,
    pub specialization: Option<String>,
    pub subscription_tier: String,
    pub subscription_active: bool,
    pub email_verified: bool,
    pub failed_login_attempts: i32,
    pub locked_until: Option<DateTime<Utc>>,
    pub password_changed_at: DateTime<Utc>,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert payload for a new identity.
#[derive(Debug)]
pub(super) struct NewIdentity {
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub license_number: Option<String>,
    pub specialization: Option<String>,
}

/// Outcome when attempting to create a new identity.
#[derive(Debug)]
pub(super) enum RegisterOutcome {
    Created(Box<IdentityRecord>),
    EmailConflict,
    LicenseConflict,
}

/// Allow-listed profile fields; `None` leaves the column untouched.
#[derive(Debug, Default)]
pub(crate) struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub license_number: Option<String>,
    pub specialization: Option<String>,
}

impl ProfileUpdate {
    pub(crate) fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.phone.is_none()
            && self.license_number.is_none()
            && self.specialization.is_none()
    }
}

fn map_identity(row: &PgRow) -> Result<IdentityRecord> {
    let role: String = row.try_get("role")?;
    let status: String = row.try_get("status")?;
    Ok(IdentityRecord {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        role: role.parse()?,
        status: status.parse()?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        phone: row.try_get("phone")?,
        license_number: row.try_get("license_number")?,
        specialization: row.try_get("specialization")?,
        subscription_tier: row.try_get("subscription_tier")?,
        subscription_active: row.try_get("subscription_active")?,
        email_verified: row.try_get("email_verified")?,
        failed_login_attempts: row.try_get("failed_login_attempts")?,
        locked_until: row.try_get("locked_until")?,
        password_changed_at: row.try_get("password_changed_at")?,
        deleted: row.try_get("deleted")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Look up one identity by normalized email.
pub(super) async fn lookup_by_email(
    pool: &PgPool,
    email: &str,
    include_deleted: bool,
) -> Result<Option<IdentityRecord>> {
    let filter = if include_deleted { "" } else { " AND NOT deleted" };
    let query = format!("SELECT {IDENTITY_COLUMNS} FROM identities WHERE email = $1{filter}");
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = %query
    );
    let row = sqlx::query(&query)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup identity by email")?;

    row.as_ref().map(map_identity).transpose()
}

pub(crate) async fn lookup_by_id(
    pool: &PgPool,
    id: Uuid,
    include_deleted: bool,
) -> Result<Option<IdentityRecord>> {
    let filter = if include_deleted { "" } else { " AND NOT deleted" };
    let query = format!("SELECT {IDENTITY_COLUMNS} FROM identities WHERE id = $1{filter}");
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = %query
    );
    let row = sqlx::query(&query)
        .bind(id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup identity by id")?;

    row.as_ref().map(map_identity).transpose()
}

/// Create a new identity in `pending_verification` state.
///
/// The verification token digest rides along in the same statement so the
/// identity and its token are persisted together or not at all.
pub(super) async fn insert_identity(
    pool: &PgPool,
    new: &NewIdentity,
    verification_digest: &[u8],
    verification_ttl_seconds: i64,
) -> Result<RegisterOutcome> {
    let query = format!(
        "INSERT INTO identities \
             (email, password_hash, role, first_name, last_name, phone, \
              license_number, specialization, verification_token_hash, \
              verification_token_expires_at) \
         VALUES ($1, $2, $3::identity_role, $4, $5, $6, $7, $8, $9, \
                 NOW() + ($10 * INTERVAL '1 second')) \
         RETURNING {IDENTITY_COLUMNS}"
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = %query
    );
    let row = sqlx::query(&query)
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(new.role.as_str())
        .bind(&new.first_name)
        .bind(&new.last_name)
        .bind(&new.phone)
        .bind(&new.license_number)
        .bind(&new.specialization)
        .bind(verification_digest)
        .bind(verification_ttl_seconds)
        .fetch_one(pool)
        .instrument(span)
        .await;

    match row {
        Ok(row) => Ok(RegisterOutcome::Created(Box::new(map_identity(&row)?))),
        Err(err) => match unique_constraint(&err).as_deref() {
            Some(EMAIL_CONSTRAINT) => Ok(RegisterOutcome::EmailConflict),
            Some(LICENSE_CONSTRAINT) => Ok(RegisterOutcome::LicenseConflict),
            _ => Err(err).context("failed to insert identity"),
        },
    }
}

/// Store the digest of a freshly issued verification token.
pub(super) async fn store_verification_token(
    pool: &PgPool,
    id: Uuid,
    digest: &[u8],
    ttl_seconds: i64,
) -> Result<()> {
    let query = r"
        UPDATE identities
        SET verification_token_hash = $2,
            verification_token_expires_at = NOW() + ($3 * INTERVAL '1 second'),
            updated_at = NOW()
        WHERE id = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(id)
        .bind(digest)
        .bind(ttl_seconds)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to store verification token")?;
    Ok(())
}

/// Consume an unexpired verification token and mark the email verified.
///
/// One statement, so the token can be consumed exactly once; a second
/// attempt with the same digest matches no row.
pub(super) async fn consume_verification_token(
    pool: &PgPool,
    digest: &[u8],
) -> Result<Option<Uuid>> {
    let query = r"
        UPDATE identities
        SET email_verified = TRUE,
            verification_token_hash = NULL,
            verification_token_expires_at = NULL,
            updated_at = NOW()
        WHERE verification_token_hash = $1
          AND verification_token_expires_at > NOW()
          AND NOT deleted
        RETURNING id
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(digest)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to consume verification token")?;

    Ok(row.map(|row| row.get("id")))
}

/// Store the digest of a freshly issued password reset token.
pub(super) async fn store_reset_token(
    pool: &PgPool,
    id: Uuid,
    digest: &[u8],
    ttl_seconds: i64,
) -> Result<()> {
    let query = r"
        UPDATE identities
        SET reset_token_hash = $2,
            reset_token_expires_at = NOW() + ($3 * INTERVAL '1 second'),
            updated_at = NOW()
        WHERE id = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(id)
        .bind(digest)
        .bind(ttl_seconds)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to store reset token")?;
    Ok(())
}

/// Find the identity holding an unexpired reset token digest.
pub(super) async fn lookup_by_reset_digest(
    pool: &PgPool,
    digest: &[u8],
) -> Result<Option<IdentityRecord>> {
    let query = format!(
        "SELECT {IDENTITY_COLUMNS} FROM identities \
         WHERE reset_token_hash = $1 \
           AND reset_token_expires_at > NOW() \
           AND NOT deleted"
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = %query
    );
    let row = sqlx::query(&query)
        .bind(digest)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup identity by reset token")?;

    row.as_ref().map(map_identity).transpose()
}

/// Replace the password hash and clear recovery/lockout state.
///
/// `password_changed_at` is stamped one second in the past so a token issued
/// in the same instant as the change is still rejected as stale.
pub(super) async fn set_password(pool: &PgPool, id: Uuid, password_hash: &str) -> Result<()> {
    let query = r"
        UPDATE identities
        SET password_hash = $2,
            password_changed_at = NOW() - INTERVAL '1 second',
            failed_login_attempts = 0,
            locked_until = NULL,
            reset_token_hash = NULL,
            reset_token_expires_at = NULL,
            updated_at = NOW()
        WHERE id = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(id)
        .bind(password_hash)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to set password")?;
    Ok(())
}

/// Persist the lockout decision after a failed password check.
pub(super) async fn record_login_failure(
    pool: &PgPool,
    id: Uuid,
    attempts: i32,
    locked_until: Option<DateTime<Utc>>,
) -> Result<()> {
    let query = r"
        UPDATE identities
        SET failed_login_attempts = $2,
            locked_until = $3
        WHERE id = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(id)
        .bind(attempts)
        .bind(locked_until)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to record login failure")?;
    Ok(())
}

/// Clear failure state and stamp the login time after a successful login.
pub(super) async fn record_login_success(pool: &PgPool, id: Uuid) -> Result<()> {
    let query = r"
        UPDATE identities
        SET failed_login_attempts = 0,
            locked_until = NULL,
            last_login_at = NOW()
        WHERE id = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to record login success")?;
    Ok(())
}

/// Promote a pending identity to active. No-op for any other status.
pub(crate) async fn promote_to_active(pool: &PgPool, id: Uuid) -> Result<()> {
    let query = r"
        UPDATE identities
        SET status = 'active',
            updated_at = NOW()
        WHERE id = $1
          AND status = 'pending_verification'
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to promote identity to active")?;
    Ok(())
}

/// Record activity for audit/visibility.
pub(crate) async fn touch_last_active(pool: &PgPool, id: Uuid) -> Result<()> {
    let query = "UPDATE identities SET last_active_at = NOW() WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to update last_active_at")?;
    Ok(())
}

/// Apply allow-listed profile fields and return the updated record.
pub(crate) async fn update_profile(
    pool: &PgPool,
    id: Uuid,
    update: &ProfileUpdate,
) -> Result<Option<IdentityRecord>> {
    let query = format!(
        "UPDATE identities \
         SET first_name = COALESCE($2, first_name), \
             last_name = COALESCE($3, last_name), \
             phone = COALESCE($4, phone), \
             license_number = COALESCE($5, license_number), \
             specialization = COALESCE($6, specialization), \
             updated_at = NOW() \
         WHERE id = $1 AND NOT deleted \
         RETURNING {IDENTITY_COLUMNS}"
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = %query
    );
    let row = sqlx::query(&query)
        .bind(id)
        .bind(&update.first_name)
        .bind(&update.last_name)
        .bind(&update.phone)
        .bind(&update.license_number)
        .bind(&update.specialization)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to update profile")?;

    row.as_ref().map(map_identity).transpose()
}

/// Logical delete; the row stays for audit but drops out of default lookups.
pub(crate) async fn soft_delete(pool: &PgPool, id: Uuid) -> Result<()> {
    let query = r"
        UPDATE identities
        SET deleted = TRUE,
            updated_at = NOW()
        WHERE id = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to soft delete identity")?;
    Ok(())
}

/// Most recent identities, for the admin surface.
pub(crate) async fn list_identities(
    pool: &PgPool,
    limit: i64,
    include_deleted: bool,
) -> Result<Vec<IdentityRecord>> {
    let filter = if include_deleted { "" } else { "WHERE NOT deleted " };
    let query = format!(
        "SELECT {IDENTITY_COLUMNS} FROM identities {filter}ORDER BY created_at DESC LIMIT $1"
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = %query
    );
    let rows = sqlx::query(&query)
        .bind(limit)
        .fetch_all(pool)
        .instrument(span)
        .await
        .context("failed to list identities")?;

    rows.iter().map(map_identity).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_outcome_debug_names() {
        assert_eq!(format!("{:?}", RegisterOutcome::EmailConflict), "EmailConflict");
        assert_eq!(
            format!("{:?}", RegisterOutcome::LicenseConflict),
            "LicenseConflict"
        );
    }

    #[test]
    fn profile_update_emptiness() {
        assert!(ProfileUpdate::default().is_empty());
        let update = ProfileUpdate {
            phone: Some("03001234567".to_string()),
            ..ProfileUpdate::default()
        };
        assert!(!update.is_empty());
    }

    #[test]
    fn new_identity_holds_values() {
        let new = NewIdentity {
            email: "a@x.com".to_string(),
            password_hash: "$2b$12$hash".to_string(),
            role: Role::Litigant,
            first_name: "A".to_string(),
            last_name: "B".to_string(),
            phone: None,
            license_number: None,
            specialization: None,
        };
        assert_eq!(new.role, Role::Litigant);
        assert_eq!(new.email, "a@x.com");
    }
}
