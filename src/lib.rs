//! # Lawdesk (Authentication & Session Lifecycle)
//!
//! `lawdesk` is the identity authority for the Lawdesk legal practice
//! platform. It owns registration, login, signed access/refresh tokens,
//! email verification, password reset, and the request guard that every
//! protected endpoint of the platform sits behind.
//!
//! ## Identity Model
//!
//! Each person is one identity record with a closed role set (`lawyer`,
//! `litigant`, `clerk`, `admin`) and an account status
//! (`pending_verification`, `active`, `suspended`, `banned`).
//!
//! - **Soft Deletes:** Identities are never physically removed. Repository
//!   lookups take an explicit `include_deleted` flag so the filtering is
//!   visible at every call site.
//! - **Lockout:** Five consecutive failed logins lock the account for two
//!   hours. Locks expire lazily; there is no explicit unlock.
//! - **Credential Changes:** Tokens issued before a password change are
//!   rejected, even when otherwise still valid.
//!
//! ## Tokens
//!
//! Access and refresh tokens are HS256 JWTs carrying a `token_use`
//! discriminator. A token presented for the wrong purpose is rejected as a
//! type mismatch. Refresh tokens use a separate signing secret when one is
//! configured. One-time tokens (email verification, password reset) are
//! random 32-byte values; only their SHA-256 digest is stored.

pub mod api;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
