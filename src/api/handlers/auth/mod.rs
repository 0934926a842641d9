//! Auth handlers and supporting modules.
//!
//! This module owns the credential store, token issuance, the request guard,
//! and the lockout policy.
//!
//! ## Lockout
//!
//! Five consecutive failed logins lock the account for two hours from the
//! fifth failure. Locks expire lazily on the next attempt; a successful
//! login clears all failure state.
//!
//! ## Tokens
//!
//! Access tokens are short-lived and carry the role; refresh tokens are
//! long-lived and only renew the pair. Both embed a `token_use`
//! discriminator and are rejected when presented for the other purpose.
//! One-time email tokens are stored as SHA-256 digests only.
//!
//! > **Warning:** Rotating the signing secrets invalidates every
//! > outstanding session at once.

pub(crate) mod guard;
mod lockout;
pub(crate) mod login;
mod password;
pub(crate) mod register;
pub(crate) mod reset;
pub(crate) mod session;
mod state;
pub(crate) mod storage;
mod tokens;
pub mod types;
mod utils;
pub(crate) mod verification;

pub use guard::{Principal, optional_auth, require_active_subscription, require_auth, require_role};
pub use state::{AuthConfig, AuthState, Environment};

#[cfg(test)]
mod tests;
