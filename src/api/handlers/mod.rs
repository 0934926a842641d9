//! API handlers for the Lawdesk identity service.
//!
//! Auth flows (registration, login, tokens, lockout, verification, reset)
//! live under [`auth`]; `me` covers authenticated self-service and
//! `identities` the admin-only surface.

pub mod auth;
pub mod health;
pub mod identities;
pub mod me;
pub mod root;
