//! Auth configuration and shared state.
//!
//! Everything the auth flows need — signing secrets, TTLs, the lockout
//! policy, environment gating — is constructed here at startup and handed to
//! handlers through `Extension<Arc<AuthState>>`. There are no ambient
//! globals.

use secrecy::{ExposeSecret, SecretString};
use std::str::FromStr;

use super::lockout::LockoutPolicy;
use super::tokens::TokenIssuer;

const DEFAULT_ACCESS_TOKEN_TTL_SECONDS: i64 = 15 * 60;
const DEFAULT_REFRESH_TOKEN_TTL_SECONDS: i64 = 7 * 24 * 60 * 60;
const DEFAULT_VERIFICATION_TOKEN_TTL_SECONDS: i64 = 24 * 60 * 60;
const DEFAULT_RESET_TOKEN_TTL_SECONDS: i64 = 30 * 60;
const DEFAULT_SESSION_COOKIE_TTL_SECONDS: i64 = 24 * 60 * 60;
const DEFAULT_REMEMBER_COOKIE_TTL_SECONDS: i64 = 7 * 24 * 60 * 60;
const DEFAULT_LOCKOUT_THRESHOLD: i32 = 5;
const DEFAULT_LOCKOUT_DURATION_SECONDS: i64 = 2 * 60 * 60;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Environment {
    Production,
    Development,
}

impl Environment {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Production => "production",
            Self::Development => "development",
        }
    }
}

impl FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "production" | "prod" => Ok(Self::Production),
            "development" | "dev" => Ok(Self::Development),
            other => Err(anyhow::anyhow!("unknown environment: {other}")),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AuthConfig {
    environment: Environment,
    frontend_base_url: String,
    access_token_secret: SecretString,
    refresh_token_secret: Option<SecretString>,
    access_token_ttl_seconds: i64,
    refresh_token_ttl_seconds: i64,
    verification_token_ttl_seconds: i64,
    reset_token_ttl_seconds: i64,
    session_cookie_ttl_seconds: i64,
    remember_cookie_ttl_seconds: i64,
    lockout_threshold: i32,
    lockout_duration_seconds: i64,
}

impl AuthConfig {
    #[must_use]
    pub fn new(
        environment: Environment,
        frontend_base_url: String,
        access_token_secret: SecretString,
    ) -> Self {
        Self {
            environment,
            frontend_base_url,
            access_token_secret,
            refresh_token_secret: None,
            access_token_ttl_seconds: DEFAULT_ACCESS_TOKEN_TTL_SECONDS,
            refresh_token_ttl_seconds: DEFAULT_REFRESH_TOKEN_TTL_SECONDS,
            verification_token_ttl_seconds: DEFAULT_VERIFICATION_TOKEN_TTL_SECONDS,
            reset_token_ttl_seconds: DEFAULT_RESET_TOKEN_TTL_SECONDS,
            session_cookie_ttl_seconds: DEFAULT_SESSION_COOKIE_TTL_SECONDS,
            remember_cookie_ttl_seconds: DEFAULT_REMEMBER_COOKIE_TTL_SECONDS,
            lockout_threshold: DEFAULT_LOCKOUT_THRESHOLD,
            lockout_duration_seconds: DEFAULT_LOCKOUT_DURATION_SECONDS,
        }
    }

    #[must_use]
    pub fn with_refresh_token_secret(mut self, secret: SecretString) -> Self {
        self.refresh_token_secret = Some(secret);
        self
    }

    #[must_use]
    pub fn with_access_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.access_token_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_refresh_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.refresh_token_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_verification_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.verification_token_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_reset_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.reset_token_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_session_cookie_ttl_seconds(mut self, seconds: i64) -> Self {
        self.session_cookie_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_remember_cookie_ttl_seconds(mut self, seconds: i64) -> Self {
        self.remember_cookie_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_lockout_threshold(mut self, threshold: i32) -> Self {
        self.lockout_threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_lockout_duration_seconds(mut self, seconds: i64) -> Self {
        self.lockout_duration_seconds = seconds;
        self
    }

    #[must_use]
    pub const fn environment(&self) -> Environment {
        self.environment
    }

    #[must_use]
    pub fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    pub(crate) const fn is_production(&self) -> bool {
        matches!(self.environment, Environment::Production)
    }

    /// Raw one-time tokens are echoed in responses only outside production,
    /// so local setups work without an email integration.
    pub(crate) const fn expose_test_tokens(&self) -> bool {
        !self.is_production()
    }

    /// Cookies carry the `Secure` attribute only in production.
    pub(super) const fn cookie_secure(&self) -> bool {
        self.is_production()
    }

    pub(super) fn verification_token_ttl_seconds(&self) -> i64 {
        self.verification_token_ttl_seconds
    }

    pub(super) fn reset_token_ttl_seconds(&self) -> i64 {
        self.reset_token_ttl_seconds
    }

    pub(super) fn session_cookie_ttl_seconds(&self) -> i64 {
        self.session_cookie_ttl_seconds
    }

    pub(super) fn remember_cookie_ttl_seconds(&self) -> i64 {
        self.remember_cookie_ttl_seconds
    }
}

pub struct AuthState {
    config: AuthConfig,
    issuer: TokenIssuer,
    lockout: LockoutPolicy,
}

impl AuthState {
    #[must_use]
    pub fn new(config: AuthConfig) -> Self {
        let issuer = TokenIssuer::new(
            config.access_token_secret.expose_secret().as_bytes(),
            config
                .refresh_token_secret
                .as_ref()
                .map(|secret| secret.expose_secret().as_bytes()),
            config.access_token_ttl_seconds,
            config.refresh_token_ttl_seconds,
        );
        let lockout = LockoutPolicy::new(config.lockout_threshold, config.lockout_duration_seconds);
        Self {
            config,
            issuer,
            lockout,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub(crate) fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    pub(super) fn lockout(&self) -> &LockoutPolicy {
        &self.lockout
    }
}
