use crate::api;
use crate::api::handlers::auth::{AuthConfig, Environment};
use anyhow::{Context, Result};
use secrecy::SecretString;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub environment: String,
    pub frontend_base_url: String,
    pub access_token_secret: String,
    pub refresh_token_secret: Option<String>,
    pub access_token_ttl_seconds: i64,
    pub refresh_token_ttl_seconds: i64,
    pub verification_token_ttl_seconds: i64,
    pub reset_token_ttl_seconds: i64,
    pub session_cookie_ttl_seconds: i64,
    pub remember_cookie_ttl_seconds: i64,
    pub lockout_threshold: i32,
    pub lockout_duration_seconds: i64,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the configuration is invalid or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let environment: Environment = args
        .environment
        .parse()
        .context("invalid LAWDESK_ENVIRONMENT")?;

    let mut auth_config = AuthConfig::new(
        environment,
        args.frontend_base_url,
        SecretString::from(args.access_token_secret),
    )
    .with_access_token_ttl_seconds(args.access_token_ttl_seconds)
    .with_refresh_token_ttl_seconds(args.refresh_token_ttl_seconds)
    .with_verification_token_ttl_seconds(args.verification_token_ttl_seconds)
    .with_reset_token_ttl_seconds(args.reset_token_ttl_seconds)
    .with_session_cookie_ttl_seconds(args.session_cookie_ttl_seconds)
    .with_remember_cookie_ttl_seconds(args.remember_cookie_ttl_seconds)
    .with_lockout_threshold(args.lockout_threshold)
    .with_lockout_duration_seconds(args.lockout_duration_seconds);

    if let Some(secret) = args.refresh_token_secret {
        auth_config = auth_config.with_refresh_token_secret(SecretString::from(secret));
    }

    api::new(args.port, args.dsn, auth_config).await
}
