use anyhow::{Context, Result};
use clap::{Arg, Command};

pub const ARG_ENVIRONMENT: &str = "environment";
pub const ARG_FRONTEND_BASE_URL: &str = "frontend-base-url";
pub const ARG_ACCESS_TOKEN_SECRET: &str = "access-token-secret";
pub const ARG_REFRESH_TOKEN_SECRET: &str = "refresh-token-secret";

/// Parsed auth-related CLI options.
#[derive(Debug)]
pub struct Options {
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

impl Options {
    /// Extract auth options from parsed matches.
    ///
    /// # Errors
    /// Returns an error if a required argument is missing.
    pub fn parse(matches: &clap::ArgMatches) -> Result<Self> {
        let string = |name: &str| -> Result<String> {
            matches
                .get_one::<String>(name)
                .cloned()
                .with_context(|| format!("missing required argument: --{name}"))
        };
        let int = |name: &str| -> Result<i64> {
            matches
                .get_one::<i64>(name)
                .copied()
                .with_context(|| format!("missing required argument: --{name}"))
        };

        Ok(Self {
            environment: string(ARG_ENVIRONMENT)?,
            frontend_base_url: string(ARG_FRONTEND_BASE_URL)?,
            access_token_secret: string(ARG_ACCESS_TOKEN_SECRET)?,
            refresh_token_secret: matches.get_one::<String>(ARG_REFRESH_TOKEN_SECRET).cloned(),
            access_token_ttl_seconds: int("access-token-ttl-seconds")?,
            refresh_token_ttl_seconds: int("refresh-token-ttl-seconds")?,
            verification_token_ttl_seconds: int("verification-token-ttl-seconds")?,
            reset_token_ttl_seconds: int("reset-token-ttl-seconds")?,
            session_cookie_ttl_seconds: int("session-cookie-ttl-seconds")?,
            remember_cookie_ttl_seconds: int("remember-cookie-ttl-seconds")?,
            lockout_threshold: i32::try_from(int("lockout-threshold")?)
                .context("lockout threshold out of range")?,
            lockout_duration_seconds: int("lockout-duration-seconds")?,
        })
    }
}

pub fn with_args(command: Command) -> Command {
    let command = with_token_args(command);
    with_lockout_args(command)
}

fn with_token_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_ENVIRONMENT)
                .long(ARG_ENVIRONMENT)
                .help("Deployment environment: production or development")
                .env("LAWDESK_ENVIRONMENT")
                .default_value("development"),
        )
        .arg(
            Arg::new(ARG_FRONTEND_BASE_URL)
                .long(ARG_FRONTEND_BASE_URL)
                .help("Frontend base URL used for CORS and email links")
                .env("LAWDESK_FRONTEND_BASE_URL")
                .default_value("https://lawdesk.app"),
        )
        .arg(
            Arg::new(ARG_ACCESS_TOKEN_SECRET)
                .long(ARG_ACCESS_TOKEN_SECRET)
                .help("HS256 signing secret for access tokens")
                .env("LAWDESK_ACCESS_TOKEN_SECRET")
                .required(true),
        )
        .arg(
            Arg::new(ARG_REFRESH_TOKEN_SECRET)
                .long(ARG_REFRESH_TOKEN_SECRET)
                .help("HS256 signing secret for refresh tokens (defaults to the access secret)")
                .env("LAWDESK_REFRESH_TOKEN_SECRET"),
        )
        .arg(
            Arg::new("access-token-ttl-seconds")
                .long("access-token-ttl-seconds")
                .help("Access token TTL in seconds")
                .env("LAWDESK_ACCESS_TOKEN_TTL_SECONDS")
                .default_value("900")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new("refresh-token-ttl-seconds")
                .long("refresh-token-ttl-seconds")
                .help("Refresh token TTL in seconds")
                .env("LAWDESK_REFRESH_TOKEN_TTL_SECONDS")
                .default_value("604800")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new("verification-token-ttl-seconds")
                .long("verification-token-ttl-seconds")
                .help("Email verification token TTL in seconds")
                .env("LAWDESK_VERIFICATION_TOKEN_TTL_SECONDS")
                .default_value("86400")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new("reset-token-ttl-seconds")
                .long("reset-token-ttl-seconds")
                .help("Password reset token TTL in seconds")
                .env("LAWDESK_RESET_TOKEN_TTL_SECONDS")
                .default_value("1800")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new("session-cookie-ttl-seconds")
                .long("session-cookie-ttl-seconds")
                .help("Auth cookie TTL in seconds for a regular login")
                .env("LAWDESK_SESSION_COOKIE_TTL_SECONDS")
                .default_value("86400")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new("remember-cookie-ttl-seconds")
                .long("remember-cookie-ttl-seconds")
                .help("Auth cookie TTL in seconds for a remember-me login")
                .env("LAWDESK_REMEMBER_COOKIE_TTL_SECONDS")
                .default_value("604800")
                .value_parser(clap::value_parser!(i64)),
        )
}

fn with_lockout_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("lockout-threshold")
                .long("lockout-threshold")
                .help("Consecutive failed logins before the account is locked")
                .env("LAWDESK_LOCKOUT_THRESHOLD")
                .default_value("5")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new("lockout-duration-seconds")
                .long("lockout-duration-seconds")
                .help("Lock duration in seconds after the threshold is reached")
                .env("LAWDESK_LOCKOUT_DURATION_SECONDS")
                .default_value("7200")
                .value_parser(clap::value_parser!(i64)),
        )
}
