//! Command-line argument dispatch and server initialization.
//!
//! This module parses validated CLI arguments and maps them to the appropriate
//! action, such as starting the API server with its full configuration state.

use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::auth;
use anyhow::{Context, Result};

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;

    let auth_opts = auth::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        dsn,
        environment: auth_opts.environment,
        frontend_base_url: auth_opts.frontend_base_url,
        access_token_secret: auth_opts.access_token_secret,
        refresh_token_secret: auth_opts.refresh_token_secret,
        access_token_ttl_seconds: auth_opts.access_token_ttl_seconds,
        refresh_token_ttl_seconds: auth_opts.refresh_token_ttl_seconds,
        verification_token_ttl_seconds: auth_opts.verification_token_ttl_seconds,
        reset_token_ttl_seconds: auth_opts.reset_token_ttl_seconds,
        session_cookie_ttl_seconds: auth_opts.session_cookie_ttl_seconds,
        remember_cookie_ttl_seconds: auth_opts.remember_cookie_ttl_seconds,
        lockout_threshold: auth_opts.lockout_threshold,
        lockout_duration_seconds: auth_opts.lockout_duration_seconds,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_token_secret_required() {
        temp_env::with_vars(
            [
                ("LAWDESK_ACCESS_TOKEN_SECRET", None::<&str>),
                (
                    "LAWDESK_DSN",
                    Some("postgres://user@localhost:5432/lawdesk"),
                ),
            ],
            || {
                let command = crate::cli::commands::new();
                let result = command.try_get_matches_from(vec!["lawdesk"]);
                // clap enforces the secret at parse time
                assert!(result.is_err());
            },
        );
    }

    #[test]
    fn handler_builds_server_action() -> Result<()> {
        temp_env::with_vars([("LAWDESK_REFRESH_TOKEN_SECRET", None::<&str>)], || {
            let command = crate::cli::commands::new();
            let matches = command.get_matches_from(vec![
                "lawdesk",
                "--dsn",
                "postgres://user@localhost:5432/lawdesk",
                "--access-token-secret",
                "access-secret",
                "--environment",
                "production",
                "--lockout-threshold",
                "3",
            ]);
            let Action::Server(args) = handler(&matches)?;
            assert_eq!(args.port, 8080);
            assert_eq!(args.environment, "production");
            assert_eq!(args.access_token_secret, "access-secret");
            assert_eq!(args.refresh_token_secret, None);
            assert_eq!(args.access_token_ttl_seconds, 900);
            assert_eq!(args.refresh_token_ttl_seconds, 604_800);
            assert_eq!(args.lockout_threshold, 3);
            assert_eq!(args.lockout_duration_seconds, 7200);
            Ok(())
        })
    }
}
