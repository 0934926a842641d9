//! Small helpers for validation, one-time tokens, and token transport.

use anyhow::{Context, Result};
use axum::http::{HeaderMap, header::AUTHORIZATION, header::COOKIE};
use base64::Engine;
use rand::{RngCore, rngs::OsRng};
use regex::Regex;
use sha2::{Digest, Sha256};

/// Minimum accepted password length.
pub(super) const MIN_PASSWORD_LENGTH: usize = 8;

/// Normalize an email for lookup/uniqueness checks.
pub(super) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic email format check on already-normalized input.
pub(super) fn valid_email(email_normalized: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email_normalized))
}

pub(super) fn valid_password(password: &str) -> bool {
    password.len() >= MIN_PASSWORD_LENGTH
}

/// Create a one-time token for verification/reset links.
///
/// The raw value is only returned to the caller; the database stores a digest.
pub(super) fn generate_one_time_token() -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate one-time token")?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
}

/// Hash a one-time token so raw values never touch the database.
/// The digest is used for lookups when the token is presented.
pub(crate) fn hash_one_time_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}

/// Resolve the request token: the Authorization bearer header takes
/// precedence over the `token` cookie when both are present.
pub(super) fn extract_request_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = extract_bearer_token(headers) {
        return Some(token);
    }
    extract_cookie(headers, "token")
}

pub(super) fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

pub(super) fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let header = headers.get(COOKIE)?;
    let value = header.to_str().ok()?;
    for pair in value.split(';') {
        let trimmed = pair.trim();
        let mut parts = trimmed.splitn(2, '=');
        let key = parts.next()?.trim();
        let val = parts.next()?.trim();
        if key == name && !val.is_empty() {
            return Some(val.to_string());
        }
    }
    None
}

/// Name of the violated unique constraint, if this is a unique violation.
pub(super) fn unique_constraint(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db_err) if db_err.code().is_some_and(|code| code.as_ref() == "23505") => {
            db_err.constraint().map(str::to_string)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::borrow::Cow;
    use std::error::Error as StdError;
    use std::fmt;

    #[test]
    fn normalize_email_trims_and_lowercases() {
        assert_eq!(normalize_email(" Counsel@Chambers.PK "), "counsel@chambers.pk");
    }

    #[test]
    fn valid_email_accepts_basic_format() {
        assert!(valid_email("a@x.com"));
        assert!(valid_email("name.surname@example.co"));
    }

    #[test]
    fn valid_email_rejects_missing_parts() {
        assert!(!valid_email("not-an-email"));
        assert!(!valid_email("missing-at.example.com"));
        assert!(!valid_email("missing-domain@"));
    }

    #[test]
    fn valid_password_enforces_minimum_length() {
        assert!(!valid_password("short7!"));
        assert!(valid_password("longenough"));
    }

    #[test]
    fn generate_one_time_token_round_trip() {
        let decoded_len = generate_one_time_token()
            .ok()
            .and_then(|token| URL_SAFE_NO_PAD.decode(token.as_bytes()).ok())
            .map(|bytes| bytes.len());
        assert_eq!(decoded_len, Some(32));
    }

    #[test]
    fn hash_one_time_token_stable() {
        let first = hash_one_time_token("token");
        let second = hash_one_time_token("token");
        let different = hash_one_time_token("other");
        assert_eq!(first, second);
        assert_ne!(first, different);
    }

    #[test]
    fn fresh_token_digest_matches_stored_digest() -> anyhow::Result<()> {
        // The digest stored at generation time must match the digest computed
        // when the raw token comes back on the verification link.
        let token = generate_one_time_token()?;
        let stored = hash_one_time_token(&token);
        assert_eq!(hash_one_time_token(&token), stored);
        Ok(())
    }

    #[test]
    fn bearer_token_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        headers.insert(COOKIE, HeaderValue::from_static("token=from-cookie"));
        assert_eq!(
            extract_request_token(&headers),
            Some("from-header".to_string())
        );
    }

    #[test]
    fn cookie_token_used_without_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; token=from-cookie; other=1"),
        );
        assert_eq!(
            extract_request_token(&headers),
            Some("from-cookie".to_string())
        );
    }

    #[test]
    fn empty_bearer_token_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(extract_request_token(&headers), None);
    }

    #[test]
    fn missing_token_yields_none() {
        let headers = HeaderMap::new();
        assert_eq!(extract_request_token(&headers), None);
        assert_eq!(extract_cookie(&headers, "refreshToken"), None);
    }

    #[derive(Debug)]
    struct TestDbError {
        code: Option<&'static str>,
        constraint: Option<&'static str>,
    }

    impl fmt::Display for TestDbError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "test database error")
        }
    }

    impl StdError for TestDbError {}

    impl DatabaseError for TestDbError {
        fn message(&self) -> &'static str {
            "test database error"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            self.code.map(Cow::Borrowed)
        }

        fn constraint(&self) -> Option<&str> {
            self.constraint
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            ErrorKind::UniqueViolation
        }
    }

    #[test]
    fn unique_constraint_reports_name() {
        let err = sqlx::Error::Database(Box::new(TestDbError {
            code: Some("23505"),
            constraint: Some("identities_email_unique"),
        }));
        assert_eq!(
            unique_constraint(&err).as_deref(),
            Some("identities_email_unique")
        );

        let err = sqlx::Error::Database(Box::new(TestDbError {
            code: Some("99999"),
            constraint: Some("identities_email_unique"),
        }));
        assert_eq!(unique_constraint(&err), None);

        let err = sqlx::Error::RowNotFound;
        assert_eq!(unique_constraint(&err), None);
    }
}
