//! Password hashing and verification.
//!
//! bcrypt is the brute-force defense here: the cost factor keeps each
//! comparison expensive on purpose. Hashing runs on the blocking pool so the
//! request executor is not stalled.

use anyhow::{Context, Result};

/// Adaptive cost factor; must stay at or above 12.
const BCRYPT_COST: u32 = 12;

pub(super) async fn hash_password(password: String) -> Result<String> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, BCRYPT_COST))
        .await
        .context("password hashing task failed")?
        .context("failed to hash password")
}

/// Constant-time comparison against the stored hash.
pub(super) async fn verify_password(password: String, hash: String) -> Result<bool> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .context("password verification task failed")?
        .context("failed to verify password")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_and_verify_round_trip() -> Result<()> {
        let hash = hash_password("correct horse".to_string()).await?;
        assert!(hash.starts_with("$2"));
        assert!(verify_password("correct horse".to_string(), hash.clone()).await?);
        assert!(!verify_password("wrong horse".to_string(), hash).await?);
        Ok(())
    }

    #[tokio::test]
    async fn hashes_are_salted() -> Result<()> {
        let first = hash_password("secret1x".to_string()).await?;
        let second = hash_password("secret1x".to_string()).await?;
        assert_ne!(first, second);
        Ok(())
    }
}
