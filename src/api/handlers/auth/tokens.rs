//! Signed access/refresh token pairs.
//!
//! Both tokens are HS256 JWTs carrying a `token_use` discriminator. Refresh
//! tokens are signed with their own secret when one is configured, falling
//! back to the access secret otherwise. Expiry is evaluated against the
//! embedded `iat`/`exp` claims with zero leeway.

use chrono::Utc;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::types::Role;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Claims {
    pub sub: Uuid,
    /// Present on access tokens only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    pub token_use: TokenKind,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub(crate) enum TokenError {
    /// Signature valid, clock past expiry.
    #[error("token has expired")]
    Expired,
    /// Structurally wrong or invalid signature.
    #[error("token is malformed")]
    Malformed,
    /// Valid token presented for the wrong purpose.
    #[error("token type mismatch")]
    WrongType,
}

pub(crate) struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

pub(crate) struct TokenIssuer {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_ttl_seconds: i64,
    refresh_ttl_seconds: i64,
}

impl TokenIssuer {
    pub(crate) fn new(
        access_secret: &[u8],
        refresh_secret: Option<&[u8]>,
        access_ttl_seconds: i64,
        refresh_ttl_seconds: i64,
    ) -> Self {
        let refresh_secret = refresh_secret.unwrap_or(access_secret);
        Self {
            access_encoding: EncodingKey::from_secret(access_secret),
            access_decoding: DecodingKey::from_secret(access_secret),
            refresh_encoding: EncodingKey::from_secret(refresh_secret),
            refresh_decoding: DecodingKey::from_secret(refresh_secret),
            access_ttl_seconds,
            refresh_ttl_seconds,
        }
    }

    /// Mint an access/refresh pair for one identity.
    pub(crate) fn issue_pair(&self, identity_id: Uuid, role: Role) -> anyhow::Result<TokenPair> {
        let now = Utc::now().timestamp();
        Ok(TokenPair {
            access_token: self.sign(TokenKind::Access, identity_id, Some(role), now)?,
            refresh_token: self.sign(TokenKind::Refresh, identity_id, None, now)?,
        })
    }

    fn sign(
        &self,
        kind: TokenKind,
        identity_id: Uuid,
        role: Option<Role>,
        now: i64,
    ) -> anyhow::Result<String> {
        let (key, ttl) = match kind {
            TokenKind::Access => (&self.access_encoding, self.access_ttl_seconds),
            TokenKind::Refresh => (&self.refresh_encoding, self.refresh_ttl_seconds),
        };
        let claims = Claims {
            sub: identity_id,
            role,
            token_use: kind,
            iat: now,
            exp: now + ttl,
        };
        encode(&Header::default(), &claims, key)
            .map_err(|err| anyhow::anyhow!("failed to sign {} token: {err}", kind.as_str()))
    }

    /// Verify a token against the expected purpose.
    ///
    /// The embedded discriminator selects which secret checks the signature;
    /// the claim itself is only trusted once the signature holds. A valid
    /// token with the wrong discriminator is a type mismatch, not malformed.
    pub(crate) fn verify(&self, token: &str, expected: TokenKind) -> Result<Claims, TokenError> {
        let kind = peek_kind(token)?;
        let key = match kind {
            TokenKind::Access => &self.access_decoding,
            TokenKind::Refresh => &self.refresh_decoding,
        };

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;

        let data = decode::<Claims>(token, key, &validation).map_err(|err| match err.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Malformed,
        })?;

        if data.claims.token_use != expected {
            return Err(TokenError::WrongType);
        }

        Ok(data.claims)
    }
}

/// Read the unverified discriminator to pick the right verification key.
fn peek_kind(token: &str) -> Result<TokenKind, TokenError> {
    let mut peek = Validation::new(Algorithm::HS256);
    peek.insecure_disable_signature_validation();
    peek.validate_exp = false;
    peek.required_spec_claims.clear();

    let data = decode::<Claims>(token, &DecodingKey::from_secret(&[]), &peek)
        .map_err(|_| TokenError::Malformed)?;
    Ok(data.claims.token_use)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACCESS_SECRET: &[u8] = b"unit-test-access-secret";
    const REFRESH_SECRET: &[u8] = b"unit-test-refresh-secret";

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(ACCESS_SECRET, Some(REFRESH_SECRET), 900, 604_800)
    }

    #[test]
    fn issue_pair_round_trips() -> anyhow::Result<()> {
        let issuer = issuer();
        let id = Uuid::new_v4();
        let pair = issuer.issue_pair(id, Role::Litigant)?;

        let access = issuer
            .verify(&pair.access_token, TokenKind::Access)
            .map_err(|err| anyhow::anyhow!("access verify failed: {err}"))?;
        assert_eq!(access.sub, id);
        assert_eq!(access.role, Some(Role::Litigant));
        assert_eq!(access.token_use, TokenKind::Access);

        let refresh = issuer
            .verify(&pair.refresh_token, TokenKind::Refresh)
            .map_err(|err| anyhow::anyhow!("refresh verify failed: {err}"))?;
        assert_eq!(refresh.sub, id);
        assert_eq!(refresh.role, None);
        Ok(())
    }

    #[test]
    fn wrong_purpose_is_type_mismatch() -> anyhow::Result<()> {
        let issuer = issuer();
        let pair = issuer.issue_pair(Uuid::new_v4(), Role::Lawyer)?;

        assert_eq!(
            issuer.verify(&pair.refresh_token, TokenKind::Access),
            Err(TokenError::WrongType)
        );
        assert_eq!(
            issuer.verify(&pair.access_token, TokenKind::Refresh),
            Err(TokenError::WrongType)
        );
        Ok(())
    }

    #[test]
    fn wrong_purpose_detected_with_shared_secret() -> anyhow::Result<()> {
        // Refresh secret unset: both purposes share the access secret, so only
        // the discriminator separates them.
        let issuer = TokenIssuer::new(ACCESS_SECRET, None, 900, 604_800);
        let pair = issuer.issue_pair(Uuid::new_v4(), Role::Clerk)?;
        assert_eq!(
            issuer.verify(&pair.refresh_token, TokenKind::Access),
            Err(TokenError::WrongType)
        );
        Ok(())
    }

    #[test]
    fn expired_token_is_expired() -> anyhow::Result<()> {
        let expired = TokenIssuer::new(ACCESS_SECRET, Some(REFRESH_SECRET), -60, -60);
        let pair = expired.issue_pair(Uuid::new_v4(), Role::Litigant)?;
        assert_eq!(
            issuer().verify(&pair.access_token, TokenKind::Access),
            Err(TokenError::Expired)
        );
        Ok(())
    }

    #[test]
    fn garbage_is_malformed() {
        assert_eq!(
            issuer().verify("not-a-token", TokenKind::Access),
            Err(TokenError::Malformed)
        );
        assert_eq!(
            issuer().verify("", TokenKind::Refresh),
            Err(TokenError::Malformed)
        );
    }

    #[test]
    fn foreign_signature_is_malformed() -> anyhow::Result<()> {
        let other = TokenIssuer::new(b"someone-elses-secret", None, 900, 900);
        let pair = other.issue_pair(Uuid::new_v4(), Role::Admin)?;
        assert_eq!(
            issuer().verify(&pair.access_token, TokenKind::Access),
            Err(TokenError::Malformed)
        );
        Ok(())
    }
}
