//! Request/response types and the closed role/status sets.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

use super::storage::IdentityRecord;

/// Closed role set. `lawyer` is the privileged professional role; `litigant`
/// is the standard user; `clerk` covers clerical staff.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Lawyer,
    Litigant,
    Clerk,
    Admin,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lawyer => "lawyer",
            Self::Litigant => "litigant",
            Self::Clerk => "clerk",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lawyer" => Ok(Self::Lawyer),
            "litigant" => Ok(Self::Litigant),
            "clerk" => Ok(Self::Clerk),
            "admin" => Ok(Self::Admin),
            other => Err(anyhow::anyhow!("unknown role: {other}")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    PendingVerification,
    Active,
    Suspended,
    Banned,
}

impl AccountStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PendingVerification => "pending_verification",
            Self::Active => "active",
            Self::Suspended => "suspended",
            Self::Banned => "banned",
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending_verification" => Ok(Self::PendingVerification),
            "active" => Ok(Self::Active),
            "suspended" => Ok(Self::Suspended),
            "banned" => Ok(Self::Banned),
            other => Err(anyhow::anyhow!("unknown account status: {other}")),
        }
    }
}

/// Client-safe identity view. Built field by field so the password hash and
/// token digests can never leak through serialization.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IdentitySummary {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub role: Role,
    pub status: AccountStatus,
    pub email_verified: bool,
    pub license_number: Option<String>,
    pub specialization: Option<String>,
    pub subscription_tier: String,
    pub subscription_active: bool,
    pub created_at: String,
}

impl From<&IdentityRecord> for IdentitySummary {
    fn from(record: &IdentityRecord) -> Self {
        Self {
            id: record.id.to_string(),
            email: record.email.clone(),
            first_name: record.first_name.clone(),
            last_name: record.last_name.clone(),
            phone: record.phone.clone(),
            role: record.role,
            status: record.status,
            email_verified: record.email_verified,
            license_number: record.license_number.clone(),
            specialization: record.specialization.clone(),
            subscription_tier: record.subscription_tier.clone(),
            subscription_active: record.subscription_active,
            created_at: record.created_at.to_rfc3339(),
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub role: Role,
    pub license_number: Option<String>,
    pub specialization: Option<String>,
}

#[derive(ToSchema, Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub identity: IdentitySummary,
    /// Raw verification token, echoed only outside production.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_token: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub remember_me: Option<bool>,
}

#[derive(ToSchema, Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub token: String,
    pub refresh_token: String,
    pub identity: IdentitySummary,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
    pub remember_me: Option<bool>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ResendVerificationRequest {
    pub email: String,
}

#[derive(ToSchema, Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct VerificationTokenResponse {
    /// Raw verification token, echoed only outside production.
    pub verification_token: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(ToSchema, Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ResetTokenResponse {
    /// Raw reset token, echoed only outside production.
    pub reset_token: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ResetPasswordRequest {
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateMeRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub license_number: Option<String>,
    pub specialization: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, Result};

    #[test]
    fn register_request_uses_camel_case() -> Result<()> {
        let request: RegisterRequest = serde_json::from_value(serde_json::json!({
            "email": "a@x.com",
            "password": "secret1x",
            "firstName": "A",
            "lastName": "B",
            "phone": "03001234567",
            "role": "litigant"
        }))?;
        assert_eq!(request.first_name, "A");
        assert_eq!(request.role, Role::Litigant);
        assert_eq!(request.license_number, None);
        Ok(())
    }

    #[test]
    fn register_request_rejects_unknown_role() {
        let result: Result<RegisterRequest, _> = serde_json::from_value(serde_json::json!({
            "email": "a@x.com",
            "password": "secret1x",
            "firstName": "A",
            "lastName": "B",
            "role": "paralegal"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn login_request_round_trips() -> Result<()> {
        let request: LoginRequest = serde_json::from_value(serde_json::json!({
            "email": "a@x.com",
            "password": "secret1x",
            "rememberMe": true
        }))?;
        assert_eq!(request.remember_me, Some(true));
        Ok(())
    }

    #[test]
    fn role_and_status_parse_their_display() -> Result<()> {
        for role in [Role::Lawyer, Role::Litigant, Role::Clerk, Role::Admin] {
            assert_eq!(role.as_str().parse::<Role>().ok(), Some(role));
        }
        for status in [
            AccountStatus::PendingVerification,
            AccountStatus::Active,
            AccountStatus::Suspended,
            AccountStatus::Banned,
        ] {
            assert_eq!(status.as_str().parse::<AccountStatus>().ok(), Some(status));
        }
        assert!("paralegal".parse::<Role>().is_err());
        assert!("parked".parse::<AccountStatus>().is_err());
        Ok(())
    }

    #[test]
    fn update_me_rejects_unknown_fields() {
        let result: Result<UpdateMeRequest, _> = serde_json::from_value(serde_json::json!({
            "firstName": "A",
            "role": "admin"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn session_response_serializes_camel_case() -> Result<()> {
        let value = serde_json::to_value(RefreshRequest {
            refresh_token: Some("r".to_string()),
            remember_me: None,
        })?;
        value
            .get("refreshToken")
            .context("missing refreshToken key")?;
        Ok(())
    }
}
