use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::api::ClientError;

/// Failure codes surfaced at the authentication boundary, carried in `/auth/error?code=`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthErrorCode {
    TenantMembershipMissing,
    SessionExpired,
    ProfileLoadFailed,
    SignInFailed,
    RegistrationFailed,
    TenantNotFound,
}

/// What the error page offers the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Remediation {
    RetrySignIn,
    ContactSupport,
}

impl AuthErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthErrorCode::TenantMembershipMissing => "tenant-membership-missing",
            AuthErrorCode::SessionExpired => "session-expired",
            AuthErrorCode::ProfileLoadFailed => "profile-load-failed",
            AuthErrorCode::SignInFailed => "sign-in-failed",
            AuthErrorCode::RegistrationFailed => "registration-failed",
            AuthErrorCode::TenantNotFound => "tenant-not-found",
        }
    }

    /// Classify a failed `/auth/me` call by HTTP status
    pub fn from_profile_status(status: Option<u16>) -> Self {
        match status {
            Some(404) => AuthErrorCode::TenantMembershipMissing,
            Some(401) | Some(403) => AuthErrorCode::SessionExpired,
            _ => AuthErrorCode::ProfileLoadFailed,
        }
    }

    pub fn from_profile_error(error: &ClientError) -> Self {
        Self::from_profile_status(error.status())
    }

    pub fn title(&self) -> &'static str {
        match self {
            AuthErrorCode::TenantMembershipMissing => "No access to this organization",
            AuthErrorCode::SessionExpired => "Your session has expired",
            AuthErrorCode::ProfileLoadFailed => "We couldn't load your profile",
            AuthErrorCode::SignInFailed => "Sign-in didn't complete",
            AuthErrorCode::RegistrationFailed => "We couldn't finish creating your account",
            AuthErrorCode::TenantNotFound => "Organization not found",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            AuthErrorCode::TenantMembershipMissing => {
                "Your account is not a member of this organization. Ask an administrator to invite you, or sign in with a different account."
            }
            AuthErrorCode::SessionExpired => "Please sign in again to continue.",
            AuthErrorCode::ProfileLoadFailed => {
                "Something went wrong while loading your account. Try signing in again in a moment."
            }
            AuthErrorCode::SignInFailed => "The sign-in attempt was interrupted or could not be verified.",
            AuthErrorCode::RegistrationFailed => "Your account was created but your role could not be saved.",
            AuthErrorCode::TenantNotFound => "This address is not connected to any organization.",
        }
    }

    pub fn remediation(&self) -> Remediation {
        match self {
            AuthErrorCode::TenantMembershipMissing
            | AuthErrorCode::RegistrationFailed
            | AuthErrorCode::TenantNotFound => Remediation::ContactSupport,
            AuthErrorCode::SessionExpired
            | AuthErrorCode::ProfileLoadFailed
            | AuthErrorCode::SignInFailed => Remediation::RetrySignIn,
        }
    }
}

impl fmt::Display for AuthErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthErrorCode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tenant-membership-missing" => Ok(AuthErrorCode::TenantMembershipMissing),
            "session-expired" => Ok(AuthErrorCode::SessionExpired),
            "profile-load-failed" => Ok(AuthErrorCode::ProfileLoadFailed),
            "sign-in-failed" => Ok(AuthErrorCode::SignInFailed),
            "registration-failed" => Ok(AuthErrorCode::RegistrationFailed),
            "tenant-not-found" => Ok(AuthErrorCode::TenantNotFound),
            _ => Err(()),
        }
    }
}
