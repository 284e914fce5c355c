use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::constants::DEFAULT_DISPLAY_NAME;

/// Subscription level attached to an account
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionTier {
    #[default]
    Starter,
    Pro,
    Business,
}

impl SubscriptionTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionTier::Starter => "starter",
            SubscriptionTier::Pro => "pro",
            SubscriptionTier::Business => "business",
        }
    }
}

impl std::fmt::Display for SubscriptionTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SubscriptionTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "starter" => Ok(SubscriptionTier::Starter),
            "pro" => Ok(SubscriptionTier::Pro),
            "business" => Ok(SubscriptionTier::Business),
            other => Err(format!("Unknown subscription tier: {}", other)),
        }
    }
}

/// Email verification state. A token exists only while unverified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum VerificationState {
    Unverified { token: String },
    Verified,
}

impl VerificationState {
    pub fn is_verified(&self) -> bool {
        matches!(self, VerificationState::Verified)
    }

    /// Pending verification token, if any
    pub fn token(&self) -> Option<&str> {
        match self {
            VerificationState::Unverified { token } => Some(token),
            VerificationState::Verified => None,
        }
    }
}

/// Reference to the externally hosted profile image.
/// Object id and URL only ever travel together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Avatar {
    /// object id in the image store
    pub object_id: String,
    /// public URL
    pub url: String,
}

/// user account record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// unique ID
    pub id: String,
    /// email address (normalized)
    pub email: String,
    /// argon2 password hash
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// display name
    pub name: String,
    /// subscription tier
    pub subscription: SubscriptionTier,
    /// verification state
    pub verification: VerificationState,
    /// current session token
    #[serde(skip_serializing)]
    pub session_token: Option<String>,
    /// profile image reference
    pub avatar: Option<Avatar>,
    /// account creation time
    pub created_at: DateTime<Utc>,
    /// update time
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Build a freshly signed-up account: unverified, no session, no avatar
    pub fn new_unverified(
        email: &str,
        password_hash: String,
        name: Option<String>,
        verification_token: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            email: normalize_email(email),
            password_hash,
            name: name
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| DEFAULT_DISPLAY_NAME.to_string()),
            subscription: SubscriptionTier::default(),
            verification: VerificationState::Unverified {
                token: verification_token,
            },
            session_token: None,
            avatar: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_verified(&self) -> bool {
        self.verification.is_verified()
    }

    pub fn summary(&self) -> AccountSummary {
        AccountSummary::from(self)
    }
}

/// Trim and lower-case an email so lookups and uniqueness agree
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Redacted account view returned to API clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub id: String,
    pub name: String,
    pub email: String,
    pub subscription: SubscriptionTier,
    #[serde(rename = "avatarURL")]
    pub avatar_url: Option<String>,
}

impl From<&Account> for AccountSummary {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id.clone(),
            name: account.name.clone(),
            email: account.email.clone(),
            subscription: account.subscription,
            avatar_url: account.avatar.as_ref().map(|a| a.url.clone()),
        }
    }
}

/// Minimal view returned by the current-account query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentAccount {
    pub email: String,
    pub subscription: SubscriptionTier,
}

impl From<&Account> for CurrentAccount {
    fn from(account: &Account) -> Self {
        Self {
            email: account.email.clone(),
            subscription: account.subscription,
        }
    }
}

/// Signup request body
#[derive(Debug, Clone, Deserialize)]
pub struct NewAccount {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Login request body
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Resend-verification request body
#[derive(Debug, Clone, Deserialize)]
pub struct ResendRequest {
    pub email: String,
}

/// The only field a subscription update may touch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TierUpdate {
    pub subscription: SubscriptionTier,
}
