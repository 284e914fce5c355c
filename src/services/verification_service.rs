use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::auth::{generate_verification_token, hash_blocking, CredentialHasher};
use crate::error::{IdentityError, Result};
use crate::models::{normalize_email, Account, AccountSummary, NewAccount, VerificationState};
use crate::services::notification_service::{NotificationDispatcher, NotificationOutcome};
use crate::storage::AccountStore;

/// What signup did: the created account and how the email went
#[derive(Debug, Clone)]
pub struct SignupReport {
    pub account: AccountSummary,
    pub notification: NotificationOutcome,
}

/// Account creation and email confirmation
pub struct VerificationWorkflow {
    accounts: Arc<dyn AccountStore>,
    hasher: Arc<dyn CredentialHasher>,
    notifier: Arc<NotificationDispatcher>,
}

impl VerificationWorkflow {
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        hasher: Arc<dyn CredentialHasher>,
        notifier: Arc<NotificationDispatcher>,
    ) -> Self {
        Self {
            accounts,
            hasher,
            notifier,
        }
    }

    /// Create an unverified account and mail its verification link.
    /// Mail failure is reported in the outcome, never as an error.
    #[instrument(skip(self, request))]
    pub async fn signup(&self, request: NewAccount) -> Result<SignupReport> {
        let email = normalize_email(&request.email);
        if self.accounts.find_by_email(&email).await?.is_some() {
            debug!("Signup rejected, email already registered: {}", email);
            return Err(IdentityError::conflict("Email is already in use"));
        }

        let password_hash = hash_blocking(self.hasher.clone(), request.password).await?;
        let token = generate_verification_token();
        let account = Account::new_unverified(&email, password_hash, request.name, token.clone());

        // a concurrent signup for the same email surfaces here as Conflict
        self.accounts.create(&account).await?;
        info!("Account {} created for {}", account.id, account.email);

        let notification = self
            .notifier
            .send_verification_email(&token, &account.email, &account.name)
            .await;

        Ok(SignupReport {
            account: account.summary(),
            notification,
        })
    }

    /// Consume a verification token
    #[instrument(skip(self, token))]
    pub async fn verify(&self, token: &str) -> Result<()> {
        let account = self
            .accounts
            .find_by_verification_token(token)
            .await?
            .ok_or_else(|| IdentityError::not_found("Token not found"))?;

        self.accounts
            .update_verification(&account.id, VerificationState::Verified)
            .await?
            .ok_or_else(|| IdentityError::not_found("Token not found"))?;

        info!("Account {} verified", account.id);
        Ok(())
    }

    /// Mail the existing token again
    #[instrument(skip(self))]
    pub async fn resend_verification(&self, email: &str) -> Result<NotificationOutcome> {
        let account = self
            .accounts
            .find_by_email(&normalize_email(email))
            .await?
            .ok_or_else(|| IdentityError::not_found("User not found"))?;

        let token = match &account.verification {
            VerificationState::Verified => {
                return Err(IdentityError::conflict("Email is already verified"))
            }
            VerificationState::Unverified { token } => token,
        };

        let outcome = self
            .notifier
            .send_verification_email(token, &account.email, &account.name)
            .await;
        if let NotificationOutcome::Failed(reason) = &outcome {
            warn!("Resend for {} could not be delivered: {}", account.email, reason);
        }
        Ok(outcome)
    }
}
