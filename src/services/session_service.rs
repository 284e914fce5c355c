use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::auth::{verify_blocking, CredentialHasher, TokenService};
use crate::error::{IdentityError, Result};
use crate::models::{normalize_email, Account, CurrentAccount};
use crate::storage::AccountStore;

const INVALID_CREDENTIALS: &str = "Invalid credentials";
const UNVERIFIED: &str = "Check mail for verification!";
const NOT_AUTHORIZED: &str = "Not authorized";

/// Login, logout and bearer-token checks
pub struct SessionWorkflow {
    accounts: Arc<dyn AccountStore>,
    hasher: Arc<dyn CredentialHasher>,
    tokens: TokenService,
}

impl SessionWorkflow {
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        hasher: Arc<dyn CredentialHasher>,
        tokens: TokenService,
    ) -> Self {
        Self {
            accounts,
            hasher,
            tokens,
        }
    }

    /// Exchange credentials for a session token and persist it
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<String> {
        let email = normalize_email(email);
        let account = match self.accounts.find_by_email(&email).await? {
            Some(account) => account,
            None => {
                debug!("Login for unknown email {}", email);
                return Err(IdentityError::unauthorized(INVALID_CREDENTIALS));
            }
        };

        let matches = verify_blocking(
            self.hasher.clone(),
            password.to_string(),
            account.password_hash.clone(),
        )
        .await
        .unwrap_or_else(|e| {
            warn!("Stored password hash for {} is unreadable: {}", account.id, e);
            false
        });
        if !matches {
            debug!("Login with wrong password for {}", account.id);
            return Err(IdentityError::unauthorized(INVALID_CREDENTIALS));
        }

        if !account.is_verified() {
            return Err(IdentityError::unauthorized(UNVERIFIED));
        }

        let token = self.tokens.issue(&account.id)?;
        self.accounts
            .update_session_token(&account.id, Some(&token))
            .await?
            .ok_or_else(|| IdentityError::unauthorized(INVALID_CREDENTIALS))?;

        info!("Account {} logged in", account.id);
        Ok(token)
    }

    /// Load the account named by a valid token
    #[instrument(skip(self, token))]
    pub async fn current_account(&self, token: &str) -> Result<CurrentAccount> {
        let identity = self.tokens.validate(token)?;
        let account = self
            .accounts
            .find_by_id(&identity)
            .await?
            .ok_or_else(|| IdentityError::unauthorized(NOT_AUTHORIZED))?;
        Ok(CurrentAccount::from(&account))
    }

    /// Guard check: valid token that is also the account's stored session
    #[instrument(skip(self, token))]
    pub async fn authenticate(&self, token: &str) -> Result<Account> {
        let identity = self.tokens.validate(token)?;
        match self.accounts.find_by_id(&identity).await? {
            Some(account) if account.session_token.as_deref() == Some(token) => Ok(account),
            Some(_) => {
                debug!("Bearer for {} is not the active session", identity);
                Err(IdentityError::unauthorized(NOT_AUTHORIZED))
            }
            None => Err(IdentityError::unauthorized(NOT_AUTHORIZED)),
        }
    }

    /// Drop the stored session token
    #[instrument(skip(self))]
    pub async fn logout(&self, identity: &str) -> Result<()> {
        if self.accounts.update_session_token(identity, None).await?.is_some() {
            info!("Account {} logged out", identity);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Argon2Hasher;
    use crate::config::settings::TokenConfig;
    use crate::models::VerificationState;
    use crate::storage::MemoryAccountStore;

    async fn fixture(verified: bool) -> (SessionWorkflow, Arc<MemoryAccountStore>, String) {
        let hasher = Arc::new(Argon2Hasher::new());
        let accounts = Arc::new(MemoryAccountStore::new());
        let mut account = Account::new_unverified(
            "a@x.com",
            hasher.hash("p1").unwrap(),
            None,
            "tok".to_string(),
        );
        if verified {
            account.verification = VerificationState::Verified;
        }
        let id = account.id.clone();
        accounts.create(&account).await.unwrap();

        let workflow =
            SessionWorkflow::new(accounts.clone(), hasher, TokenService::new(&TokenConfig::default()));
        (workflow, accounts, id)
    }

    #[tokio::test]
    async fn unknown_email_and_wrong_password_look_the_same() {
        let (workflow, _, _) = fixture(true).await;
        let unknown = workflow.login("b@x.com", "p1").await.unwrap_err();
        let wrong = workflow.login("a@x.com", "nope").await.unwrap_err();
        assert_eq!(unknown, wrong);
        assert_eq!(unknown, IdentityError::unauthorized("Invalid credentials"));
    }

    #[tokio::test]
    async fn unreadable_stored_hash_reads_as_invalid_credentials() {
        let accounts = Arc::new(MemoryAccountStore::new());
        let mut account = Account::new_unverified(
            "c@x.com",
            "not-a-phc-string".to_string(),
            None,
            "tok".to_string(),
        );
        account.verification = VerificationState::Verified;
        accounts.create(&account).await.unwrap();
        let workflow = SessionWorkflow::new(
            accounts,
            Arc::new(Argon2Hasher::new()),
            TokenService::new(&TokenConfig::default()),
        );

        let err = workflow.login("c@x.com", "p1").await.unwrap_err();
        assert_eq!(err, IdentityError::unauthorized("Invalid credentials"));
    }

    #[tokio::test]
    async fn unverified_account_cannot_log_in() {
        let (workflow, _, _) = fixture(false).await;
        let err = workflow.login("a@x.com", "p1").await.unwrap_err();
        assert_eq!(err, IdentityError::unauthorized("Check mail for verification!"));
    }

    #[tokio::test]
    async fn login_persists_token_readable_through_current() {
        let (workflow, accounts, id) = fixture(true).await;
        let token = workflow.login(" A@x.com", "p1").await.unwrap();

        let stored = accounts.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(stored.session_token.as_deref(), Some(token.as_str()));

        let current = workflow.current_account(&token).await.unwrap();
        assert_eq!(current.email, "a@x.com");
    }

    #[tokio::test]
    async fn logout_revokes_the_bearer() {
        let (workflow, _, id) = fixture(true).await;
        let token = workflow.login("a@x.com", "p1").await.unwrap();
        assert_eq!(workflow.authenticate(&token).await.unwrap().id, id);

        workflow.logout(&id).await.unwrap();
        assert!(matches!(
            workflow.authenticate(&token).await,
            Err(IdentityError::Unauthorized(_))
        ));
        // second logout is a no-op
        workflow.logout(&id).await.unwrap();
    }

    #[tokio::test]
    async fn a_new_login_replaces_the_old_session() {
        let (workflow, _, id) = fixture(true).await;
        let tokens = TokenService::new(&TokenConfig::default());
        let old = tokens
            .issue_at(&id, chrono::Utc::now() - chrono::Duration::minutes(5))
            .unwrap();
        let current = workflow.login("a@x.com", "p1").await.unwrap();

        assert!(workflow.authenticate(&old).await.is_err());
        assert!(workflow.authenticate(&current).await.is_ok());
    }

    #[tokio::test]
    async fn garbage_bearer_is_unauthorized() {
        let (workflow, _, _) = fixture(true).await;
        assert_eq!(
            workflow.current_account("garbage").await.unwrap_err(),
            IdentityError::unauthorized("Not authorized")
        );
    }
}
