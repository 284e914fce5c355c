use std::sync::Arc;
use tracing::{info, instrument};

use crate::error::{IdentityError, Result};
use crate::models::{AccountSummary, CurrentAccount, TierUpdate};
use crate::services::session_service::SessionWorkflow;
use crate::storage::AccountStore;

/// Profile changes on an authenticated account
pub struct AccountLifecycleService {
    accounts: Arc<dyn AccountStore>,
    sessions: Arc<SessionWorkflow>,
}

impl AccountLifecycleService {
    pub fn new(accounts: Arc<dyn AccountStore>, sessions: Arc<SessionWorkflow>) -> Self {
        Self { accounts, sessions }
    }

    #[instrument(skip(self, update))]
    pub async fn update_subscription(&self, identity: &str, update: TierUpdate) -> Result<AccountSummary> {
        let account = self
            .accounts
            .update_tier(identity, update.subscription)
            .await?
            .ok_or_else(|| IdentityError::not_found("Not found"))?;

        info!("Account {} moved to {} tier", account.id, account.subscription);
        Ok(account.summary())
    }

    pub async fn current(&self, token: &str) -> Result<CurrentAccount> {
        self.sessions.current_account(token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Argon2Hasher, TokenService};
    use crate::config::settings::TokenConfig;
    use crate::models::{Account, SubscriptionTier};
    use crate::storage::MemoryAccountStore;

    fn service(accounts: Arc<MemoryAccountStore>) -> AccountLifecycleService {
        let sessions = Arc::new(SessionWorkflow::new(
            accounts.clone(),
            Arc::new(Argon2Hasher::new()),
            TokenService::new(&TokenConfig::default()),
        ));
        AccountLifecycleService::new(accounts, sessions)
    }

    #[tokio::test]
    async fn tier_update_returns_updated_summary() {
        let accounts = Arc::new(MemoryAccountStore::new());
        let account = Account::new_unverified("a@x.com", "h".to_string(), None, "t".to_string());
        accounts.create(&account).await.unwrap();

        let summary = service(accounts.clone())
            .update_subscription(&account.id, TierUpdate { subscription: SubscriptionTier::Business })
            .await
            .unwrap();

        assert_eq!(summary.subscription, SubscriptionTier::Business);
        let stored = accounts.find_by_id(&account.id).await.unwrap().unwrap();
        assert_eq!(stored.subscription, SubscriptionTier::Business);
        assert!(!stored.is_verified());
    }

    #[tokio::test]
    async fn unknown_identity_is_not_found() {
        let err = service(Arc::new(MemoryAccountStore::new()))
            .update_subscription("missing", TierUpdate { subscription: SubscriptionTier::Pro })
            .await
            .unwrap_err();
        assert_eq!(err, IdentityError::not_found("Not found"));
    }
}
