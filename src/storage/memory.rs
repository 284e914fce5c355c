use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::Mutex as TokioMutex;
use tracing::debug;

use crate::models::{normalize_email, Account, Avatar, SubscriptionTier, VerificationState};
use crate::storage::{AccountStore, Result, StorageError};

// In-memory storage data structure (using Mutex for thread safety)
struct StorageData {
    accounts: HashMap<String, Account>,    // id -> account
    email_index: HashMap<String, String>,  // normalized email -> id
}

impl StorageData {
    fn new() -> Self {
        Self {
            accounts: HashMap::new(),
            email_index: HashMap::new(),
        }
    }

    /// Apply a mutation to one account and stamp `updated_at`
    fn modify<F>(&mut self, id: &str, f: F) -> Option<Account>
    where
        F: FnOnce(&mut Account),
    {
        let account = self.accounts.get_mut(id)?;
        f(account);
        account.updated_at = Utc::now();
        Some(account.clone())
    }
}

/// In-memory account store (useful for testing and local development)
pub struct MemoryAccountStore {
    data: TokioMutex<StorageData>,
}

impl MemoryAccountStore {
    /// Create a new memory storage instance
    pub fn new() -> Self {
        Self {
            data: TokioMutex::new(StorageData::new()),
        }
    }

    /// Number of stored accounts
    pub async fn len(&self) -> usize {
        self.data.lock().await.accounts.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for MemoryAccountStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    async fn create(&self, account: &Account) -> Result<()> {
        let mut data = self.data.lock().await;
        let email = normalize_email(&account.email);

        if data.email_index.contains_key(&email) {
            return Err(StorageError::Duplicate(format!("email {}", email)));
        }
        if data.accounts.contains_key(&account.id) {
            return Err(StorageError::Duplicate(format!("id {}", account.id)));
        }

        data.email_index.insert(email, account.id.clone());
        data.accounts.insert(account.id.clone(), account.clone());
        debug!("Memory store: created account {}", account.id);
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Account>> {
        let data = self.data.lock().await;
        Ok(data.accounts.get(id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        let data = self.data.lock().await;
        Ok(data
            .email_index
            .get(&normalize_email(email))
            .and_then(|id| data.accounts.get(id))
            .cloned())
    }

    async fn find_by_verification_token(&self, token: &str) -> Result<Option<Account>> {
        let data = self.data.lock().await;
        Ok(data
            .accounts
            .values()
            .find(|account| account.verification.token() == Some(token))
            .cloned())
    }

    async fn update_session_token(&self, id: &str, token: Option<&str>) -> Result<Option<Account>> {
        let mut data = self.data.lock().await;
        Ok(data.modify(id, |account| {
            account.session_token = token.map(str::to_string);
        }))
    }

    async fn update_verification(&self, id: &str, state: VerificationState) -> Result<Option<Account>> {
        let mut data = self.data.lock().await;
        let pending = data
            .accounts
            .get(id)
            .map_or(false, |account| !account.verification.is_verified());
        if !pending {
            return Ok(None);
        }
        Ok(data.modify(id, |account| account.verification = state))
    }

    async fn update_avatar(&self, id: &str, avatar: &Avatar) -> Result<Option<Account>> {
        let mut data = self.data.lock().await;
        Ok(data.modify(id, |account| account.avatar = Some(avatar.clone())))
    }

    async fn update_tier(&self, id: &str, tier: SubscriptionTier) -> Result<Option<Account>> {
        let mut data = self.data.lock().await;
        Ok(data.modify(id, |account| account.subscription = tier))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(email: &str, token: &str) -> Account {
        Account::new_unverified(email, "hash".to_string(), None, token.to_string())
    }

    #[tokio::test]
    async fn email_is_unique_case_insensitively() {
        let store = MemoryAccountStore::new();
        store.create(&account("a@x.com", "t1")).await.unwrap();

        let err = store.create(&account("A@X.COM", "t2")).await.unwrap_err();
        assert!(matches!(err, StorageError::Duplicate(_)));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn lookup_by_token_and_email() {
        let store = MemoryAccountStore::new();
        let created = account("a@x.com", "token-1");
        store.create(&created).await.unwrap();

        let by_token = store.find_by_verification_token("token-1").await.unwrap().unwrap();
        assert_eq!(by_token.id, created.id);
        let by_email = store.find_by_email(" A@x.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, created.id);
        assert!(store.find_by_verification_token("other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn verified_accounts_are_not_found_by_token() {
        let store = MemoryAccountStore::new();
        let created = account("a@x.com", "token-1");
        store.create(&created).await.unwrap();

        store
            .update_verification(&created.id, VerificationState::Verified)
            .await
            .unwrap();
        assert!(store.find_by_verification_token("token-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn verification_is_one_way() {
        let store = MemoryAccountStore::new();
        let created = account("a@x.com", "token-1");
        store.create(&created).await.unwrap();

        let first = store
            .update_verification(&created.id, VerificationState::Verified)
            .await
            .unwrap();
        assert!(first.unwrap().verification.is_verified());

        let again = store
            .update_verification(&created.id, VerificationState::Verified)
            .await
            .unwrap();
        assert!(again.is_none());

        let reset = store
            .update_verification(
                &created.id,
                VerificationState::Unverified {
                    token: "token-2".to_string(),
                },
            )
            .await
            .unwrap();
        assert!(reset.is_none());
        assert!(store.find_by_verification_token("token-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn updates_on_unknown_id_return_none() {
        let store = MemoryAccountStore::new();
        assert!(store.update_session_token("missing", Some("t")).await.unwrap().is_none());
        assert!(store.update_tier("missing", SubscriptionTier::Pro).await.unwrap().is_none());
        let avatar = Avatar {
            object_id: "o".to_string(),
            url: "u".to_string(),
        };
        assert!(store.update_avatar("missing", &avatar).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn session_token_set_and_cleared() {
        let store = MemoryAccountStore::new();
        let created = account("a@x.com", "t");
        store.create(&created).await.unwrap();

        let updated = store.update_session_token(&created.id, Some("bearer")).await.unwrap().unwrap();
        assert_eq!(updated.session_token.as_deref(), Some("bearer"));

        let cleared = store.update_session_token(&created.id, None).await.unwrap().unwrap();
        assert!(cleared.session_token.is_none());
    }
}
