use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::mysql::MySqlPoolOptions;
use sqlx::MySqlPool;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::config::settings::DatabaseConfig;
use crate::models::{normalize_email, Account, Avatar, SubscriptionTier, VerificationState};
use crate::storage::{AccountStore, Result, StorageError};

const ACCOUNT_COLUMNS: &str = "id, email, password_hash, name, subscription, verified, \
     verify_token, session_token, avatar_object_id, avatar_url, created_at, updated_at";

/// MySQL account store backed by a sqlx pool
pub struct MySqlAccountStore {
    pool: MySqlPool,
}

/// Raw `accounts` row
#[derive(Debug, sqlx::FromRow)]
struct AccountRow {
    id: String,
    email: String,
    password_hash: String,
    name: String,
    subscription: String,
    verified: bool,
    verify_token: Option<String>,
    session_token: Option<String>,
    avatar_object_id: Option<String>,
    avatar_url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AccountRow> for Account {
    type Error = StorageError;

    fn try_from(row: AccountRow) -> Result<Self> {
        let verification = match (row.verified, row.verify_token) {
            (true, _) => VerificationState::Verified,
            (false, Some(token)) => VerificationState::Unverified { token },
            (false, None) => {
                return Err(StorageError::InvalidData(format!(
                    "account {} is unverified without a verification token",
                    row.id
                )))
            }
        };

        let avatar = match (row.avatar_object_id, row.avatar_url) {
            (Some(object_id), Some(url)) => Some(Avatar { object_id, url }),
            (None, None) => None,
            _ => {
                return Err(StorageError::InvalidData(format!(
                    "account {} has a partial avatar reference",
                    row.id
                )))
            }
        };

        let subscription = row
            .subscription
            .parse::<SubscriptionTier>()
            .map_err(StorageError::InvalidData)?;

        Ok(Account {
            id: row.id,
            email: row.email,
            password_hash: row.password_hash,
            name: row.name,
            subscription,
            verification,
            session_token: row.session_token,
            avatar,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl MySqlAccountStore {
    /// Connect a pool to the given URL
    pub async fn connect(url: &str, config: &DatabaseConfig) -> Result<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(url)
            .await
            .map_err(|e| StorageError::Connection(format!("Failed to connect via sqlx: {}", e)))?;

        info!("MySQL pool ready (max_connections={})", config.max_connections);
        Ok(Self { pool })
    }

    /// Create the accounts table when missing
    pub async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS accounts (
                id VARCHAR(36) NOT NULL PRIMARY KEY,
                email VARCHAR(255) NOT NULL,
                password_hash VARCHAR(255) NOT NULL,
                name VARCHAR(255) NOT NULL,
                subscription VARCHAR(16) NOT NULL DEFAULT 'starter',
                verified TINYINT(1) NOT NULL DEFAULT 0,
                verify_token VARCHAR(128) NULL,
                session_token TEXT NULL,
                avatar_object_id VARCHAR(512) NULL,
                avatar_url TEXT NULL,
                created_at DATETIME(6) NOT NULL,
                updated_at DATETIME(6) NOT NULL,
                UNIQUE KEY uq_accounts_email (email),
                KEY idx_accounts_verify_token (verify_token)
            ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4"#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to initialize accounts schema: {}", e);
            StorageError::from(e)
        })?;

        info!("✅ accounts schema ready");
        Ok(())
    }

    async fn fetch_one_by(&self, column: &str, value: &str) -> Result<Option<Account>> {
        let sql = format!("SELECT {} FROM accounts WHERE {} = ?", ACCOUNT_COLUMNS, column);
        let row: Option<AccountRow> = sqlx::query_as(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Account::try_from).transpose()
    }
}

#[async_trait]
impl AccountStore for MySqlAccountStore {
    async fn health_check(&self) -> Result<bool> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(true)
    }

    async fn create(&self, account: &Account) -> Result<()> {
        let (avatar_object_id, avatar_url) = match &account.avatar {
            Some(avatar) => (Some(avatar.object_id.as_str()), Some(avatar.url.as_str())),
            None => (None, None),
        };

        sqlx::query(
            r#"INSERT INTO accounts (
                id, email, password_hash, name, subscription, verified,
                verify_token, session_token, avatar_object_id, avatar_url,
                created_at, updated_at
              ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&account.id)
        .bind(normalize_email(&account.email))
        .bind(&account.password_hash)
        .bind(&account.name)
        .bind(account.subscription.as_str())
        .bind(account.verification.is_verified())
        .bind(account.verification.token())
        .bind(account.session_token.as_deref())
        .bind(avatar_object_id)
        .bind(avatar_url)
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await?;

        debug!("MySQL store: created account {}", account.id);
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Account>> {
        self.fetch_one_by("id", id).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        self.fetch_one_by("email", &normalize_email(email)).await
    }

    async fn find_by_verification_token(&self, token: &str) -> Result<Option<Account>> {
        let sql = format!(
            "SELECT {} FROM accounts WHERE verify_token = ? AND verified = 0",
            ACCOUNT_COLUMNS
        );
        let row: Option<AccountRow> = sqlx::query_as(&sql)
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Account::try_from).transpose()
    }

    async fn update_session_token(&self, id: &str, token: Option<&str>) -> Result<Option<Account>> {
        sqlx::query("UPDATE accounts SET session_token = ?, updated_at = ? WHERE id = ?")
            .bind(token)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;
        self.find_by_id(id).await
    }

    async fn update_verification(&self, id: &str, state: VerificationState) -> Result<Option<Account>> {
        let result = sqlx::query(
            "UPDATE accounts SET verified = ?, verify_token = ?, updated_at = ? \
             WHERE id = ? AND verified = 0",
        )
        .bind(state.is_verified())
        .bind(state.token())
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        // a concurrent verify already consumed the token
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_by_id(id).await
    }

    async fn update_avatar(&self, id: &str, avatar: &Avatar) -> Result<Option<Account>> {
        sqlx::query(
            "UPDATE accounts SET avatar_object_id = ?, avatar_url = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&avatar.object_id)
        .bind(&avatar.url)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;
        self.find_by_id(id).await
    }

    async fn update_tier(&self, id: &str, tier: SubscriptionTier) -> Result<Option<Account>> {
        sqlx::query("UPDATE accounts SET subscription = ?, updated_at = ? WHERE id = ?")
            .bind(tier.as_str())
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;
        self.find_by_id(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> AccountRow {
        let now = Utc::now();
        AccountRow {
            id: "id-1".to_string(),
            email: "a@x.com".to_string(),
            password_hash: "h".to_string(),
            name: "Guest".to_string(),
            subscription: "pro".to_string(),
            verified: false,
            verify_token: Some("tok".to_string()),
            session_token: None,
            avatar_object_id: None,
            avatar_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn row_maps_to_account() {
        let account = Account::try_from(row()).unwrap();
        assert_eq!(account.subscription, SubscriptionTier::Pro);
        assert_eq!(account.verification.token(), Some("tok"));
        assert!(account.avatar.is_none());
    }

    #[test]
    fn unverified_row_without_token_is_rejected() {
        let mut r = row();
        r.verify_token = None;
        assert!(matches!(Account::try_from(r), Err(StorageError::InvalidData(_))));
    }

    #[test]
    fn partial_avatar_row_is_rejected() {
        let mut r = row();
        r.avatar_url = Some("https://cdn/x".to_string());
        assert!(matches!(Account::try_from(r), Err(StorageError::InvalidData(_))));
    }
}
