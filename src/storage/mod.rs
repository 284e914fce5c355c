pub mod image_store;
pub mod memory;
pub mod mysql;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::{
    config::settings::DatabaseConfig,
    error::{IdentityError, Result as AppResult},
    models::{Account, Avatar, SubscriptionTier, VerificationState},
};

pub use image_store::{
    init_image_store, ImageStore, ImageStoreError, MemoryImageStore, S3ImageStore,
};
pub use memory::MemoryAccountStore;
pub use mysql::MySqlAccountStore;

/// Storage Result type
pub type Result<T> = std::result::Result<T, StorageError>;

/// Error types for storage operations
#[derive(Debug, Error, Clone)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query timeout: {0}")]
    QueryTimeout(String),

    #[error("Duplicate entry: {0}")]
    Duplicate(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for StorageError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::RowNotFound => Self::NotFound("Record not found".to_string()),
            sqlx::Error::Database(db_err) => {
                if db_err.is_unique_violation() {
                    Self::Duplicate(db_err.to_string())
                } else {
                    Self::Database(db_err.to_string())
                }
            }
            sqlx::Error::Io(io_err) => Self::Connection(io_err.to_string()),
            sqlx::Error::PoolTimedOut => Self::QueryTimeout("Connection pool timeout".to_string()),
            sqlx::Error::PoolClosed => Self::Connection("Connection pool closed".to_string()),
            _ => Self::Database(error.to_string()),
        }
    }
}

impl From<StorageError> for IdentityError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Duplicate(_) => IdentityError::Conflict("Email is already in use".to_string()),
            StorageError::NotFound(msg) => IdentityError::NotFound(msg),
            _ => IdentityError::Storage(err.to_string()),
        }
    }
}

/// Persistence boundary for account records.
///
/// Every mutation is a single atomic write of one account. Update methods
/// return the affected record, or `None` when no account has that id.
/// `update_verification` only applies to accounts that are still
/// unverified and returns `None` otherwise.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Health check with connection validation
    async fn health_check(&self) -> Result<bool>;

    /// Insert a new account. Fails with `Duplicate` when the email is taken.
    async fn create(&self, account: &Account) -> Result<()>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Account>>;
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>>;
    async fn find_by_verification_token(&self, token: &str) -> Result<Option<Account>>;

    async fn update_session_token(&self, id: &str, token: Option<&str>) -> Result<Option<Account>>;
    async fn update_verification(&self, id: &str, state: VerificationState) -> Result<Option<Account>>;
    async fn update_avatar(&self, id: &str, avatar: &Avatar) -> Result<Option<Account>>;
    async fn update_tier(&self, id: &str, tier: SubscriptionTier) -> Result<Option<Account>>;
}

/// Storage initialization: MySQL when configured, memory otherwise
#[instrument(skip(config))]
pub async fn init_storage(config: &DatabaseConfig) -> AppResult<Arc<dyn AccountStore>> {
    let store: Arc<dyn AccountStore> = match config.url.as_deref() {
        Some(url) if config.is_mysql() => {
            info!("Initializing MySQL account store");
            let store = MySqlAccountStore::connect(url, config).await?;
            store.init_schema().await?;
            Arc::new(store)
        }
        Some(url) => {
            return Err(IdentityError::config(format!(
                "Unsupported DATABASE_URL scheme: {}",
                url.split("://").next().unwrap_or_default()
            )));
        }
        None => {
            warn!("⚠️ DATABASE_URL not set, using memory account store");
            Arc::new(MemoryAccountStore::new())
        }
    };

    store
        .health_check()
        .await
        .map_err(|e| IdentityError::Storage(format!("Storage health check failed: {}", e)))?;

    info!("✅ Account store initialized successfully");
    Ok(store)
}
