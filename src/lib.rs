// Re-export core functionality for external use
pub use async_trait::async_trait;

// Core module definitions
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod server;
pub mod services;
pub mod storage;
pub mod utils;

// Unified error handling
pub use error::{IdentityError, Result};

// Essential re-exports for convenience
pub use server::{
    app_state::AppState,
    startup::{configure_routes, start_server, start_server_with_state},
};

pub use config::settings::{Config, DatabaseConfig, ServerConfig};

// Storage abstractions
pub use storage::{
    init_image_store, init_storage, AccountStore, ImageStore, MemoryAccountStore, MemoryImageStore,
    MySqlAccountStore, Result as StorageResult, S3ImageStore, StorageError,
};

// Model exports
pub use models::{Account, AccountSummary, CurrentAccount, SubscriptionTier, VerificationState};

// Version and build information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
