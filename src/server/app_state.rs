use std::sync::Arc;
use tracing::info;

use crate::auth::{Argon2Hasher, CredentialHasher, TokenService};
use crate::config::settings::Config;
use crate::error::Result;
use crate::server::rate_limit::{FixedWindowLimiter, RateLimiter};
use crate::services::{
    AccountLifecycleService, AvatarUploadCoordinator, MailTransport, NotificationDispatcher,
    SessionWorkflow, VerificationWorkflow,
};
use crate::storage::{init_image_store, init_storage, AccountStore, ImageStore};

/// Application state that is shared across all request handlers
#[derive(Clone)]
pub struct AppState {
    /// Loaded configuration
    pub config: Config,
    /// Account persistence
    pub accounts: Arc<dyn AccountStore>,
    /// Signup, verification and resend
    pub verification: Arc<VerificationWorkflow>,
    /// Login, logout and the route guard
    pub sessions: Arc<SessionWorkflow>,
    /// Subscription changes
    pub lifecycle: Arc<AccountLifecycleService>,
    /// Avatar uploads
    pub avatars: Arc<AvatarUploadCoordinator>,
    /// Signup throttling per client address
    pub signup_limiter: Arc<dyn RateLimiter>,
}

impl AppState {
    /// Build every dependency from configuration
    pub async fn new(config: Config) -> Result<Self> {
        let accounts = init_storage(&config.database).await?;
        let images = init_image_store(&config.avatar);
        let notifier = NotificationDispatcher::from_config(&config.mail)?;
        info!(
            "App state ready (account store connected, image store={}, mail transport={})",
            images.store_type(),
            notifier.transport_type()
        );
        Ok(Self::assemble(config, accounts, images, notifier))
    }

    /// Build with injected dependencies (tests, embedding)
    pub fn new_with_components(
        config: Config,
        accounts: Arc<dyn AccountStore>,
        images: Arc<dyn ImageStore>,
        mail: Arc<dyn MailTransport>,
    ) -> Self {
        let notifier = NotificationDispatcher::new(mail, &config.mail);
        Self::assemble(config, accounts, images, notifier)
    }

    fn assemble(
        config: Config,
        accounts: Arc<dyn AccountStore>,
        images: Arc<dyn ImageStore>,
        notifier: NotificationDispatcher,
    ) -> Self {
        let hasher: Arc<dyn CredentialHasher> = Arc::new(Argon2Hasher::new());
        let tokens = TokenService::new(&config.token);

        let verification = Arc::new(VerificationWorkflow::new(
            accounts.clone(),
            hasher.clone(),
            Arc::new(notifier),
        ));
        let sessions = Arc::new(SessionWorkflow::new(accounts.clone(), hasher, tokens));
        let lifecycle = Arc::new(AccountLifecycleService::new(accounts.clone(), sessions.clone()));
        let avatars = Arc::new(AvatarUploadCoordinator::new(
            accounts.clone(),
            images,
            config.avatar.max_bytes,
        ));
        let signup_limiter: Arc<dyn RateLimiter> =
            Arc::new(FixedWindowLimiter::from_config(&config.limiter));

        Self {
            config,
            accounts,
            verification,
            sessions,
            lifecycle,
            avatars,
            signup_limiter,
        }
    }
}
