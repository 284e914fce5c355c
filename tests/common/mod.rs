// Common test helpers for integration tests
#![allow(dead_code)]

use std::sync::Arc;

use cosmic_identity_server::config::settings::Config;
use cosmic_identity_server::models::NewAccount;
use cosmic_identity_server::server::app_state::AppState;
use cosmic_identity_server::services::MemoryMailTransport;
use cosmic_identity_server::storage::{AccountStore, MemoryAccountStore, MemoryImageStore};

pub struct TestContext {
    pub state: AppState,
    pub accounts: Arc<MemoryAccountStore>,
    pub images: Arc<MemoryImageStore>,
    pub mail: Arc<MemoryMailTransport>,
}

/// Defaults with a signup budget large enough not to interfere
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.limiter.max_requests = 1_000;
    config.mail.app_base_url = "https://id.test".to_string();
    config
}

pub fn context_with(config: Config, mail: MemoryMailTransport) -> TestContext {
    let accounts = Arc::new(MemoryAccountStore::new());
    let images = Arc::new(MemoryImageStore::with_base_url("https://cdn.test/avatars"));
    let mail = Arc::new(mail);
    let state = AppState::new_with_components(config, accounts.clone(), images.clone(), mail.clone());
    TestContext {
        state,
        accounts,
        images,
        mail,
    }
}

pub fn context() -> TestContext {
    context_with(test_config(), MemoryMailTransport::new())
}

/// Token currently waiting for confirmation on `email`
pub async fn pending_token(ctx: &TestContext, email: &str) -> String {
    ctx.accounts
        .find_by_email(email)
        .await
        .expect("store lookup")
        .expect("account exists")
        .verification
        .token()
        .expect("account is unverified")
        .to_string()
}

/// Create, verify and log in an account through the workflows
pub async fn verified_session(ctx: &TestContext, email: &str, password: &str) -> String {
    ctx.state
        .verification
        .signup(NewAccount {
            email: email.to_string(),
            password: password.to_string(),
            name: None,
        })
        .await
        .expect("signup");
    let token = pending_token(ctx, email).await;
    ctx.state.verification.verify(&token).await.expect("verify");
    ctx.state.sessions.login(email, password).await.expect("login")
}
