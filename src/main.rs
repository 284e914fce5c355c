use dotenv::dotenv;
use tracing::{error, info, instrument};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cosmic_identity_server::{
    config::settings::{Config, LoggingConfig},
    error::Result,
    server::startup::start_server,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    // Initialize structured logging
    init_tracing(&LoggingConfig::load());

    info!("📋 Loading server configuration...");
    let config = Config::load();
    config.validate()?;
    info!(
        "✅ Configuration validated: environment={:?}, workers={}",
        config.environment, config.server.worker_threads
    );

    info!("🚀 Starting COSMIC Identity Server v{}", env!("CARGO_PKG_VERSION"));
    match start_server(config).await {
        Ok(_) => {
            info!("✅ Server shutdown completed successfully");
            Ok(())
        }
        Err(e) => {
            error!("❌ Server failed: {}", e);
            Err(e)
        }
    }
}

/// Initialize structured logging
#[instrument]
fn init_tracing(logging: &LoggingConfig) {
    let subscriber = tracing_subscriber::registry().with(
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level)),
    );

    // JSON logging for production
    if logging.json {
        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(false)
            .with_span_list(false);

        subscriber.with(json_layer).init();
    } else {
        subscriber
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(false)
                    .with_line_number(false)
                    .compact(),
            )
            .init();
    }

    info!("✅ Structured logging initialized with level: {}", logging.level);
}
