use std::time::Duration;
use tokio::signal;
use tracing::{error, info, instrument};

use crate::{
    config::{constants, settings::Config},
    error::{IdentityError, Result},
    handlers,
    server::app_state::AppState,
};

use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};

/// Build state from configuration and serve until shutdown
#[instrument(skip(config))]
pub async fn start_server(config: Config) -> Result<()> {
    info!("🚀 Starting COSMIC Identity Server");

    let app_state = AppState::new(config).await?;
    start_server_with_state(app_state).await
}

/// Serve with a prepared state (for dependency injection)
#[instrument(skip(app_state))]
pub async fn start_server_with_state(app_state: AppState) -> Result<()> {
    let http_server = start_http_server(app_state.clone());
    let shutdown_signal = setup_shutdown_signal();

    print_startup_banner(&app_state.config);

    tokio::select! {
        result = http_server => {
            if let Err(e) = result {
                error!("❌ HTTP server error: {}", e);
                return Err(e);
            }
        },
        _ = shutdown_signal => {
            info!("🛑 Shutdown signal received");
        }
    }

    info!("✅ Server shutdown completed successfully");
    Ok(())
}

/// Route table, shared by the server and the integration tests
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(handlers::health::health_check))
        .route("/health/live", web::get().to(handlers::health::liveness_check))
        .configure(handlers::account_handler::configure);
}

#[instrument(skip(app_state))]
async fn start_http_server(app_state: AppState) -> Result<()> {
    let config = app_state.config.server.clone();
    let addr = config
        .address()
        .map_err(|e| IdentityError::config(format!("Invalid server address: {}", e)))?;

    info!("🌐 Starting HTTP server on {}", addr);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(middleware::Compress::default())
            .wrap(middleware::Logger::default())
            .wrap(
                middleware::DefaultHeaders::new()
                    .add(("X-Version", env!("CARGO_PKG_VERSION")))
                    .add(("X-Server", "COSMIC-Identity")),
            )
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(constants::DEFAULT_CORS_MAX_AGE_SECS as usize),
            )
            .configure(configure_routes)
    })
    .workers(config.worker_threads)
    .keep_alive(Duration::from_secs(constants::HTTP_KEEPALIVE_SECS))
    .client_request_timeout(Duration::from_secs(constants::HTTP_CLIENT_REQUEST_TIMEOUT_SECS))
    .shutdown_timeout(30)
    .bind(addr)
    .map_err(|e| IdentityError::config(format!("Failed to bind HTTP server: {}", e)))?
    .run()
    .await
    .map_err(|e| IdentityError::internal(format!("HTTP server error: {}", e)))?;

    info!("🌐 HTTP server stopped");
    Ok(())
}

/// Setup graceful shutdown signal handling
async fn setup_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("🛑 Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            info!("🛑 Received TERM signal, initiating graceful shutdown...");
        },
    }
}

fn print_startup_banner(config: &Config) {
    println!(
        "
╭─────────────────────────────────────────────────────╮
│               COSMIC Identity Server                │
│                   v{}
├─────────────────────────────────────────────────────┤
│ 🌐 HTTP: {}:{}
│ 🧵 Workers: {} threads
│ 🖼  Avatar store: {:?}
│ 🌍 Environment: {:?}
╰─────────────────────────────────────────────────────╯
",
        env!("CARGO_PKG_VERSION"),
        config.server.host,
        config.server.port,
        config.server.worker_threads,
        config.avatar.store_type,
        config.environment
    );
}
