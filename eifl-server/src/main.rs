use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use eifl_server::config::ServerConfig;
use eifl_server::crypto::SecretCipherHandle;
use eifl_server::git::CliGitAdapter;
use eifl_server::{api, db, service, AppState};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "eifl_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting EIFL server...");

    let config = ServerConfig::from_env();

    tracing::info!("Connecting to database...");

    let pool = db::create_pool(&config.database_url)
        .await
        .expect("Failed to create database pool");

    tracing::info!("Database connection pool created");

    db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    let secrets = SecretCipherHandle::from_env();
    if !secrets.is_configured() {
        tracing::warn!("EIFL_ENCRYPTION_KEY is not set; secret management is disabled");
    }

    let git = Arc::new(CliGitAdapter::new(config.data_dir.clone()));
    let bind_addr = config.bind_addr.clone();

    let state = AppState::new(pool, git, Arc::new(secrets), config);

    // Scheduler tick loop: once at startup, then on the configured interval
    service::scheduler::spawn(state.clone());

    let app = api::create_router(state);

    tracing::info!("Listening on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
