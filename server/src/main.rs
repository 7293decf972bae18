use dotenvy::dotenv;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use gatepass_server::config::Config;
use gatepass_server::routes::{create_routes, AppState};
use gatepass_server::services::events::complete_elapsed;
use gatepass_server::store::{MemoryStore, PgStore, TicketStore};

const DEFAULT_LOG_FILTER: &str = "gatepass_server=info,tower_http=info";

#[tokio::main]
async fn main() {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let config = Config::from_env().expect("Invalid configuration");

    let store: Arc<dyn TicketStore> = match &config.database_url {
        Some(url) => Arc::new(
            PgStore::connect(url, config.max_connections)
                .await
                .expect("Failed to connect to database"),
        ),
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    spawn_completion_sweep(store.clone(), config.completion_sweep);

    let app = create_routes(AppState::new(store), &config.cors_origins);

    let addr = config.bind_addr();
    tracing::info!("Server running at http://{}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server failed");
}

fn spawn_completion_sweep(store: Arc<dyn TicketStore>, period: std::time::Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            if let Err(e) = complete_elapsed(store.as_ref(), chrono::Utc::now()).await {
                tracing::error!(error = ?e, "Event completion sweep failed");
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = ?e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
