use anyhow::Context;
use axum::http::HeaderValue;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nextwatch_api::{
    api::{create_router_with_cors, AppState},
    config::{Config, StorageBackend},
    db::{create_pool, run_migrations, InMemoryStore, Stores},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nextwatch_api=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let stores = match config.storage_backend {
        StorageBackend::Postgres => {
            let pool = create_pool(&config.database_url, config.db_max_connections).await?;
            run_migrations(&pool).await?;
            Stores::postgres(pool)
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on exit");
            Stores::in_memory(InMemoryStore::new())
        }
    };

    let cors_origin = config
        .cors_origin
        .as_deref()
        .map(HeaderValue::from_str)
        .transpose()
        .context("CORS_ORIGIN is not a valid header value")?;

    let shutdown = CancellationToken::new();
    let state = AppState::new(stores, config.embedding_dim, shutdown.clone());
    let app = create_router_with_cors(state, cors_origin);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    tracing::info!(
        address = %address,
        backend = ?config.storage_backend,
        dimension = config.embedding_dim,
        "Server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Resolves on ctrl-c or SIGTERM after cancelling `token`
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
    token.cancel();
}
