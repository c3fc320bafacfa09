use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{header, HeaderValue};
use recall_backend::cache::{MemoryCache, NoopCache, QueueCache};
use recall_backend::config::Config;
use recall_backend::logging::{init_tracing, LogConfig};
use recall_backend::routes::build_router;
use recall_backend::state::AppState;
use recall_backend::store::Store;
use recall_backend::workers::WorkerManager;
use tokio::sync::broadcast;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;

type BoxError = Box<dyn Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    dotenvy::dotenv().ok();

    let config = Config::from_env();
    init_tracing(&LogConfig::from(&config));
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting recall-backend");

    let store = Arc::new(Store::open(&config.sled_path)?);
    store.run_migrations()?;

    let cache: Arc<dyn QueueCache> = if config.cache.enabled {
        Arc::new(MemoryCache::new())
    } else {
        tracing::info!("Queue cache disabled");
        Arc::new(NoopCache)
    };

    let (shutdown_tx, _) = broadcast::channel::<()>(8);
    let state = AppState::new(store.clone(), cache.clone(), &config, shutdown_tx.clone());

    if config.worker.is_leader {
        let worker_manager = WorkerManager::new(
            store.clone(),
            cache.clone(),
            shutdown_tx.subscribe(),
            &config.worker,
        );
        let handle = tokio::spawn(async move {
            if let Err(e) = worker_manager.start().await {
                tracing::error!(error = %e, "Worker manager failed");
            }
        });
        // A crashed scheduler must not take the HTTP server down with it.
        tokio::spawn(async move {
            match handle.await {
                Err(e) => tracing::error!(error = %e, "Worker task panicked, HTTP server continues"),
                Ok(()) => tracing::info!("Worker manager exited normally"),
            }
        });
    }

    let app = build_router(state)
        .layer(build_cors_layer(&config)?)
        .layer(CatchPanicLayer::new())
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ));

    let addr = SocketAddr::new(config.host, config.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Listening");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_tx.clone()))
        .await;
    if let Err(e) = served {
        tracing::error!(error = %e, "HTTP server crashed");
    }

    tracing::info!("Flushing store before exit");
    if let Err(e) = store.flush() {
        tracing::error!(error = %e, "Failed to flush store before exit");
    }
    tracing::info!("Shutdown complete");
    Ok(())
}

fn build_cors_layer(config: &Config) -> Result<CorsLayer, BoxError> {
    let base = CorsLayer::new()
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_methods(Any);

    if config.cors_origin.trim() == "*" {
        return Ok(base.allow_origin(Any));
    }

    let origin = config
        .cors_origin
        .parse::<HeaderValue>()
        .map_err(|e| format!("invalid CORS_ORIGIN {:?}: {e}", config.cors_origin))?;
    Ok(base.allow_origin(origin))
}

async fn shutdown_signal(shutdown_tx: broadcast::Sender<()>) {
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = sigterm.recv() => {},
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable, waiting for ctrl-c");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    tracing::info!("Shutdown signal received");
    let _ = shutdown_tx.send(());
}
