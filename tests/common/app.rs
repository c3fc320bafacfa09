use std::sync::Arc;

use axum::Router;
use tempfile::TempDir;
use tokio::sync::broadcast;

use recall_backend::cache::{MemoryCache, QueueCache};
use recall_backend::config::{CacheConfig, Config, WorkerConfig};
use recall_backend::routes::build_router;
use recall_backend::state::AppState;
use recall_backend::store::Store;

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub store: Arc<Store>,
    pub config: Config,
    _temp_dir: TempDir,
}

/// Built directly instead of through `Config::from_env` so parallel tests
/// never race on process environment.
fn test_config(sled_path: String) -> Config {
    Config {
        host: std::net::IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1)),
        port: 3000,
        log_level: "info".to_string(),
        enable_file_logs: false,
        log_dir: "./logs".to_string(),
        sled_path,
        jwt_secret: format!("integration-test-jwt-secret-{}", uuid::Uuid::new_v4()),
        cors_origin: "http://localhost:5173".to_string(),
        cache: CacheConfig {
            enabled: true,
            queue_ttl_secs: 300,
        },
        worker: WorkerConfig { is_leader: false },
    }
}

pub async fn spawn_test_app_with_cache(cache: Arc<dyn QueueCache>) -> TestApp {
    let temp_dir = tempfile::tempdir().expect("tempdir");
    let sled_path = temp_dir.path().join("recall-test.sled");
    let config = test_config(sled_path.to_string_lossy().to_string());

    let store = Arc::new(Store::open(&config.sled_path).expect("open store"));
    store.run_migrations().expect("run migrations");

    let (shutdown_tx, _) = broadcast::channel::<()>(8);
    let state = AppState::new(store.clone(), cache, &config, shutdown_tx);
    let app = build_router(state.clone());

    TestApp {
        app,
        state,
        store,
        config,
        _temp_dir: temp_dir,
    }
}

pub async fn spawn_test_app() -> TestApp {
    spawn_test_app_with_cache(Arc::new(MemoryCache::new())).await
}
