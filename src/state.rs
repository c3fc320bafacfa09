use std::sync::Arc;
use std::time::Instant;

use tokio::sync::broadcast;

use crate::cache::QueueCache;
use crate::config::Config;
use crate::services::{QueueBuilder, ReviewService};
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    store: Arc<Store>,
    reviews: ReviewService,
    queues: QueueBuilder,
    config: Arc<Config>,
    shutdown_tx: broadcast::Sender<()>,
    started_at: Instant,
}

impl AppState {
    pub fn new(
        store: Arc<Store>,
        cache: Arc<dyn QueueCache>,
        config: &Config,
        shutdown_tx: broadcast::Sender<()>,
    ) -> Self {
        let reviews = ReviewService::new(store.clone(), cache.clone());
        let queues = QueueBuilder::new(store.clone(), cache.clone(), config.cache.queue_ttl());

        Self {
            store,
            reviews,
            queues,
            config: Arc::new(config.clone()),
            shutdown_tx,
            started_at: Instant::now(),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn reviews(&self) -> &ReviewService {
        &self.reviews
    }

    pub fn queues(&self) -> &QueueBuilder {
        &self.queues
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn shutdown_rx(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
