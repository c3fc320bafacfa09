use crate::store::Store;

pub async fn run(store: &Store) {
    match store.flush() {
        Ok(()) => tracing::debug!("Store flushed"),
        Err(err) => tracing::error!(error = %err, "Periodic store flush failed"),
    }
}
