use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::store::Store;

/// Snapshots department asset totals every `interval` until the runtime
/// shuts down.
pub fn spawn_stats_recorder(store: Arc<dyn Store>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;
            match store.record_asset_stats() {
                Ok(recorded) => tracing::info!(departments = recorded, "asset stats recorded"),
                Err(e) => tracing::warn!("Failed to record asset stats: {e}"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;

    #[tokio::test(start_paused = true)]
    async fn test_recorder_snapshots_on_each_tick() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.initialize().unwrap();
        let entity = store.create_entity("e").unwrap();
        let department = store.create_department("d", entity.id, None).unwrap();
        let store: Arc<dyn Store> = Arc::new(store);

        let handle = spawn_stats_recorder(store.clone(), Duration::from_secs(60));
        tokio::time::sleep(Duration::from_secs(125)).await;
        handle.abort();

        assert_eq!(store.list_asset_stats(department.id).unwrap().len(), 2);
    }
}
