//! Eviction sweeper
//!
//! Two mechanisms keep partitions bounded: a write-time entry cap enforced
//! after every store, and a periodic sweep that deletes age-expired entries
//! across all partitions.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::WorkerResult;
use crate::store::CacheStore;

/// Enforces entry caps and age-based expiry against the cache store
pub struct EvictionSweeper {
    store: Arc<dyn CacheStore>,

    /// Periodic sweep task, when running
    task: Mutex<Option<JoinHandle<()>>>,
}

impl EvictionSweeper {
    /// Create a sweeper over a store
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            task: Mutex::new(None),
        }
    }

    /// Trim a partition down to `max_entries`, oldest first
    ///
    /// Entries are ordered by their `sw-cached-at` metadata; entries missing
    /// the timestamp sort as oldest. Returns the number of evicted entries.
    pub async fn enforce_max_entries(
        &self,
        partition: &str,
        max_entries: usize,
    ) -> WorkerResult<usize> {
        let keys = self.store.keys(partition).await?;
        if keys.len() <= max_entries {
            return Ok(0);
        }

        let mut dated: Vec<(String, i64)> = Vec::with_capacity(keys.len());
        for key in keys {
            let cached_at = self
                .store
                .get(partition, &key)
                .await?
                .and_then(|response| response.cached_at())
                .unwrap_or(0);
            dated.push((key, cached_at));
        }

        dated.sort_by_key(|(_, cached_at)| *cached_at);

        let surplus = dated.len() - max_entries;
        let mut evicted = 0;
        for (key, _) in dated.into_iter().take(surplus) {
            if self.store.delete(partition, &key).await? {
                evicted += 1;
            }
        }

        if evicted > 0 {
            debug!(partition, evicted, "evicted oldest cache entries");
        }
        Ok(evicted)
    }

    /// Delete every age-expired entry in every partition
    ///
    /// Entries whose recorded max-age is zero are exempt. Returns the number
    /// of deleted entries.
    pub async fn sweep_expired(&self) -> WorkerResult<usize> {
        Self::sweep_store(&self.store).await
    }

    async fn sweep_store(store: &Arc<dyn CacheStore>) -> WorkerResult<usize> {
        let now = Utc::now().timestamp_millis();
        let mut deleted = 0;

        for partition in store.partitions().await? {
            for key in store.keys(&partition).await? {
                let Some(response) = store.get(&partition, &key).await? else {
                    // Raced a concurrent deletion; nothing to do
                    continue;
                };

                let max_age = response.recorded_max_age();
                if max_age > 0 && response.is_expired(max_age, now) {
                    debug!(partition = partition.as_str(), url = key.as_str(), "deleting expired cache entry");
                    if store.delete(&partition, &key).await? {
                        deleted += 1;
                    }
                }
            }
        }

        Ok(deleted)
    }

    /// Start the recurring sweep task
    ///
    /// The first sweep runs one full interval after start. Calling start
    /// while a task is running replaces it.
    pub async fn start(&self, interval: Duration) {
        let store = Arc::clone(&self.store);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The immediate first tick would sweep an empty cache
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(error) = Self::sweep_store(&store).await {
                    warn!(%error, "periodic cache sweep failed");
                }
            }
        });

        if let Some(old) = self.task.lock().await.replace(handle) {
            old.abort();
        }
    }

    /// Stop the recurring sweep task, if running
    pub async fn stop(&self) {
        if let Some(task) = self.task.lock().await.take() {
            task.abort();
        }
    }

    /// Whether the recurring sweep task is running
    pub async fn is_running(&self) -> bool {
        self.task.lock().await.is_some()
    }
}
