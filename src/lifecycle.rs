//! Worker lifecycle - install, waiting, activate

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::http::Request;
use crate::store::CacheStore;
use crate::strategy::Network;

/// Strategy name recorded on precached entries
pub const PRECACHE_STRATEGY: &str = "precache";

/// Lifecycle stages of a worker version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    /// Precaching in progress
    Installing,
    /// Installed, waiting for old instances to finish
    Waiting,
    /// Cleaning up stale generations and claiming clients
    Activating,
    /// Intercepting requests
    Active,
}

impl WorkerState {
    /// Stage name as it appears in logs and state queries
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerState::Installing => "installing",
            WorkerState::Waiting => "waiting",
            WorkerState::Activating => "activating",
            WorkerState::Active => "active",
        }
    }
}

/// Drives the install/activate stages and cache-generation cleanup
pub struct LifecycleManager {
    config: WorkerConfig,
    store: Arc<dyn CacheStore>,
    network: Arc<dyn Network>,
    state: RwLock<WorkerState>,
}

impl LifecycleManager {
    /// New manager starting in the installing stage
    pub fn new(
        config: WorkerConfig,
        store: Arc<dyn CacheStore>,
        network: Arc<dyn Network>,
    ) -> Self {
        Self {
            config,
            store,
            network,
            state: RwLock::new(WorkerState::Installing),
        }
    }

    /// Current lifecycle stage
    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    /// Install: fetch and store the precache set into the static partition
    ///
    /// Any precache fetch failure fails the whole install stage. Precached
    /// entries carry metadata with max-age 0, so the age sweep never touches
    /// them, but they stay subject to the write-time entry cap.
    pub async fn install(&self) -> WorkerResult<()> {
        let partition = self.config.static_partition();
        info!(partition = partition.as_str(), "installing: precaching resources");

        for url in &self.config.precache {
            let request = Request::get(url.clone());
            let response = self.network.fetch(&request).await.map_err(|error| {
                WorkerError::PrecacheFailed {
                    url: url.clone(),
                    reason: error.to_string(),
                }
            })?;

            if !response.is_ok() {
                return Err(WorkerError::PrecacheFailed {
                    url: url.clone(),
                    reason: format!("status {}", response.status),
                });
            }

            let now = Utc::now().timestamp_millis();
            let to_cache = response.with_cache_metadata(PRECACHE_STRATEGY, 0, now);
            self.store.put(&partition, url, to_cache).await?;
            debug!(url = url.as_str(), "precached");
        }

        *self.state.write().await = WorkerState::Waiting;
        Ok(())
    }

    /// Skip the waiting stage and move straight to activating
    ///
    /// A no-op unless the worker is currently waiting.
    pub async fn skip_waiting(&self) {
        let mut state = self.state.write().await;
        if *state == WorkerState::Waiting {
            debug!("skip waiting requested; activating immediately");
            *state = WorkerState::Activating;
        }
    }

    /// Activate: delete partitions from stale cache generations
    ///
    /// Keeps exactly the current generation's partitions. Idempotent:
    /// running it again deletes nothing and loses nothing. Returns the names
    /// of the deleted partitions; the caller claims clients afterwards.
    pub async fn activate(&self) -> WorkerResult<Vec<String>> {
        *self.state.write().await = WorkerState::Activating;

        let keep = self.config.current_partitions();
        let mut deleted = Vec::new();

        for partition in self.store.partitions().await? {
            if !keep.contains(&partition) {
                info!(partition = partition.as_str(), "deleting stale cache generation");
                if self.store.delete_partition(&partition).await? {
                    deleted.push(partition);
                }
            }
        }

        *self.state.write().await = WorkerState::Active;
        Ok(deleted)
    }
}
