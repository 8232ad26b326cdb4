//! Kickoff Club caching worker
//!
//! Client-side interception layer that serves outgoing GET requests through
//! named caching strategies, with bounded partitions and a message-based
//! control channel:
//! - Resolves a strategy per request by ordered URL patterns
//! - Runs cache-first / network-first / stale-while-revalidate /
//!   network-only / cache-only against partitioned cache storage
//! - Evicts oldest entries past each rule's cap and sweeps expired entries
//!   on a timer
//! - Precaches the app shell on install, purges stale cache generations on
//!   activate
//! - Answers control commands and pushes cache telemetry to every connected
//!   client
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      CACHING WORKER                          │
//! │                                                              │
//! │  request ──► Strategy ──► Strategy ──► Eviction              │
//! │              Registry     Executor     Sweeper               │
//! │                              │            │                  │
//! │                        ┌─────▼────────────▼─────┐            │
//! │                        │      Cache Store       │            │
//! │                        │ static│dynamic│default │            │
//! │                        └────────────────────────┘            │
//! │                                                              │
//! │  Lifecycle (install/activate)      Control Channel ◄──► UI  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kickoff_cache::{Worker, WorkerConfig};
//!
//! let worker = Worker::new(WorkerConfig::default(), network);
//! worker.install().await?;
//! worker.activate().await?;
//! worker.start().await;
//!
//! let response = worker.handle_fetch(&request).await?;
//! ```

pub mod channel;
pub mod clients;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod registry;
pub mod stats;
pub mod store;
pub mod strategy;
pub mod sweeper;

pub use channel::{Command, Event, PartitionReport, StatsReport, StatsUpdate};
pub use clients::{ClientId, ClientRegistry};
pub use config::{SweepConfig, WorkerConfig};
pub use error::{WorkerError, WorkerResult};
pub use http::{Destination, Method, Request, Response};
pub use lifecycle::{LifecycleManager, WorkerState};
pub use registry::{StrategyKind, StrategyRegistry, StrategyRule};
pub use stats::{Outcome, StatsRecorder, StatsSnapshot};
pub use store::{CacheStore, MemoryStore};
pub use strategy::{Network, StrategyExecutor};
pub use sweeper::EvictionSweeper;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Strategy name recorded on prefetched entries
pub const PREFETCH_STRATEGY: &str = "prefetch";

/// The caching worker
///
/// Owns the store, the strategy machinery, the sweeper, the lifecycle state,
/// and the connected clients. One `Worker` corresponds to one active
/// software version.
pub struct Worker {
    config: WorkerConfig,
    store: Arc<dyn CacheStore>,
    network: Arc<dyn Network>,
    registry: StrategyRegistry,
    executor: StrategyExecutor,
    sweeper: Arc<EvictionSweeper>,
    lifecycle: LifecycleManager,
    clients: Arc<ClientRegistry>,
    stats: Arc<StatsRecorder>,
}

impl Worker {
    /// Create a worker with an in-memory store
    pub fn new(config: WorkerConfig, network: Arc<dyn Network>) -> Self {
        Self::with_store(config, network, Arc::new(MemoryStore::new()))
    }

    /// Create a worker over a custom cache store
    pub fn with_store(
        config: WorkerConfig,
        network: Arc<dyn Network>,
        store: Arc<dyn CacheStore>,
    ) -> Self {
        let sweeper = Arc::new(EvictionSweeper::new(Arc::clone(&store)));
        let stats = Arc::new(StatsRecorder::new());
        let clients = Arc::new(ClientRegistry::new());
        let executor = StrategyExecutor::new(
            Arc::clone(&store),
            Arc::clone(&network),
            Arc::clone(&sweeper),
            Arc::clone(&stats),
            Arc::clone(&clients),
        );
        let lifecycle =
            LifecycleManager::new(config.clone(), Arc::clone(&store), Arc::clone(&network));

        Self {
            config,
            store,
            network,
            registry: StrategyRegistry::new(),
            executor,
            sweeper,
            lifecycle,
            clients,
            stats,
        }
    }

    /// Run the install stage: precache the app shell
    pub async fn install(&self) -> WorkerResult<()> {
        self.lifecycle.install().await
    }

    /// Skip the waiting stage
    pub async fn skip_waiting(&self) {
        self.lifecycle.skip_waiting().await;
    }

    /// Run the activate stage: purge stale generations, claim clients
    ///
    /// Returns the names of the deleted stale partitions.
    pub async fn activate(&self) -> WorkerResult<Vec<String>> {
        let deleted = self.lifecycle.activate().await?;
        let claimed = self.clients.claim().await;
        info!(claimed, deleted = deleted.len(), "worker active");
        Ok(deleted)
    }

    /// Current lifecycle stage
    pub async fn state(&self) -> WorkerState {
        self.lifecycle.state().await
    }

    /// Start the periodic expired-entry sweep, per config
    pub async fn start(&self) {
        if self.config.sweep.enabled {
            self.sweeper
                .start(Duration::from_millis(self.config.sweep.interval_ms))
                .await;
        }
    }

    /// Stop background tasks
    pub async fn shutdown(&self) {
        self.sweeper.stop().await;
    }

    /// Handle an intercepted request
    ///
    /// Non-GET and non-http(s) requests bypass the cache entirely. For a
    /// cached GET, a strategy failure degrades to the offline fallback
    /// instead of surfacing; only bypassed requests can return an error.
    pub async fn handle_fetch(&self, request: &Request) -> WorkerResult<Response> {
        if !request.method.is_get() || !request.is_http() {
            return self.network.fetch(request).await;
        }

        let rule = self.registry.resolve(&request.url);
        let partition = self.config.partition_for_rule(&rule.name);

        match self.executor.handle(request, rule, &partition).await {
            Ok(response) => Ok(response),
            Err(error) => {
                warn!(%error, url = request.url.as_str(), "request failed; serving offline fallback");
                Ok(self.offline_fallback(request).await)
            }
        }
    }

    /// Offline degradation for a failed request
    ///
    /// Navigations get the precached offline page when available; everything
    /// else gets a structured JSON 503.
    async fn offline_fallback(&self, request: &Request) -> Response {
        if request.destination == Destination::Document {
            if let Ok(Some(page)) = self
                .store
                .get(&self.config.static_partition(), &self.config.offline_page)
                .await
            {
                return page;
            }
        }

        let body = serde_json::json!({
            "error": "Network unavailable",
            "offline": true,
            "timestamp": Utc::now().timestamp_millis(),
        });

        Response {
            status: 503,
            status_text: "Service Unavailable".to_string(),
            headers: std::collections::HashMap::from([
                ("content-type".to_string(), "application/json".to_string()),
                ("cache-control".to_string(), "no-cache".to_string()),
            ]),
            body: body.to_string().into_bytes(),
        }
    }

    /// Handle a control message from a client
    ///
    /// Returns the direct reply, if the command has one. Unrecognized
    /// message types are ignored.
    pub async fn handle_message(
        &self,
        message: &serde_json::Value,
    ) -> WorkerResult<Option<Event>> {
        let Some(command) = Command::parse(message) else {
            return Ok(None);
        };

        match command {
            Command::SkipWaiting => {
                self.skip_waiting().await;
                Ok(None)
            }
            Command::GetCacheStats => Ok(Some(Event::CacheStats(self.cache_stats().await?))),
            Command::ClearCache { cache_name } => {
                let deleted = self.store.delete_partition(&cache_name).await?;
                info!(partition = cache_name.as_str(), deleted, "cache cleared by command");
                Ok(Some(Event::CacheCleared {
                    cache_name,
                    deleted,
                }))
            }
            Command::PrefetchContent { urls } => {
                self.prefetch(&urls).await;
                Ok(None)
            }
        }
    }

    /// Fetch and cache URLs into the dynamic partition, best effort
    ///
    /// Per-URL failures are logged and do not abort the batch. Returns the
    /// number of URLs cached.
    pub async fn prefetch(&self, urls: &[String]) -> usize {
        let partition = self.config.dynamic_partition();
        let mut cached = 0;

        for url in urls {
            let request = Request::get(url.clone());
            match self.network.fetch(&request).await {
                Ok(response) if response.is_ok() => {
                    let now = Utc::now().timestamp_millis();
                    let to_cache = response.with_cache_metadata(PREFETCH_STRATEGY, 0, now);
                    match self.store.put(&partition, url, to_cache).await {
                        Ok(()) => cached += 1,
                        Err(error) => warn!(%error, url = url.as_str(), "prefetch store failed"),
                    }
                }
                Ok(response) => {
                    warn!(url = url.as_str(), status = response.status, "prefetch got non-success status");
                }
                Err(error) => {
                    warn!(%error, url = url.as_str(), "prefetch failed");
                }
            }
        }

        cached
    }

    /// Process queued offline actions and notify clients
    pub async fn process_offline_actions(&self) {
        self.clients
            .broadcast(Event::OfflineActionsProcessed {
                timestamp: Utc::now().timestamp_millis(),
            })
            .await;
    }

    /// Register a client for broadcasts and command replies
    pub async fn connect_client(&self) -> (ClientId, mpsc::UnboundedReceiver<Event>) {
        self.clients.connect().await
    }

    /// Remove a connected client
    pub async fn disconnect_client(&self, id: ClientId) {
        self.clients.disconnect(id).await;
    }

    /// Full statistics report: counters plus per-partition contents
    pub async fn cache_stats(&self) -> WorkerResult<StatsReport> {
        let mut partitions = BTreeMap::new();

        for partition in self.store.partitions().await? {
            let urls = self.store.keys(&partition).await?;
            partitions.insert(
                partition,
                PartitionReport {
                    entries: urls.len(),
                    urls,
                },
            );
        }

        Ok(StatsReport {
            counters: self.stats.snapshot(),
            partitions,
        })
    }

    /// Running counters only
    pub fn stats_snapshot(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Run one expired-entry sweep immediately
    pub async fn sweep_now(&self) -> WorkerResult<usize> {
        self.sweeper.sweep_expired().await
    }

    /// The worker's configuration
    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }
}
