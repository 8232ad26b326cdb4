//! Strategy executor - the request-handling algorithms

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::warn;

use crate::channel::{Event, StatsUpdate};
use crate::clients::ClientRegistry;
use crate::error::{WorkerError, WorkerResult};
use crate::http::{Request, Response};
use crate::registry::{StrategyKind, StrategyRule};
use crate::stats::{Outcome, StatsRecorder};
use crate::store::CacheStore;
use crate::sweeper::EvictionSweeper;

/// Network fetch seam
///
/// The executor never talks to a transport directly; production plugs in the
/// platform fetch, tests plug in a scripted double.
#[async_trait]
pub trait Network: Send + Sync {
    /// Perform the request against the network
    async fn fetch(&self, request: &Request) -> WorkerResult<Response>;
}

/// Runs the caching strategies against the store and network
pub struct StrategyExecutor {
    store: Arc<dyn CacheStore>,
    network: Arc<dyn Network>,
    sweeper: Arc<EvictionSweeper>,
    stats: Arc<StatsRecorder>,
    clients: Arc<ClientRegistry>,
}

impl StrategyExecutor {
    /// Wire up an executor
    pub fn new(
        store: Arc<dyn CacheStore>,
        network: Arc<dyn Network>,
        sweeper: Arc<EvictionSweeper>,
        stats: Arc<StatsRecorder>,
        clients: Arc<ClientRegistry>,
    ) -> Self {
        Self {
            store,
            network,
            sweeper,
            stats,
            clients,
        }
    }

    /// Handle a GET request under the resolved rule
    pub async fn handle(
        &self,
        request: &Request,
        rule: &StrategyRule,
        partition: &str,
    ) -> WorkerResult<Response> {
        match rule.kind {
            StrategyKind::CacheFirst => self.cache_first(request, rule, partition).await,
            StrategyKind::NetworkFirst => self.network_first(request, rule, partition).await,
            StrategyKind::StaleWhileRevalidate => {
                self.stale_while_revalidate(request, rule, partition).await
            }
            StrategyKind::NetworkOnly => self.network.fetch(request).await,
            StrategyKind::CacheOnly => self.cache_only(request).await,
        }
    }

    async fn cache_first(
        &self,
        request: &Request,
        rule: &StrategyRule,
        partition: &str,
    ) -> WorkerResult<Response> {
        let cached = self.store.get(partition, &request.url).await?;
        let now = Utc::now().timestamp_millis();

        if let Some(response) = &cached {
            if !response.is_expired(rule.max_age_ms, now) {
                self.record(&request.url, Outcome::Hit).await;
                return Ok(response.clone());
            }
        }

        match self.network.fetch(request).await {
            Ok(response) => {
                if response.is_ok() {
                    self.store_response(partition, rule, &request.url, &response)
                        .await?;
                    self.record(&request.url, Outcome::Miss).await;
                }
                Ok(response)
            }
            Err(error) => {
                self.record(&request.url, Outcome::Miss).await;
                // An expired entry still beats no response at all
                match cached {
                    Some(stale) => Ok(stale),
                    None => Err(error),
                }
            }
        }
    }

    async fn network_first(
        &self,
        request: &Request,
        rule: &StrategyRule,
        partition: &str,
    ) -> WorkerResult<Response> {
        match self.network.fetch(request).await {
            Ok(response) => {
                if response.is_ok() {
                    self.store_response(partition, rule, &request.url, &response)
                        .await?;
                    self.record(&request.url, Outcome::Network).await;
                }
                Ok(response)
            }
            Err(error) => match self.store.get(partition, &request.url).await? {
                Some(cached) => {
                    self.record(&request.url, Outcome::CacheFallback).await;
                    Ok(cached)
                }
                None => Err(error),
            },
        }
    }

    async fn stale_while_revalidate(
        &self,
        request: &Request,
        rule: &StrategyRule,
        partition: &str,
    ) -> WorkerResult<Response> {
        let cached = self.store.get(partition, &request.url).await?;
        let now = Utc::now().timestamp_millis();

        if let Some(response) = &cached {
            if !response.is_expired(rule.max_age_ms, now) {
                // Serve the cached copy now; the refresh settles on its own
                self.spawn_revalidation(request, rule, partition);
                self.record(&request.url, Outcome::StaleHit).await;
                return Ok(response.clone());
            }
        }

        match self.network.fetch(request).await {
            Ok(response) => {
                if response.is_ok() {
                    self.store_response(partition, rule, &request.url, &response)
                        .await?;
                }
                self.record(&request.url, Outcome::Network).await;
                Ok(response)
            }
            Err(error) => match cached {
                Some(stale) => {
                    self.record(&request.url, Outcome::StaleFallback).await;
                    Ok(stale)
                }
                None => Err(error),
            },
        }
    }

    async fn cache_only(&self, request: &Request) -> WorkerResult<Response> {
        for partition in self.store.partitions().await? {
            if let Some(response) = self.store.get(&partition, &request.url).await? {
                return Ok(response);
            }
        }
        Err(WorkerError::NoCachedResponse(request.url.clone()))
    }

    /// Detached background refresh for stale-while-revalidate
    ///
    /// The caller already has its response; success re-populates the cache
    /// for the next request, failure is logged and goes nowhere.
    fn spawn_revalidation(&self, request: &Request, rule: &StrategyRule, partition: &str) {
        let store = Arc::clone(&self.store);
        let sweeper = Arc::clone(&self.sweeper);
        let network = Arc::clone(&self.network);
        let request = request.clone();
        let rule = rule.clone();
        let partition = partition.to_string();

        tokio::spawn(async move {
            match network.fetch(&request).await {
                Ok(response) if response.is_ok() => {
                    let now = Utc::now().timestamp_millis();
                    let to_cache =
                        response.with_cache_metadata(&rule.name, rule.max_age_ms, now);
                    if let Err(error) = store.put(&partition, &request.url, to_cache).await {
                        warn!(%error, url = request.url.as_str(), "revalidation store failed");
                        return;
                    }
                    if let Err(error) =
                        sweeper.enforce_max_entries(&partition, rule.max_entries).await
                    {
                        warn!(%error, partition = partition.as_str(), "post-revalidation eviction failed");
                    }
                }
                Ok(_) => {}
                Err(error) => {
                    warn!(%error, url = request.url.as_str(), "background revalidation failed");
                }
            }
        });
    }

    /// Write a response with injected metadata and enforce the entry cap
    async fn store_response(
        &self,
        partition: &str,
        rule: &StrategyRule,
        url: &str,
        response: &Response,
    ) -> WorkerResult<()> {
        let now = Utc::now().timestamp_millis();
        let to_cache = response
            .clone()
            .with_cache_metadata(&rule.name, rule.max_age_ms, now);

        self.store.put(partition, url, to_cache).await?;
        self.sweeper
            .enforce_max_entries(partition, rule.max_entries)
            .await?;
        Ok(())
    }

    /// Count the outcome and push telemetry to every connected client
    async fn record(&self, url: &str, outcome: Outcome) {
        self.stats.record(outcome);
        self.clients
            .broadcast(Event::CacheStatsUpdate(StatsUpdate {
                counters: self.stats.snapshot(),
                url: url.to_string(),
                outcome: outcome.tag().to_string(),
            }))
            .await;
    }
}
