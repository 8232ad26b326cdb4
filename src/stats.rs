//! Request outcome counters

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// How a single intercepted request was satisfied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Fresh cache entry served without touching the network
    Hit,
    /// Fresh cache entry served while revalidation runs in the background
    StaleHit,
    /// Cache could not serve; the network was consulted
    Miss,
    /// Network response served (and cached where eligible)
    Network,
    /// Network failed; a cached entry of any age was served instead
    CacheFallback,
    /// Background-revalidation strategy fell back to an expired entry
    StaleFallback,
}

impl Outcome {
    /// Tag broadcast with each stats update
    pub fn tag(&self) -> &'static str {
        match self {
            Outcome::Hit => "hit",
            Outcome::StaleHit => "stale-hit",
            Outcome::Miss => "miss",
            Outcome::Network => "network",
            Outcome::CacheFallback => "cache-fallback",
            Outcome::StaleFallback => "stale-fallback",
        }
    }
}

/// Point-in-time view of the counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Requests served from a fresh cache entry
    pub hits: u64,

    /// Requests the cache could not serve
    pub misses: u64,

    /// Requests served by the network
    pub network_requests: u64,

    /// Requests served from cache after the network failed
    pub fallbacks: u64,
}

/// Owned request-outcome counters
///
/// Injected into the strategy executor rather than living as process-wide
/// globals, so tests can observe counters in isolation. Counters are never
/// persisted; they reset when the worker restarts.
#[derive(Debug, Default)]
pub struct StatsRecorder {
    hits: AtomicU64,
    misses: AtomicU64,
    network_requests: AtomicU64,
    fallbacks: AtomicU64,
}

impl StatsRecorder {
    /// Create a zeroed recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one completed request
    pub fn record(&self, outcome: Outcome) {
        match outcome {
            Outcome::Hit | Outcome::StaleHit => {
                self.hits.fetch_add(1, Ordering::SeqCst);
            }
            Outcome::Miss => {
                self.misses.fetch_add(1, Ordering::SeqCst);
            }
            Outcome::Network => {
                self.network_requests.fetch_add(1, Ordering::SeqCst);
            }
            Outcome::CacheFallback | Outcome::StaleFallback => {
                self.fallbacks.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    /// Current counter values
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            hits: self.hits.load(Ordering::SeqCst),
            misses: self.misses.load(Ordering::SeqCst),
            network_requests: self.network_requests.load(Ordering::SeqCst),
            fallbacks: self.fallbacks.load(Ordering::SeqCst),
        }
    }
}
