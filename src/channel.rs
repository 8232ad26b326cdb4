//! Control channel message types
//!
//! Commands arrive from controlled clients as `{type, payload}` messages;
//! events go back either as a direct reply or as a broadcast to every
//! connected client.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::stats::StatsSnapshot;

/// Inbound control command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    /// Activate immediately without waiting for old instances
    SkipWaiting,

    /// Request a full statistics report
    GetCacheStats,

    /// Delete a named partition
    #[serde(rename_all = "camelCase")]
    ClearCache { cache_name: String },

    /// Fetch and cache a batch of URLs, best effort
    PrefetchContent { urls: Vec<String> },
}

impl Command {
    /// Parse a raw message; unrecognized types yield `None` and are ignored
    pub fn parse(message: &serde_json::Value) -> Option<Command> {
        serde_json::from_value(message.clone()).ok()
    }
}

/// Outbound event, replied or broadcast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Event {
    /// Push telemetry emitted after every completed request
    CacheStatsUpdate(StatsUpdate),

    /// Reply to `GET_CACHE_STATS`
    CacheStats(StatsReport),

    /// Reply to `CLEAR_CACHE`
    #[serde(rename_all = "camelCase")]
    CacheCleared { cache_name: String, deleted: bool },

    /// Broadcast after queued offline actions are processed
    OfflineActionsProcessed { timestamp: i64 },
}

/// Running counters plus the request that just completed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsUpdate {
    /// Counter values after this request
    #[serde(flatten)]
    pub counters: StatsSnapshot,

    /// URL of the completed request
    pub url: String,

    /// Outcome tag (hit, miss, network, ...)
    pub outcome: String,
}

/// Full statistics report: counters plus per-partition contents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsReport {
    /// Running counters
    #[serde(flatten)]
    pub counters: StatsSnapshot,

    /// Per-partition entry counts and cached URLs
    pub partitions: BTreeMap<String, PartitionReport>,
}

/// One partition's contribution to a stats report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionReport {
    /// Number of entries
    pub entries: usize,

    /// Cached request URLs
    pub urls: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_known_commands() {
        assert_eq!(
            Command::parse(&json!({"type": "SKIP_WAITING"})),
            Some(Command::SkipWaiting)
        );
        assert_eq!(
            Command::parse(&json!({"type": "CLEAR_CACHE", "payload": {"cacheName": "kickoff-club-dynamic-v1"}})),
            Some(Command::ClearCache {
                cache_name: "kickoff-club-dynamic-v1".to_string()
            })
        );
        assert_eq!(
            Command::parse(&json!({"type": "PREFETCH_CONTENT", "payload": {"urls": ["/a", "/b"]}})),
            Some(Command::PrefetchContent {
                urls: vec!["/a".to_string(), "/b".to_string()]
            })
        );
    }

    #[test]
    fn test_unknown_command_ignored() {
        assert_eq!(Command::parse(&json!({"type": "REBOOT"})), None);
        assert_eq!(Command::parse(&json!({"hello": "world"})), None);
    }

    #[test]
    fn test_event_wire_shape() {
        let event = Event::CacheCleared {
            cache_name: "x".to_string(),
            deleted: true,
        };
        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(value["type"], "CACHE_CLEARED");
        assert_eq!(value["payload"]["cacheName"], "x");
    }
}
