//! Configuration for the caching worker

use serde::{Deserialize, Serialize};

/// Main worker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Prefix shared by all cache partition names
    #[serde(default = "default_prefix")]
    pub cache_prefix: String,

    /// Cache generation; bumping it makes activation delete the old partitions
    #[serde(default = "default_version")]
    pub cache_version: u32,

    /// Resources fetched and stored at install time
    #[serde(default = "default_precache")]
    pub precache: Vec<String>,

    /// Document served when a navigation request fails offline
    #[serde(default = "default_offline_page")]
    pub offline_page: String,

    /// Periodic sweep configuration
    #[serde(default)]
    pub sweep: SweepConfig,
}

fn default_prefix() -> String {
    "kickoff-club".to_string()
}
fn default_version() -> u32 {
    1
}
fn default_precache() -> Vec<String> {
    vec![
        "/".to_string(),
        "/index.html".to_string(),
        "/offline.html".to_string(),
        "/manifest.json".to_string(),
    ]
}
fn default_offline_page() -> String {
    "/offline.html".to_string()
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            cache_prefix: default_prefix(),
            cache_version: default_version(),
            precache: default_precache(),
            offline_page: default_offline_page(),
            sweep: SweepConfig::default(),
        }
    }
}

impl WorkerConfig {
    /// Legacy/default partition for rules without a dedicated one
    pub fn default_partition(&self) -> String {
        format!("{}-cache-v{}", self.cache_prefix, self.cache_version)
    }

    /// Partition for long-lived static assets (also holds the precache set)
    pub fn static_partition(&self) -> String {
        format!("{}-static-v{}", self.cache_prefix, self.cache_version)
    }

    /// Partition for API, page, and lesson responses
    pub fn dynamic_partition(&self) -> String {
        format!("{}-dynamic-v{}", self.cache_prefix, self.cache_version)
    }

    /// The partitions belonging to the current cache generation
    pub fn current_partitions(&self) -> Vec<String> {
        vec![
            self.default_partition(),
            self.static_partition(),
            self.dynamic_partition(),
        ]
    }

    /// Partition a named strategy rule writes into
    pub fn partition_for_rule(&self, rule_name: &str) -> String {
        match rule_name {
            "static" => self.static_partition(),
            "api" | "lessons" | "pages" => self.dynamic_partition(),
            _ => self.default_partition(),
        }
    }
}

/// Periodic expired-entry sweep configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Whether the periodic sweep task runs
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Sweep interval in milliseconds
    #[serde(default = "default_sweep_interval")]
    pub interval_ms: u64,
}

fn default_true() -> bool {
    true
}
fn default_sweep_interval() -> u64 {
    60 * 60 * 1000
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: default_sweep_interval(),
        }
    }
}
