//! Cache store abstraction and the in-memory implementation

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::WorkerResult;
use crate::http::Response;

/// Key-value store of request URL -> response, grouped into named partitions
///
/// Partitions are created on first write and destroyed wholesale. Concurrent
/// writes to the same key are serialized by the implementation; the last
/// write wins. A lookup racing a deletion observes an ordinary miss.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Look up a cached response
    async fn get(&self, partition: &str, key: &str) -> WorkerResult<Option<Response>>;

    /// Store a response, overwriting any existing entry for the key
    async fn put(&self, partition: &str, key: &str, response: Response) -> WorkerResult<()>;

    /// Delete one entry; returns whether it existed
    async fn delete(&self, partition: &str, key: &str) -> WorkerResult<bool>;

    /// All keys currently in a partition
    async fn keys(&self, partition: &str) -> WorkerResult<Vec<String>>;

    /// Entry count for a partition (0 when the partition does not exist)
    async fn count(&self, partition: &str) -> WorkerResult<usize>;

    /// Names of all live partitions
    async fn partitions(&self) -> WorkerResult<Vec<String>>;

    /// Destroy a partition and everything in it; returns whether it existed
    async fn delete_partition(&self, name: &str) -> WorkerResult<bool>;
}

/// In-memory cache store
///
/// Serves tests and the in-process build; a durable platform store would
/// implement the same trait.
#[derive(Debug, Default)]
pub struct MemoryStore {
    partitions: RwLock<HashMap<String, HashMap<String, Response>>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, partition: &str, key: &str) -> WorkerResult<Option<Response>> {
        let partitions = self.partitions.read().await;
        Ok(partitions.get(partition).and_then(|p| p.get(key)).cloned())
    }

    async fn put(&self, partition: &str, key: &str, response: Response) -> WorkerResult<()> {
        let mut partitions = self.partitions.write().await;
        partitions
            .entry(partition.to_string())
            .or_default()
            .insert(key.to_string(), response);
        Ok(())
    }

    async fn delete(&self, partition: &str, key: &str) -> WorkerResult<bool> {
        let mut partitions = self.partitions.write().await;
        Ok(partitions
            .get_mut(partition)
            .map(|p| p.remove(key).is_some())
            .unwrap_or(false))
    }

    async fn keys(&self, partition: &str) -> WorkerResult<Vec<String>> {
        let partitions = self.partitions.read().await;
        Ok(partitions
            .get(partition)
            .map(|p| p.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn count(&self, partition: &str) -> WorkerResult<usize> {
        let partitions = self.partitions.read().await;
        Ok(partitions.get(partition).map(|p| p.len()).unwrap_or(0))
    }

    async fn partitions(&self) -> WorkerResult<Vec<String>> {
        let partitions = self.partitions.read().await;
        Ok(partitions.keys().cloned().collect())
    }

    async fn delete_partition(&self, name: &str) -> WorkerResult<bool> {
        let mut partitions = self.partitions.write().await;
        Ok(partitions.remove(name).is_some())
    }
}
