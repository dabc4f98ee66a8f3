mod memory;

pub use memory::MemoryKv;

use std::time::Duration;

use async_trait::async_trait;

#[derive(Debug)]
pub struct KvError(pub String);

impl std::fmt::Display for KvError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "kv: {}", self.0)
    }
}

impl std::error::Error for KvError {}

/// Minimal key-value capability the pipeline needs for deduplication state.
/// The store is shared between all pipelines and concurrent dispatchers, so
/// `set_if_absent` must be atomic and must install the TTL in the same call
/// that creates the key.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn exists(&self, key: &str) -> Result<bool, KvError>;

    /// `Ok(None)` for an absent key; errors are reserved for store failures.
    async fn get(&self, key: &str) -> Result<Option<String>, KvError>;

    async fn del(&self, keys: &[String]) -> Result<(), KvError>;

    /// Returns true iff the key was created by this call. A zero `ttl`
    /// creates the key without expiry.
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, KvError>;

    async fn incr(&self, key: &str) -> Result<i64, KvError>;

    async fn sadd(&self, set: &str, members: &[String]) -> Result<(), KvError>;

    async fn srem(&self, set: &str, members: &[String]) -> Result<(), KvError>;
}
