use std::collections::HashSet;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::{KvError, KvStore};

struct ValueEntry {
    data: String,
    expires_at: Option<Instant>,
}

impl ValueEntry {
    fn new(data: String, ttl: Duration) -> Self {
        let expires_at = if ttl.is_zero() {
            None
        } else {
            Some(Instant::now() + ttl)
        };
        Self { data, expires_at }
    }

    fn expired(&self) -> bool {
        self.expires_at.is_some_and(|t| Instant::now() >= t)
    }
}

/// In-process KV store with lazy TTL expiry. Suitable for single-node
/// deployments and as the test double for the `KvStore` capability.
#[derive(Default)]
pub struct MemoryKv {
    values: DashMap<String, ValueEntry>,
    sets: DashMap<String, HashSet<String>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Members of a set, sorted. Introspection helper for operators and
    /// tests; not part of the `KvStore` capability.
    pub fn members(&self, set: &str) -> Vec<String> {
        let mut out: Vec<String> = self
            .sets
            .get(set)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default();
        out.sort();
        out
    }
}

#[async_trait]
impl KvStore for MemoryKv {
    async fn exists(&self, key: &str) -> Result<bool, KvError> {
        let expired = match self.values.get(key) {
            None => return Ok(false),
            Some(entry) => entry.expired(),
        };
        if expired {
            self.values.remove_if(key, |_, e| e.expired());
            return Ok(false);
        }
        Ok(true)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        let found = match self.values.get(key) {
            None => return Ok(None),
            Some(entry) if entry.expired() => None,
            Some(entry) => Some(entry.data.clone()),
        };
        if found.is_none() {
            self.values.remove_if(key, |_, e| e.expired());
        }
        Ok(found)
    }

    async fn del(&self, keys: &[String]) -> Result<(), KvError> {
        for key in keys {
            self.values.remove(key);
        }
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, KvError> {
        match self.values.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().expired() {
                    occupied.insert(ValueEntry::new(value.to_string(), ttl));
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(ValueEntry::new(value.to_string(), ttl));
                Ok(true)
            }
        }
    }

    async fn incr(&self, key: &str) -> Result<i64, KvError> {
        match self.values.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                let current = if occupied.get().expired() {
                    0
                } else {
                    occupied
                        .get()
                        .data
                        .parse::<i64>()
                        .map_err(|_| KvError(format!("value at {key} is not an integer")))?
                };
                let next = current + 1;
                occupied.insert(ValueEntry::new(next.to_string(), Duration::ZERO));
                Ok(next)
            }
            Entry::Vacant(vacant) => {
                vacant.insert(ValueEntry::new("1".into(), Duration::ZERO));
                Ok(1)
            }
        }
    }

    async fn sadd(&self, set: &str, members: &[String]) -> Result<(), KvError> {
        self.sets
            .entry(set.to_string())
            .or_default()
            .extend(members.iter().cloned());
        Ok(())
    }

    async fn srem(&self, set: &str, members: &[String]) -> Result<(), KvError> {
        if let Some(mut entry) = self.sets.get_mut(set) {
            for member in members {
                entry.remove(member);
            }
        }
        Ok(())
    }
}
