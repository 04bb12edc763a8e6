//! Key/value store capability
//!
//! Functions keep small amounts of state between invocations (dedup keys,
//! counters, cached lookups) in a JSON key/value store. Every function sees
//! its own namespace through [`ScopedStore`], so two functions using the key
//! `"last_seen"` never collide.
//!
//! The in-memory [`MemoryStore`] is the default backend. Each access takes a
//! short `parking_lot::RwLock`; expired entries are treated as absent on
//! read and purged on write.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;

/// Errors from store backends
#[derive(Debug, Error)]
pub enum StoreError {
    /// Value could not be converted to or from JSON
    #[error("store serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backend failure (connection lost, quota exceeded, ...)
    #[error("store backend failed: {0}")]
    Backend(String),
}

/// Remaining lifetime of a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTtl {
    /// No such key
    Missing,
    /// Key never expires
    Persistent,
    /// Key expires after this long
    Expires(Duration),
}

/// JSON key/value store
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// Store a value, optionally expiring after `ttl`
    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<(), StoreError>;

    async fn del(&self, key: &str) -> Result<(), StoreError>;

    async fn ttl(&self, key: &str) -> Result<KeyTtl, StoreError>;
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

/// In-process store with per-key expiry
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live keys
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.read().values().filter(|e| e.is_live(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let now = Instant::now();
        Ok(self
            .entries
            .read()
            .get(key)
            .filter(|e| e.is_live(now))
            .map(|e| e.value.clone()))
    }

    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<(), StoreError> {
        let now = Instant::now();
        let entry = Entry {
            value,
            expires_at: ttl.map(|ttl| now + ttl),
        };
        let mut entries = self.entries.write();
        entries.retain(|_, e| e.is_live(now));
        entries.insert(key.to_string(), entry);
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<(), StoreError> {
        self.entries.write().remove(key);
        Ok(())
    }

    async fn ttl(&self, key: &str) -> Result<KeyTtl, StoreError> {
        let now = Instant::now();
        let entries = self.entries.read();
        Ok(match entries.get(key) {
            Some(e) if e.is_live(now) => match e.expires_at {
                Some(at) => KeyTtl::Expires(at - now),
                None => KeyTtl::Persistent,
            },
            _ => KeyTtl::Missing,
        })
    }
}

/// Store view limited to one function's keys
///
/// Keys are stored as `{function_id}:{key}`, with `\` and `:` in the id
/// escaped so the first unescaped `:` always ends the id.
#[derive(Clone)]
pub struct ScopedStore {
    inner: Arc<dyn KvStore>,
    prefix: String,
}

impl ScopedStore {
    pub fn new(inner: Arc<dyn KvStore>, function_id: &str) -> Self {
        Self {
            inner,
            prefix: format!("{}:", function_id.replace('\\', "\\\\").replace(':', "\\:")),
        }
    }

    fn key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    pub async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        self.inner.get(&self.key(key)).await
    }

    pub async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<(), StoreError> {
        self.inner.set(&self.key(key), value, ttl).await
    }

    pub async fn del(&self, key: &str) -> Result<(), StoreError> {
        self.inner.del(&self.key(key)).await
    }

    pub async fn ttl(&self, key: &str) -> Result<KeyTtl, StoreError> {
        self.inner.ttl(&self.key(key)).await
    }

    /// Get and deserialize a value
    pub async fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.get(key).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Serialize and store a value
    pub async fn set_as<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<(), StoreError> {
        let value = serde_json::to_value(value)?;
        self.set(key, value, ttl).await
    }
}

impl std::fmt::Debug for ScopedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedStore")
            .field("prefix", &self.prefix)
            .finish()
    }
}
