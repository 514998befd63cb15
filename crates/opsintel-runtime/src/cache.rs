//! Response cache for the gateway.
//!
//! Identical prompts (and, for structured calls, identical schemas) within
//! the TTL reuse the earlier validated response instead of calling the
//! provider again. Only successful responses are cached.

use moka::future::Cache;
use serde_json::Value as JsonValue;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use crate::config::CacheConfig;

/// Hash of the prompt and, when present, the response schema.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    prompt_hash: u64,
    schema_hash: Option<u64>,
}

impl CacheKey {
    pub fn text(prompt: &str) -> Self {
        Self {
            prompt_hash: hash_str(prompt),
            schema_hash: None,
        }
    }

    pub fn structured(prompt: &str, schema: &JsonValue) -> Self {
        Self {
            prompt_hash: hash_str(prompt),
            schema_hash: Some(hash_str(&schema.to_string())),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum CachedResponse {
    Text(String),
    Structured(JsonValue),
}

pub struct ResponseCache {
    cache: Cache<CacheKey, CachedResponse>,
}

impl ResponseCache {
    pub fn new(max_entries: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();

        Self { cache }
    }

    /// A cache when enabled in config, otherwise `None`.
    pub fn from_config(config: &CacheConfig) -> Option<Self> {
        config
            .enabled
            .then(|| Self::new(config.max_entries, config.ttl))
    }

    pub async fn get(&self, key: &CacheKey) -> Option<CachedResponse> {
        self.cache.get(key).await
    }

    pub async fn insert(&self, key: CacheKey, response: CachedResponse) {
        self.cache.insert(key, response).await;
    }

    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }
}

fn hash_str(value: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hit_after_insert() {
        let cache = ResponseCache::new(10, Duration::from_secs(60));
        let key = CacheKey::text("Summarize loc-1");

        assert!(cache.get(&key).await.is_none());
        cache
            .insert(key, CachedResponse::Text("All good".to_string()))
            .await;
        assert_eq!(
            cache.get(&key).await,
            Some(CachedResponse::Text("All good".to_string()))
        );
    }

    #[test]
    fn test_schema_is_part_of_key() {
        let a = CacheKey::structured("p", &serde_json::json!({"type": "object"}));
        let b = CacheKey::structured("p", &serde_json::json!({"type": "array"}));
        assert_ne!(a, b);
        assert_ne!(a, CacheKey::text("p"));
    }

    #[test]
    fn test_disabled_by_default() {
        assert!(ResponseCache::from_config(&CacheConfig::default()).is_none());
    }
}
