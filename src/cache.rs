// parking_lot::RwLock: no lock poisoning, and get() needs write access to refresh LRU order

use crate::config::CacheConfig;
use crate::types::Request;
use lru_time_cache::LruCache;
use parking_lot::RwLock;
use serde_json::Value;

/// Methods whose results are safe to serve from cache for a short while.
const CACHEABLE_METHODS: [&str; 2] = ["eth_chainId", "eth_blockNumber"];

/// LruCache with time-based expiration
pub struct Cache {
    store: RwLock<LruCache<String, Value>>,
}

impl Cache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            store: RwLock::new(LruCache::with_expiry_duration_and_capacity(
                config.ttl(),
                config.capacity,
            )),
        }
    }

    /// Cache key for a request, or `None` when its result must not be cached.
    pub fn key_for(request: &Request) -> Option<String> {
        if !CACHEABLE_METHODS.contains(&request.method.as_str()) {
            return None;
        }
        Some(format!(
            "{}:{}",
            request.method,
            Value::Array(request.params.clone())
        ))
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        let mut store = self.store.write();
        store.get(key).cloned()
    }

    pub fn put(&self, key: String, value: Value) {
        let mut store = self.store.write();
        store.insert(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn cache(ttl_ms: u64, capacity: usize) -> Cache {
        Cache::new(&CacheConfig { ttl_ms, capacity })
    }

    #[test]
    fn test_cache_put_and_get() {
        let cache = cache(60_000, 10);
        let key = "test_key".to_string();
        let value = serde_json::json!("0x1234");

        cache.put(key.clone(), value.clone());

        assert_eq!(cache.get(&key), Some(value));
    }

    #[test]
    fn test_cache_miss() {
        let cache = cache(60_000, 10);
        assert!(cache.get("invalid_key").is_none());
    }

    #[test]
    fn test_cache_expiry() {
        let cache = cache(50, 10);
        let key = "expired_key".to_string();

        cache.put(key.clone(), serde_json::json!(1));
        assert!(cache.get(&key).is_some());

        std::thread::sleep(Duration::from_millis(150));
        assert!(cache.get(&key).is_none());
    }

    #[test]
    fn test_cache_lru_eviction() {
        let cache = cache(60_000, 2);

        cache.put("key1".to_string(), serde_json::json!("value1"));
        cache.put("key2".to_string(), serde_json::json!("value2"));
        cache.put("key3".to_string(), serde_json::json!("value3"));

        assert!(cache.get("key1").is_none()); //Evicted
        assert!(cache.get("key2").is_some());
        assert!(cache.get("key3").is_some());
    }

    #[test]
    fn test_only_chain_state_methods_are_cacheable() {
        let key = Cache::key_for(&Request::new("eth_blockNumber", vec![]));
        assert_eq!(key.as_deref(), Some("eth_blockNumber:[]"));

        assert!(Cache::key_for(&Request::new("eth_chainId", vec![])).is_some());
        assert!(Cache::key_for(&Request::new("eth_getBalance", vec![])).is_none());
        assert!(Cache::key_for(&Request::new("eth_sendRawTransaction", vec![])).is_none());
    }
}
