/// Plan cache for resolved result mappings
///
/// Building a mapping walks the domain model and resolves every column; the
/// result only depends on the model, the SQL text and the mapping's builder
/// structure. This module keeps an LRU cache of resolved plans so repeated
/// executions of the same query reuse them.
///
/// # Architecture
///
/// Cache Key: (model_name, normalized_sql, cache-key copy of the mapping)
/// Cache Value: the resolved `JdbcValuesMapping`
///
/// Structurally equal mappings built independently produce equal keys, so a
/// caller rebuilding its mapping per execution still hits the cache. Failed
/// builds are never stored.
///
/// # Configuration
///
/// Environment variables:
/// - `RESULTGRAPH_PLAN_CACHE_ENABLED` (default: true)
/// - `RESULTGRAPH_PLAN_CACHE_MAX_ENTRIES` (default: 256)
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::config::EngineConfig;
use crate::results::builders::CacheKeyCopy;
use crate::results::errors::MappingError;
use crate::results::mapping::{JdbcValuesMapping, ResultSetMapping};

/// Key for cache lookup
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlanCacheKey {
    pub model_name: String,
    /// SQL with whitespace collapsed
    pub normalized_sql: String,
    /// Detached copy of the caller's mapping
    pub mapping: ResultSetMapping,
}

impl PlanCacheKey {
    pub fn new(model_name: &str, sql: &str, mapping: &ResultSetMapping) -> Self {
        let normalized = sql.split_whitespace().collect::<Vec<&str>>().join(" ");
        PlanCacheKey {
            model_name: model_name.to_string(),
            normalized_sql: normalized,
            mapping: mapping.cache_key_copy(),
        }
    }

    /// Stable hex digest of the key, for logs and diagnostics
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.model_name.as_bytes());
        hasher.update([0u8]);
        hasher.update(self.normalized_sql.as_bytes());
        hasher.update([0u8]);
        hasher.update(mapping_bytes(&self.mapping));
        hex::encode(hasher.finalize())
    }
}

/// Serialized form of a mapping for hashing. Falls back to the debug
/// rendering when serialization fails so distinct keys keep distinct digests.
fn mapping_bytes<M: Serialize + fmt::Debug>(mapping: &M) -> Vec<u8> {
    match serde_json::to_vec(mapping) {
        Ok(bytes) => bytes,
        Err(e) => {
            log::warn!("Plan cache key serialization failed, hashing debug form: {}", e);
            format!("{:?}", mapping).into_bytes()
        }
    }
}

/// Cached entry with metadata
#[derive(Debug, Clone)]
struct CacheEntry {
    plan: Arc<JdbcValuesMapping>,
    /// Logical clock value of the last access (for LRU)
    last_accessed: u64,
    access_count: u64,
}

/// Configuration for the plan cache
#[derive(Debug, Clone)]
pub struct PlanCacheConfig {
    pub enabled: bool,
    /// Maximum number of entries (LRU eviction)
    pub max_entries: usize,
}

impl Default for PlanCacheConfig {
    fn default() -> Self {
        PlanCacheConfig {
            enabled: true,
            max_entries: 256,
        }
    }
}

impl PlanCacheConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let enabled = std::env::var("RESULTGRAPH_PLAN_CACHE_ENABLED")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(true);

        let max_entries = std::env::var("RESULTGRAPH_PLAN_CACHE_MAX_ENTRIES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(256);

        PlanCacheConfig {
            enabled,
            max_entries,
        }
    }
}

impl From<&EngineConfig> for PlanCacheConfig {
    fn from(config: &EngineConfig) -> Self {
        PlanCacheConfig {
            enabled: config.plan_cache_enabled,
            max_entries: config.plan_cache_max_entries,
        }
    }
}

/// Plan cache with LRU eviction
pub struct PlanCache {
    cache: Mutex<HashMap<PlanCacheKey, CacheEntry>>,
    config: PlanCacheConfig,
    clock: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl PlanCache {
    pub fn new(config: PlanCacheConfig) -> Self {
        PlanCache {
            cache: Mutex::new(HashMap::new()),
            config,
            clock: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(PlanCacheConfig::default())
    }

    pub fn from_env() -> Self {
        Self::new(PlanCacheConfig::from_env())
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PlanCacheKey, CacheEntry>> {
        // Entries are plain data; a panic elsewhere cannot leave one half-written
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Get a plan from the cache
    pub fn get(&self, key: &PlanCacheKey) -> Option<Arc<JdbcValuesMapping>> {
        if !self.config.enabled {
            return None;
        }

        let now = self.tick();
        let mut cache = self.lock();
        if let Some(entry) = cache.get_mut(key) {
            entry.last_accessed = now;
            entry.access_count += 1;
            self.hits.fetch_add(1, Ordering::Relaxed);
            log::debug!(
                "Plan cache hit for {} (accessed {} times)",
                key.fingerprint(),
                entry.access_count
            );
            Some(entry.plan.clone())
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            None
        }
    }

    /// Insert a plan, evicting the least recently used entry when full
    pub fn insert(&self, key: PlanCacheKey, plan: Arc<JdbcValuesMapping>) {
        if !self.config.enabled || self.config.max_entries == 0 {
            return;
        }

        let entry = CacheEntry {
            plan,
            last_accessed: self.tick(),
            access_count: 0,
        };
        let mut cache = self.lock();
        if !cache.contains_key(&key) && cache.len() >= self.config.max_entries {
            self.evict_lru(&mut cache);
        }
        cache.insert(key, entry);
    }

    /// Return the cached plan for `key`, or build, store and return it.
    /// A failed build leaves the cache untouched.
    pub fn get_or_build<F>(
        &self,
        key: PlanCacheKey,
        build: F,
    ) -> Result<Arc<JdbcValuesMapping>, MappingError>
    where
        F: FnOnce() -> Result<JdbcValuesMapping, MappingError>,
    {
        if let Some(plan) = self.get(&key) {
            return Ok(plan);
        }
        log::debug!("Plan cache miss for {}, building", key.fingerprint());
        let plan = Arc::new(build()?);
        self.insert(key, plan.clone());
        Ok(plan)
    }

    fn evict_lru(&self, cache: &mut HashMap<PlanCacheKey, CacheEntry>) {
        if let Some((key, _)) = cache.iter().min_by_key(|(_, entry)| entry.last_accessed) {
            let key = key.clone();
            log::debug!("Evicting plan {}", key.fingerprint());
            cache.remove(&key);
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Drop every plan built against `model_name`; called when a model is
    /// reloaded.
    pub fn invalidate_model(&self, model_name: &str) {
        let mut cache = self.lock();
        let before = cache.len();
        cache.retain(|key, _| key.model_name != model_name);
        log::info!(
            "Invalidated {} cached plan(s) for model '{}'",
            before - cache.len(),
            model_name
        );
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn metrics(&self) -> CacheMetrics {
        let size = self.lock().len();
        CacheMetrics {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            size,
            max_entries: self.config.max_entries,
        }
    }
}

/// Cache metrics for monitoring
#[derive(Debug, Clone)]
pub struct CacheMetrics {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub size: usize,
    pub max_entries: usize,
}

impl CacheMetrics {
    /// Calculate cache hit rate (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Calculate entry utilization (0.0 to 1.0)
    pub fn entry_utilization(&self) -> f64 {
        if self.max_entries == 0 {
            0.0
        } else {
            self.size as f64 / self.max_entries as f64
        }
    }
}
