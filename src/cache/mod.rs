// src/cache/mod.rs

// In-memory response cache shared by all translation tasks.
// Entries live for the whole session; there is no eviction and no TTL.
use dashmap::DashMap;
use tracing::trace;

/// Lookup key for a cached translation. Fields are compared verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub provider: String,
    pub text: String,
    pub source: String,
    pub target: String,
}

impl CacheKey {
    pub fn new(provider: &str, text: &str, source: &str, target: &str) -> Self {
        Self {
            provider: provider.to_string(),
            text: text.to_string(),
            source: source.to_string(),
            target: target.to_string(),
        }
    }
}

/// Thread-safe translation cache
#[derive(Debug, Default)]
pub struct ResponseCache {
    entries: DashMap<CacheKey, String>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    pub fn get(&self, provider: &str, text: &str, source: &str, target: &str) -> Option<String> {
        let key = CacheKey::new(provider, text, source, target);
        self.entries.get(&key).map(|entry| entry.value().clone())
    }

    /// Store a translation. The first value written for a key is kept;
    /// returns `false` when the key was already present.
    pub fn set(&self, provider: &str, text: &str, source: &str, target: &str, value: &str) -> bool {
        let key = CacheKey::new(provider, text, source, target);
        let mut stored = false;
        self.entries.entry(key).or_insert_with(|| {
            stored = true;
            value.to_string()
        });
        trace!(provider, source, target, stored, "Cache write");
        stored
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
