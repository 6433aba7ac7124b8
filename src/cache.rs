//! In-memory TTL cache for expensive aggregate results.
//!
//! Payloads are stored as opaque JSON values so that every result kind
//! (winning/losing sets, keyword summaries) shares one backend. Reads
//! after expiry are misses; registry mutations invalidate the summary key
//! explicitly, everything else ages out on TTL.

use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
};

use chrono::{DateTime, Duration, Utc};
use log::debug;
use serde_json::Value;

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    expires_at: DateTime<Utc>,
}

pub struct ResultCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl ResultCache {
    pub fn new(ttl_secs: i64) -> Self {
        Self {
            ttl: Duration::seconds(ttl_secs),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Cache key for a result kind scoped to a window length,
    /// e.g. `winning_keywords_30days`.
    pub fn key(kind: &str, days: i64) -> String {
        format!("{kind}_{days}days")
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        let mut entries = self.lock();
        match entries.get(key) {
            Some(entry) if entry.expires_at > Utc::now() => {
                debug!("cache hit for {key}");
                Some(entry.value.clone())
            }
            Some(_) => {
                debug!("cache entry {key} expired");
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn set(&self, key: &str, value: Value) {
        let entry = CacheEntry {
            value,
            expires_at: Utc::now() + self.ttl,
        };
        self.lock().insert(key.to_string(), entry);
    }

    pub fn invalidate(&self, key: &str) {
        if self.lock().remove(key).is_some() {
            debug!("invalidated cache entry {key}");
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, CacheEntry>> {
        // A poisoned lock degrades to whatever state the map was left in;
        // stale or missing entries only cost a recomputation.
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
