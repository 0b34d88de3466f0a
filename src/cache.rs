//! GET response cache
//!
//! The executor only depends on the [`GetCache`] contract: look a URL up,
//! store a body with an expiry. [`MemoryCache`] is the bundled implementation,
//! a bounded in-memory map safe for concurrent use from many executors.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

/// Expiry applied when nobody configures one
pub const DEFAULT_EXPIRY: Duration = Duration::from_secs(60);

/// Key/value store for GET string responses, keyed by full request URL
///
/// Implementations must tolerate uncoordinated concurrent reads and writes.
pub trait GetCache: Send + Sync {
    /// Cached body for `url`, if present and not yet expired
    fn get(&self, url: &str) -> Option<String>;

    /// Store `body` for `url`, valid for `expiry` from now
    fn put(&self, url: &str, body: String, expiry: Duration);
}

#[derive(Debug)]
struct CacheEntry {
    body: String,
    /// `None` when the expiry does not fit in an `Instant`; such entries never expire
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

/// Bounded in-memory [`GetCache`]
///
/// When full, expired entries are dropped first, then the entry closest to
/// expiry.
#[derive(Debug)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    max_entries: usize,
}

impl MemoryCache {
    /// Create a cache holding at most `max_entries` bodies
    #[must_use]
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            max_entries: max_entries.max(1),
        }
    }

    /// Process-wide shared cache, the default for every [`HttpClient`](crate::HttpClient)
    ///
    /// `max_entries` only applies to the call that creates it.
    pub fn global(max_entries: usize) -> Arc<MemoryCache> {
        static GLOBAL: OnceLock<Arc<MemoryCache>> = OnceLock::new();
        GLOBAL
            .get_or_init(|| Arc::new(MemoryCache::new(max_entries)))
            .clone()
    }

    /// Number of stored entries, expired ones included
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Remove every entry
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Remove the entry for `url`
    pub fn remove(&self, url: &str) {
        self.entries.lock().remove(url);
    }

    fn get_at(&self, url: &str, now: Instant) -> Option<String> {
        let mut entries = self.entries.lock();
        match entries.get(url) {
            Some(entry) if entry.is_live(now) => Some(entry.body.clone()),
            Some(_) => {
                entries.remove(url);
                None
            }
            None => None,
        }
    }

    fn put_at(&self, url: &str, body: String, expiry: Duration, now: Instant) {
        let mut entries = self.entries.lock();

        if !entries.contains_key(url) && entries.len() >= self.max_entries {
            entries.retain(|_, entry| entry.is_live(now));

            if entries.len() >= self.max_entries
                && let Some(oldest) = entries
                    .iter()
                    .min_by_key(|(_, entry)| (entry.expires_at.is_none(), entry.expires_at))
                    .map(|(key, _)| key.clone())
            {
                entries.remove(&oldest);
            }
        }

        entries.insert(
            url.to_string(),
            CacheEntry {
                body,
                expires_at: now.checked_add(expiry),
            },
        );
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(256)
    }
}

impl GetCache for MemoryCache {
    fn get(&self, url: &str) -> Option<String> {
        self.get_at(url, Instant::now())
    }

    fn put(&self, url: &str, body: String, expiry: Duration) {
        self.put_at(url, body, expiry, Instant::now());
    }
}
