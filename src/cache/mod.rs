//! Bounded response cache keyed by request fingerprint.
//!
//! Least-recently-used eviction, one entry per fingerprint, and a wholesale
//! clear when the calendar day changes.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

/// Stable hash of a normalized outbound request (lowercase hex SHA-256).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Hash the canonical request text.
    ///
    /// ```
    /// use helpdesk::cache::Fingerprint;
    ///
    /// let a = Fingerprint::of("model\nprompt");
    /// assert_eq!(a, Fingerprint::of("model\nprompt"));
    /// assert_ne!(a, Fingerprint::of("model\nprompt "));
    /// assert_eq!(a.as_str().len(), 64);
    /// ```
    pub fn of(canonical: &str) -> Self {
        Self(hex::encode(Sha256::digest(canonical.as_bytes())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex characters, for logs.
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A cached model response.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub response: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct CacheInner {
    entries: HashMap<Fingerprint, CacheEntry>,
    /// Front is least recently used
    order: VecDeque<Fingerprint>,
    day: Option<NaiveDate>,
}

impl CacheInner {
    fn touch(&mut self, fingerprint: &Fingerprint) {
        if let Some(pos) = self.order.iter().position(|f| f == fingerprint) {
            if let Some(f) = self.order.remove(pos) {
                self.order.push_back(f);
            }
        }
    }
}

/// Capacity-bounded LRU store of model responses.
#[derive(Debug)]
pub struct ResponseCache {
    capacity: usize,
    inner: Mutex<CacheInner>,
}

impl ResponseCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(CacheInner::default()),
        }
    }

    /// Look up a response, refreshing its recency on hit.
    pub fn get(&self, fingerprint: &Fingerprint) -> Option<String> {
        let mut inner = self.lock();
        let response = inner.entries.get(fingerprint)?.response.clone();
        inner.touch(fingerprint);
        Some(response)
    }

    /// Store a response.
    ///
    /// An existing fingerprint keeps its content and only moves to the most
    /// recently used position.
    pub fn put(&self, fingerprint: Fingerprint, response: String) {
        let mut inner = self.lock();
        if inner.entries.contains_key(&fingerprint) {
            inner.touch(&fingerprint);
            return;
        }

        while inner.entries.len() >= self.capacity {
            let Some(oldest) = inner.order.pop_front() else {
                break;
            };
            inner.entries.remove(&oldest);
            tracing::debug!(fingerprint = %oldest.short(), "cache entry evicted");
        }

        inner.order.push_back(fingerprint.clone());
        inner.entries.insert(
            fingerprint,
            CacheEntry {
                response,
                created_at: Utc::now(),
            },
        );
    }

    /// Align the cache with the quota day; clears everything on a change.
    ///
    /// Returns true when entries were dropped.
    pub fn sync_day(&self, day: NaiveDate) -> bool {
        let mut inner = self.lock();
        match inner.day {
            Some(current) if current == day => false,
            Some(_) => {
                let dropped = inner.entries.len();
                inner.entries.clear();
                inner.order.clear();
                inner.day = Some(day);
                tracing::info!(%day, dropped, "response cache cleared on day rollover");
                dropped > 0
            }
            None => {
                inner.day = Some(day);
                false
            }
        }
    }

    /// Entry metadata without touching recency.
    pub fn peek(&self, fingerprint: &Fingerprint) -> Option<CacheEntry> {
        self.lock().entries.get(fingerprint).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.order.clear();
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fp(s: &str) -> Fingerprint {
        Fingerprint::of(s)
    }

    #[test]
    fn test_capacity_one_evicts_previous() {
        let cache = ResponseCache::new(1);
        cache.put(fp("F1"), "one".to_string());
        cache.put(fp("F2"), "two".to_string());

        assert_eq!(cache.get(&fp("F1")), None);
        assert_eq!(cache.get(&fp("F2")), Some("two".to_string()));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_get_refreshes_recency() {
        let cache = ResponseCache::new(2);
        cache.put(fp("a"), "A".to_string());
        cache.put(fp("b"), "B".to_string());
        assert!(cache.get(&fp("a")).is_some());
        cache.put(fp("c"), "C".to_string());

        assert!(cache.get(&fp("a")).is_some());
        assert!(cache.get(&fp("b")).is_none());
        assert!(cache.get(&fp("c")).is_some());
    }

    #[test]
    fn test_put_existing_keeps_content_refreshes_recency() {
        let cache = ResponseCache::new(2);
        cache.put(fp("a"), "first".to_string());
        cache.put(fp("b"), "B".to_string());
        cache.put(fp("a"), "second".to_string());
        cache.put(fp("c"), "C".to_string());

        assert_eq!(cache.get(&fp("a")), Some("first".to_string()));
        assert!(cache.get(&fp("b")).is_none());
    }

    #[test]
    fn test_sync_day_clears_on_change_only() {
        let cache = ResponseCache::new(4);
        let d1 = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2025, 3, 2).unwrap();

        assert!(!cache.sync_day(d1));
        cache.put(fp("a"), "A".to_string());
        assert!(!cache.sync_day(d1));
        assert_eq!(cache.len(), 1);

        assert!(cache.sync_day(d2));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_peek_does_not_touch() {
        let cache = ResponseCache::new(2);
        cache.put(fp("a"), "A".to_string());
        cache.put(fp("b"), "B".to_string());
        assert_eq!(cache.peek(&fp("a")).unwrap().response, "A");
        cache.put(fp("c"), "C".to_string());
        assert!(cache.peek(&fp("a")).is_none());
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let cache = ResponseCache::new(0);
        assert_eq!(cache.capacity(), 1);
        cache.put(fp("a"), "A".to_string());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_fingerprint_short_prefix() {
        let f = fp("hello");
        assert_eq!(f.short().len(), 12);
        assert!(f.as_str().starts_with(f.short()));
        assert!(f.as_str().chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}
