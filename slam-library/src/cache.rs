//! In-memory cache of detection results keyed by source URL
//!
//! Owned by the caller. Entries expire after a fixed time-to-live; nothing is
//! shared between cache instances.

use parking_lot::Mutex;
use slam_analysis::{AnalysisError, DetectionResult};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::debug;

/// Default lifetime of a cached result (one hour)
pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone)]
struct Entry {
    result: DetectionResult,
    stored_at: Instant,
}

/// TTL cache for detection results
#[derive(Debug)]
pub struct AnalysisCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, Entry>>,
}

impl Default for AnalysisCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl AnalysisCache {
    /// Create an empty cache whose entries live for `ttl`
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached result for `key` if present and not expired
    pub fn get(&self, key: &str) -> Option<DetectionResult> {
        self.get_at(key, Instant::now())
    }

    /// `get` as seen at time `now`
    pub fn get_at(&self, key: &str, now: Instant) -> Option<DetectionResult> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if !self.is_expired(entry, now) => {
                debug!(key, "analysis cache hit");
                Some(entry.result.clone())
            }
            Some(_) => {
                debug!(key, "analysis cache entry expired");
                entries.remove(key);
                None
            }
            None => {
                debug!(key, "analysis cache miss");
                None
            }
        }
    }

    /// Store a result, replacing any previous entry for `key`
    pub fn insert(&self, key: impl Into<String>, result: DetectionResult) {
        self.insert_at(key, result, Instant::now());
    }

    /// `insert` as if stored at time `now`
    pub fn insert_at(&self, key: impl Into<String>, result: DetectionResult, now: Instant) {
        self.entries.lock().insert(
            key.into(),
            Entry {
                result,
                stored_at: now,
            },
        );
    }

    /// Return the cached result or run `analyze` and cache its success
    ///
    /// The lock is not held while `analyze` runs, so two callers missing the
    /// same key may both compute; the later insert wins. Errors are returned
    /// without being cached.
    pub fn get_or_analyze<F>(&self, key: &str, analyze: F) -> Result<DetectionResult, AnalysisError>
    where
        F: FnOnce() -> Result<DetectionResult, AnalysisError>,
    {
        if let Some(hit) = self.get(key) {
            return Ok(hit);
        }
        let result = analyze()?;
        self.insert(key, result.clone());
        Ok(result)
    }

    /// Drop every expired entry, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Instant::now())
    }

    /// `purge_expired` as seen at time `now`
    pub fn purge_expired_at(&self, now: Instant) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| now.saturating_duration_since(entry.stored_at) < self.ttl);
        before - entries.len()
    }

    /// Number of stored entries, expired or not
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    fn is_expired(&self, entry: &Entry, now: Instant) -> bool {
        now.saturating_duration_since(entry.stored_at) >= self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slam_analysis::InputProblem;
    use std::cell::Cell;

    fn result(bpm: f32) -> DetectionResult {
        DetectionResult {
            bpm,
            bpm_confidence: 95,
            bpm_candidates: Vec::new(),
            bpm_adjusted: false,
            original_bpm: None,
            key: None,
            key_confidence: 0,
            key_candidates: Vec::new(),
            needs_verification: false,
            verification_reason: None,
            detection_time_ms: 12,
        }
    }

    #[test]
    fn test_insert_and_get() {
        let cache = AnalysisCache::default();
        cache.insert("https://cdn.example/track.mp3", result(128.0));
        let hit = cache.get("https://cdn.example/track.mp3").unwrap();
        assert_eq!(hit.bpm, 128.0);
        assert!(cache.get("https://cdn.example/other.mp3").is_none());
    }

    #[test]
    fn test_entries_expire() {
        let cache = AnalysisCache::new(Duration::from_secs(60));
        let t0 = Instant::now();
        cache.insert_at("a", result(120.0), t0);

        assert!(cache.get_at("a", t0 + Duration::from_secs(59)).is_some());
        assert!(cache.get_at("a", t0 + Duration::from_secs(60)).is_none());
        // Expired entries are dropped on read
        assert!(cache.is_empty());
    }

    #[test]
    fn test_purge_expired() {
        let cache = AnalysisCache::new(Duration::from_secs(10));
        let t0 = Instant::now();
        cache.insert_at("old", result(120.0), t0);
        cache.insert_at("new", result(124.0), t0 + Duration::from_secs(8));

        assert_eq!(cache.purge_expired_at(t0 + Duration::from_secs(12)), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get_at("new", t0 + Duration::from_secs(12)).is_some());
    }

    #[test]
    fn test_get_or_analyze_computes_once() {
        let cache = AnalysisCache::default();
        let calls = Cell::new(0);

        for _ in 0..3 {
            let res = cache
                .get_or_analyze("track", || {
                    calls.set(calls.get() + 1);
                    Ok(result(174.0))
                })
                .unwrap();
            assert_eq!(res.bpm, 174.0);
        }
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_errors_are_not_cached() {
        let cache = AnalysisCache::default();
        let err = cache
            .get_or_analyze("broken", || Err(InputProblem::EmptyBuffer.into()))
            .unwrap_err();
        assert_eq!(err, AnalysisError::InvalidInput(InputProblem::EmptyBuffer));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_instances_are_isolated() {
        let a = AnalysisCache::default();
        let b = AnalysisCache::default();
        a.insert("shared-url", result(100.0));
        assert!(b.get("shared-url").is_none());
        a.clear();
        assert!(a.is_empty());
    }
}
