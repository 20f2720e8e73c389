//! Explicit report cache.
//!
//! Cross-run caching is an injected collaborator, never ambient state
//! inside the core. The surrounding layer constructs one [`ReportCache`]
//! and hands it to the orchestrator.

use crate::report::AnalysisReport;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

struct Entry {
    report: AnalysisReport,
    inserted: Instant,
}

/// Bounded TTL cache for recent analysis reports.
pub struct ReportCache {
    entries: Mutex<HashMap<String, Entry>>,
    capacity: usize,
    ttl: Duration,
}

impl ReportCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity,
            ttl,
        }
    }

    /// Fetch a non-expired report; expired entries are dropped on access.
    pub fn get(&self, key: &str) -> Option<AnalysisReport> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if entry.inserted.elapsed() < self.ttl => Some(entry.report.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Insert a report, evicting expired entries first and the oldest
    /// entry when at capacity.
    pub fn insert(&self, key: impl Into<String>, report: AnalysisReport) {
        let mut entries = self.entries.lock();
        entries.retain(|_, e| e.inserted.elapsed() < self.ttl);
        if entries.len() >= self.capacity {
            let oldest = entries
                .iter()
                .min_by_key(|(_, e)| e.inserted)
                .map(|(k, _)| k.clone());
            if let Some(k) = oldest {
                entries.remove(&k);
            }
        }
        entries.insert(
            key.into(),
            Entry {
                report,
                inserted: Instant::now(),
            },
        );
    }

    /// Drop every expired entry.
    pub fn purge_expired(&self) {
        self.entries.lock().retain(|_, e| e.inserted.elapsed() < self.ttl);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize;
    use serde_json::json;

    fn report() -> AnalysisReport {
        normalize::normalize(&json!({"overallScore": 88.0}))
    }

    #[test]
    fn get_returns_fresh_entries() {
        let cache = ReportCache::new(4, Duration::from_secs(60));
        cache.insert("scenario-1", report());
        assert!(cache.get("scenario-1").is_some());
        assert!(cache.get("scenario-2").is_none());
    }

    #[test]
    fn expired_entries_are_dropped() {
        let cache = ReportCache::new(4, Duration::from_millis(0));
        cache.insert("scenario-1", report());
        assert!(cache.get("scenario-1").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn capacity_evicts_oldest() {
        let cache = ReportCache::new(2, Duration::from_secs(60));
        cache.insert("a", report());
        std::thread::sleep(Duration::from_millis(5));
        cache.insert("b", report());
        std::thread::sleep(Duration::from_millis(5));
        cache.insert("c", report());
        assert_eq!(cache.len(), 2);
        assert!(cache.get("a").is_none());
        assert!(cache.get("c").is_some());
    }
}
