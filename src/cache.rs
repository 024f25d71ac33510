//! Pull-through cache of the most recent successful row fetch.
//!
//! The refresh runs while the cache lock is held, so at most one fetch is
//! in flight and callers arriving during it wait and reuse its outcome.
//! Failures degrade to stale rows, then to the fallback source.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::analyzers::types::RawRow;
use crate::services::RowSource;

/// Where a snapshot's rows came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// Fetched by this call.
    Live,
    /// Served from a fresh cache entry.
    Cached,
    /// Upstream failed; an expired cache entry was served.
    Stale,
    /// Upstream unavailable and nothing cached; fallback rows.
    Synthetic,
}

#[derive(Debug, Clone)]
pub struct RowSnapshot {
    pub rows: Arc<Vec<RawRow>>,
    pub provenance: Provenance,
    pub fetched_at: Option<DateTime<Utc>>,
}

struct Entry {
    rows: Arc<Vec<RawRow>>,
    fetched: Instant,
    fetched_at: DateTime<Utc>,
}

#[derive(Default)]
struct CacheState {
    entry: Option<Entry>,
    last_failure: Option<Instant>,
}

pub struct RowCache {
    source: Option<Arc<dyn RowSource>>,
    fallback: Arc<dyn RowSource>,
    ttl: Duration,
    fetch_timeout: Duration,
    retry_after: Duration,
    state: Mutex<CacheState>,
}

impl RowCache {
    /// `source` is the live feed (if any); `fallback` supplies rows when it is unusable.
    pub fn new(
        source: Option<Arc<dyn RowSource>>,
        fallback: Arc<dyn RowSource>,
        ttl: Duration,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            source,
            fallback,
            ttl,
            fetch_timeout,
            retry_after: ttl.min(Duration::from_secs(30)),
            state: Mutex::new(CacheState::default()),
        }
    }

    /// Returns the current rows, refreshing from upstream when the entry has expired.
    pub async fn get(&self) -> RowSnapshot {
        let Some(source) = self.source.as_ref() else {
            return self.fallback_snapshot().await;
        };

        let mut state = self.state.lock().await;

        if let Some(entry) = state.entry.as_ref() {
            if entry.fetched.elapsed() < self.ttl {
                return RowSnapshot {
                    rows: entry.rows.clone(),
                    provenance: Provenance::Cached,
                    fetched_at: Some(entry.fetched_at),
                };
            }
        }

        let recently_failed = state
            .last_failure
            .is_some_and(|at| at.elapsed() < self.retry_after);

        if !recently_failed {
            let started = Instant::now();
            let outcome = tokio::time::timeout(self.fetch_timeout, source.fetch_rows()).await;
            let elapsed_ms = started.elapsed().as_millis() as u64;

            match outcome {
                Ok(Ok(rows)) if !rows.is_empty() => {
                    info!(
                        source = %source.describe(),
                        rows = rows.len(),
                        elapsed_ms,
                        "Row cache refreshed"
                    );
                    let entry = Entry {
                        rows: Arc::new(rows),
                        fetched: Instant::now(),
                        fetched_at: Utc::now(),
                    };
                    let snapshot = RowSnapshot {
                        rows: entry.rows.clone(),
                        provenance: Provenance::Live,
                        fetched_at: Some(entry.fetched_at),
                    };
                    state.entry = Some(entry);
                    state.last_failure = None;
                    return snapshot;
                }
                Ok(Ok(_)) => {
                    warn!(source = %source.describe(), elapsed_ms, "Row source returned no rows");
                }
                Ok(Err(e)) => {
                    warn!(source = %source.describe(), elapsed_ms, error = %e, "Row source fetch failed");
                }
                Err(_) => {
                    warn!(
                        source = %source.describe(),
                        timeout_ms = self.fetch_timeout.as_millis() as u64,
                        "Row source fetch timed out"
                    );
                }
            }
            state.last_failure = Some(Instant::now());
        } else {
            debug!("Skipping refresh after recent failure");
        }

        if let Some(entry) = state.entry.as_ref() {
            return RowSnapshot {
                rows: entry.rows.clone(),
                provenance: Provenance::Stale,
                fetched_at: Some(entry.fetched_at),
            };
        }

        drop(state);
        self.fallback_snapshot().await
    }

    /// Drops the cached entry and any failure backoff.
    pub async fn invalidate(&self) {
        let mut state = self.state.lock().await;
        *state = CacheState::default();
    }

    async fn fallback_snapshot(&self) -> RowSnapshot {
        let rows = match self.fallback.fetch_rows().await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(error = %e, "Fallback row source failed");
                Vec::new()
            }
        };

        RowSnapshot {
            rows: Arc::new(rows),
            provenance: Provenance::Synthetic,
            fetched_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Result, bail};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: Arc<AtomicUsize>,
        delay: Duration,
        fail: bool,
        empty: bool,
    }

    impl CountingSource {
        fn ok(calls: Arc<AtomicUsize>) -> Self {
            Self {
                calls,
                delay: Duration::from_millis(50),
                fail: false,
                empty: false,
            }
        }
    }

    #[async_trait]
    impl RowSource for CountingSource {
        async fn fetch_rows(&self) -> Result<Vec<RawRow>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if self.fail {
                bail!("upstream down");
            }
            if self.empty {
                return Ok(Vec::new());
            }
            Ok(vec![json!({"City": "Jeddah"}).as_object().cloned().unwrap()])
        }

        fn describe(&self) -> String {
            "counting".into()
        }
    }

    struct Fallback;

    #[async_trait]
    impl RowSource for Fallback {
        async fn fetch_rows(&self) -> Result<Vec<RawRow>> {
            Ok(vec![json!({"City": "Fallback"}).as_object().cloned().unwrap()])
        }

        fn describe(&self) -> String {
            "fallback".into()
        }
    }

    fn cache(source: CountingSource, ttl: Duration) -> RowCache {
        RowCache::new(
            Some(Arc::new(source)),
            Arc::new(Fallback),
            ttl,
            Duration::from_secs(1),
        )
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_fetch() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = Arc::new(cache(CountingSource::ok(calls.clone()), Duration::from_secs(60)));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.get().await })
            })
            .collect();

        let mut live = 0;
        for handle in handles {
            let snapshot = handle.await.unwrap();
            assert_eq!(snapshot.rows.len(), 1);
            if snapshot.provenance == Provenance::Live {
                live += 1;
            }
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(live, 1);
    }

    #[tokio::test]
    async fn test_fresh_entry_is_cached() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = cache(CountingSource::ok(calls.clone()), Duration::from_secs(60));

        assert_eq!(cache.get().await.provenance, Provenance::Live);
        assert_eq!(cache.get().await.provenance, Provenance::Cached);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        cache.invalidate().await;
        assert_eq!(cache.get().await.provenance, Provenance::Live);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failure_without_cache_uses_fallback() {
        let calls = Arc::new(AtomicUsize::new(0));
        let source = CountingSource {
            fail: true,
            ..CountingSource::ok(calls.clone())
        };
        let cache = cache(source, Duration::from_secs(60));

        let snapshot = cache.get().await;
        assert_eq!(snapshot.provenance, Provenance::Synthetic);
        assert_eq!(snapshot.rows[0]["City"], json!("Fallback"));

        // Backoff: the next caller reuses the failed outcome.
        cache.get().await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_result_uses_fallback() {
        let calls = Arc::new(AtomicUsize::new(0));
        let source = CountingSource {
            empty: true,
            ..CountingSource::ok(calls)
        };
        let snapshot = cache(source, Duration::from_secs(60)).get().await;
        assert_eq!(snapshot.provenance, Provenance::Synthetic);
    }

    #[tokio::test]
    async fn test_timeout_uses_fallback() {
        let calls = Arc::new(AtomicUsize::new(0));
        let source = CountingSource {
            delay: Duration::from_secs(5),
            ..CountingSource::ok(calls)
        };
        let cache = RowCache::new(
            Some(Arc::new(source)),
            Arc::new(Fallback),
            Duration::from_secs(60),
            Duration::from_millis(20),
        );
        assert_eq!(cache.get().await.provenance, Provenance::Synthetic);
    }

    #[tokio::test]
    async fn test_expired_entry_served_stale_on_failure() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = cache(CountingSource::ok(calls), Duration::ZERO);
        assert_eq!(cache.get().await.provenance, Provenance::Live);

        // Swap in a failing upstream by keeping the entry but replacing the source.
        let failing = RowCache {
            source: Some(Arc::new(CountingSource {
                fail: true,
                ..CountingSource::ok(Arc::new(AtomicUsize::new(0)))
            })),
            ..cache
        };
        let snapshot = failing.get().await;
        assert_eq!(snapshot.provenance, Provenance::Stale);
        assert_eq!(snapshot.rows[0]["City"], json!("Jeddah"));
    }

    #[tokio::test]
    async fn test_no_source_is_synthetic() {
        let cache = RowCache::new(None, Arc::new(Fallback), Duration::from_secs(60), Duration::from_secs(1));
        assert_eq!(cache.get().await.provenance, Provenance::Synthetic);
    }
}
