//! In-memory forecast cache keyed by place name.

use super::types::ForecastResult;
use moka::future::Cache;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Source of the current time in epoch milliseconds.
pub trait Clock: Send + Sync + fmt::Debug {
    fn now_millis(&self) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// A fetched forecast and the time it was stored.
#[derive(Clone, Debug)]
pub struct CacheEntry {
    pub data: Arc<ForecastResult>,
    pub fetched_at_millis: i64,
}

impl CacheEntry {
    /// Age of the entry as seen at `now_millis`. A clock that went backwards yields zero.
    pub fn age_millis(&self, now_millis: i64) -> u64 {
        u64::try_from(now_millis.saturating_sub(self.fetched_at_millis)).unwrap_or(0)
    }

    pub fn is_fresh(&self, now_millis: i64, expire: Duration) -> bool {
        u128::from(self.age_millis(now_millis)) < expire.as_millis()
    }
}

/// Owned forecast cache. Keys are used verbatim: no case folding or trimming.
///
/// Entries never expire on their own; freshness is judged per lookup against
/// the caller's expiry window. With `max_entries` set, moka evicts by size.
#[derive(Clone, Debug)]
pub struct ForecastCache {
    inner: Cache<String, CacheEntry>,
    clock: Arc<dyn Clock>,
    max_entries: Option<u64>,
}

impl ForecastCache {
    pub fn new(max_entries: Option<u64>, clock: Arc<dyn Clock>) -> Self {
        let mut builder = Cache::builder();
        if let Some(max) = max_entries {
            builder = builder.max_capacity(max);
        }

        Self {
            inner: builder.build(),
            clock,
            max_entries,
        }
    }

    pub fn max_entries(&self) -> Option<u64> {
        self.max_entries
    }

    pub async fn get(&self, place: &str) -> Option<CacheEntry> {
        self.inner.get(place).await
    }

    /// Cached data for `place` if it was stored less than `expire` ago.
    pub async fn get_fresh(&self, place: &str, expire: Duration) -> Option<Arc<ForecastResult>> {
        let entry = self.inner.get(place).await?;
        let now = self.clock.now_millis();

        if entry.is_fresh(now, expire) {
            Some(entry.data)
        } else {
            tracing::debug!(
                place,
                age_ms = entry.age_millis(now),
                expire_ms = expire.as_millis() as u64,
                "Cached forecast is stale"
            );
            None
        }
    }

    /// Store `data` for `place`, stamped with the current time. Overwrites any previous entry.
    pub async fn insert(&self, place: &str, data: Arc<ForecastResult>) -> CacheEntry {
        let entry = CacheEntry {
            data,
            fetched_at_millis: self.clock.now_millis(),
        };
        self.inner.insert(place.to_string(), entry.clone()).await;
        entry
    }

    pub fn clear(&self) {
        self.inner.invalidate_all();
    }

    /// Number of live entries, after flushing moka's pending maintenance.
    pub async fn len(&self) -> u64 {
        self.inner.run_pending_tasks().await;
        self.inner.entry_count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::mock::{sample_forecast, ManualClock};

    fn cache_with_clock() -> (ForecastCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_000_000));
        (ForecastCache::new(None, clock.clone()), clock)
    }

    #[tokio::test]
    async fn test_insert_and_get_fresh() {
        let (cache, clock) = cache_with_clock();
        let data = Arc::new(sample_forecast("London"));

        let entry = cache.insert("London", data.clone()).await;
        assert_eq!(entry.fetched_at_millis, 1_000_000);

        clock.advance(Duration::from_secs(1));
        let hit = cache.get_fresh("London", Duration::from_secs(600)).await;
        assert!(Arc::ptr_eq(&hit.unwrap(), &data));
    }

    #[tokio::test]
    async fn test_entry_goes_stale_at_expiry() {
        let (cache, clock) = cache_with_clock();
        cache.insert("London", Arc::new(sample_forecast("London"))).await;

        clock.advance(Duration::from_millis(599_999));
        assert!(cache.get_fresh("London", Duration::from_secs(600)).await.is_some());

        clock.advance(Duration::from_millis(1));
        assert!(cache.get_fresh("London", Duration::from_secs(600)).await.is_none());
        // Stale entries stay in place until overwritten.
        assert!(cache.get("London").await.is_some());
    }

    #[tokio::test]
    async fn test_zero_expiry_never_hits() {
        let (cache, _clock) = cache_with_clock();
        cache.insert("London", Arc::new(sample_forecast("London"))).await;

        assert!(cache.get_fresh("London", Duration::ZERO).await.is_none());
    }

    #[tokio::test]
    async fn test_keys_are_verbatim() {
        let (cache, _clock) = cache_with_clock();
        cache.insert("Paris", Arc::new(sample_forecast("Paris"))).await;

        let expire = Duration::from_secs(600);
        assert!(cache.get_fresh("Paris", expire).await.is_some());
        assert!(cache.get_fresh("paris", expire).await.is_none());
        assert!(cache.get_fresh(" Paris", expire).await.is_none());
    }

    #[tokio::test]
    async fn test_insert_overwrites_timestamp() {
        let (cache, clock) = cache_with_clock();
        cache.insert("London", Arc::new(sample_forecast("London"))).await;

        clock.advance(Duration::from_secs(660));
        cache.insert("London", Arc::new(sample_forecast("London"))).await;

        let entry = cache.get("London").await.unwrap();
        assert_eq!(entry.fetched_at_millis, 1_660_000);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_clear() {
        let (cache, _clock) = cache_with_clock();
        cache.insert("London", Arc::new(sample_forecast("London"))).await;
        cache.insert("Paris", Arc::new(sample_forecast("Paris"))).await;
        assert_eq!(cache.len().await, 2);

        cache.clear();
        assert!(cache.get("London").await.is_none());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_max_entries_bounds_size() {
        let clock = Arc::new(ManualClock::new(0));
        let cache = ForecastCache::new(Some(2), clock);

        for place in ["A", "B", "C", "D", "E"] {
            cache.insert(place, Arc::new(sample_forecast(place))).await;
        }

        assert!(cache.len().await <= 2);
        assert_eq!(cache.max_entries(), Some(2));
    }

    #[test]
    fn test_age_with_clock_skew() {
        let entry = CacheEntry {
            data: Arc::new(sample_forecast("London")),
            fetched_at_millis: 5_000,
        };

        assert_eq!(entry.age_millis(4_000), 0);
        assert_eq!(entry.age_millis(6_500), 1_500);
        assert!(entry.is_fresh(4_000, Duration::from_millis(1)));
    }
}
