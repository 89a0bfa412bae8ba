use crate::memo::{CacheStats, LruCache};
use crate::sources::WeatherSource;
use crate::weather_data::error::WeatherDataError;
use crate::weather_data::key::WeatherKey;
use log::{debug, info};
use polars::prelude::DataFrame;
use tokio::sync::Mutex;

/// Memoizes weather tables per [`WeatherKey`] in a bounded LRU cache.
///
/// Failed loads are never cached: the next request for the same key calls the source again.
pub struct FrameFetcher<W> {
    source: W,
    frame_cache: Mutex<LruCache<WeatherKey, DataFrame>>,
}

impl<W: WeatherSource> FrameFetcher<W> {
    pub fn new(source: W, capacity: usize) -> Self {
        Self {
            source,
            frame_cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn source(&self) -> &W {
        &self.source
    }

    /// Returns the weather table for `key`, loading it through the source on a miss.
    ///
    /// Invalid keys are rejected with [`WeatherDataError::InvalidRequest`] before the cache
    /// or the source is consulted.
    pub async fn get_weather_frame(&self, key: &WeatherKey) -> Result<DataFrame, WeatherDataError> {
        key.validate().map_err(WeatherDataError::InvalidRequest)?;
        {
            let mut cache = self.frame_cache.lock().await;
            if let Some(frame) = cache.get(key) {
                debug!("Weather cache hit for {}", key);
                return Ok(frame.clone());
            }
        }

        // Loading happens outside the lock so other keys are not blocked.
        let loaded_frame = self.source.load(key).await?;

        let mut cache = self.frame_cache.lock().await;
        if let Some(frame) = cache.peek(key) {
            // A concurrent request for the same key finished first.
            return Ok(frame.clone());
        }
        if let Some(evicted) = cache.insert(key.clone(), loaded_frame.clone()) {
            info!("Evicted weather table for {} from memory", evicted);
        }
        Ok(loaded_frame)
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.frame_cache.lock().await.stats()
    }

    /// Drops every memoized table.
    pub async fn clear(&self) {
        self.frame_cache.lock().await.clear();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::types::department::DepartmentCode;
    use polars::df;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Weather source returning a fixed frame and counting its calls.
    pub(crate) struct CountingSource {
        pub(crate) calls: AtomicUsize,
        pub(crate) failures_left: AtomicUsize,
        pub(crate) frame: DataFrame,
    }

    impl CountingSource {
        pub(crate) fn with_frame(frame: DataFrame) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                failures_left: AtomicUsize::new(0),
                frame,
            }
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl WeatherSource for CountingSource {
        async fn load(&self, key: &WeatherKey) -> Result<DataFrame, WeatherDataError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let failing = self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if failing {
                return Err(WeatherDataError::MissingColumnError {
                    department: key.department.clone(),
                    column: "TN",
                });
            }
            Ok(self.frame.clone())
        }
    }

    fn key(department: &str) -> WeatherKey {
        WeatherKey::new(DepartmentCode::new(department), 1991, 2020, 0.9)
    }

    fn frame() -> DataFrame {
        df!("station_id" => [74056001i64]).unwrap()
    }

    #[tokio::test]
    async fn test_same_key_loads_once() -> Result<(), WeatherDataError> {
        let fetcher = FrameFetcher::new(CountingSource::with_frame(frame()), 4);

        let first = fetcher.get_weather_frame(&key("74")).await?;
        let second = fetcher.get_weather_frame(&key("74")).await?;

        assert_eq!(fetcher.source().calls(), 1);
        assert!(first.equals(&second));
        let stats = fetcher.cache_stats().await;
        assert_eq!((stats.hits, stats.misses, stats.size), (1, 1, 1));
        Ok(())
    }

    #[tokio::test]
    async fn test_different_threshold_is_a_different_entry() -> Result<(), WeatherDataError> {
        let fetcher = FrameFetcher::new(CountingSource::with_frame(frame()), 4);

        fetcher.get_weather_frame(&key("74")).await?;
        let stricter = WeatherKey::new(DepartmentCode::new("74"), 1991, 2020, 0.95);
        fetcher.get_weather_frame(&stricter).await?;

        assert_eq!(fetcher.source().calls(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_failure_is_not_cached() -> Result<(), WeatherDataError> {
        let source = CountingSource::with_frame(frame());
        source.failures_left.store(1, Ordering::SeqCst);
        let fetcher = FrameFetcher::new(source, 4);

        assert!(fetcher.get_weather_frame(&key("74")).await.is_err());
        fetcher.get_weather_frame(&key("74")).await?;

        assert_eq!(fetcher.source().calls(), 2);
        assert_eq!(fetcher.cache_stats().await.size, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_eviction_forces_reload() -> Result<(), WeatherDataError> {
        let fetcher = FrameFetcher::new(CountingSource::with_frame(frame()), 1);

        fetcher.get_weather_frame(&key("74")).await?;
        fetcher.get_weather_frame(&key("73")).await?;
        fetcher.get_weather_frame(&key("74")).await?;

        assert_eq!(fetcher.source().calls(), 3);
        assert_eq!(fetcher.cache_stats().await.evictions, 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_clear_forces_reload() -> Result<(), WeatherDataError> {
        let fetcher = FrameFetcher::new(CountingSource::with_frame(frame()), 2);

        fetcher.get_weather_frame(&key("74")).await?;
        fetcher.clear().await;
        fetcher.get_weather_frame(&key("74")).await?;

        assert_eq!(fetcher.source().calls(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_key_never_reaches_source() {
        let fetcher = FrameFetcher::new(CountingSource::with_frame(frame()), 2);
        let inverted = WeatherKey::new(DepartmentCode::new("74"), 2020, 1991, 0.9);
        let out_of_range = WeatherKey::new(DepartmentCode::new("74"), 1991, 2020, 1.5);

        for key in [inverted, out_of_range] {
            let result = fetcher.get_weather_frame(&key).await;
            assert!(matches!(result, Err(WeatherDataError::InvalidRequest(_))));
        }
        assert_eq!(fetcher.source().calls(), 0);
        let stats = fetcher.cache_stats().await;
        assert_eq!((stats.misses, stats.size), (0, 0));
    }
}
