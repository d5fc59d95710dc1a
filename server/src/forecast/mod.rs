pub mod cache;
pub mod mock;
pub mod types;
pub mod weatherapi;

use crate::config::Config;
use cache::{Clock, ForecastCache, SystemClock};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use types::ForecastResult;
use weatherapi::{WeatherApiClient, WeatherApiError};

/// Per-call options for [`ForecastClient::fetch_forecast`].
#[derive(Clone, Copy, Debug, Default)]
pub struct FetchOptions {
    /// Maximum age of a cached entry that may be served. `None` uses the client default.
    pub expire_time: Option<Duration>,
}

impl FetchOptions {
    pub fn expire_after(expire_time: Duration) -> Self {
        Self {
            expire_time: Some(expire_time),
        }
    }

    pub fn expire_after_millis(millis: u64) -> Self {
        Self::expire_after(Duration::from_millis(millis))
    }
}

/// Fetches forecasts by place name, serving repeat queries from an in-memory
/// cache while they are younger than the expiry window.
#[derive(Debug)]
pub struct ForecastClient {
    api: WeatherApiClient,
    cache: ForecastCache,
    default_expire_time: Duration,
    single_flight: bool,
    gates: GateMap,
}

impl ForecastClient {
    pub fn new(config: &Config) -> Result<Self, WeatherApiError> {
        let api = WeatherApiClient::new(config)?;
        let cache = ForecastCache::new(config.cache_max_entries, Arc::new(SystemClock));
        Ok(Self::with_parts(api, cache, config))
    }

    /// Assemble a client from an existing transport and cache. The expiry
    /// default and single-flight switch come from `config`.
    pub fn with_parts(api: WeatherApiClient, cache: ForecastCache, config: &Config) -> Self {
        Self {
            api,
            cache,
            default_expire_time: Duration::from_millis(config.forecast_expire_ms),
            single_flight: config.single_flight,
            gates: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_default_expire_time(mut self, expire_time: Duration) -> Self {
        self.default_expire_time = expire_time;
        self
    }

    pub fn with_single_flight(mut self, enabled: bool) -> Self {
        self.single_flight = enabled;
        self
    }

    /// Client against `base_url` with default settings, whose cache runs on `clock`.
    pub fn with_clock(
        base_url: &str,
        api_key: &str,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, WeatherApiError> {
        let config = Config::default();
        let api = WeatherApiClient::with_base_url(
            base_url,
            api_key,
            Duration::from_secs(config.request_timeout_secs),
        )?;
        Ok(Self::with_parts(api, ForecastCache::new(None, clock), &config))
    }

    pub fn cache(&self) -> &ForecastCache {
        &self.cache
    }

    pub fn default_expire_time(&self) -> Duration {
        self.default_expire_time
    }

    pub fn single_flight(&self) -> bool {
        self.single_flight
    }

    /// Return the forecast for `place`, from cache when an entry younger than
    /// the expiry window exists, otherwise from one upstream request.
    ///
    /// On failure the error is returned unchanged and the cache is left as it was;
    /// a stale entry is never served as a fallback.
    pub async fn fetch_forecast(
        &self,
        place: &str,
        options: FetchOptions,
    ) -> Result<Arc<ForecastResult>, WeatherApiError> {
        let expire_time = options.expire_time.unwrap_or(self.default_expire_time);

        if let Some(data) = self.cache.get_fresh(place, expire_time).await {
            tracing::debug!(place, "Forecast cache hit");
            return Ok(data);
        }

        if self.single_flight {
            self.fetch_single_flight(place, expire_time).await
        } else {
            self.fetch_and_store(place).await
        }
    }

    async fn fetch_single_flight(
        &self,
        place: &str,
        expire_time: Duration,
    ) -> Result<Arc<ForecastResult>, WeatherApiError> {
        // Declared before the guard so the lock is released first, including on cancellation.
        let lease = self.lease_gate(place);
        let _guard = lease.gate.lock().await;

        // Another caller may have filled the cache while we waited.
        match self.cache.get_fresh(place, expire_time).await {
            Some(data) => {
                tracing::debug!(place, "Forecast cache hit after waiting on in-flight request");
                Ok(data)
            }
            None => self.fetch_and_store(place).await,
        }
    }

    async fn fetch_and_store(&self, place: &str) -> Result<Arc<ForecastResult>, WeatherApiError> {
        tracing::info!(place, "Fetching forecast from weather API");

        let data = Arc::new(self.api.get_forecast(place).await?);
        let entry = self.cache.insert(place, data.clone()).await;

        tracing::info!(
            place,
            fetched_at_ms = entry.fetched_at_millis,
            "Cached forecast"
        );
        Ok(data)
    }

    fn lease_gate(&self, place: &str) -> GateLease<'_> {
        let mut gates = self.gates.lock().unwrap_or_else(PoisonError::into_inner);
        let gate = gates.entry(place.to_string()).or_default().clone();
        GateLease {
            gates: &self.gates,
            place: place.to_string(),
            gate,
        }
    }

    #[cfg(test)]
    fn pending_gates(&self) -> usize {
        self.gates.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

type GateMap = Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>;

/// A caller's hold on a per-place gate. Dropping it removes the gate from the
/// map once no other caller holds or waits on it.
struct GateLease<'a> {
    gates: &'a GateMap,
    place: String,
    gate: Arc<tokio::sync::Mutex<()>>,
}

impl Drop for GateLease<'_> {
    fn drop(&mut self) {
        let mut gates = self.gates.lock().unwrap_or_else(PoisonError::into_inner);
        // Only the map and this lease hold it: nobody is waiting.
        if Arc::strong_count(&self.gate) <= 2 {
            gates.remove(&self.place);
        }
    }
}
