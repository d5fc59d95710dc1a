use serde::{Deserialize, Serialize};
use std::env;

pub const DEFAULT_BASE_URL: &str = "http://api.weatherapi.com/v1/";
pub const DEFAULT_EXPIRE_MS: u64 = 10 * 60 * 1000;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    pub weather_api_key: String,
    pub weather_api_base_url: String,
    pub forecast_expire_ms: u64,
    pub cache_max_entries: Option<u64>,
    pub single_flight: bool,
    pub request_timeout_secs: u64,
    pub bind_addr: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            weather_api_key: String::new(),
            weather_api_base_url: DEFAULT_BASE_URL.to_string(),
            forecast_expire_ms: DEFAULT_EXPIRE_MS,
            cache_max_entries: None,
            single_flight: false,
            request_timeout_secs: 30,
            bind_addr: "0.0.0.0:8080".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build a config from any variable source; unset variables take their defaults.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let weather_api_key = lookup("WEATHER_API_KEY").unwrap_or_default();
        if weather_api_key.is_empty() {
            tracing::warn!("WEATHER_API_KEY not set, upstream requests will be rejected");
        }

        Ok(Config {
            weather_api_key,
            weather_api_base_url: lookup("WEATHER_API_BASE_URL")
                .unwrap_or(defaults.weather_api_base_url),
            forecast_expire_ms: parse_var(&lookup, "FORECAST_EXPIRE_MS")?
                .unwrap_or(defaults.forecast_expire_ms),
            cache_max_entries: parse_var(&lookup, "FORECAST_CACHE_MAX_ENTRIES")?,
            single_flight: parse_var(&lookup, "FORECAST_SINGLE_FLIGHT")?
                .unwrap_or(defaults.single_flight),
            request_timeout_secs: parse_var(&lookup, "WEATHER_API_TIMEOUT_SECS")?
                .unwrap_or(defaults.request_timeout_secs),
            bind_addr: lookup("BIND_ADDR").unwrap_or(defaults.bind_addr),
        })
    }
}

fn parse_var<F, T>(lookup: &F, name: &str) -> anyhow::Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("{} has invalid value {:?}: {}", name, raw, e)),
        None => Ok(None),
    }
}
