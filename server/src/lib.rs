//! Weather forecast lookup by place name, backed by the weatherapi.com
//! `forecast.json` endpoint and an in-memory expiring cache.

pub mod config;
pub mod forecast;
pub mod routes;
pub mod utils;

pub use config::Config;
pub use forecast::{FetchOptions, ForecastClient};
