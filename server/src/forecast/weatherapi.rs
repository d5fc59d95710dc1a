use super::types::ForecastResult;
use crate::config::Config;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Upstream error code for "No matching location found."
pub const NO_MATCHING_LOCATION: i64 = 1006;

#[derive(Error, Debug)]
pub enum WeatherApiError {
    /// Transport failure. The request URL is stripped since it carries the API key.
    #[error("HTTP request failed: {0}")]
    RequestFailed(reqwest::Error),
    #[error("JSON parsing failed: {0}")]
    JsonParsing(#[from] serde_json::Error),
    #[error("API error (HTTP {status}): {message}")]
    ApiError {
        status: u16,
        code: Option<i64>,
        message: String,
        /// Raw response body as sent by upstream.
        body: String,
    },
    #[error("Invalid forecast payload: {0}")]
    InvalidPayload(String),
    #[error("Failed to create HTTP client: {0}")]
    ClientBuild(reqwest::Error),
}

impl WeatherApiError {
    pub fn request_failed(error: reqwest::Error) -> Self {
        Self::RequestFailed(error.without_url())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ApiError {
                code: Some(NO_MATCHING_LOCATION),
                ..
            }
        )
    }

    pub fn is_auth_error(&self) -> bool {
        matches!(self, Self::ApiError { status: 401 | 403, .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::RequestFailed(e) if e.is_timeout())
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    code: Option<i64>,
    message: String,
}

/// Thin client for the weatherapi.com `forecast.json` endpoint.
#[derive(Clone)]
pub struct WeatherApiClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl std::fmt::Debug for WeatherApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherApiClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl WeatherApiClient {
    pub fn new(config: &Config) -> Result<Self, WeatherApiError> {
        Self::with_base_url(
            &config.weather_api_base_url,
            &config.weather_api_key,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn with_base_url(
        base_url: &str,
        api_key: &str,
        timeout: Duration,
    ) -> Result<Self, WeatherApiError> {
        let client = Client::builder()
            .user_agent("WeatherForecastServer/1.0")
            .timeout(timeout)
            .build()
            .map_err(WeatherApiError::ClientBuild)?;

        let mut base_url = base_url.to_string();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        Ok(Self {
            client,
            base_url,
            api_key: api_key.to_string(),
        })
    }

    /// `<base>forecast.json?key=<key>&q=<place>`, both values percent-encoded.
    pub fn forecast_url(&self, place: &str) -> String {
        format!(
            "{}forecast.json?key={}&q={}",
            self.base_url,
            urlencoding::encode(&self.api_key),
            urlencoding::encode(place)
        )
    }

    /// Issue exactly one request for `place`. No retries; the place string is
    /// forwarded without local validation.
    pub async fn get_forecast(&self, place: &str) -> Result<ForecastResult, WeatherApiError> {
        let response = self
            .client
            .get(self.forecast_url(place))
            .send()
            .await
            .map_err(WeatherApiError::request_failed)?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let error = Self::classify_error(status.as_u16(), &body);
            tracing::warn!(place, status = status.as_u16(), "Weather API rejected request: {}", error);
            return Err(error);
        }

        let body = response
            .text()
            .await
            .map_err(WeatherApiError::request_failed)?;
        let forecast: ForecastResult = serde_json::from_str(&body)?;
        forecast.validate().map_err(WeatherApiError::InvalidPayload)?;

        Ok(forecast)
    }

    fn classify_error(status: u16, body: &str) -> WeatherApiError {
        match serde_json::from_str::<ApiErrorBody>(body) {
            Ok(parsed) => WeatherApiError::ApiError {
                status,
                code: parsed.error.code,
                message: parsed.error.message,
                body: body.to_string(),
            },
            Err(_) => WeatherApiError::ApiError {
                status,
                code: None,
                message: body.to_string(),
                body: body.to_string(),
            },
        }
    }
}
