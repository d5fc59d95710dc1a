use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{
    forecast::{types::ForecastResult, weatherapi::WeatherApiError, FetchOptions, ForecastClient},
    utils::ErrorResponse,
};

// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub forecast_client: Arc<ForecastClient>,
}

#[derive(Debug, Deserialize)]
pub struct ForecastQuery {
    pub q: String,
    pub expire_ms: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub version: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CacheStatsResponse {
    pub entries: u64,
    pub default_expire_ms: u64,
    pub max_entries: Option<u64>,
    pub single_flight: bool,
}

/// HTTP rendering of a failed forecast fetch.
pub struct ApiError(WeatherApiError);

impl From<WeatherApiError> for ApiError {
    fn from(error: WeatherApiError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self.0 {
            WeatherApiError::ApiError {
                status,
                code,
                message,
                ..
            } => {
                // Upstream client errors are the caller's problem; anything else is ours.
                let status = StatusCode::from_u16(*status)
                    .ok()
                    .filter(StatusCode::is_client_error)
                    .unwrap_or(StatusCode::BAD_GATEWAY);
                (
                    status,
                    ErrorResponse::new(message, "upstream_error").with_upstream_code(*code),
                )
            }
            err if err.is_timeout() => (
                StatusCode::GATEWAY_TIMEOUT,
                ErrorResponse::new(&err.to_string(), "upstream_timeout"),
            ),
            WeatherApiError::RequestFailed(err) => (
                StatusCode::BAD_GATEWAY,
                ErrorResponse::new(&err.to_string(), "upstream_unreachable"),
            ),
            WeatherApiError::JsonParsing(_) | WeatherApiError::InvalidPayload(_) => (
                StatusCode::BAD_GATEWAY,
                ErrorResponse::new(&self.0.to_string(), "invalid_upstream_payload"),
            ),
            WeatherApiError::ClientBuild(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new(&self.0.to_string(), "internal_error"),
            ),
        };

        (status, Json(body)).into_response()
    }
}

// Route handlers
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn get_forecast(
    State(state): State<AppState>,
    Query(params): Query<ForecastQuery>,
) -> Result<Json<Arc<ForecastResult>>, ApiError> {
    let options = FetchOptions {
        expire_time: params.expire_ms.map(std::time::Duration::from_millis),
    };

    match state.forecast_client.fetch_forecast(&params.q, options).await {
        Ok(forecast) => Ok(Json(forecast)),
        Err(e) => {
            tracing::error!("Forecast fetch for {:?} failed: {}", params.q, e);
            Err(e.into())
        }
    }
}

pub async fn cache_stats(State(state): State<AppState>) -> Json<CacheStatsResponse> {
    let client = &state.forecast_client;

    Json(CacheStatsResponse {
        entries: client.cache().len().await,
        default_expire_ms: client.default_expire_time().as_millis() as u64,
        max_entries: client.cache().max_entries(),
        single_flight: client.single_flight(),
    })
}

pub async fn clear_cache(State(state): State<AppState>) -> StatusCode {
    state.forecast_client.cache().clear();
    tracing::info!("Forecast cache cleared");
    StatusCode::NO_CONTENT
}

// Create the router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/forecast", get(get_forecast))
        .route("/cache", get(cache_stats).delete(clear_cache))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(error: WeatherApiError) -> StatusCode {
        ApiError::from(error).into_response().status()
    }

    #[test]
    fn test_upstream_client_errors_pass_through() {
        let not_found = WeatherApiError::ApiError {
            status: 400,
            code: Some(1006),
            message: "No matching location found.".to_string(),
            body: String::new(),
        };
        assert_eq!(status_of(not_found), StatusCode::BAD_REQUEST);

        let forbidden = WeatherApiError::ApiError {
            status: 403,
            code: Some(2008),
            message: "API key has been disabled.".to_string(),
            body: String::new(),
        };
        assert_eq!(status_of(forbidden), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_upstream_server_errors_become_bad_gateway() {
        let error = WeatherApiError::ApiError {
            status: 500,
            code: None,
            message: "boom".to_string(),
            body: String::new(),
        };
        assert_eq!(status_of(error), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_invalid_payload_is_bad_gateway() {
        let error = WeatherApiError::InvalidPayload("short day".to_string());
        assert_eq!(status_of(error), StatusCode::BAD_GATEWAY);
    }
}
