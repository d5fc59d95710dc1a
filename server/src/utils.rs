use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Error response helper
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    pub upstream_code: Option<i64>,
    pub timestamp: DateTime<Utc>,
}

impl ErrorResponse {
    pub fn new(error: &str, code: &str) -> Self {
        Self {
            error: error.to_string(),
            code: code.to_string(),
            upstream_code: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_upstream_code(mut self, upstream_code: Option<i64>) -> Self {
        self.upstream_code = upstream_code;
        self
    }
}
