//! 保存与加载错误定义

use acreage_bridge::error::BridgeError;
use acreage_core::geo::GeoError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SaveError {
    #[error("Add at least 3 points to form a polygon (have {distinct})")]
    InvalidPolygon { distinct: usize },

    #[error("Area {square_feet:.2} sq.ft is below the {minimum:.2} sq.ft minimum")]
    BelowAreaThreshold { square_feet: f64, minimum: f64 },

    #[error("Could not confirm the latest shape: {0}")]
    StaleState(#[source] BridgeError),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Server returned {status}: {body}")]
    Server { status: u16, body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid stored coordinates: {0}")]
    Coordinates(#[from] GeoError),

    #[error("Land record not found: {0}")]
    NotFound(String),
}

impl SaveError {
    /// 是否值得原样重试（校验类错误重试也不会成功）
    pub fn is_retryable(&self) -> bool {
        match self {
            SaveError::StaleState(BridgeError::Cancelled) => false,
            SaveError::StaleState(_) | SaveError::Network(_) => true,
            SaveError::Server { status, .. } => *status >= 500 || *status == 408 || *status == 429,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(SaveError::StaleState(BridgeError::Timeout { request_id: 1 }).is_retryable());
        assert!(!SaveError::StaleState(BridgeError::Cancelled).is_retryable());
        assert!(SaveError::Network("connection reset".to_string()).is_retryable());
        assert!(SaveError::Server { status: 503, body: String::new() }.is_retryable());
        assert!(!SaveError::Server { status: 400, body: String::new() }.is_retryable());
        assert!(!SaveError::InvalidPolygon { distinct: 2 }.is_retryable());
        assert!(!SaveError::BelowAreaThreshold { square_feet: 12.0, minimum: 100.0 }.is_retryable());
    }
}
