use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};

/// Domain-specific error types for the risk engine.
/// Validation failures are unrecoverable for the run: the caller gets
/// the offending parameter and no partial results.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid parameter `{name}` = {value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("invalid count `{name}` = {value}: {reason}")]
    InvalidCount {
        name: &'static str,
        value: usize,
        reason: &'static str,
    },

    #[error("config error: {0}")]
    Config(String),

    #[error("model computation error: {0}")]
    Model(String),

    #[error("export error: {0}")]
    Export(String),

    #[error("price data error: {0}")]
    Data(String),

    #[error("worker task failed: {0}")]
    TaskJoin(String),
}

impl EngineError {
    /// Short machine-readable tag for API clients.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidParameter { .. } => "invalid_parameter",
            Self::InvalidCount { .. } => "invalid_count",
            Self::Config(_) => "config",
            Self::Model(_) => "model",
            Self::Export(_) => "export",
            Self::Data(_) => "data",
            Self::TaskJoin(_) => "task_join",
        }
    }

    #[inline]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidParameter { .. } | Self::InvalidCount { .. } | Self::Data(_)
        )
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::Export(e.to_string())
    }
}

impl From<csv::Error> for EngineError {
    fn from(e: csv::Error) -> Self {
        EngineError::Export(e.to_string())
    }
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::Export(e.to_string())
    }
}

impl From<tokio::task::JoinError> for EngineError {
    fn from(e: tokio::task::JoinError) -> Self {
        EngineError::TaskJoin(e.to_string())
    }
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let status = if self.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        let body = serde_json::json!({
            "error": self.to_string(),
            "kind": self.kind(),
        });
        (status, Json(body)).into_response()
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_names_parameter() {
        let e = EngineError::InvalidParameter {
            name: "volatility",
            value: -0.2,
            reason: "must be > 0",
        };
        let msg = e.to_string();
        assert!(msg.contains("volatility"), "message should name the parameter: {msg}");
        assert!(msg.contains("-0.2"), "message should carry the value: {msg}");
    }

    #[test]
    fn test_status_mapping() {
        let bad = EngineError::InvalidCount { name: "sample_count", value: 0, reason: "must be >= 1" };
        assert_eq!(bad.into_response().status(), StatusCode::BAD_REQUEST);

        let internal = EngineError::Model("non-finite weight".into());
        assert_eq!(internal.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
