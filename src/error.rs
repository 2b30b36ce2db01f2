use serde_json::Value;
use thiserror::Error;

/// Errors raised by a node provider or the transport underneath it.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("HTTP error: {0}")]
    Http(u16),

    #[error("RPC error {code}: {message}")]
    Rpc {
        code: i64,
        message: String,
        data: Option<Value>,
    },

    #[error("failed to decode provider result: {0}")]
    Decode(String),

    #[error("no healthy upstream available")]
    NoHealthyUpstream,
}

/// Errors returned from `ProtocolAdapter::send`.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("unsupported operation: {reason} {method} {}", Value::Array(.params.clone()))]
    Unsupported {
        reason: String,
        method: String,
        params: Vec<Value>,
    },

    #[error("invalid params for {method}: {reason}")]
    InvalidParams { method: String, reason: String },

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl AdapterError {
    pub fn unsupported(reason: impl Into<String>, method: &str, params: &[Value]) -> Self {
        Self::Unsupported {
            reason: reason.into(),
            method: method.to_string(),
            params: params.to_vec(),
        }
    }

    pub fn invalid_params(method: &str, reason: impl Into<String>) -> Self {
        Self::InvalidParams {
            method: method.to_string(),
            reason: reason.into(),
        }
    }
}
