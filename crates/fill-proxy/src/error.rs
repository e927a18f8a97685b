//! Error types for the fill proxy

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use blob_store::StoreError;
use bounded_fetch::FetchError;
use serde_json::json;
use std::fmt;

use crate::transform::TransformError;

/// Failure of a single fill request
#[derive(Debug)]
pub enum FillError {
    /// Malformed fingerprint: bad dimensions or source
    Parameter(String),
    /// Upstream retrieval failed or was rejected
    Fetch(FetchError),
    /// Upstream bytes are not a decodable JPEG
    Decode(String),
    Encode(String),
    /// Reading a cached blob failed
    Disk(StoreError),
    Internal(String),
}

impl FillError {
    /// HTTP status the request should be answered with
    pub fn status(&self) -> StatusCode {
        match self {
            FillError::Parameter(_) => StatusCode::BAD_REQUEST,
            FillError::Fetch(err) => match err {
                FetchError::UnsupportedMedia(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
                FetchError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
                FetchError::BodyRead(_) => StatusCode::NOT_FOUND,
                FetchError::Timeout => StatusCode::GATEWAY_TIMEOUT,
                FetchError::Transport(_) | FetchError::UpstreamStatus(_) => {
                    StatusCode::BAD_GATEWAY
                }
            },
            FillError::Decode(_) => StatusCode::UNPROCESSABLE_ENTITY,
            FillError::Encode(_) | FillError::Disk(_) | FillError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl fmt::Display for FillError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FillError::Parameter(msg) => write!(f, "Bad parameters: {}", msg),
            FillError::Fetch(err) => write!(f, "Upstream error: {}", err),
            FillError::Decode(msg) => write!(f, "Decode error: {}", msg),
            FillError::Encode(msg) => write!(f, "Encode error: {}", msg),
            FillError::Disk(err) => write!(f, "Disk error: {}", err),
            FillError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for FillError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FillError::Fetch(err) => Some(err),
            FillError::Disk(err) => Some(err),
            _ => None,
        }
    }
}

impl From<FetchError> for FillError {
    fn from(err: FetchError) -> Self {
        FillError::Fetch(err)
    }
}

impl From<StoreError> for FillError {
    fn from(err: StoreError) -> Self {
        FillError::Disk(err)
    }
}

impl From<TransformError> for FillError {
    fn from(err: TransformError) -> Self {
        match err {
            TransformError::Decode(e) => FillError::Decode(e.to_string()),
            TransformError::Encode(e) => FillError::Encode(e.to_string()),
        }
    }
}

impl IntoResponse for FillError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Fill request failed");
        }

        // Local failures stay opaque; upstream ones tell the client what went wrong
        let message = match &self {
            FillError::Encode(_) | FillError::Disk(_) | FillError::Internal(_) => {
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        };

        (status, axum::Json(json!({ "error": message }))).into_response()
    }
}

/// Process-level failures: startup, configuration, serving
#[derive(Debug)]
pub enum ProxyError {
    Config(String),
    Store(StoreError),
    Fetch(FetchError),
    Io(Box<std::io::Error>),
}

impl fmt::Display for ProxyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxyError::Config(msg) => write!(f, "Configuration error: {}", msg),
            ProxyError::Store(err) => write!(f, "Storage error: {}", err),
            ProxyError::Fetch(err) => write!(f, "Fetcher error: {}", err),
            ProxyError::Io(err) => write!(f, "IO error: {}", err),
        }
    }
}

impl std::error::Error for ProxyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProxyError::Store(err) => Some(err),
            ProxyError::Fetch(err) => Some(err),
            ProxyError::Io(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<StoreError> for ProxyError {
    fn from(err: StoreError) -> Self {
        ProxyError::Store(err)
    }
}

impl From<FetchError> for ProxyError {
    fn from(err: FetchError) -> Self {
        ProxyError::Fetch(err)
    }
}

impl From<std::io::Error> for ProxyError {
    fn from(err: std::io::Error) -> Self {
        ProxyError::Io(Box::new(err))
    }
}

impl From<tracing_subscriber::filter::ParseError> for ProxyError {
    fn from(err: tracing_subscriber::filter::ParseError) -> Self {
        ProxyError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ProxyError>;
