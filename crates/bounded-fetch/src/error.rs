//! Error types for the bounded fetcher

use std::fmt;

#[derive(Debug)]
pub enum FetchError {
    /// The request could not be sent or the connection failed
    Transport(Box<reqwest::Error>),
    /// The upstream did not answer within the configured deadline
    Timeout,
    /// The upstream answered with a non-success status
    UpstreamStatus(u16),
    /// The upstream body is not declared as a JPEG image
    UnsupportedMedia(String),
    /// The body exceeded the configured ceiling
    TooLarge { limit: u64 },
    /// Reading the body failed part way through
    BodyRead(Box<std::io::Error>),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Transport(err) => write!(f, "Upstream request failed: {}", err),
            FetchError::Timeout => write!(f, "Upstream request timed out"),
            FetchError::UpstreamStatus(status) => {
                write!(f, "Upstream returned status {}", status)
            }
            FetchError::UnsupportedMedia(content_type) => {
                write!(f, "Not a JPEG image (content-type {:?})", content_type)
            }
            FetchError::TooLarge { limit } => {
                write!(f, "Upstream body exceeds limit of {} bytes", limit)
            }
            FetchError::BodyRead(err) => write!(f, "Error reading upstream body: {}", err),
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FetchError::Transport(err) => Some(err.as_ref()),
            FetchError::BodyRead(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Transport(Box::new(err))
        }
    }
}

pub type Result<T> = std::result::Result<T, FetchError>;
