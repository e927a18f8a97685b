//! Error types for the blob store

use std::fmt;

#[derive(Debug)]
pub enum StoreError {
    InvalidFilename(String),
    Io(Box<std::io::Error>),
}

impl StoreError {
    /// True when the failure is a missing blob
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::Io(err) if err.kind() == std::io::ErrorKind::NotFound)
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::InvalidFilename(name) => write!(f, "Invalid blob filename: {:?}", name),
            StoreError::Io(err) => write!(f, "IO error: {}", err),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Io(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
