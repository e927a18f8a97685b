use crate::error::{ProxyError, Result};
use crate::transform::DEFAULT_JPEG_QUALITY;
use bounded_fetch::{FetchConfig, DEFAULT_MAX_BYTES};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Proxy configuration parsed from environment variables
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub port: u16,
    pub storage_dir: PathBuf,
    pub cache_capacity: usize,
    pub max_fetch_bytes: u64,
    pub fetch_timeout_secs: u64,
    pub upstream_scheme: String,
    pub jpeg_quality: u8,
    pub wipe_storage_on_shutdown: bool,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            port: 3001,
            storage_dir: PathBuf::from("../storage"),
            cache_capacity: 1000,
            max_fetch_bytes: DEFAULT_MAX_BYTES,
            fetch_timeout_secs: 30,
            upstream_scheme: "http".to_string(),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            wipe_storage_on_shutdown: true,
        }
    }
}

impl ProxyConfig {
    /// Parse configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Parse configuration from an arbitrary key lookup.
    /// Unparseable numbers fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let port = lookup("PORT")
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.port);

        let storage_dir = lookup("STORAGE_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.storage_dir);

        let cache_capacity = lookup("CACHE_CAPACITY")
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.cache_capacity);

        let max_fetch_bytes = lookup("MAX_FETCH_BYTES")
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.max_fetch_bytes);

        let fetch_timeout_secs = lookup("FETCH_TIMEOUT_SECS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.fetch_timeout_secs);

        let upstream_scheme = lookup("UPSTREAM_SCHEME")
            .map(|s| s.trim().to_ascii_lowercase())
            .unwrap_or(defaults.upstream_scheme);
        if upstream_scheme != "http" && upstream_scheme != "https" {
            return Err(ProxyError::Config(format!(
                "UPSTREAM_SCHEME must be http or https, got {:?}",
                upstream_scheme
            )));
        }

        let jpeg_quality = match lookup("JPEG_QUALITY") {
            Some(raw) => match raw.parse::<u8>() {
                Ok(q) if (1..=100).contains(&q) => q,
                _ => {
                    return Err(ProxyError::Config(format!(
                        "JPEG_QUALITY must be between 1 and 100, got {:?}",
                        raw
                    )))
                }
            },
            None => defaults.jpeg_quality,
        };

        let wipe_storage_on_shutdown = lookup("WIPE_STORAGE_ON_SHUTDOWN")
            .map(|s| !matches!(s.trim().to_ascii_lowercase().as_str(), "0" | "false" | "no"))
            .unwrap_or(defaults.wipe_storage_on_shutdown);

        Ok(Self {
            port,
            storage_dir,
            cache_capacity,
            max_fetch_bytes,
            fetch_timeout_secs,
            upstream_scheme,
            jpeg_quality,
            wipe_storage_on_shutdown,
        })
    }

    /// Limits for the upstream fetcher
    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            max_bytes: self.max_fetch_bytes,
            timeout: Duration::from_secs(self.fetch_timeout_secs),
        }
    }
}
