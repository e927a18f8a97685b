//! Fill request fingerprints
//!
//! A fingerprint looks like `fill/<width>/<height>/<source...>` where the
//! source is an upstream host followed by a path, e.g.
//! `fill/300/200/example.com/photos/cat.jpg`.

use crate::error::FillError;
use url::Url;

/// Largest accepted target dimension
pub const MAX_DIMENSION: u32 = 10_000;

/// A parsed fill request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FillRequest {
    pub width: u32,
    pub height: u32,
    source: String,
    filename: String,
}

impl FillRequest {
    /// Parse a fingerprint. A leading `/` is tolerated.
    pub fn parse(fingerprint: &str) -> Result<Self, FillError> {
        let mut segments = fingerprint.trim_start_matches('/').splitn(4, '/');

        if segments.next() != Some("fill") {
            return Err(FillError::Parameter(format!(
                "path must start with fill/: {:?}",
                fingerprint
            )));
        }

        let width = parse_dimension("width", segments.next())?;
        let height = parse_dimension("height", segments.next())?;

        let source = segments.next().unwrap_or_default();
        if source.is_empty() {
            return Err(FillError::Parameter("missing source image".to_string()));
        }

        let name = source.rsplit('/').next().unwrap_or_default();
        if name.is_empty() {
            return Err(FillError::Parameter(format!(
                "source must end in a filename: {:?}",
                source
            )));
        }

        Ok(Self {
            width,
            height,
            filename: format!("{}_{}_{}", width, height, name),
            source: source.to_string(),
        })
    }

    /// Canonical cache key; equal requests always produce equal keys
    pub fn cache_key(&self) -> String {
        format!("fill/{}/{}/{}", self.width, self.height, self.source)
    }

    /// On-disk filename, `<width>_<height>_<source filename>`
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Upstream host and path
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Absolute upstream URL using `scheme`
    pub fn upstream_url(&self, scheme: &str) -> Result<Url, FillError> {
        let url = Url::parse(&format!("{}://{}", scheme, self.source)).map_err(|e| {
            FillError::Parameter(format!("invalid source {:?}: {}", self.source, e))
        })?;

        if url.host_str().map(str::is_empty).unwrap_or(true) {
            return Err(FillError::Parameter(format!(
                "source has no host: {:?}",
                self.source
            )));
        }
        Ok(url)
    }
}

fn parse_dimension(field: &str, raw: Option<&str>) -> Result<u32, FillError> {
    let raw = raw.unwrap_or_default();
    match raw.parse::<u32>() {
        Ok(value) if (1..=MAX_DIMENSION).contains(&value) => Ok(value),
        _ => Err(FillError::Parameter(format!(
            "{} must be an integer between 1 and {}, got {:?}",
            field, MAX_DIMENSION, raw
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic() {
        let req = FillRequest::parse("fill/100/50/example.com/cat.jpg").unwrap();
        assert_eq!(req.width, 100);
        assert_eq!(req.height, 50);
        assert_eq!(req.source(), "example.com/cat.jpg");
        assert_eq!(req.filename(), "100_50_cat.jpg");
        assert_eq!(req.cache_key(), "fill/100/50/example.com/cat.jpg");
    }

    #[test]
    fn test_parse_leading_slash_and_nested_path() {
        let req = FillRequest::parse("/fill/300/200/cdn.example.com/a/b/dog.jpg").unwrap();
        assert_eq!(req.source(), "cdn.example.com/a/b/dog.jpg");
        assert_eq!(req.filename(), "300_200_dog.jpg");
    }

    #[test]
    fn test_keys_are_canonical() {
        let a = FillRequest::parse("fill/0100/050/example.com/cat.jpg").unwrap();
        let b = FillRequest::parse("/fill/100/50/example.com/cat.jpg").unwrap();
        assert_eq!(a.cache_key(), b.cache_key());
        assert_eq!(a.filename(), b.filename());
    }

    #[test]
    fn test_same_file_different_hosts_share_filename() {
        let a = FillRequest::parse("fill/100/50/one.example/cat.jpg").unwrap();
        let b = FillRequest::parse("fill/100/50/two.example/img/cat.jpg").unwrap();
        assert_ne!(a.cache_key(), b.cache_key());
        assert_eq!(a.filename(), b.filename());
    }

    #[test]
    fn test_invalid_dimensions() {
        for path in [
            "fill/abc/50/example.com/cat.jpg",
            "fill/100/xyz/example.com/cat.jpg",
            "fill/-1/50/example.com/cat.jpg",
            "fill/0/50/example.com/cat.jpg",
            "fill/100/10001/example.com/cat.jpg",
            "fill/100",
        ] {
            let err = FillRequest::parse(path).unwrap_err();
            assert!(matches!(err, FillError::Parameter(_)), "{}", path);
        }
    }

    #[test]
    fn test_invalid_source() {
        assert!(FillRequest::parse("fill/100/50").is_err());
        assert!(FillRequest::parse("fill/100/50/").is_err());
        assert!(FillRequest::parse("fill/100/50/example.com/").is_err());
        assert!(FillRequest::parse("resize/100/50/example.com/cat.jpg").is_err());
    }

    #[test]
    fn test_upstream_url() {
        let req = FillRequest::parse("fill/100/50/example.com/photos/cat.jpg").unwrap();
        let url = req.upstream_url("http").unwrap();
        assert_eq!(url.as_str(), "http://example.com/photos/cat.jpg");

        let url = req.upstream_url("https").unwrap();
        assert_eq!(url.host_str(), Some("example.com"));

        let req = FillRequest::parse("fill/100/50/127.0.0.1:8080/cat.jpg").unwrap();
        let url = req.upstream_url("http").unwrap();
        assert_eq!(url.port(), Some(8080));
    }
}
