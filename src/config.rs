//! Configuration for the conversion proxy.
//!
//! Every knob lives in [`ProxyConfig`], built via its [`ProxyConfigBuilder`].
//! The library never reads the environment itself: the binary maps flags and
//! environment variables onto the builder, tests construct configs directly.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

/// Base URL of the conversion service when none is configured.
pub const DEFAULT_UPSTREAM_URL: &str = "http://python-api:8000";

/// Path of the conversion endpoint below the upstream base URL.
pub const UPSTREAM_PROCESS_PATH: &str = "/process-pdf";

/// Configuration for a [`crate::proxy::ConversionProxy`] and the HTTP server.
///
/// # Example
/// ```rust
/// use pdf2csv_proxy::ProxyConfig;
///
/// let config = ProxyConfig::builder()
///     .upstream_url("http://localhost:8000")
///     .request_timeout_secs(30)
///     .build()
///     .unwrap();
/// assert_eq!(config.upstream_endpoint(), "http://localhost:8000/process-pdf");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Base URL of the conversion service. Default: `http://python-api:8000`.
    ///
    /// A trailing slash is ignored.
    pub upstream_url: String,

    /// Total timeout for one upstream call, in seconds. Default: 120.
    ///
    /// Statement PDFs with a few hundred transactions take the conversion
    /// service several seconds; two minutes leaves headroom for large exports
    /// without holding a client forever when the service hangs.
    pub request_timeout_secs: u64,

    /// TCP connect timeout for the upstream, in seconds. Default: 10.
    pub connect_timeout_secs: u64,

    /// Largest accepted inbound request body, in bytes. Default: 50 MiB.
    ///
    /// Matches the conversion service's own upload limit so oversized files
    /// are refused before they are buffered and forwarded.
    pub max_upload_bytes: usize,

    /// Largest accepted upstream reply body, in bytes. Default: 64 MiB.
    ///
    /// The reply carries every generated CSV inline, so it may outgrow the
    /// upload that produced it; anything past the cap is an upstream failure.
    pub max_reply_bytes: usize,

    /// Address the HTTP server binds to. Default: `0.0.0.0:3000`.
    pub bind_addr: SocketAddr,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            upstream_url: DEFAULT_UPSTREAM_URL.to_string(),
            request_timeout_secs: 120,
            connect_timeout_secs: 10,
            max_upload_bytes: 50 * 1024 * 1024,
            max_reply_bytes: 64 * 1024 * 1024,
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
        }
    }
}

impl ProxyConfig {
    /// Create a new builder seeded with the defaults.
    pub fn builder() -> ProxyConfigBuilder {
        ProxyConfigBuilder {
            config: Self::default(),
        }
    }

    /// Full URL of the upstream conversion endpoint.
    pub fn upstream_endpoint(&self) -> String {
        format!(
            "{}{}",
            self.upstream_url.trim_end_matches('/'),
            UPSTREAM_PROCESS_PATH
        )
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Check the invariants [`ProxyConfigBuilder::build`] enforces.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = reqwest::Url::parse(&self.upstream_url).map_err(|e| {
            ConfigError::InvalidUpstreamUrl {
                url: self.upstream_url.clone(),
                reason: e.to_string(),
            }
        })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::InvalidUpstreamUrl {
                url: self.upstream_url.clone(),
                reason: "scheme must be http or https".into(),
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "Request timeout must be ≥ 1 second".into(),
            ));
        }
        if self.connect_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "Connect timeout must be ≥ 1 second".into(),
            ));
        }
        if self.max_upload_bytes == 0 {
            return Err(ConfigError::Invalid(
                "Upload limit must be ≥ 1 byte".into(),
            ));
        }
        if self.max_reply_bytes == 0 {
            return Err(ConfigError::Invalid(
                "Reply limit must be ≥ 1 byte".into(),
            ));
        }
        Ok(())
    }
}

/// Builder for [`ProxyConfig`].
#[derive(Debug)]
pub struct ProxyConfigBuilder {
    config: ProxyConfig,
}

impl ProxyConfigBuilder {
    pub fn upstream_url(mut self, url: impl Into<String>) -> Self {
        self.config.upstream_url = url.into();
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    pub fn connect_timeout_secs(mut self, secs: u64) -> Self {
        self.config.connect_timeout_secs = secs;
        self
    }

    pub fn max_upload_bytes(mut self, bytes: usize) -> Self {
        self.config.max_upload_bytes = bytes;
        self
    }

    pub fn max_reply_bytes(mut self, bytes: usize) -> Self {
        self.config.max_reply_bytes = bytes;
        self
    }

    pub fn bind_addr(mut self, addr: SocketAddr) -> Self {
        self.config.bind_addr = addr;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ProxyConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_python_api() {
        let config = ProxyConfig::default();
        assert_eq!(config.upstream_url, "http://python-api:8000");
        assert_eq!(
            config.upstream_endpoint(),
            "http://python-api:8000/process-pdf"
        );
        assert_eq!(config.max_upload_bytes, 52_428_800);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn trailing_slash_is_ignored() {
        let config = ProxyConfig::builder()
            .upstream_url("http://converter:9000/")
            .build()
            .unwrap();
        assert_eq!(config.upstream_endpoint(), "http://converter:9000/process-pdf");
    }

    #[test]
    fn rejects_non_http_scheme() {
        let err = ProxyConfig::builder()
            .upstream_url("ftp://converter")
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUpstreamUrl { .. }));
    }

    #[test]
    fn rejects_relative_url() {
        let err = ProxyConfig::builder()
            .upstream_url("python-api:8000")
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUpstreamUrl { .. }), "got: {err}");
    }

    #[test]
    fn rejects_zero_timeout() {
        let err = ProxyConfig::builder()
            .request_timeout_secs(0)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("timeout"));
    }

    #[test]
    fn rejects_zero_upload_limit() {
        assert!(ProxyConfig::builder().max_upload_bytes(0).build().is_err());
    }

    #[test]
    fn rejects_zero_reply_limit() {
        assert!(ProxyConfig::builder().max_reply_bytes(0).build().is_err());
        assert_eq!(ProxyConfig::default().max_reply_bytes, 67_108_864);
    }
}
