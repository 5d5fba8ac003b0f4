//! HTTP client construction for talking to the KV store API.
//!
//! The client built here always verifies TLS certificates (rustls with the
//! bundled webpki roots), follows a bounded number of same-origin redirects
//! (a redirect to another host is returned as is, so the api token never
//! leaves the configured origin) and applies
//! explicit request and connect timeouts, so a hung endpoint can never block
//! a caller forever.
//!
//! # Example
//! ```no_run
//! use fastkv_config::http::{HttpClientParams, build_http_client};
//! use serde_yaml::Value;
//!
//! let config: Value = serde_yaml::from_str(r#"
//! http:
//!     timeout: 30
//!     connect_timeout: 10
//!     max_redirects: 5
//! "#).unwrap();
//!
//! let params = HttpClientParams::new("fastkv/0.1")
//!     .merge_config(&config["http"])
//!     .unwrap();
//! let client = build_http_client(params).unwrap();
//! ```
use crate::ConfigError;
use std::time::Duration;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

/// Parameters for configuring an HTTP client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpClientParams<'a> {
    /// Whole request timeout, seconds.
    pub timeout: u64,
    pub connect_timeout: u64,
    pub max_redirects: usize,
    /// Keep idle connections around between calls.
    pub reuse_connections: bool,
    pub user_agent: &'a str,
}

impl<'a> HttpClientParams<'a> {
    pub fn new(user_agent: &'a str) -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT_SECS,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT_SECS,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            reuse_connections: false,
            user_agent,
        }
    }

    /// Override the current values with the fields present in a YAML mapping.
    ///
    /// ```yaml
    /// http:
    ///     timeout: 30
    ///     connect_timeout: 10
    ///     max_redirects: 10
    ///     reuse_connections: false
    /// ```
    ///
    /// Every field is optional, missing ones keep their value. A field that
    /// is present but has the wrong type is an error.
    pub fn merge_config(
        self,
        http_config: &serde_yaml::Value,
    ) -> Result<Self, ConfigError> {
        let mut params = self;
        if http_config.is_null() {
            return Ok(params);
        }

        if let Some(timeout) = read_u64(http_config, "timeout")? {
            params.timeout = timeout;
        }
        if let Some(connect_timeout) = read_u64(http_config, "connect_timeout")? {
            params.connect_timeout = connect_timeout;
        }
        if let Some(max_redirects) = read_u64(http_config, "max_redirects")? {
            params.max_redirects = max_redirects as usize;
        }
        if let Some(value) = http_config.get("reuse_connections") {
            params.reuse_connections =
                value.as_bool().ok_or_else(|| ConfigError::InvalidValue {
                    key: "reuse_connections".to_string(),
                    reason: "expected a boolean".to_string(),
                })?;
        }

        Ok(params)
    }
}

fn read_u64(
    config: &serde_yaml::Value,
    key: &str,
) -> Result<Option<u64>, ConfigError> {
    match config.get(key) {
        None => Ok(None),
        Some(value) => {
            value
                .as_u64()
                .map(Some)
                .ok_or_else(|| ConfigError::InvalidValue {
                    key: key.to_string(),
                    reason: "expected a non-negative integer".to_string(),
                })
        }
    }
}

/// Follow at most `max_redirects` hops, and only while scheme, host and port
/// stay those of the first request. Anything else hands the 3xx back.
pub fn same_origin_redirects(max_redirects: usize) -> reqwest::redirect::Policy {
    reqwest::redirect::Policy::custom(move |attempt| {
        let previous = attempt.previous();
        if previous.len() > max_redirects {
            return attempt.error("too many redirects");
        }
        let same_origin = previous
            .first()
            .is_some_and(|first| first.origin() == attempt.url().origin());
        if same_origin {
            attempt.follow()
        } else {
            tracing::debug!(target_url = %attempt.url(), "not following cross-origin redirect");
            attempt.stop()
        }
    })
}

/// Builds an HTTP client with the specified parameters.
///
/// A zero timeout disables that timeout.
pub fn build_http_client(
    params: HttpClientParams,
) -> Result<reqwest::Client, reqwest::Error> {
    let mut client_builder = reqwest::ClientBuilder::new()
        .use_rustls_tls()
        .redirect(same_origin_redirects(params.max_redirects))
        .user_agent(params.user_agent);

    if params.timeout > 0 {
        client_builder = client_builder.timeout(Duration::from_secs(params.timeout));
    }
    if params.connect_timeout > 0 {
        client_builder =
            client_builder.connect_timeout(Duration::from_secs(params.connect_timeout));
    }
    if !params.reuse_connections {
        client_builder = client_builder.pool_max_idle_per_host(0);
    }

    tracing::debug!(
        timeout = params.timeout,
        connect_timeout = params.connect_timeout,
        reuse_connections = params.reuse_connections,
        "building http client"
    );

    client_builder.build()
}
