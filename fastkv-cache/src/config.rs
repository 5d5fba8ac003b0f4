use crate::CacheError;
use derive_builder::Builder;
use fastkv_config::http::{
    DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_MAX_REDIRECTS, DEFAULT_TIMEOUT_SECS,
    HttpClientParams,
};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_BASE_URL: &str = "https://api.fastly.com";
pub const USER_AGENT: &str = concat!("fastkv/", env!("CARGO_PKG_VERSION"));

/// What to do with the ttl handed to `set` / `add_if_absent`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TtlPolicy {
    /// Do not send it; report it through the observer.
    #[default]
    Ignore,
    /// Send it as the store's `time_to_live_sec` query parameter.
    Forward,
}

/// Connection settings for one Fastly KV store.
///
/// Either built with [`KvStoreConfigBuilder`] or deserialized from a yaml
/// mapping:
///
/// ```yaml
/// kv:
///   api_token: ${FASTLY_API_TOKEN}
///   store_id: 7f2k3m...
///   timeout: 5
///   ttl_policy: forward
///   http:
///     connect_timeout: 2
///     reuse_connections: true
/// ```
///
/// Fields of the optional `http` subsection win over the flat ones.
#[derive(Builder, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[builder(public, setter(into))]
pub struct KvStoreConfig {
    pub api_token: String,
    pub store_id: String,
    #[builder(default = "DEFAULT_BASE_URL.to_string()")]
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Seconds, 0 disables the timeout.
    #[builder(default = "DEFAULT_TIMEOUT_SECS")]
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[builder(default = "DEFAULT_CONNECT_TIMEOUT_SECS")]
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,
    #[builder(default = "DEFAULT_MAX_REDIRECTS")]
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    #[builder(default)]
    #[serde(default)]
    pub reuse_connections: bool,
    #[builder(default)]
    #[serde(default)]
    pub ttl_policy: TtlPolicy,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_connect_timeout() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

fn default_max_redirects() -> usize {
    DEFAULT_MAX_REDIRECTS
}

impl KvStoreConfig {
    pub fn builder() -> KvStoreConfigBuilder {
        KvStoreConfigBuilder::default()
    }

    /// Read the config from a yaml mapping such as the `kv` section of a
    /// file loaded with [`fastkv_config::Configurable::load_config`].
    pub fn from_yaml(value: &serde_yaml::Value) -> Result<Self, CacheError> {
        if value.is_null() {
            return Err(CacheError::Configuration(
                "kv store section is missing".to_string(),
            ));
        }
        let mut config: Self = serde_yaml::from_value(value.clone())
            .map_err(|e| CacheError::Config(e.into()))?;
        if let Some(http) = value.get("http") {
            let params = config.http_params().merge_config(http)?;
            config.timeout = params.timeout;
            config.connect_timeout = params.connect_timeout;
            config.max_redirects = params.max_redirects;
            config.reuse_connections = params.reuse_connections;
        }
        Ok(config)
    }

    /// Both `api_token` and `store_id` must be non blank.
    pub fn validate(&self) -> Result<(), CacheError> {
        if self.api_token.trim().is_empty() || self.store_id.trim().is_empty() {
            return Err(CacheError::Configuration(
                "api_token and store_id are required".to_string(),
            ));
        }
        if self.base_url.trim().is_empty() {
            return Err(CacheError::Configuration(
                "base_url must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn http_params(&self) -> HttpClientParams<'static> {
        HttpClientParams {
            timeout: self.timeout,
            connect_timeout: self.connect_timeout,
            max_redirects: self.max_redirects,
            reuse_connections: self.reuse_connections,
            user_agent: USER_AGENT,
        }
    }
}

// keeps the token out of logs
impl fmt::Debug for KvStoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KvStoreConfig")
            .field("api_token", &"<redacted>")
            .field("store_id", &self.store_id)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("max_redirects", &self.max_redirects)
            .field("reuse_connections", &self.reuse_connections)
            .field("ttl_policy", &self.ttl_policy)
            .finish()
    }
}

impl From<KvStoreConfigBuilderError> for CacheError {
    fn from(err: KvStoreConfigBuilderError) -> Self {
        CacheError::Configuration(err.to_string())
    }
}
