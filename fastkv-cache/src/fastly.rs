use crate::{
    CacheBackend, CacheError, CacheObserver, KvStoreConfig, Operation,
    TracingObserver, TtlPolicy, observer::SharedObserver,
};
use async_trait::async_trait;
use bytes::Bytes;
use fastkv_config::http::build_http_client;
use reqwest::{
    Method, Url,
    header::{ACCEPT, CONTENT_TYPE, HeaderValue},
};
use std::sync::Arc;
use tracing::{debug, instrument};

const FASTLY_KEY: &str = "fastly-key";
const MAX_KEY_LEN: usize = 1024;

/// Fastly KV Store exposed as a [`CacheBackend`].
///
/// Every operation is one round trip to
/// `{base_url}/resources/stores/kv/{store_id}/keys/{key}`. Nothing is kept
/// locally. Non 2xx responses, transport errors and timeouts all collapse
/// into a miss / `false`; the observer gets the details.
///
/// `add_if_absent` is a get followed by a put. Two concurrent callers can
/// both see the key as absent and both write.
#[derive(Debug, Clone)]
pub struct FastlyKvCache {
    client: reqwest::Client,
    keys_url: Url,
    api_token: HeaderValue,
    store_id: String,
    ttl_policy: TtlPolicy,
    observer: SharedObserver,
}

impl FastlyKvCache {
    /// Create a cache that reports failures through `tracing`.
    pub fn new(config: KvStoreConfig) -> Result<Self, CacheError> {
        Self::with_observer(config, Arc::new(TracingObserver))
    }

    pub fn with_observer(
        config: KvStoreConfig,
        observer: Arc<dyn CacheObserver>,
    ) -> Result<Self, CacheError> {
        config.validate()?;

        let keys_url = keys_url(&config.base_url, &config.store_id)?;

        let mut api_token =
            HeaderValue::from_str(config.api_token.trim()).map_err(|_| {
                CacheError::Configuration(
                    "api_token is not a valid header value".to_string(),
                )
            })?;
        api_token.set_sensitive(true);

        let client = build_http_client(config.http_params()).map_err(|e| {
            CacheError::Configuration(format!("failed to build http client: {e}"))
        })?;

        debug!(
            store_id = %config.store_id,
            base_url = %config.base_url,
            "fastly kv cache ready"
        );

        Ok(Self {
            client,
            keys_url,
            api_token,
            store_id: config.store_id,
            ttl_policy: config.ttl_policy,
            observer,
        })
    }

    pub fn store_id(&self) -> &str {
        &self.store_id
    }

    /// Full URL of `key` in this store, with the key percent-encoded as one
    /// path segment.
    pub fn key_url(&self, key: &str) -> Result<Url, CacheError> {
        validate_key(key)?;
        let mut url = self.keys_url.clone();
        url.path_segments_mut()
            .map_err(|_| CacheError::Configuration("base_url cannot be a base".into()))?
            .push(key);
        Ok(url)
    }

    /// Send one request and return the body of a 2xx response.
    async fn execute(
        &self,
        method: Method,
        key: &str,
        body: Option<Bytes>,
        ttl: Option<u64>,
    ) -> Result<Bytes, CacheError> {
        let mut url = self.key_url(key)?;
        if let Some(ttl) = ttl {
            url.query_pairs_mut()
                .append_pair("time_to_live_sec", &ttl.to_string());
        }

        let mut request = self
            .client
            .request(method, url)
            .header(FASTLY_KEY, self.api_token.clone())
            .header(ACCEPT, "application/json");

        if let Some(body) = body {
            request = request
                .header(CONTENT_TYPE, "application/octet-stream")
                .body(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let payload = response.bytes().await?;

        if status.is_success() {
            Ok(payload)
        } else {
            Err(CacheError::Status {
                status,
                body: String::from_utf8_lossy(&payload).into_owned(),
            })
        }
    }

    /// Hand failures to the observer and drop the error.
    fn settle<T>(
        &self,
        operation: Operation,
        key: &str,
        result: Result<T, CacheError>,
    ) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                self.observer.request_failed(operation, key, &err);
                None
            }
        }
    }

    /// Ttl actually sent with a write, per the configured policy.
    fn outgoing_ttl(&self, key: &str, ttl: Option<u64>) -> Option<u64> {
        match (ttl, self.ttl_policy) {
            (None | Some(0), _) => None,
            (Some(ttl), TtlPolicy::Forward) => Some(ttl),
            (Some(ttl), TtlPolicy::Ignore) => {
                self.observer.ttl_ignored(key, ttl);
                None
            }
        }
    }

    async fn write(
        &self,
        operation: Operation,
        key: &str,
        value: Bytes,
        ttl: Option<u64>,
    ) -> bool {
        let ttl = self.outgoing_ttl(key, ttl);
        let result = self.execute(Method::PUT, key, Some(value), ttl).await;
        self.settle(operation, key, result).is_some()
    }
}

#[async_trait]
impl CacheBackend for FastlyKvCache {
    #[instrument(skip(self), fields(store_id = %self.store_id))]
    async fn get(&self, key: &str) -> Option<Bytes> {
        let result = self.execute(Method::GET, key, None, None).await;
        let value = self.settle(Operation::Get, key, result);
        if let Some(value) = &value {
            debug!(len = value.len(), "fastly kv hit");
        }
        value
    }

    #[instrument(skip(self, value), fields(store_id = %self.store_id, len = value.len()))]
    async fn set(&self, key: &str, value: Bytes, ttl: Option<u64>) -> bool {
        let stored = self.write(Operation::Set, key, value, ttl).await;
        if stored {
            debug!("fastly kv stored");
        }
        stored
    }

    #[instrument(skip(self, value), fields(store_id = %self.store_id, len = value.len()))]
    async fn add_if_absent(
        &self,
        key: &str,
        value: Bytes,
        ttl: Option<u64>,
    ) -> bool {
        if self.get(key).await.is_some() {
            debug!("fastly kv add skipped, key exists");
            return false;
        }
        self.write(Operation::AddIfAbsent, key, value, ttl).await
    }

    #[instrument(skip(self), fields(store_id = %self.store_id))]
    async fn delete(&self, key: &str) -> bool {
        let result = self.execute(Method::DELETE, key, None, None).await;
        self.settle(Operation::Delete, key, result).is_some()
    }

    /// The KV API has no call to clear a whole store, so this never
    /// succeeds and never touches the network.
    async fn flush(&self) -> bool {
        debug!(store_id = %self.store_id, "fastly kv flush is not supported");
        false
    }
}

/// `{base_url}/resources/stores/kv/{store_id}/keys`
fn keys_url(base_url: &str, store_id: &str) -> Result<Url, CacheError> {
    let mut url = Url::parse(base_url.trim()).map_err(|e| {
        CacheError::Configuration(format!("invalid base_url {base_url:?}: {e}"))
    })?;
    url.set_query(None);
    url.set_fragment(None);
    url.path_segments_mut()
        .map_err(|_| {
            CacheError::Configuration(format!(
                "base_url {base_url:?} cannot be used as a base"
            ))
        })?
        .pop_if_empty()
        .extend(["resources", "stores", "kv", store_id.trim(), "keys"]);
    Ok(url)
}

/// Keys go into the URL as a single path segment.
fn validate_key(key: &str) -> Result<(), CacheError> {
    let invalid = key.is_empty()
        || key == "."
        || key == ".."
        || key.len() > MAX_KEY_LEN
        || key.contains(['\r', '\n']);
    if invalid {
        return Err(CacheError::InvalidKey(key.to_string()));
    }
    Ok(())
}
