//! # fastkv
//!
//! Fastly KV Store as a drop-in cache backend for async Rust services.
//!
//! ## Features
//!
//! - **One trait, one backend**: [`CacheBackend`] covers `get`, `set`,
//!   `add_if_absent`, `delete` and `flush`; [`FastlyKvCache`] implements it
//!   on top of the KV Store REST API.
//! - **No surprises on failure**: runtime errors become a miss or `false`,
//!   the details go to a pluggable [`cache::CacheObserver`].
//! - **Explicit timeouts**: a hung endpoint can not block the caller forever.
//! - **Yaml config with `${ENV}` expansion** via [`config::Configurable`].
//!
//! ## Getting Started
//!
//! ```ignore
//! use fastkv::prelude::*;
//!
//! let config = KvStoreConfig::builder()
//!     .api_token(std::env::var("FASTLY_API_TOKEN")?)
//!     .store_id("my-store-id")
//!     .build()?;
//! let cache: AbstractCacheBackend = std::sync::Arc::new(FastlyKvCache::new(config)?);
//!
//! cache.set("user:1", Bytes::from_static(br#"{"id":1}"#), None).await;
//! let value = cache.get("user:1").await;
//! ```
//!
//! ## Modules
//!
//! - `cache`: the backend trait, the Fastly implementation and its config.
//! - `config`: yaml loading and http client construction.
//! - `cli`: the `fastkv` command line tool.
pub mod cli;
pub mod prelude;

pub use fastkv_cache as cache;
pub use fastkv_cache::{
    AbstractCacheBackend, CacheBackend, CacheError, FastlyKvCache, KvStoreConfig,
};
pub use fastkv_config as config;
// re-export
pub use async_trait;
pub use bytes;
pub use tracing;
pub use tracing_subscriber;
