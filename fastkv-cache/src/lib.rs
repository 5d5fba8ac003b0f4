//! Fastly KV Store as a generic cache backend.
//!
//! The crate exposes a narrow, async [`CacheBackend`] trait and one
//! implementation, [`FastlyKvCache`], that maps each cache primitive onto a
//! single call of the Fastly KV Store REST API:
//!
//! | operation       | request                                             |
//! |-----------------|-----------------------------------------------------|
//! | `get`           | `GET /resources/stores/kv/{store}/keys/{key}`       |
//! | `set`           | `PUT` on the same path, raw bytes as body           |
//! | `add_if_absent` | `get`, then `set` when the key was missing          |
//! | `delete`        | `DELETE` on the same path                           |
//! | `flush`         | unsupported, always `false`                         |
//!
//! Runtime failures never surface as errors. They become a miss or `false`
//! and are reported to a [`CacheObserver`] ([`TracingObserver`] by default).
//! Only construction can fail, with [`CacheError::Configuration`].

mod backend;
mod config;
mod error;
mod fastly;
mod observer;

pub use backend::{AbstractCacheBackend, CacheBackend, Operation};
pub use config::{
    DEFAULT_BASE_URL, KvStoreConfig, KvStoreConfigBuilder,
    KvStoreConfigBuilderError, TtlPolicy, USER_AGENT,
};
pub use error::CacheError;
pub use fastly::FastlyKvCache;
pub use observer::{CacheObserver, SharedObserver, TracingObserver};
