pub use crate::cache::{
    AbstractCacheBackend, CacheBackend, CacheError, CacheObserver, FastlyKvCache,
    KvStoreConfig, KvStoreConfigBuilder, Operation, TracingObserver, TtlPolicy,
};
pub use crate::config::Configurable;
pub use bytes::Bytes;
