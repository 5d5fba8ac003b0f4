//! The narrow capability interface a generic caching layer consumes.
//!
//! Key prefixing, value serialization and default durations belong to the
//! caller. Backends only move opaque bytes and report plain outcomes: a miss
//! is `None`, a failed write is `false`. Why something failed is reported
//! through a [`CacheObserver`](crate::CacheObserver), never returned.

use async_trait::async_trait;
use bytes::Bytes;
use std::{fmt, sync::Arc};

#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Fetch the raw value stored under `key`, `None` on miss or failure.
    async fn get(&self, key: &str) -> Option<Bytes>;

    /// Store `value` under `key`. `ttl` is in seconds, `None` or `Some(0)`
    /// means no expiry was requested.
    async fn set(&self, key: &str, value: Bytes, ttl: Option<u64>) -> bool;

    /// Store `value` only if nothing is stored under `key` yet.
    async fn add_if_absent(
        &self,
        key: &str,
        value: Bytes,
        ttl: Option<u64>,
    ) -> bool;

    async fn delete(&self, key: &str) -> bool;

    /// Drop every entry of the backend.
    async fn flush(&self) -> bool;
}

pub type AbstractCacheBackend = Arc<dyn CacheBackend>;

/// Cache operation, used to label diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Get,
    Set,
    AddIfAbsent,
    Delete,
    Flush,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Get => "get",
            Operation::Set => "set",
            Operation::AddIfAbsent => "add_if_absent",
            Operation::Delete => "delete",
            Operation::Flush => "flush",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
