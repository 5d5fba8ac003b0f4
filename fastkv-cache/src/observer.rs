//! Diagnostic side channel for failures the cache contract swallows.

use crate::{CacheError, Operation};
use std::{fmt::Debug, sync::Arc};
use tracing::{debug, error, warn};

/// Receives the concrete reason behind every miss or `false` outcome.
///
/// Implementations must not block; they are called inline on the request
/// path.
pub trait CacheObserver: Send + Sync + Debug {
    fn request_failed(&self, operation: Operation, key: &str, error: &CacheError);

    /// A ttl was passed in but is not sent to the store.
    fn ttl_ignored(&self, key: &str, ttl: u64);
}

pub type SharedObserver = Arc<dyn CacheObserver>;

/// Default observer, forwards everything to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl CacheObserver for TracingObserver {
    fn request_failed(&self, operation: Operation, key: &str, err: &CacheError) {
        match err {
            // plain miss
            CacheError::Status { .. }
                if operation == Operation::Get && err.is_not_found() =>
            {
                debug!(%operation, key, "fastly kv: key not found");
            }
            CacheError::Status { status, body } => {
                error!(
                    %operation,
                    key,
                    status = status.as_u16(),
                    "fastly kv error: {}",
                    body
                );
            }
            other => {
                error!(%operation, key, "fastly kv error: {}", other);
            }
        }
    }

    fn ttl_ignored(&self, key: &str, ttl: u64) {
        warn!(
            key,
            ttl, "ttl is not forwarded to the kv store (ttl_policy: ignore)"
        );
    }
}
