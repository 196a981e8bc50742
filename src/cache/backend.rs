//! Batched key-value cache contract.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend error: {message}")]
    Backend { message: String },
    #[error("cache unavailable: {message}")]
    Unavailable { message: String },
}

impl CacheError {
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }
}

/// Write discipline for [`CacheBackend::set_many`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetMode {
    /// Unconditional write.
    Overwrite,
    /// Keep an existing value; only absent keys are written.
    IfAbsent,
}

/// Batched string cache with per-key expiry and an ordered-list primitive.
///
/// Every method is one round-trip: implementations dispatch all
/// sub-operations of a call together and await them as a unit. No ordering
/// is guaranteed between sub-operations of the same batch, only batch
/// completion.
#[async_trait]
pub trait CacheBackend: Send + Sync + std::fmt::Debug {
    /// Values for `keys`, position-aligned; `None` marks absence.
    async fn get_many(&self, keys: &[String]) -> Result<Vec<Option<String>>, CacheError>;

    async fn set_many(
        &self,
        entries: &[(String, String)],
        ttl: Option<Duration>,
        mode: SetMode,
    ) -> Result<(), CacheError>;

    /// Returns the number of keys actually removed.
    async fn delete_many(&self, keys: &[String]) -> Result<u64, CacheError>;

    /// Assign `ttl` to each existing key. With `only_if_no_expiry`, keys that
    /// already carry an expiry keep it.
    async fn expire_many(
        &self,
        keys: &[String],
        ttl: Duration,
        only_if_no_expiry: bool,
    ) -> Result<(), CacheError>;

    /// Full contents of the list at `key` in push order; empty when absent.
    async fn list_range(&self, key: &str) -> Result<Vec<String>, CacheError>;

    /// Append `values` to the list at `key`, creating it when absent.
    async fn list_push(&self, key: &str, values: &[String]) -> Result<(), CacheError>;
}
