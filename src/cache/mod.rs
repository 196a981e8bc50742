//! Field-granular cache layer.
//!
//! Posts are cached one field per key so that a mutation can evict exactly
//! the fields it stales, and a feed read can fetch exactly the fields it is
//! missing. Profiles are cached whole, five fields written and read as one
//! batch. Both wrappers speak to a [`CacheBackend`], a thin batched-command
//! surface with an in-process implementation for tests and single-node
//! deployments.
//!
//! Key layout is a stable contract shared with other readers of the same
//! cache; see [`keys`] for the exact formats.

mod backend;
pub mod keys;
mod memory;
mod posts;
mod users;

pub use backend::{CacheBackend, CacheError, SetMode};
pub use memory::MemoryBackend;
pub use posts::{FieldWrite, PostFieldCache};
pub use users::{CachedProfile, ProfileCache};

use std::sync::Arc;

use crate::config::CacheSettings;

/// Endpoint scheme selecting the in-process backend.
pub const MEMORY_ENDPOINT: &str = "memory://";

/// Build a cache backend from settings. Only the in-process backend is
/// wired in today; anything else is reported as unavailable rather than
/// silently falling back.
pub fn backend_from_settings(
    settings: &CacheSettings,
) -> Result<Arc<dyn CacheBackend>, CacheError> {
    if settings.endpoint == MEMORY_ENDPOINT {
        return Ok(Arc::new(MemoryBackend::new()));
    }
    Err(CacheError::unavailable(format!(
        "unsupported cache endpoint `{}`",
        settings.endpoint
    )))
}
