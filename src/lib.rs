//! Starling: a field-granular cache-aside engine for social feeds.
//!
//! The engine keeps a relational record store authoritative while serving
//! feed reads from a cache that stores every post as ten independently
//! keyed fields. Reads assemble feeds from whatever fields are cached and
//! fetch only the gaps from the store; mutations write the store first and
//! then evict exactly the fields they staled. User profiles get a simpler
//! whole-record cache-aside treatment.
//!
//! The layering follows the usual split: [`domain`] holds the entities and
//! the field vocabulary, [`application`] the feed and profile services plus
//! the repository contracts, [`cache`] the key layout and batched cache
//! wrappers, and [`infra`] the Postgres implementations and telemetry
//! bootstrap. [`config`] resolves layered settings for all of it.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
