//! Whole-record cache-aside for user profiles.
//!
//! Unlike the feed cache there is no per-field gap fill: the username field
//! decides hit or miss for the record as a whole, and a hit is served as-is.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::application::repos::{RepoError, UsersRepo};
use crate::cache::{CacheError, ProfileCache};
use crate::domain::entities::ProfileRecord;

const METRIC_PROFILE_HIT: &str = "starling_profile_hit_total";
const METRIC_PROFILE_MISS: &str = "starling_profile_miss_total";

#[derive(Clone)]
pub struct ProfileService {
    users: Arc<dyn UsersRepo>,
    cache: ProfileCache,
    profile_ttl: Duration,
}

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl ProfileService {
    pub fn new(users: Arc<dyn UsersRepo>, cache: ProfileCache, profile_ttl: Duration) -> Self {
        Self {
            users,
            cache,
            profile_ttl,
        }
    }

    /// Fetch a user's profile, cache-aside. A cached record is returned
    /// without consulting the store; a miss falls back to the store and
    /// populates the cache with set-if-absent writes, so a concurrent
    /// populator is never clobbered. The TTL is then reapplied across the
    /// record whether or not the store had the user, which also pushes out
    /// the expiry of a record some other request won the race to write.
    pub async fn get_profile(&self, user_id: Uuid) -> Result<Option<ProfileRecord>, ProfileError> {
        let cached = self.cache.profile_fields(user_id).await?;
        if cached.is_hit() {
            counter!(METRIC_PROFILE_HIT).increment(1);
            return Ok(cached.into_profile());
        }

        counter!(METRIC_PROFILE_MISS).increment(1);
        debug!(user_id = %user_id, "profile not cached; reading the store");
        let profile = self.users.profile_by_id(user_id).await?;

        if let Some(record) = &profile
            && let Err(err) = self
                .cache
                .write_if_absent(user_id, record, self.profile_ttl)
                .await
        {
            warn!(user_id = %user_id, error = %err, "profile population failed; serving from the store");
        }
        if let Err(err) = self.cache.refresh_ttl(user_id, self.profile_ttl).await {
            warn!(user_id = %user_id, error = %err, "profile ttl refresh failed");
        }

        Ok(profile)
    }

    /// Evict a user's cached profile, forcing the next read back to the
    /// store. Used when the underlying account record changes or goes away.
    pub async fn evict_profile(&self, user_id: Uuid) -> Result<u64, ProfileError> {
        self.cache.delete(user_id).await.map_err(ProfileError::from)
    }
}
