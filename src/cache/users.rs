//! Profile-side cache wrapper: whole-record cache-aside for user profiles.

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::domain::entities::ProfileRecord;
use crate::domain::fields::ProfileField;

use super::backend::{CacheBackend, CacheError, SetMode};
use super::keys;

/// The five profile fields as read from the cache in one round-trip.
///
/// Hit or miss is decided by [`ProfileField::Username`] alone: a profile is
/// never cached without it, so its absence means the record is not cached.
#[derive(Debug, Default)]
pub struct CachedProfile {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub profile_pic: Option<String>,
}

impl CachedProfile {
    pub fn is_hit(&self) -> bool {
        self.username.is_some()
    }

    /// Assemble a record from the cached fields, or `None` on a miss.
    /// Missing non-identity fields come back empty rather than failing the
    /// whole read.
    pub fn into_profile(self) -> Option<ProfileRecord> {
        let username = self.username?;
        Some(ProfileRecord {
            first_name: self.first_name.unwrap_or_default(),
            last_name: self.last_name.unwrap_or_default(),
            username,
            email: self.email.unwrap_or_default(),
            profile_pic: self.profile_pic.unwrap_or_default(),
        })
    }
}

#[derive(Clone)]
pub struct ProfileCache {
    backend: Arc<dyn CacheBackend>,
}

impl ProfileCache {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self { backend }
    }

    /// Batched read of all five profile fields for `user_id`.
    pub async fn profile_fields(&self, user_id: Uuid) -> Result<CachedProfile, CacheError> {
        let flat: Vec<String> = ProfileField::ALL
            .into_iter()
            .map(|field| keys::profile_field_key(user_id, field))
            .collect();
        let mut values = self.backend.get_many(&flat).await?.into_iter();

        // Position-aligned with ProfileField::ALL.
        Ok(CachedProfile {
            first_name: values.next().flatten(),
            last_name: values.next().flatten(),
            username: values.next().flatten(),
            email: values.next().flatten(),
            profile_pic: values.next().flatten(),
        })
    }

    /// Write the record field-by-field without clobbering concurrent writers:
    /// each field lands only where no value exists yet, and carries `ttl`.
    pub async fn write_if_absent(
        &self,
        user_id: Uuid,
        profile: &ProfileRecord,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let entries: Vec<(String, String)> = ProfileField::ALL
            .into_iter()
            .map(|field| {
                (
                    keys::profile_field_key(user_id, field),
                    profile.field_value(field).to_string(),
                )
            })
            .collect();
        self.backend
            .set_many(&entries, Some(ttl), SetMode::IfAbsent)
            .await
    }

    /// Push the expiry of all five fields out to `ttl`, including keys that
    /// already carry one.
    pub async fn refresh_ttl(&self, user_id: Uuid, ttl: Duration) -> Result<(), CacheError> {
        let flat: Vec<String> = ProfileField::ALL
            .into_iter()
            .map(|field| keys::profile_field_key(user_id, field))
            .collect();
        self.backend.expire_many(&flat, ttl, false).await
    }

    /// Evict the cached profile, returning how many fields were present.
    pub async fn delete(&self, user_id: Uuid) -> Result<u64, CacheError> {
        let flat: Vec<String> = ProfileField::ALL
            .into_iter()
            .map(|field| keys::profile_field_key(user_id, field))
            .collect();
        self.backend.delete_many(&flat).await
    }
}
