//! Feed-side cache wrapper: field matrices, surgical invalidation, and the
//! per-user feed index.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;
use uuid::Uuid;

use crate::application::merge::FieldMatrix;
use crate::domain::fields::FeedField;

use super::backend::{CacheBackend, CacheError, SetMode};
use super::keys;

/// Author-metadata fields denormalized onto every post.
const AUTHOR_FIELDS: [FeedField; 4] = [
    FeedField::Owner,
    FeedField::FirstName,
    FeedField::LastName,
    FeedField::ProfilePic,
];

/// One field value destined for the post cache.
#[derive(Debug, Clone)]
pub struct FieldWrite {
    pub post_id: Uuid,
    pub field: FeedField,
    pub value: String,
}

#[derive(Clone)]
pub struct PostFieldCache {
    backend: Arc<dyn CacheBackend>,
}

impl PostFieldCache {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self { backend }
    }

    /// Batched read of all ten fields for `post_ids` in one backend
    /// round-trip. Self-flags resolve against `viewer`.
    pub async fn field_matrix(
        &self,
        post_ids: &[Uuid],
        viewer: Uuid,
    ) -> Result<FieldMatrix, CacheError> {
        let mut flat = Vec::with_capacity(post_ids.len() * FeedField::COUNT);
        for post_id in post_ids {
            for field in FeedField::ALL {
                flat.push(keys::post_field_key(*post_id, viewer, field));
            }
        }

        let values = self.backend.get_many(&flat).await?;

        // get_many is position-aligned with the key layout built above.
        let mut matrix = FieldMatrix::new(post_ids.len());
        let mut cursor = values.into_iter();
        for row in 0..post_ids.len() {
            for field in FeedField::ALL {
                matrix.set(field, row, cursor.next().flatten());
            }
        }
        Ok(matrix)
    }

    /// Batched overwrite of field values. No TTL is assigned here: expiry is
    /// backfilled by [`assign_expiry`] as a separate explicit step.
    ///
    /// [`assign_expiry`]: PostFieldCache::assign_expiry
    pub async fn write_fields(
        &self,
        writes: &[FieldWrite],
        viewer: Uuid,
    ) -> Result<(), CacheError> {
        if writes.is_empty() {
            return Ok(());
        }
        let entries: Vec<(String, String)> = writes
            .iter()
            .map(|write| {
                (
                    keys::post_field_key(write.post_id, viewer, write.field),
                    write.value.clone(),
                )
            })
            .collect();
        self.backend
            .set_many(&entries, None, SetMode::Overwrite)
            .await
    }

    /// Delete a subset of fields for one post in one round-trip.
    pub async fn delete_fields(
        &self,
        post_id: Uuid,
        fields: &[FeedField],
        viewer: Uuid,
    ) -> Result<u64, CacheError> {
        let flat: Vec<String> = fields
            .iter()
            .map(|field| keys::post_field_key(post_id, viewer, *field))
            .collect();
        self.backend.delete_many(&flat).await
    }

    /// Delete every cached field for a post, including the self-flags scoped
    /// to `viewer`.
    pub async fn delete_entry(&self, post_id: Uuid, viewer: Uuid) -> Result<u64, CacheError> {
        self.delete_fields(post_id, &FeedField::ALL, viewer).await
    }

    /// Delete the denormalized author fields of a post, used when a profile
    /// edit stales them. The viewer takes no part in these keys.
    pub async fn delete_author_fields(&self, post_id: Uuid) -> Result<u64, CacheError> {
        self.delete_fields(post_id, &AUTHOR_FIELDS, Uuid::nil())
            .await
    }

    /// The cached feed index for `user_id`, empty when absent. Entries that
    /// fail to parse as uuids are skipped.
    pub async fn feed_index(&self, user_id: Uuid) -> Result<Vec<Uuid>, CacheError> {
        let raw = self
            .backend
            .list_range(&keys::feed_index_key(user_id))
            .await?;
        let mut ids = Vec::with_capacity(raw.len());
        for value in raw {
            match Uuid::parse_str(&value) {
                Ok(id) => ids.push(id),
                Err(_) => warn!(
                    user_id = %user_id,
                    entry = %value,
                    "feed index entry is not a uuid; skipping"
                ),
            }
        }
        Ok(ids)
    }

    /// Persist the feed index. An empty id list is a no-op, so an author
    /// without posts never gets a persisted (and permanently empty) index.
    pub async fn write_feed_index(
        &self,
        user_id: Uuid,
        post_ids: &[Uuid],
    ) -> Result<(), CacheError> {
        if post_ids.is_empty() {
            return Ok(());
        }
        let values: Vec<String> = post_ids.iter().map(|id| id.to_string()).collect();
        self.backend
            .list_push(&keys::feed_index_key(user_id), &values)
            .await
    }

    pub async fn delete_feed_index(&self, user_id: Uuid) -> Result<(), CacheError> {
        self.backend
            .delete_many(std::slice::from_ref(&keys::feed_index_key(user_id)))
            .await
            .map(|_| ())
    }

    /// Backfill `ttl` onto all ten fields of each post plus the index key,
    /// leaving keys that already expire untouched. Self-flag keys are scoped
    /// to `user_id`, the feed's owner reading their own feed.
    pub async fn assign_expiry(
        &self,
        user_id: Uuid,
        post_ids: &[Uuid],
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let mut flat = Vec::with_capacity(post_ids.len() * FeedField::COUNT + 1);
        for post_id in post_ids {
            for field in FeedField::ALL {
                flat.push(keys::post_field_key(*post_id, user_id, field));
            }
        }
        flat.push(keys::feed_index_key(user_id));
        self.backend.expire_many(&flat, ttl, true).await
    }
}
