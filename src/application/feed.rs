//! Feed assembly and mutation over the field cache and the record store.
//!
//! Reads take one of two paths. When the viewer's feed index is absent the
//! whole feed is hydrated from the store in a single query and the cache is
//! populated wholesale (cold). When the index is present, cached fields are
//! read in one batch and only the fields with gaps go back to the store, one
//! batched fetch per gapped field (warm). Mutations write the store first and
//! then evict exactly the cached fields they staled.

use std::sync::Arc;
use std::time::Duration;

use futures::future::try_join_all;
use metrics::counter;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::application::merge;
use crate::application::repos::{PostsRepo, RepoError};
use crate::cache::{CacheError, FieldWrite, PostFieldCache};
use crate::domain::entities::{FeedEntry, PostRecord};
use crate::domain::fields::{FeedField, FieldValue};

const METRIC_FEED_INDEX_HIT: &str = "starling_feed_index_hit_total";
const METRIC_FEED_INDEX_MISS: &str = "starling_feed_index_miss_total";
const METRIC_FEED_FIELD_HIT: &str = "starling_feed_field_hit_total";
const METRIC_FEED_FIELD_MISS: &str = "starling_feed_field_miss_total";
const METRIC_FEED_GAP_FETCH: &str = "starling_feed_gap_fetch_total";

/// Fields staled by a like toggle.
const LIKE_FIELDS: [FeedField; 2] = [FeedField::LikeCount, FeedField::SelfLiked];
/// Fields staled by a retweet toggle.
const RETWEET_FIELDS: [FeedField; 2] = [FeedField::RetweetCount, FeedField::SelfRetweeted];

#[derive(Clone)]
pub struct FeedService {
    posts: Arc<dyn PostsRepo>,
    cache: PostFieldCache,
    feed_ttl: Duration,
}

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl FeedService {
    pub fn new(posts: Arc<dyn PostsRepo>, cache: PostFieldCache, feed_ttl: Duration) -> Self {
        Self {
            posts,
            cache,
            feed_ttl,
        }
    }

    /// Assemble the feed of `username`'s posts as seen by that user, newest
    /// first.
    ///
    /// No expiry is assigned here; callers that want the cached feed to age
    /// out invoke [`assign_feed_expiry`] once assembly is done, so that a
    /// fresh key never starts its countdown mid-read.
    ///
    /// [`assign_feed_expiry`]: FeedService::assign_feed_expiry
    pub async fn get_feed(
        &self,
        user_id: Uuid,
        username: &str,
    ) -> Result<Vec<FeedEntry>, FeedError> {
        let index = self.cache.feed_index(user_id).await?;
        if index.is_empty() {
            counter!(METRIC_FEED_INDEX_MISS).increment(1);
            debug!(user_id = %user_id, "feed index absent; hydrating from the store");
            return self.cold_feed(user_id, username).await;
        }

        counter!(METRIC_FEED_INDEX_HIT).increment(1);
        debug!(user_id = %user_id, posts = index.len(), "feed index present; filling gaps");
        self.warm_feed(user_id, username, &index).await
    }

    /// Append a post and drop the author's feed index so the next read
    /// rebuilds it with the new post in front. Cached fields of older posts
    /// stay put.
    pub async fn write_post(
        &self,
        user_id: Uuid,
        username: &str,
        content: &str,
    ) -> Result<PostRecord, FeedError> {
        if content.is_empty() {
            return Err(FeedError::InvalidInput(
                "post content must not be empty".to_string(),
            ));
        }
        let record = self.posts.append_post(username, content).await?;
        self.cache.delete_feed_index(user_id).await?;
        Ok(record)
    }

    /// Flip the caller's like on a post, returning `true` when the post is
    /// now liked. Evicts exactly the like count and the caller's self-liked
    /// flag; every other cached field of the post stays.
    pub async fn toggle_like(
        &self,
        user_id: Uuid,
        username: &str,
        post_id: Uuid,
    ) -> Result<bool, FeedError> {
        let now_liked = self.posts.toggle_like(post_id, username).await?;
        self.cache
            .delete_fields(post_id, &LIKE_FIELDS, user_id)
            .await?;
        Ok(now_liked)
    }

    /// Like [`toggle_like`], on the retweet fields.
    ///
    /// [`toggle_like`]: FeedService::toggle_like
    pub async fn toggle_retweet(
        &self,
        user_id: Uuid,
        username: &str,
        post_id: Uuid,
    ) -> Result<bool, FeedError> {
        let now_retweeted = self.posts.toggle_retweet(post_id, username).await?;
        self.cache
            .delete_fields(post_id, &RETWEET_FIELDS, user_id)
            .await?;
        Ok(now_retweeted)
    }

    /// Remove a post from the store and evict its cached fields. Both sides
    /// run to completion even when one fails, so a store error cannot leave
    /// the eviction unattempted. Returns the number of store rows removed.
    ///
    /// The caller's feed index is left alone: ids without backing rows
    /// resolve to defaults until the index ages out or is rebuilt.
    pub async fn delete_post(&self, user_id: Uuid, post_id: Uuid) -> Result<u64, FeedError> {
        let (store, cache) = tokio::join!(
            self.posts.delete_post(post_id),
            self.cache.delete_entry(post_id, user_id),
        );
        let removed = store?;
        cache?;
        Ok(removed)
    }

    /// Backfill the configured expiry onto the viewer's cached feed, leaving
    /// keys that already expire untouched.
    pub async fn assign_feed_expiry(
        &self,
        user_id: Uuid,
        post_ids: &[Uuid],
    ) -> Result<(), FeedError> {
        self.cache
            .assign_expiry(user_id, post_ids, self.feed_ttl)
            .await
            .map_err(FeedError::from)
    }

    async fn cold_feed(&self, user_id: Uuid, username: &str) -> Result<Vec<FeedEntry>, FeedError> {
        let entries = self.posts.feed_for_author(username, username).await?;
        if entries.is_empty() {
            // Nothing to cache, and an empty index is never persisted: an
            // author's first post must not fight a negative-cached feed.
            return Ok(entries);
        }

        let mut writes = Vec::with_capacity(entries.len() * FeedField::COUNT);
        for entry in &entries {
            for field in FeedField::ALL {
                writes.push(FieldWrite {
                    post_id: entry.post_id,
                    field,
                    value: entry.field_value(field).encode(),
                });
            }
        }

        // Fields land before the index: a present index promises that every
        // listed post is assemblable. Population failures only cost the next
        // read another cold pass.
        if let Err(err) = self.cache.write_fields(&writes, user_id).await {
            warn!(user_id = %user_id, error = %err, "feed population failed; serving from the store");
            return Ok(entries);
        }
        let ids: Vec<Uuid> = entries.iter().map(|entry| entry.post_id).collect();
        if let Err(err) = self.cache.write_feed_index(user_id, &ids).await {
            warn!(user_id = %user_id, error = %err, "feed index write failed; next read is cold again");
        }
        Ok(entries)
    }

    async fn warm_feed(
        &self,
        user_id: Uuid,
        username: &str,
        post_ids: &[Uuid],
    ) -> Result<Vec<FeedEntry>, FeedError> {
        let mut matrix = self.cache.field_matrix(post_ids, user_id).await?;

        let mut gapped: Vec<(FeedField, Vec<Uuid>)> = Vec::new();
        for field in FeedField::ALL {
            let gaps = matrix.gap_ids(field, post_ids);
            let hits = post_ids.len() - gaps.len();
            if hits > 0 {
                counter!(METRIC_FEED_FIELD_HIT, "field" => field.wire_name())
                    .increment(hits as u64);
            }
            if gaps.is_empty() {
                continue;
            }
            counter!(METRIC_FEED_FIELD_MISS, "field" => field.wire_name())
                .increment(gaps.len() as u64);
            gapped.push((field, gaps));
        }

        // One batched store fetch per gapped field, all in flight at once.
        // Fully cached fields never touch the store.
        let fetches = gapped
            .iter()
            .map(|(field, ids)| self.fetch_column(*field, ids, username));
        let columns = try_join_all(fetches).await?;

        let mut write_back = Vec::new();
        for ((field, _), fetched) in gapped.into_iter().zip(columns) {
            counter!(METRIC_FEED_GAP_FETCH, "field" => field.wire_name()).increment(1);
            for (post_id, value) in &fetched {
                write_back.push(FieldWrite {
                    post_id: *post_id,
                    field,
                    value: value.clone(),
                });
            }
            let merged = merge::merge_column(post_ids, matrix.column(field), &fetched);
            matrix.replace_column(field, merged);
        }

        if !write_back.is_empty()
            && let Err(err) = self.cache.write_fields(&write_back, user_id).await
        {
            warn!(user_id = %user_id, error = %err, "gap write-back failed; fields stay uncached");
        }

        Ok(merge::assemble_entries(post_ids, &matrix))
    }

    /// Fetch one field for the given posts from the store, encoded for the
    /// cache so fetched and cached values merge as equals.
    async fn fetch_column(
        &self,
        field: FeedField,
        ids: &[Uuid],
        viewer: &str,
    ) -> Result<Vec<(Uuid, String)>, RepoError> {
        let column = match field {
            FeedField::Content => self.posts.fetch_content(ids).await?,
            FeedField::CreatedAt => {
                encode_pairs(self.posts.fetch_created_at(ids).await?, FieldValue::Timestamp)
            }
            FeedField::LikeCount => {
                encode_pairs(self.posts.fetch_like_counts(ids).await?, FieldValue::Count)
            }
            FeedField::RetweetCount => {
                encode_pairs(self.posts.fetch_retweet_counts(ids).await?, FieldValue::Count)
            }
            FeedField::SelfLiked => {
                encode_pairs(self.posts.fetch_self_liked(ids, viewer).await?, FieldValue::Flag)
            }
            FeedField::SelfRetweeted => encode_pairs(
                self.posts.fetch_self_retweeted(ids, viewer).await?,
                FieldValue::Flag,
            ),
            FeedField::Owner => self.posts.fetch_owners(ids).await?,
            FeedField::FirstName => self.posts.fetch_first_names(ids).await?,
            FeedField::LastName => self.posts.fetch_last_names(ids).await?,
            FeedField::ProfilePic => self.posts.fetch_profile_pics(ids).await?,
        };
        Ok(column)
    }
}

fn encode_pairs<T>(pairs: Vec<(Uuid, T)>, wrap: impl Fn(T) -> FieldValue) -> Vec<(Uuid, String)> {
    pairs
        .into_iter()
        .map(|(id, value)| (id, wrap(value).encode()))
        .collect()
}
