//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::entities::{FeedEntry, NewUser, PostRecord, ProfileRecord, UserAccount};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Authoritative post storage, including the per-field batch fetchers the
/// warm-path gap-fill relies on.
///
/// Fetchers take the id subset the cache could not serve and return pairs
/// keyed by post id; callers must not assume result ordering. Ids unknown to
/// the store are simply absent from the result.
#[async_trait]
pub trait PostsRepo: Send + Sync {
    async fn append_post(&self, author: &str, content: &str) -> Result<PostRecord, RepoError>;

    /// Atomically flips the like state for `(post_id, actor)` and reports the
    /// resulting state: `true` when the post is now liked.
    async fn toggle_like(&self, post_id: Uuid, actor: &str) -> Result<bool, RepoError>;

    async fn toggle_retweet(&self, post_id: Uuid, actor: &str) -> Result<bool, RepoError>;

    async fn add_like(&self, post_id: Uuid, actor: &str) -> Result<u64, RepoError>;

    async fn delete_like(&self, post_id: Uuid, actor: &str) -> Result<u64, RepoError>;

    async fn add_retweet(&self, post_id: Uuid, actor: &str) -> Result<u64, RepoError>;

    async fn delete_retweet(&self, post_id: Uuid, actor: &str) -> Result<u64, RepoError>;

    async fn delete_post(&self, post_id: Uuid) -> Result<u64, RepoError>;

    /// Full feed hydration: every post by `author`, newest first, with counts,
    /// viewer-relative self-flags, and author metadata joined in one query.
    async fn feed_for_author(
        &self,
        author: &str,
        viewer: &str,
    ) -> Result<Vec<FeedEntry>, RepoError>;

    async fn fetch_content(&self, ids: &[Uuid]) -> Result<Vec<(Uuid, String)>, RepoError>;

    async fn fetch_created_at(
        &self,
        ids: &[Uuid],
    ) -> Result<Vec<(Uuid, OffsetDateTime)>, RepoError>;

    async fn fetch_like_counts(&self, ids: &[Uuid]) -> Result<Vec<(Uuid, i64)>, RepoError>;

    async fn fetch_retweet_counts(&self, ids: &[Uuid]) -> Result<Vec<(Uuid, i64)>, RepoError>;

    async fn fetch_self_liked(
        &self,
        ids: &[Uuid],
        viewer: &str,
    ) -> Result<Vec<(Uuid, bool)>, RepoError>;

    async fn fetch_self_retweeted(
        &self,
        ids: &[Uuid],
        viewer: &str,
    ) -> Result<Vec<(Uuid, bool)>, RepoError>;

    async fn fetch_owners(&self, ids: &[Uuid]) -> Result<Vec<(Uuid, String)>, RepoError>;

    async fn fetch_first_names(&self, ids: &[Uuid]) -> Result<Vec<(Uuid, String)>, RepoError>;

    async fn fetch_last_names(&self, ids: &[Uuid]) -> Result<Vec<(Uuid, String)>, RepoError>;

    async fn fetch_profile_pics(&self, ids: &[Uuid]) -> Result<Vec<(Uuid, String)>, RepoError>;
}

/// User storage: the profile cache's fallback plus the account-layer lookups.
#[async_trait]
pub trait UsersRepo: Send + Sync {
    async fn profile_by_id(&self, user_id: Uuid) -> Result<Option<ProfileRecord>, RepoError>;

    async fn find_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<UserAccount>, RepoError>;

    async fn create_user(&self, user: NewUser) -> Result<Uuid, RepoError>;

    async fn delete_user(&self, user_id: Uuid) -> Result<u64, RepoError>;
}
