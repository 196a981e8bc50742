//! Core records shared by the cache, store, and service layers.

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::fields::{FeedField, FieldValue, ProfileField};

/// Identity the store assigns when a post is appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostRecord {
    pub post_id: Uuid,
    pub created_at: OffsetDateTime,
}

/// Fully-resolved, viewer-relative view of one post in a feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedEntry {
    pub post_id: Uuid,
    pub content: String,
    pub created_at: OffsetDateTime,
    pub like_count: i64,
    pub retweet_count: i64,
    pub self_liked: bool,
    pub self_retweeted: bool,
    pub author: String,
    pub first_name: String,
    pub last_name: String,
    pub profile_pic: String,
}

impl FeedEntry {
    /// Typed access to one field, used when fanning an entry out into cache
    /// writes.
    pub fn field_value(&self, field: FeedField) -> FieldValue {
        match field {
            FeedField::Content => FieldValue::Text(self.content.clone()),
            FeedField::CreatedAt => FieldValue::Timestamp(self.created_at),
            FeedField::LikeCount => FieldValue::Count(self.like_count),
            FeedField::RetweetCount => FieldValue::Count(self.retweet_count),
            FeedField::SelfLiked => FieldValue::Flag(self.self_liked),
            FeedField::SelfRetweeted => FieldValue::Flag(self.self_retweeted),
            FeedField::Owner => FieldValue::Text(self.author.clone()),
            FeedField::FirstName => FieldValue::Text(self.first_name.clone()),
            FeedField::LastName => FieldValue::Text(self.last_name.clone()),
            FeedField::ProfilePic => FieldValue::Text(self.profile_pic.clone()),
        }
    }
}

/// Accumulates per-field values while an entry is reassembled from merged
/// columns. Fields left unset resolve to defensive defaults in [`finish`].
///
/// [`finish`]: FeedEntryDraft::finish
#[derive(Debug)]
pub struct FeedEntryDraft {
    post_id: Uuid,
    content: Option<String>,
    created_at: Option<OffsetDateTime>,
    like_count: Option<i64>,
    retweet_count: Option<i64>,
    self_liked: Option<bool>,
    self_retweeted: Option<bool>,
    author: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    profile_pic: Option<String>,
}

impl FeedEntryDraft {
    pub fn new(post_id: Uuid) -> Self {
        Self {
            post_id,
            content: None,
            created_at: None,
            like_count: None,
            retweet_count: None,
            self_liked: None,
            self_retweeted: None,
            author: None,
            first_name: None,
            last_name: None,
            profile_pic: None,
        }
    }

    pub fn set(&mut self, field: FeedField, value: FieldValue) {
        match (field, value) {
            (FeedField::Content, FieldValue::Text(v)) => self.content = Some(v),
            (FeedField::CreatedAt, FieldValue::Timestamp(v)) => self.created_at = Some(v),
            (FeedField::LikeCount, FieldValue::Count(v)) => self.like_count = Some(v),
            (FeedField::RetweetCount, FieldValue::Count(v)) => self.retweet_count = Some(v),
            (FeedField::SelfLiked, FieldValue::Flag(v)) => self.self_liked = Some(v),
            (FeedField::SelfRetweeted, FieldValue::Flag(v)) => self.self_retweeted = Some(v),
            (FeedField::Owner, FieldValue::Text(v)) => self.author = Some(v),
            (FeedField::FirstName, FieldValue::Text(v)) => self.first_name = Some(v),
            (FeedField::LastName, FieldValue::Text(v)) => self.last_name = Some(v),
            (FeedField::ProfilePic, FieldValue::Text(v)) => self.profile_pic = Some(v),
            // Kind mismatch: leave unset so finish() applies the default.
            _ => {}
        }
    }

    pub fn finish(self) -> FeedEntry {
        FeedEntry {
            post_id: self.post_id,
            content: self.content.unwrap_or_default(),
            created_at: self.created_at.unwrap_or_else(OffsetDateTime::now_utc),
            like_count: self.like_count.unwrap_or(0),
            retweet_count: self.retweet_count.unwrap_or(0),
            self_liked: self.self_liked.unwrap_or(false),
            self_retweeted: self.self_retweeted.unwrap_or(false),
            author: self.author.unwrap_or_default(),
            first_name: self.first_name.unwrap_or_default(),
            last_name: self.last_name.unwrap_or_default(),
            profile_pic: self.profile_pic.unwrap_or_default(),
        }
    }
}

/// A user's public profile as returned by the profile lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileRecord {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub profile_pic: String,
}

impl ProfileRecord {
    pub fn field_value(&self, field: ProfileField) -> &str {
        match field {
            ProfileField::FirstName => &self.first_name,
            ProfileField::LastName => &self.last_name,
            ProfileField::Username => &self.username,
            ProfileField::Email => &self.email,
            ProfileField::ProfilePic => &self.profile_pic,
        }
    }
}

/// Credential lookup result consumed by the account layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAccount {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// Parameters for creating a user row; the password arrives pre-hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
    pub profile_pic: String,
}
