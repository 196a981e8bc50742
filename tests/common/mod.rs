//! Shared fixtures: scripted in-memory stores with per-operation call
//! counters, plus service constructors over the in-process cache backend.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use time::OffsetDateTime;
use time::macros::datetime;
use uuid::Uuid;

use starling::application::feed::FeedService;
use starling::application::profile::ProfileService;
use starling::application::repos::{PostsRepo, RepoError, UsersRepo};
use starling::cache::{MemoryBackend, PostFieldCache, ProfileCache};
use starling::domain::entities::{FeedEntry, NewUser, PostRecord, ProfileRecord, UserAccount};
use starling::domain::fields::FeedField;

pub const FEED_TTL: Duration = Duration::from_secs(900);
pub const PROFILE_TTL: Duration = Duration::from_secs(900);

const BASE_TIME: OffsetDateTime = datetime!(2026-02-01 00:00:00 UTC);

#[derive(Clone)]
struct UserRow {
    first_name: String,
    last_name: String,
    profile_pic: String,
}

#[derive(Clone)]
struct PostRow {
    post_id: Uuid,
    author: String,
    content: String,
    created_at: OffsetDateTime,
}

#[derive(Default)]
struct PostsState {
    users: HashMap<String, UserRow>,
    posts: Vec<PostRow>,
    likes: HashSet<(Uuid, String)>,
    retweets: HashSet<(Uuid, String)>,
}

/// In-memory record store scripted through seeding helpers. Every store
/// round-trip is counted so tests can assert exactly which fetches a read
/// path issued. Field fetchers return their pairs in reverse id order, so
/// anything relying on positional alignment instead of id matching fails
/// loudly.
#[derive(Default)]
pub struct ScriptedPosts {
    state: Mutex<PostsState>,
    seq: AtomicUsize,
    feed_queries: AtomicUsize,
    field_fetches: Mutex<HashMap<&'static str, usize>>,
}

impl ScriptedPosts {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_user(&self, username: &str, first_name: &str, last_name: &str, profile_pic: &str) {
        let mut state = self.state.lock().unwrap();
        state.users.insert(
            username.to_string(),
            UserRow {
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
                profile_pic: profile_pic.to_string(),
            },
        );
    }

    pub fn add_post(&self, author: &str, content: &str) -> Uuid {
        let post_id = Uuid::new_v4();
        let created_at = self.next_timestamp();
        let mut state = self.state.lock().unwrap();
        state.posts.push(PostRow {
            post_id,
            author: author.to_string(),
            content: content.to_string(),
            created_at,
        });
        post_id
    }

    pub fn feed_queries(&self) -> usize {
        self.feed_queries.load(Ordering::SeqCst)
    }

    pub fn fetches_for(&self, field: FeedField) -> usize {
        let fetches = self.field_fetches.lock().unwrap();
        fetches.get(field.wire_name()).copied().unwrap_or(0)
    }

    pub fn total_field_fetches(&self) -> usize {
        let fetches = self.field_fetches.lock().unwrap();
        fetches.values().sum()
    }

    fn next_timestamp(&self) -> OffsetDateTime {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst) as i64;
        BASE_TIME + time::Duration::seconds(seq)
    }

    fn bump_fetch(&self, field: FeedField) {
        let mut fetches = self.field_fetches.lock().unwrap();
        *fetches.entry(field.wire_name()).or_insert(0) += 1;
    }

    /// Pairs for the posts among `ids` the store knows, reverse id order.
    fn known_pairs<T>(
        state: &PostsState,
        ids: &[Uuid],
        value: impl Fn(&PostsState, &PostRow) -> T,
    ) -> Vec<(Uuid, T)> {
        let mut pairs: Vec<(Uuid, T)> = ids
            .iter()
            .filter_map(|id| {
                state
                    .posts
                    .iter()
                    .find(|post| post.post_id == *id)
                    .map(|post| (*id, value(state, post)))
            })
            .collect();
        pairs.reverse();
        pairs
    }
}

#[async_trait]
impl PostsRepo for ScriptedPosts {
    async fn append_post(&self, author: &str, content: &str) -> Result<PostRecord, RepoError> {
        let post_id = self.add_post(author, content);
        let state = self.state.lock().unwrap();
        let created_at = state
            .posts
            .iter()
            .find(|post| post.post_id == post_id)
            .map(|post| post.created_at)
            .unwrap();
        Ok(PostRecord {
            post_id,
            created_at,
        })
    }

    async fn toggle_like(&self, post_id: Uuid, actor: &str) -> Result<bool, RepoError> {
        let mut state = self.state.lock().unwrap();
        let key = (post_id, actor.to_string());
        if state.likes.remove(&key) {
            Ok(false)
        } else {
            state.likes.insert(key);
            Ok(true)
        }
    }

    async fn toggle_retweet(&self, post_id: Uuid, actor: &str) -> Result<bool, RepoError> {
        let mut state = self.state.lock().unwrap();
        let key = (post_id, actor.to_string());
        if state.retweets.remove(&key) {
            Ok(false)
        } else {
            state.retweets.insert(key);
            Ok(true)
        }
    }

    async fn add_like(&self, post_id: Uuid, actor: &str) -> Result<u64, RepoError> {
        let mut state = self.state.lock().unwrap();
        Ok(u64::from(state.likes.insert((post_id, actor.to_string()))))
    }

    async fn delete_like(&self, post_id: Uuid, actor: &str) -> Result<u64, RepoError> {
        let mut state = self.state.lock().unwrap();
        Ok(u64::from(state.likes.remove(&(post_id, actor.to_string()))))
    }

    async fn add_retweet(&self, post_id: Uuid, actor: &str) -> Result<u64, RepoError> {
        let mut state = self.state.lock().unwrap();
        Ok(u64::from(
            state.retweets.insert((post_id, actor.to_string())),
        ))
    }

    async fn delete_retweet(&self, post_id: Uuid, actor: &str) -> Result<u64, RepoError> {
        let mut state = self.state.lock().unwrap();
        Ok(u64::from(
            state.retweets.remove(&(post_id, actor.to_string())),
        ))
    }

    async fn delete_post(&self, post_id: Uuid) -> Result<u64, RepoError> {
        let mut state = self.state.lock().unwrap();
        let before = state.posts.len();
        state.posts.retain(|post| post.post_id != post_id);
        let removed = before - state.posts.len();
        state.likes.retain(|(id, _)| *id != post_id);
        state.retweets.retain(|(id, _)| *id != post_id);
        Ok(removed as u64)
    }

    async fn feed_for_author(
        &self,
        author: &str,
        viewer: &str,
    ) -> Result<Vec<FeedEntry>, RepoError> {
        self.feed_queries.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().unwrap();

        let mut entries: Vec<FeedEntry> = state
            .posts
            .iter()
            .filter(|post| post.author == author)
            .filter_map(|post| {
                let user = state.users.get(&post.author)?;
                Some(FeedEntry {
                    post_id: post.post_id,
                    content: post.content.clone(),
                    created_at: post.created_at,
                    like_count: state.likes.iter().filter(|(id, _)| *id == post.post_id).count()
                        as i64,
                    retweet_count: state
                        .retweets
                        .iter()
                        .filter(|(id, _)| *id == post.post_id)
                        .count() as i64,
                    self_liked: state.likes.contains(&(post.post_id, viewer.to_string())),
                    self_retweeted: state
                        .retweets
                        .contains(&(post.post_id, viewer.to_string())),
                    author: post.author.clone(),
                    first_name: user.first_name.clone(),
                    last_name: user.last_name.clone(),
                    profile_pic: user.profile_pic.clone(),
                })
            })
            .collect();

        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(entries)
    }

    async fn fetch_content(&self, ids: &[Uuid]) -> Result<Vec<(Uuid, String)>, RepoError> {
        self.bump_fetch(FeedField::Content);
        let state = self.state.lock().unwrap();
        Ok(Self::known_pairs(&state, ids, |_, post| {
            post.content.clone()
        }))
    }

    async fn fetch_created_at(
        &self,
        ids: &[Uuid],
    ) -> Result<Vec<(Uuid, OffsetDateTime)>, RepoError> {
        self.bump_fetch(FeedField::CreatedAt);
        let state = self.state.lock().unwrap();
        Ok(Self::known_pairs(&state, ids, |_, post| post.created_at))
    }

    async fn fetch_like_counts(&self, ids: &[Uuid]) -> Result<Vec<(Uuid, i64)>, RepoError> {
        self.bump_fetch(FeedField::LikeCount);
        let state = self.state.lock().unwrap();
        Ok(Self::known_pairs(&state, ids, |state, post| {
            state.likes.iter().filter(|(id, _)| *id == post.post_id).count() as i64
        }))
    }

    async fn fetch_retweet_counts(&self, ids: &[Uuid]) -> Result<Vec<(Uuid, i64)>, RepoError> {
        self.bump_fetch(FeedField::RetweetCount);
        let state = self.state.lock().unwrap();
        Ok(Self::known_pairs(&state, ids, |state, post| {
            state
                .retweets
                .iter()
                .filter(|(id, _)| *id == post.post_id)
                .count() as i64
        }))
    }

    async fn fetch_self_liked(
        &self,
        ids: &[Uuid],
        viewer: &str,
    ) -> Result<Vec<(Uuid, bool)>, RepoError> {
        self.bump_fetch(FeedField::SelfLiked);
        let state = self.state.lock().unwrap();
        Ok(Self::known_pairs(&state, ids, |state, post| {
            state.likes.contains(&(post.post_id, viewer.to_string()))
        }))
    }

    async fn fetch_self_retweeted(
        &self,
        ids: &[Uuid],
        viewer: &str,
    ) -> Result<Vec<(Uuid, bool)>, RepoError> {
        self.bump_fetch(FeedField::SelfRetweeted);
        let state = self.state.lock().unwrap();
        Ok(Self::known_pairs(&state, ids, |state, post| {
            state
                .retweets
                .contains(&(post.post_id, viewer.to_string()))
        }))
    }

    async fn fetch_owners(&self, ids: &[Uuid]) -> Result<Vec<(Uuid, String)>, RepoError> {
        self.bump_fetch(FeedField::Owner);
        let state = self.state.lock().unwrap();
        Ok(Self::known_pairs(&state, ids, |_, post| post.author.clone()))
    }

    async fn fetch_first_names(&self, ids: &[Uuid]) -> Result<Vec<(Uuid, String)>, RepoError> {
        self.bump_fetch(FeedField::FirstName);
        let state = self.state.lock().unwrap();
        Ok(Self::known_pairs(&state, ids, |state, post| {
            state
                .users
                .get(&post.author)
                .map(|user| user.first_name.clone())
                .unwrap_or_default()
        }))
    }

    async fn fetch_last_names(&self, ids: &[Uuid]) -> Result<Vec<(Uuid, String)>, RepoError> {
        self.bump_fetch(FeedField::LastName);
        let state = self.state.lock().unwrap();
        Ok(Self::known_pairs(&state, ids, |state, post| {
            state
                .users
                .get(&post.author)
                .map(|user| user.last_name.clone())
                .unwrap_or_default()
        }))
    }

    async fn fetch_profile_pics(&self, ids: &[Uuid]) -> Result<Vec<(Uuid, String)>, RepoError> {
        self.bump_fetch(FeedField::ProfilePic);
        let state = self.state.lock().unwrap();
        Ok(Self::known_pairs(&state, ids, |state, post| {
            state
                .users
                .get(&post.author)
                .map(|user| user.profile_pic.clone())
                .unwrap_or_default()
        }))
    }
}

/// In-memory user store with a call counter on the profile lookup.
#[derive(Default)]
pub struct ScriptedUsers {
    profiles: Mutex<HashMap<Uuid, ProfileRecord>>,
    accounts: Mutex<Vec<UserAccount>>,
    profile_queries: AtomicUsize,
}

impl ScriptedUsers {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_profile(&self, user_id: Uuid, profile: ProfileRecord) {
        self.profiles.lock().unwrap().insert(user_id, profile);
    }

    pub fn remove_profile(&self, user_id: Uuid) {
        self.profiles.lock().unwrap().remove(&user_id);
    }

    pub fn profile_queries(&self) -> usize {
        self.profile_queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UsersRepo for ScriptedUsers {
    async fn profile_by_id(&self, user_id: Uuid) -> Result<Option<ProfileRecord>, RepoError> {
        self.profile_queries.fetch_add(1, Ordering::SeqCst);
        Ok(self.profiles.lock().unwrap().get(&user_id).cloned())
    }

    async fn find_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<UserAccount>, RepoError> {
        let accounts = self.accounts.lock().unwrap();
        Ok(accounts
            .iter()
            .find(|account| account.username == username || account.email == email)
            .cloned())
    }

    async fn create_user(&self, user: NewUser) -> Result<Uuid, RepoError> {
        let mut accounts = self.accounts.lock().unwrap();
        if accounts
            .iter()
            .any(|account| account.username == user.username || account.email == user.email)
        {
            return Err(RepoError::Duplicate {
                constraint: "users_username_key".to_string(),
            });
        }
        let user_id = Uuid::new_v4();
        accounts.push(UserAccount {
            user_id,
            username: user.username.clone(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
        });
        drop(accounts);

        self.set_profile(
            user_id,
            ProfileRecord {
                first_name: user.first_name,
                last_name: user.last_name,
                username: user.username,
                email: user.email,
                profile_pic: user.profile_pic,
            },
        );
        Ok(user_id)
    }

    async fn delete_user(&self, user_id: Uuid) -> Result<u64, RepoError> {
        let mut accounts = self.accounts.lock().unwrap();
        let before = accounts.len();
        accounts.retain(|account| account.user_id != user_id);
        let removed = before - accounts.len();
        drop(accounts);
        self.remove_profile(user_id);
        Ok(removed as u64)
    }
}

pub fn feed_service(posts: Arc<ScriptedPosts>) -> (FeedService, Arc<MemoryBackend>) {
    let backend = Arc::new(MemoryBackend::new());
    let cache = PostFieldCache::new(backend.clone());
    (FeedService::new(posts, cache, FEED_TTL), backend)
}

pub fn profile_service(users: Arc<ScriptedUsers>) -> (ProfileService, Arc<MemoryBackend>) {
    let backend = Arc::new(MemoryBackend::new());
    let cache = ProfileCache::new(backend.clone());
    (ProfileService::new(users, cache, PROFILE_TTL), backend)
}

pub fn sample_profile(username: &str) -> ProfileRecord {
    ProfileRecord {
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
        username: username.to_string(),
        email: format!("{username}@example.com"),
        profile_pic: String::new(),
    }
}
