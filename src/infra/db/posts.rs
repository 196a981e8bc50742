use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{PostsRepo, RepoError};
use crate::domain::entities::{FeedEntry, PostRecord};

use super::PostgresStores;
use super::map_sqlx_error;

/// Delete-then-conditionally-insert in one statement, so concurrent toggles
/// for the same (post, actor) cannot both insert. The insert's row count is
/// the outcome: 1 means the interaction now exists.
const TOGGLE_LIKE_SQL: &str = "\
    WITH removed AS ( \
        DELETE FROM likes WHERE post_id = $1 AND username = $2 RETURNING 1 \
    ) \
    INSERT INTO likes (post_id, username) \
    SELECT $1, $2 \
    WHERE NOT EXISTS (SELECT 1 FROM removed) \
    ON CONFLICT DO NOTHING";

const TOGGLE_RETWEET_SQL: &str = "\
    WITH removed AS ( \
        DELETE FROM retweets WHERE post_id = $1 AND username = $2 RETURNING 1 \
    ) \
    INSERT INTO retweets (post_id, username) \
    SELECT $1, $2 \
    WHERE NOT EXISTS (SELECT 1 FROM removed) \
    ON CONFLICT DO NOTHING";

#[derive(sqlx::FromRow)]
struct FeedRow {
    post_id: Uuid,
    content: String,
    created_at: OffsetDateTime,
    like_count: i64,
    retweet_count: i64,
    self_liked: bool,
    self_retweeted: bool,
    author: String,
    first_name: String,
    last_name: String,
    profile_pic: String,
}

impl From<FeedRow> for FeedEntry {
    fn from(row: FeedRow) -> Self {
        FeedEntry {
            post_id: row.post_id,
            content: row.content,
            created_at: row.created_at,
            like_count: row.like_count,
            retweet_count: row.retweet_count,
            self_liked: row.self_liked,
            self_retweeted: row.self_retweeted,
            author: row.author,
            first_name: row.first_name,
            last_name: row.last_name,
            profile_pic: row.profile_pic,
        }
    }
}

#[async_trait]
impl PostsRepo for PostgresStores {
    async fn append_post(&self, author: &str, content: &str) -> Result<PostRecord, RepoError> {
        let (post_id, created_at) = sqlx::query_as::<_, (Uuid, OffsetDateTime)>(
            "INSERT INTO posts (author, content) VALUES ($1, $2) \
             RETURNING post_id, created_at",
        )
        .bind(author)
        .bind(content)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(PostRecord {
            post_id,
            created_at,
        })
    }

    async fn toggle_like(&self, post_id: Uuid, actor: &str) -> Result<bool, RepoError> {
        let result = sqlx::query(TOGGLE_LIKE_SQL)
            .bind(post_id)
            .bind(actor)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() == 1)
    }

    async fn toggle_retweet(&self, post_id: Uuid, actor: &str) -> Result<bool, RepoError> {
        let result = sqlx::query(TOGGLE_RETWEET_SQL)
            .bind(post_id)
            .bind(actor)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() == 1)
    }

    async fn add_like(&self, post_id: Uuid, actor: &str) -> Result<u64, RepoError> {
        let result = sqlx::query(
            "INSERT INTO likes (post_id, username) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(post_id)
        .bind(actor)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(result.rows_affected())
    }

    async fn delete_like(&self, post_id: Uuid, actor: &str) -> Result<u64, RepoError> {
        let result = sqlx::query("DELETE FROM likes WHERE post_id = $1 AND username = $2")
            .bind(post_id)
            .bind(actor)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected())
    }

    async fn add_retweet(&self, post_id: Uuid, actor: &str) -> Result<u64, RepoError> {
        let result = sqlx::query(
            "INSERT INTO retweets (post_id, username) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(post_id)
        .bind(actor)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(result.rows_affected())
    }

    async fn delete_retweet(&self, post_id: Uuid, actor: &str) -> Result<u64, RepoError> {
        let result = sqlx::query("DELETE FROM retweets WHERE post_id = $1 AND username = $2")
            .bind(post_id)
            .bind(actor)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected())
    }

    async fn delete_post(&self, post_id: Uuid) -> Result<u64, RepoError> {
        // Interaction rows go with the post via ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM posts WHERE post_id = $1")
            .bind(post_id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected())
    }

    async fn feed_for_author(
        &self,
        author: &str,
        viewer: &str,
    ) -> Result<Vec<FeedEntry>, RepoError> {
        let rows = sqlx::query_as::<_, FeedRow>(
            "SELECT p.post_id, p.content, p.created_at, \
                    (SELECT COUNT(*) FROM likes l WHERE l.post_id = p.post_id) AS like_count, \
                    (SELECT COUNT(*) FROM retweets r WHERE r.post_id = p.post_id) AS retweet_count, \
                    EXISTS (SELECT 1 FROM likes l \
                            WHERE l.post_id = p.post_id AND l.username = $2) AS self_liked, \
                    EXISTS (SELECT 1 FROM retweets r \
                            WHERE r.post_id = p.post_id AND r.username = $2) AS self_retweeted, \
                    p.author, u.first_name, u.last_name, u.profile_pic \
             FROM posts p \
             INNER JOIN users u ON u.username = p.author \
             WHERE p.author = $1 \
             ORDER BY p.created_at DESC",
        )
        .bind(author)
        .bind(viewer)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(FeedEntry::from).collect())
    }

    async fn fetch_content(&self, ids: &[Uuid]) -> Result<Vec<(Uuid, String)>, RepoError> {
        sqlx::query_as::<_, (Uuid, String)>(
            "SELECT post_id, content FROM posts WHERE post_id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn fetch_created_at(
        &self,
        ids: &[Uuid],
    ) -> Result<Vec<(Uuid, OffsetDateTime)>, RepoError> {
        sqlx::query_as::<_, (Uuid, OffsetDateTime)>(
            "SELECT post_id, created_at FROM posts WHERE post_id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn fetch_like_counts(&self, ids: &[Uuid]) -> Result<Vec<(Uuid, i64)>, RepoError> {
        // Derived from posts so that zero-interaction posts report (id, 0)
        // instead of being absent, which keeps zeros cacheable.
        sqlx::query_as::<_, (Uuid, i64)>(
            "SELECT p.post_id, \
                    (SELECT COUNT(*) FROM likes l WHERE l.post_id = p.post_id) \
             FROM posts p WHERE p.post_id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn fetch_retweet_counts(&self, ids: &[Uuid]) -> Result<Vec<(Uuid, i64)>, RepoError> {
        sqlx::query_as::<_, (Uuid, i64)>(
            "SELECT p.post_id, \
                    (SELECT COUNT(*) FROM retweets r WHERE r.post_id = p.post_id) \
             FROM posts p WHERE p.post_id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn fetch_self_liked(
        &self,
        ids: &[Uuid],
        viewer: &str,
    ) -> Result<Vec<(Uuid, bool)>, RepoError> {
        sqlx::query_as::<_, (Uuid, bool)>(
            "SELECT p.post_id, \
                    EXISTS (SELECT 1 FROM likes l \
                            WHERE l.post_id = p.post_id AND l.username = $2) \
             FROM posts p WHERE p.post_id = ANY($1)",
        )
        .bind(ids)
        .bind(viewer)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn fetch_self_retweeted(
        &self,
        ids: &[Uuid],
        viewer: &str,
    ) -> Result<Vec<(Uuid, bool)>, RepoError> {
        sqlx::query_as::<_, (Uuid, bool)>(
            "SELECT p.post_id, \
                    EXISTS (SELECT 1 FROM retweets r \
                            WHERE r.post_id = p.post_id AND r.username = $2) \
             FROM posts p WHERE p.post_id = ANY($1)",
        )
        .bind(ids)
        .bind(viewer)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn fetch_owners(&self, ids: &[Uuid]) -> Result<Vec<(Uuid, String)>, RepoError> {
        sqlx::query_as::<_, (Uuid, String)>(
            "SELECT post_id, author FROM posts WHERE post_id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn fetch_first_names(&self, ids: &[Uuid]) -> Result<Vec<(Uuid, String)>, RepoError> {
        sqlx::query_as::<_, (Uuid, String)>(
            "SELECT p.post_id, u.first_name \
             FROM posts p INNER JOIN users u ON u.username = p.author \
             WHERE p.post_id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn fetch_last_names(&self, ids: &[Uuid]) -> Result<Vec<(Uuid, String)>, RepoError> {
        sqlx::query_as::<_, (Uuid, String)>(
            "SELECT p.post_id, u.last_name \
             FROM posts p INNER JOIN users u ON u.username = p.author \
             WHERE p.post_id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn fetch_profile_pics(&self, ids: &[Uuid]) -> Result<Vec<(Uuid, String)>, RepoError> {
        sqlx::query_as::<_, (Uuid, String)>(
            "SELECT p.post_id, u.profile_pic \
             FROM posts p INNER JOIN users u ON u.username = p.author \
             WHERE p.post_id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)
    }
}
