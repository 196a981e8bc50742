use async_trait::async_trait;
use uuid::Uuid;

use crate::application::repos::{RepoError, UsersRepo};
use crate::domain::entities::{NewUser, ProfileRecord, UserAccount};

use super::PostgresStores;
use super::map_sqlx_error;

#[derive(sqlx::FromRow)]
struct ProfileRow {
    first_name: String,
    last_name: String,
    username: String,
    email: String,
    profile_pic: String,
}

impl From<ProfileRow> for ProfileRecord {
    fn from(row: ProfileRow) -> Self {
        ProfileRecord {
            first_name: row.first_name,
            last_name: row.last_name,
            username: row.username,
            email: row.email,
            profile_pic: row.profile_pic,
        }
    }
}

#[derive(sqlx::FromRow)]
struct AccountRow {
    user_id: Uuid,
    username: String,
    email: String,
    password_hash: String,
}

impl From<AccountRow> for UserAccount {
    fn from(row: AccountRow) -> Self {
        UserAccount {
            user_id: row.user_id,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
        }
    }
}

#[async_trait]
impl UsersRepo for PostgresStores {
    async fn profile_by_id(&self, user_id: Uuid) -> Result<Option<ProfileRecord>, RepoError> {
        let row = sqlx::query_as::<_, ProfileRow>(
            "SELECT first_name, last_name, username, email, profile_pic \
             FROM users WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(ProfileRecord::from))
    }

    async fn find_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<UserAccount>, RepoError> {
        let row = sqlx::query_as::<_, AccountRow>(
            "SELECT user_id, username, email, password_hash \
             FROM users WHERE username = $1 OR email = $2 \
             LIMIT 1",
        )
        .bind(username)
        .bind(email)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(UserAccount::from))
    }

    async fn create_user(&self, user: NewUser) -> Result<Uuid, RepoError> {
        let (user_id,) = sqlx::query_as::<_, (Uuid,)>(
            "INSERT INTO users \
                 (username, first_name, last_name, email, password_hash, profile_pic) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING user_id",
        )
        .bind(&user.username)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.profile_pic)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(user_id)
    }

    async fn delete_user(&self, user_id: Uuid) -> Result<u64, RepoError> {
        // The user's posts, likes and retweets cascade with the row.
        let result = sqlx::query("DELETE FROM users WHERE user_id = $1")
            .bind(user_id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected())
    }
}
