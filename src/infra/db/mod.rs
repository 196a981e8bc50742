//! Postgres-backed repository implementations.

mod posts;
mod users;

use std::sync::Arc;

use sqlx::{
    postgres::{PgPool, PgPoolOptions},
    query,
};

use crate::application::repos::RepoError;
use crate::config::DatabaseSettings;
use crate::infra::error::InfraError;

#[derive(Clone)]
pub struct PostgresStores {
    pool: Arc<PgPool>,
}

impl PostgresStores {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Connect a pool from resolved settings. Migrations are not run here;
    /// call [`run_migrations`] when the deployment owns the schema.
    ///
    /// [`run_migrations`]: PostgresStores::run_migrations
    pub async fn from_settings(settings: &DatabaseSettings) -> Result<Self, InfraError> {
        let url = settings
            .url
            .as_deref()
            .ok_or_else(|| InfraError::configuration("database.url must be set"))?;
        let pool = Self::connect(url, settings.max_connections.get())
            .await
            .map_err(|err| InfraError::database(format!("failed to connect: {err}")))?;
        Ok(Self::new(pool))
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
    }

    pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        query("SELECT 1").execute(self.pool()).await.map(|_| ())
    }
}

/// Classify driver errors into the repository taxonomy. Postgres reports
/// constraint problems through the message text, so the matching is on
/// well-known fragments.
pub fn map_sqlx_error(err: sqlx::Error) -> RepoError {
    match err {
        sqlx::Error::RowNotFound => RepoError::NotFound,
        // Concurrent gap fills can exhaust the pool; acquire timeouts arrive
        // as their own variant, not as a database error.
        sqlx::Error::PoolTimedOut => RepoError::Timeout,
        // Unique violations also say "violates"; they must classify first.
        sqlx::Error::Database(db) if db.message().contains("duplicate key") => {
            RepoError::Duplicate {
                constraint: db.constraint().unwrap_or("unknown").to_string(),
            }
        }
        sqlx::Error::Database(db)
            if db.message().contains("violates")
                || db.message().contains("invalid input syntax") =>
        {
            RepoError::InvalidInput {
                message: db.message().to_string(),
            }
        }
        sqlx::Error::Database(db)
            if db
                .message()
                .contains("canceling statement due to user request") =>
        {
            RepoError::Timeout
        }
        other => RepoError::from_persistence(other),
    }
}
