//! SQLite-backed `UserRepository`.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use tracing::warn;

use crate::domain::password::{PasswordHashError, PasswordHasher};
use crate::domain::ports::{UserRepository, UserRepositoryError};
use crate::domain::{NewUser, UserId};

use super::pool::DbPool;
use super::sqlx_error_mapping::{is_unique_violation, map_basic_sqlx_error};

#[derive(sqlx::FromRow)]
struct CredentialRow {
    id: String,
    hashed_password: String,
}

fn map_sqlx_error(error: sqlx::Error) -> UserRepositoryError {
    map_basic_sqlx_error(
        error,
        UserRepositoryError::query,
        UserRepositoryError::connection,
    )
}

/// Account store over the `users` table.
#[derive(Clone)]
pub struct SqliteUserRepository {
    pool: DbPool,
    clock: Arc<dyn Clock>,
    hasher: PasswordHasher,
}

impl SqliteUserRepository {
    pub fn new(pool: DbPool, clock: Arc<dyn Clock>) -> Self {
        Self {
            pool,
            clock,
            hasher: PasswordHasher::default(),
        }
    }

    /// Replace the password hasher; tests use a low round count.
    pub fn with_hasher(mut self, hasher: PasswordHasher) -> Self {
        self.hasher = hasher;
        self
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn insert(&self, user: &NewUser) -> Result<UserId, UserRepositoryError> {
        let id = UserId::random();
        let hashed = self
            .hasher
            .hash_blocking(&user.password)
            .await
            .map_err(|err| UserRepositoryError::query(err.to_string()))?;
        sqlx::query(
            "INSERT INTO users (id, name, email, hashed_password, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(&user.name)
        .bind(&user.email)
        .bind(hashed)
        .bind(self.clock.utc())
        .execute(self.pool.inner())
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                UserRepositoryError::duplicate_email()
            } else {
                map_sqlx_error(err)
            }
        })?;
        Ok(id)
    }

    async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<UserId, UserRepositoryError> {
        let row: Option<CredentialRow> =
            sqlx::query_as("SELECT id, hashed_password FROM users WHERE email = ?")
                .bind(email)
                .fetch_optional(self.pool.inner())
                .await
                .map_err(map_sqlx_error)?;
        let Some(row) = row else {
            return Err(UserRepositoryError::invalid_credentials());
        };

        match self.hasher.verify_blocking(password, row.hashed_password).await {
            Ok(true) => UserId::new(&row.id)
                .map_err(|err| UserRepositoryError::query(format!("stored user id: {err}"))),
            Ok(false) => Err(UserRepositoryError::invalid_credentials()),
            Err(err @ PasswordHashError::Task(_)) => Err(UserRepositoryError::query(err.to_string())),
            Err(err) => {
                warn!(error = %err, "stored password hash is unreadable");
                Err(UserRepositoryError::invalid_credentials())
            }
        }
    }

    async fn exists(&self, id: &UserId) -> Result<bool, UserRepositoryError> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE id = ?)")
            .bind(id.to_string())
            .fetch_one(self.pool.inner())
            .await
            .map_err(map_sqlx_error)
    }
}
