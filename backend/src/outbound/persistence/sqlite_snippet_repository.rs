//! SQLite-backed `SnippetRepository`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockable::Clock;
use uuid::Uuid;

use crate::domain::ports::{SnippetRepository, SnippetRepositoryError};
use crate::domain::{RECENT_SNIPPETS_LIMIT, Snippet, SnippetDraft, SnippetId};

use super::pool::DbPool;
use super::sqlx_error_mapping::map_basic_sqlx_error;

#[derive(sqlx::FromRow)]
struct SnippetRow {
    id: String,
    title: String,
    content: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl TryFrom<SnippetRow> for Snippet {
    type Error = SnippetRepositoryError;

    fn try_from(row: SnippetRow) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&row.id)
            .map_err(|err| SnippetRepositoryError::query(format!("stored snippet id: {err}")))?;
        Ok(Self {
            id: SnippetId::from_uuid(id),
            title: row.title,
            content: row.content,
            created_at: row.created_at,
            expires_at: row.expires_at,
        })
    }
}

fn map_sqlx_error(error: sqlx::Error) -> SnippetRepositoryError {
    map_basic_sqlx_error(
        error,
        SnippetRepositoryError::query,
        SnippetRepositoryError::connection,
    )
}

/// Snippet store over the `snippets` table.
#[derive(Clone)]
pub struct SqliteSnippetRepository {
    pool: DbPool,
    clock: Arc<dyn Clock>,
}

impl SqliteSnippetRepository {
    pub fn new(pool: DbPool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }
}

#[async_trait]
impl SnippetRepository for SqliteSnippetRepository {
    async fn insert(&self, draft: &SnippetDraft) -> Result<SnippetId, SnippetRepositoryError> {
        let id = SnippetId::random();
        let now = self.clock.utc();
        sqlx::query(
            "INSERT INTO snippets (id, title, content, created_at, expires_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(&draft.title)
        .bind(&draft.content)
        .bind(now)
        .bind(draft.expiry.expires_at(now))
        .execute(self.pool.inner())
        .await
        .map_err(map_sqlx_error)?;
        Ok(id)
    }

    async fn get_by_id(&self, id: &SnippetId) -> Result<Option<Snippet>, SnippetRepositoryError> {
        let row: Option<SnippetRow> = sqlx::query_as(
            "SELECT id, title, content, created_at, expires_at FROM snippets \
             WHERE id = ? AND expires_at > ?",
        )
        .bind(id.to_string())
        .bind(self.clock.utc())
        .fetch_optional(self.pool.inner())
        .await
        .map_err(map_sqlx_error)?;
        row.map(Snippet::try_from).transpose()
    }

    async fn list_recent(&self) -> Result<Vec<Snippet>, SnippetRepositoryError> {
        let limit = i64::try_from(RECENT_SNIPPETS_LIMIT).unwrap_or(i64::MAX);
        let rows: Vec<SnippetRow> = sqlx::query_as(
            "SELECT id, title, content, created_at, expires_at FROM snippets \
             WHERE expires_at > ? ORDER BY created_at DESC LIMIT ?",
        )
        .bind(self.clock.utc())
        .bind(limit)
        .fetch_all(self.pool.inner())
        .await
        .map_err(map_sqlx_error)?;
        rows.into_iter().map(Snippet::try_from).collect()
    }
}
