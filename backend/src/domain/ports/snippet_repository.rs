//! Port for snippet storage.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use crate::domain::{Error, Snippet, SnippetDraft, SnippetId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by snippet repository adapters.
    pub enum SnippetRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "snippet repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "snippet repository query failed: {message}",
    }
}

impl From<SnippetRepositoryError> for Error {
    fn from(err: SnippetRepositoryError) -> Self {
        Self::internal_from(err)
    }
}

/// Row store for snippets. Expired rows are never returned.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SnippetRepository: Send + Sync {
    /// Store a new snippet and return its identifier.
    async fn insert(&self, draft: &SnippetDraft) -> Result<SnippetId, SnippetRepositoryError>;

    /// Fetch an unexpired snippet.
    async fn get_by_id(&self, id: &SnippetId) -> Result<Option<Snippet>, SnippetRepositoryError>;

    /// Up to [`crate::domain::RECENT_SNIPPETS_LIMIT`] unexpired snippets,
    /// newest first.
    async fn list_recent(&self) -> Result<Vec<Snippet>, SnippetRepositoryError>;
}

/// Identifier of the single snippet served by [`FixtureSnippetRepository`].
pub const FIXTURE_SNIPPET_ID: Uuid = Uuid::from_u128(0x3fa8_5f64_5717_4562_b3fc_2c96_3f66_afa6);

/// Deterministic repository for handler and integration tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureSnippetRepository;

impl FixtureSnippetRepository {
    fn snippet() -> Snippet {
        let created_at = fixed_time(2022, 1, 1);
        Snippet {
            id: SnippetId::from_uuid(FIXTURE_SNIPPET_ID),
            title: "An old silent pond".to_owned(),
            content: "An old silent pond...".to_owned(),
            created_at,
            expires_at: fixed_time(9999, 1, 1),
        }
    }
}

fn fixed_time(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 10, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

#[async_trait]
impl SnippetRepository for FixtureSnippetRepository {
    async fn insert(&self, _draft: &SnippetDraft) -> Result<SnippetId, SnippetRepositoryError> {
        Ok(SnippetId::from_uuid(FIXTURE_SNIPPET_ID))
    }

    async fn get_by_id(&self, id: &SnippetId) -> Result<Option<Snippet>, SnippetRepositoryError> {
        if *id.as_uuid() == FIXTURE_SNIPPET_ID {
            Ok(Some(Self::snippet()))
        } else {
            Ok(None)
        }
    }

    async fn list_recent(&self) -> Result<Vec<Snippet>, SnippetRepositoryError> {
        Ok(vec![Self::snippet()])
    }
}
