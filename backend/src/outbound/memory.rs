//! Process-local repositories used when no database DSN is configured.
//!
//! State lives behind `RwLock`s and is lost on restart.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use mockable::Clock;

use crate::domain::password::{PasswordHashError, PasswordHasher};
use crate::domain::ports::{
    SnippetRepository, SnippetRepositoryError, UserRepository, UserRepositoryError,
};
use crate::domain::{NewUser, RECENT_SNIPPETS_LIMIT, Snippet, SnippetDraft, SnippetId, UserId};

const POISONED: &str = "in-memory store lock poisoned";

/// Snippet store backed by a `HashMap`.
#[derive(Clone)]
pub struct InMemorySnippetRepository {
    rows: Arc<RwLock<HashMap<SnippetId, Snippet>>>,
    clock: Arc<dyn Clock>,
}

impl InMemorySnippetRepository {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            rows: Arc::default(),
            clock,
        }
    }
}

#[async_trait]
impl SnippetRepository for InMemorySnippetRepository {
    async fn insert(&self, draft: &SnippetDraft) -> Result<SnippetId, SnippetRepositoryError> {
        let now = self.clock.utc();
        let snippet = Snippet {
            id: SnippetId::random(),
            title: draft.title.clone(),
            content: draft.content.clone(),
            created_at: now,
            expires_at: draft.expiry.expires_at(now),
        };
        let id = snippet.id;
        self.rows
            .write()
            .map_err(|_| SnippetRepositoryError::query(POISONED))?
            .insert(id, snippet);
        Ok(id)
    }

    async fn get_by_id(&self, id: &SnippetId) -> Result<Option<Snippet>, SnippetRepositoryError> {
        let now = self.clock.utc();
        let rows = self
            .rows
            .read()
            .map_err(|_| SnippetRepositoryError::query(POISONED))?;
        Ok(rows.get(id).filter(|s| s.is_live_at(now)).cloned())
    }

    async fn list_recent(&self) -> Result<Vec<Snippet>, SnippetRepositoryError> {
        let now = self.clock.utc();
        let rows = self
            .rows
            .read()
            .map_err(|_| SnippetRepositoryError::query(POISONED))?;
        let mut live: Vec<Snippet> = rows.values().filter(|s| s.is_live_at(now)).cloned().collect();
        live.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        live.truncate(RECENT_SNIPPETS_LIMIT);
        Ok(live)
    }
}

struct StoredUser {
    id: UserId,
    hashed_password: String,
}

/// Account store keyed by email address.
#[derive(Clone)]
pub struct InMemoryUserRepository {
    by_email: Arc<RwLock<HashMap<String, StoredUser>>>,
    hasher: PasswordHasher,
}

impl Default for InMemoryUserRepository {
    fn default() -> Self {
        Self {
            by_email: Arc::default(),
            hasher: PasswordHasher::default(),
        }
    }
}

impl InMemoryUserRepository {
    /// Replace the password hasher; tests use a low round count.
    pub fn with_hasher(mut self, hasher: PasswordHasher) -> Self {
        self.hasher = hasher;
        self
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn insert(&self, user: &NewUser) -> Result<UserId, UserRepositoryError> {
        let hashed_password = self
            .hasher
            .hash_blocking(&user.password)
            .await
            .map_err(|err| UserRepositoryError::query(err.to_string()))?;
        let mut users = self
            .by_email
            .write()
            .map_err(|_| UserRepositoryError::query(POISONED))?;
        if users.contains_key(&user.email) {
            return Err(UserRepositoryError::duplicate_email());
        }
        let id = UserId::random();
        users.insert(
            user.email.clone(),
            StoredUser {
                id: id.clone(),
                hashed_password,
            },
        );
        Ok(id)
    }

    async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<UserId, UserRepositoryError> {
        let (id, hashed_password) = {
            let users = self
                .by_email
                .read()
                .map_err(|_| UserRepositoryError::query(POISONED))?;
            let Some(stored) = users.get(email) else {
                return Err(UserRepositoryError::invalid_credentials());
            };
            (stored.id.clone(), stored.hashed_password.clone())
        };
        match self.hasher.verify_blocking(password, hashed_password).await {
            Ok(true) => Ok(id),
            Err(err @ PasswordHashError::Task(_)) => Err(UserRepositoryError::query(err.to_string())),
            Ok(false) | Err(_) => Err(UserRepositoryError::invalid_credentials()),
        }
    }

    async fn exists(&self, id: &UserId) -> Result<bool, UserRepositoryError> {
        let users = self
            .by_email
            .read()
            .map_err(|_| UserRepositoryError::query(POISONED))?;
        Ok(users.values().any(|stored| &stored.id == id))
    }
}

#[cfg(test)]
mod tests {
    use mockable::DefaultClock;
    use rstest::{fixture, rstest};

    use super::*;
    use crate::domain::Expiry;

    #[fixture]
    fn users() -> InMemoryUserRepository {
        InMemoryUserRepository::default().with_hasher(PasswordHasher::new(1_000))
    }

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "Bob".to_owned(),
            email: email.to_owned(),
            password: "correct horse".to_owned(),
        }
    }

    #[rstest]
    #[tokio::test]
    async fn snippets_round_trip_and_list_newest_first() {
        let repo = InMemorySnippetRepository::new(Arc::new(DefaultClock));
        let first = repo
            .insert(&SnippetDraft {
                title: "first".to_owned(),
                content: "a".to_owned(),
                expiry: Expiry::OneDay,
            })
            .await
            .expect("insert");
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        repo.insert(&SnippetDraft {
            title: "second".to_owned(),
            content: "b".to_owned(),
            expiry: Expiry::OneYear,
        })
        .await
        .expect("insert");

        let found = repo.get_by_id(&first).await.expect("lookup");
        assert_eq!(found.map(|s| s.title), Some("first".to_owned()));

        let titles: Vec<String> = repo
            .list_recent()
            .await
            .expect("list")
            .into_iter()
            .map(|s| s.title)
            .collect();
        assert_eq!(titles, ["second", "first"]);
    }

    #[rstest]
    #[tokio::test]
    async fn user_lifecycle(users: InMemoryUserRepository) {
        let id = users.insert(&new_user("bob@example.com")).await.expect("insert");
        assert!(users.exists(&id).await.expect("exists"));
        assert_eq!(
            users
                .authenticate("bob@example.com", "correct horse")
                .await
                .expect("authenticate"),
            id
        );
        assert_eq!(
            users.authenticate("bob@example.com", "wrong").await,
            Err(UserRepositoryError::InvalidCredentials)
        );
        assert_eq!(
            users.insert(&new_user("bob@example.com")).await,
            Err(UserRepositoryError::DuplicateEmail)
        );
    }
}
