//! Server-side session storage.
//!
//! The cookie carries an opaque random token; session state lives in a
//! process-local map with a per-entry expiry. Deleting an entry invalidates
//! its token, which is how `Session::renew` defeats fixation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use actix_session::storage::{LoadError, SaveError, SessionKey, SessionStore, UpdateError};
use actix_web::cookie::time::Duration;
use anyhow::anyhow;
use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;
use rand::Rng;
use rand::distributions::Alphanumeric;

const TOKEN_LEN: usize = 64;
const POISONED: &str = "session store lock poisoned";

type SessionState = HashMap<String, String>;

struct StoredSession {
    state: SessionState,
    expires_at: DateTime<Utc>,
}

/// In-memory [`SessionStore`] keyed by opaque tokens.
#[derive(Clone)]
pub struct MemorySessionStore {
    inner: Arc<RwLock<HashMap<String, StoredSession>>>,
    clock: Arc<dyn Clock>,
}

impl MemorySessionStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::default(),
            clock,
        }
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        let now = self.clock.utc();
        self.inner
            .read()
            .map(|map| map.values().filter(|s| s.expires_at > now).count())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn expiry(&self, ttl: &Duration) -> DateTime<Utc> {
        let now = self.clock.utc();
        TimeDelta::try_seconds(ttl.whole_seconds())
            .and_then(|delta| now.checked_add_signed(delta))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}

fn session_key(token: String) -> Result<SessionKey, anyhow::Error> {
    SessionKey::try_from(token).map_err(|error| anyhow!("invalid session key: {error}"))
}

impl SessionStore for MemorySessionStore {
    async fn load(&self, session_key: &SessionKey) -> Result<Option<SessionState>, LoadError> {
        let now = self.clock.utc();
        let map = self
            .inner
            .read()
            .map_err(|_| LoadError::Other(anyhow!(POISONED)))?;
        Ok(map
            .get(session_key.as_ref())
            .filter(|stored| stored.expires_at > now)
            .map(|stored| stored.state.clone()))
    }

    async fn save(
        &self,
        session_state: SessionState,
        ttl: &Duration,
    ) -> Result<SessionKey, SaveError> {
        let expires_at = self.expiry(ttl);
        let now = self.clock.utc();
        let mut map = self
            .inner
            .write()
            .map_err(|_| SaveError::Other(anyhow!(POISONED)))?;
        map.retain(|_, stored| stored.expires_at > now);

        let mut token = generate_token();
        while map.contains_key(&token) {
            token = generate_token();
        }
        map.insert(
            token.clone(),
            StoredSession {
                state: session_state,
                expires_at,
            },
        );
        session_key(token).map_err(SaveError::Other)
    }

    async fn update(
        &self,
        session_key: SessionKey,
        session_state: SessionState,
        ttl: &Duration,
    ) -> Result<SessionKey, UpdateError> {
        let expires_at = self.expiry(ttl);
        let now = self.clock.utc();
        {
            let mut map = self
                .inner
                .write()
                .map_err(|_| UpdateError::Other(anyhow!(POISONED)))?;
            if let Some(stored) = map
                .get_mut(session_key.as_ref())
                .filter(|stored| stored.expires_at > now)
            {
                stored.state = session_state;
                stored.expires_at = expires_at;
                return Ok(session_key);
            }
        }
        // The entry expired between load and save: issue a fresh token.
        self.save(session_state, ttl).await.map_err(|error| match error {
            SaveError::Serialization(e) => UpdateError::Serialization(e),
            SaveError::Other(e) => UpdateError::Other(e),
        })
    }

    async fn update_ttl(&self, session_key: &SessionKey, ttl: &Duration) -> Result<(), anyhow::Error> {
        let expires_at = self.expiry(ttl);
        let mut map = self.inner.write().map_err(|_| anyhow!(POISONED))?;
        if let Some(stored) = map.get_mut(session_key.as_ref()) {
            stored.expires_at = expires_at;
        }
        Ok(())
    }

    async fn delete(&self, session_key: &SessionKey) -> Result<(), anyhow::Error> {
        self.inner
            .write()
            .map_err(|_| anyhow!(POISONED))?
            .remove(session_key.as_ref());
        Ok(())
    }
}
