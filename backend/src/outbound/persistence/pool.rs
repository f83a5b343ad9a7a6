//! SQLite connection pool and schema bootstrap.
//!
//! Wraps `sqlx`'s pool so repositories depend on [`DbPool`] only. The schema
//! is created idempotently when the pool is built.

use std::str::FromStr;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS snippets (
    id TEXT PRIMARY KEY NOT NULL,
    title TEXT NOT NULL,
    content TEXT NOT NULL,
    created_at TEXT NOT NULL,
    expires_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_snippets_created ON snippets(created_at);

CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,
    hashed_password TEXT NOT NULL,
    created_at TEXT NOT NULL
);
";

/// Errors that can occur during pool operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    /// The DSN could not be parsed or the database could not be opened.
    #[error("failed to build connection pool: {message}")]
    Build { message: String },

    /// Schema creation failed.
    #[error("failed to initialise schema: {message}")]
    Schema { message: String },
}

impl PoolError {
    pub fn build(message: impl Into<String>) -> Self {
        Self::Build {
            message: message.into(),
        }
    }

    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
        }
    }
}

/// Configuration for the database connection pool.
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use snippetbox::outbound::persistence::PoolConfig;
///
/// let config = PoolConfig::new("sqlite://snippetbox.db")
///     .with_max_connections(4)
///     .with_acquire_timeout(Duration::from_secs(5));
/// assert_eq!(config.dsn(), "sqlite://snippetbox.db");
/// ```
#[derive(Debug, Clone)]
pub struct PoolConfig {
    dsn: String,
    max_connections: u32,
    acquire_timeout: Duration,
}

impl PoolConfig {
    /// Defaults: 5 connections, 30 second acquire timeout.
    pub fn new(dsn: impl Into<String>) -> Self {
        Self {
            dsn: dsn.into(),
            max_connections: 5,
            acquire_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections.max(1);
        self
    }

    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    pub fn dsn(&self) -> &str {
        &self.dsn
    }
}

/// Shared SQLite pool.
#[derive(Clone, Debug)]
pub struct DbPool {
    inner: SqlitePool,
}

impl DbPool {
    /// Open the database (creating the file if needed) and apply the schema.
    ///
    /// # Errors
    ///
    /// [`PoolError::Build`] when the DSN is invalid or the database cannot be
    /// opened; [`PoolError::Schema`] when table creation fails.
    pub async fn new(config: PoolConfig) -> Result<Self, PoolError> {
        let options = SqliteConnectOptions::from_str(&config.dsn)
            .map_err(|err| PoolError::build(err.to_string()))?
            .create_if_missing(true);

        let inner = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect_with(options)
            .await
            .map_err(|err| PoolError::build(err.to_string()))?;

        sqlx::query(SCHEMA)
            .execute(&inner)
            .await
            .map_err(|err| PoolError::schema(err.to_string()))?;

        Ok(Self { inner })
    }

    pub(crate) fn inner(&self) -> &SqlitePool {
        &self.inner
    }
}
