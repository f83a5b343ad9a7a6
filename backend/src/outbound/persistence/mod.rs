//! SQLite persistence adapters using sqlx.
//!
//! Repository implementations only translate between rows and domain types.
//! Row structs stay private to this module and every driver error is mapped
//! to the port's error enum.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use snippetbox::outbound::persistence::{DbPool, PoolConfig, SqliteSnippetRepository};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = DbPool::new(PoolConfig::new("sqlite://snippetbox.db")).await?;
//! let snippets = SqliteSnippetRepository::new(pool, Arc::new(mockable::DefaultClock));
//! # let _ = snippets;
//! # Ok(())
//! # }
//! ```

mod pool;
mod sqlite_snippet_repository;
mod sqlite_user_repository;
mod sqlx_error_mapping;

pub use pool::{DbPool, PoolConfig, PoolError};
pub use sqlite_snippet_repository::SqliteSnippetRepository;
pub use sqlite_user_repository::SqliteUserRepository;
