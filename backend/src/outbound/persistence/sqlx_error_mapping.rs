//! Shared sqlx error mapping for repositories with basic query semantics.

use tracing::debug;

/// Map a sqlx error onto a repository's query/connection constructors.
///
/// Driver messages are logged at debug level and replaced with fixed text so
/// SQL fragments never reach the domain layer.
pub fn map_basic_sqlx_error<E, Q, C>(error: sqlx::Error, query: Q, connection: C) -> E
where
    Q: Fn(&'static str) -> E,
    C: Fn(&'static str) -> E,
{
    match &error {
        sqlx::Error::Database(db) => {
            debug!(code = ?db.code(), message = db.message(), "sqlite operation failed");
        }
        other => debug!(error = %other, "sqlite operation failed"),
    }

    match error {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            connection("database connection error")
        }
        sqlx::Error::RowNotFound => query("record not found"),
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => query("row decode error"),
        _ => query("database error"),
    }
}

/// Whether `error` is a uniqueness constraint violation.
pub fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(db) if db.is_unique_violation())
}
