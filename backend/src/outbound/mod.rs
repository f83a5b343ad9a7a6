//! Outbound adapters implementing the domain ports.
//!
//! - **persistence**: SQLite repositories via sqlx
//! - **memory**: process-local repositories for DSN-less runs
//!
//! Adapters translate between domain types and storage representations and
//! contain no business logic.

pub mod memory;
pub mod persistence;
