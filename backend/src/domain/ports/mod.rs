//! Driven ports at the hexagonal boundary.
//!
//! Inbound adapters depend on these traits only; the SQLite and in-memory
//! adapters in `outbound` implement them.

mod macros;
pub(crate) use macros::define_port_error;

mod snippet_repository;
mod user_repository;

#[cfg(test)]
pub use snippet_repository::MockSnippetRepository;
pub use snippet_repository::{
    FIXTURE_SNIPPET_ID, FixtureSnippetRepository, SnippetRepository, SnippetRepositoryError,
};
#[cfg(test)]
pub use user_repository::MockUserRepository;
pub use user_repository::{
    FIXTURE_DUPLICATE_EMAIL, FIXTURE_EMAIL, FIXTURE_PASSWORD, FIXTURE_USER_ID,
    FixtureUserRepository, UserRepository, UserRepositoryError,
};
