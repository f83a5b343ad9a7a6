//! Port for user accounts and credential checks.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Error, NewUser, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by user repository adapters.
    pub enum UserRepositoryError {
        /// The email address belongs to another account.
        DuplicateEmail => "email address is already in use",
        /// Unknown email or wrong password.
        InvalidCredentials => "invalid credentials",
        /// Repository connection could not be established.
        Connection { message: String } => "user repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "user repository query failed: {message}",
    }
}

impl From<UserRepositoryError> for Error {
    fn from(err: UserRepositoryError) -> Self {
        match err {
            UserRepositoryError::DuplicateEmail => Self::already_exists(err.to_string()),
            UserRepositoryError::InvalidCredentials => Self::unauthenticated(err.to_string()),
            UserRepositoryError::Connection { .. } | UserRepositoryError::Query { .. } => {
                Self::internal_from(err)
            }
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create an account, hashing the password before it is stored.
    async fn insert(&self, user: &NewUser) -> Result<UserId, UserRepositoryError>;

    /// Resolve credentials to the owning account.
    async fn authenticate(&self, email: &str, password: &str)
    -> Result<UserId, UserRepositoryError>;

    /// Whether the account still exists.
    async fn exists(&self, id: &UserId) -> Result<bool, UserRepositoryError>;
}

/// Identifier of the only account known to [`FixtureUserRepository`].
pub const FIXTURE_USER_ID: Uuid = Uuid::from_u128(0x123e_4567_e89b_12d3_a456_4266_1417_4000);

/// Email that [`FixtureUserRepository::insert`] treats as taken.
pub const FIXTURE_DUPLICATE_EMAIL: &str = "dupe@example.com";

/// Credentials accepted by [`FixtureUserRepository::authenticate`].
pub const FIXTURE_EMAIL: &str = "alice@example.com";
pub const FIXTURE_PASSWORD: &str = "pa$$word";

/// Deterministic account store for handler and integration tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureUserRepository;

#[async_trait]
impl UserRepository for FixtureUserRepository {
    async fn insert(&self, user: &NewUser) -> Result<UserId, UserRepositoryError> {
        if user.email == FIXTURE_DUPLICATE_EMAIL {
            Err(UserRepositoryError::duplicate_email())
        } else {
            Ok(UserId::from_uuid(FIXTURE_USER_ID))
        }
    }

    async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<UserId, UserRepositoryError> {
        if email == FIXTURE_EMAIL && password == FIXTURE_PASSWORD {
            Ok(UserId::from_uuid(FIXTURE_USER_ID))
        } else {
            Err(UserRepositoryError::invalid_credentials())
        }
    }

    async fn exists(&self, id: &UserId) -> Result<bool, UserRepositoryError> {
        Ok(*id.as_uuid() == FIXTURE_USER_ID)
    }
}
