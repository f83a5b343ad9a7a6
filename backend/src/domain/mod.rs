//! Domain primitives, validation, and ports.
//!
//! Everything here is transport agnostic. The HTTP adapter maps [`Error`]
//! codes to statuses and renders [`Validator`] output into pages; storage
//! adapters implement the traits in [`ports`].

pub mod auth;
pub mod error;
pub mod password;
pub mod ports;
pub mod snippet;
pub mod user;
pub mod validation;

pub use self::auth::AuthContext;
pub use self::error::{Error, ErrorCode, ErrorDetail, FieldViolation, INTERNAL_MESSAGE};
pub use self::snippet::{
    Expiry, RECENT_SNIPPETS_LIMIT, Snippet, SnippetDraft, SnippetId, UnsupportedExpiry,
};
pub use self::user::{NewUser, UserId, UserValidationError};
pub use self::validation::Validator;
