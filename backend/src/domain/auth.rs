//! Per-request authentication state.

use super::UserId;

/// Authentication state derived fresh for every request.
///
/// Built by the authentication middleware from the session and the user
/// store; never cached beyond the request that produced it.
///
/// # Examples
/// ```
/// use snippetbox::domain::{AuthContext, UserId};
///
/// assert!(!AuthContext::anonymous().is_authenticated());
/// let ctx = AuthContext::authenticated(UserId::random());
/// assert!(ctx.is_authenticated());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthContext {
    user_id: Option<UserId>,
}

impl AuthContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }

    /// Identifier of the authenticated user, if any.
    pub fn user_id(&self) -> Option<&UserId> {
        self.user_id.as_ref()
    }
}
