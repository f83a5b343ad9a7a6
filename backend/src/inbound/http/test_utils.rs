//! Test helpers for inbound HTTP components.

use std::sync::Arc;

use actix_session::SessionMiddleware;
use actix_web::cookie::Cookie;
use actix_web::cookie::time::Duration;
use actix_web::dev::ServiceResponse;
use mockable::DefaultClock;

use super::session_config::{SESSION_COOKIE_NAME, SessionSettings};
use super::session_store::MemorySessionStore;

/// Build a session middleware configured for tests.
///
/// - Backs sessions with a fresh [`MemorySessionStore`] per invocation.
/// - Disables the `Secure` flag for local HTTP tests.
pub fn test_session_middleware() -> SessionMiddleware<MemorySessionStore> {
    SessionSettings::for_tests(Duration::hours(12))
        .middleware(MemorySessionStore::new(Arc::new(DefaultClock)))
}

/// The session cookie set on `res`, if any.
pub fn session_cookie<B>(res: &ServiceResponse<B>) -> Option<Cookie<'static>> {
    res.response()
        .cookies()
        .find(|cookie| cookie.name() == SESSION_COOKIE_NAME)
        .map(|cookie| cookie.into_owned())
}
