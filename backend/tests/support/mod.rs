//! Shared helpers for integration tests driving the composed application.

use std::sync::Arc;

use actix_web::cookie::Cookie;
use actix_web::cookie::time::Duration;
use actix_web::dev::ServiceResponse;
use actix_web::http::header;
use actix_web::test::TestRequest;
use mockable::{Clock, DefaultClock};
use snippetbox::domain::ports::{FixtureSnippetRepository, FixtureUserRepository};
use snippetbox::inbound::http::AppDependencies;
use snippetbox::inbound::http::session_config::SessionSettings;
use snippetbox::inbound::http::session_store::MemorySessionStore;
use snippetbox::inbound::http::state::HttpState;
use snippetbox::inbound::http::templates::TemplateCache;

const CSRF_MARKER: &str = r#"name="csrf_token" value=""#;

/// Dependencies backed by the fixture repositories and `templates`.
pub fn deps_with(templates: TemplateCache) -> AppDependencies {
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    AppDependencies::new(
        HttpState::new(
            Arc::new(FixtureSnippetRepository),
            Arc::new(FixtureUserRepository),
            Arc::new(templates),
            clock.clone(),
        ),
        SessionSettings::for_tests(Duration::hours(12)),
        MemorySessionStore::new(clock),
    )
}

pub fn deps() -> AppDependencies {
    deps_with(TemplateCache::new())
}

pub fn session_cookie<B>(res: &ServiceResponse<B>) -> Option<Cookie<'static>> {
    res.response()
        .cookies()
        .find(|cookie| cookie.name() == "session")
        .map(|cookie| cookie.into_owned())
}

pub fn location<B>(res: &ServiceResponse<B>) -> Option<String> {
    res.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

/// First CSRF token embedded in a rendered form.
pub fn csrf_token(html: &str) -> Option<String> {
    let start = html.find(CSRF_MARKER)? + CSRF_MARKER.len();
    let end = html[start..].find('"')?;
    Some(html[start..start + end].to_owned())
}

/// URL-encoded POST to `uri` carrying `cookie`.
pub fn form_post(uri: &str, cookie: Cookie<'static>, fields: &[(&str, &str)]) -> TestRequest {
    let body = serde_urlencoded::to_string(fields).unwrap_or_default();
    TestRequest::post()
        .uri(uri)
        .cookie(cookie)
        .insert_header((header::CONTENT_TYPE, "application/x-www-form-urlencoded"))
        .set_payload(body)
}
