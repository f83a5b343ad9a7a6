//! Server construction: adapter selection and transport settings.

mod config;

pub use config::{ServerConfig, ServerSettings};

use std::sync::Arc;
use std::time::Duration;

use actix_web::HttpServer;
use actix_web::dev::Server;
use mockable::{Clock, DefaultClock};
use tracing::info;

use snippetbox::domain::ports::{SnippetRepository, UserRepository};
use snippetbox::inbound::http::session_store::MemorySessionStore;
use snippetbox::inbound::http::state::HttpState;
use snippetbox::inbound::http::templates::TemplateCache;
use snippetbox::inbound::http::{AppDependencies, build_app};
use snippetbox::outbound::memory::{InMemorySnippetRepository, InMemoryUserRepository};
use snippetbox::outbound::persistence::{SqliteSnippetRepository, SqliteUserRepository};

const KEEP_ALIVE: Duration = Duration::from_secs(60);
const CLIENT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
const CLIENT_DISCONNECT_TIMEOUT: Duration = Duration::from_secs(10);

type Repositories = (Arc<dyn SnippetRepository>, Arc<dyn UserRepository>);

/// SQLite repositories when a pool is configured, in-memory ones otherwise.
fn build_repositories(config: &ServerConfig, clock: &Arc<dyn Clock>) -> Repositories {
    match &config.db_pool {
        Some(pool) => (
            Arc::new(SqliteSnippetRepository::new(pool.clone(), clock.clone())),
            Arc::new(SqliteUserRepository::new(pool.clone(), clock.clone())),
        ),
        None => (
            Arc::new(InMemorySnippetRepository::new(clock.clone())),
            Arc::new(InMemoryUserRepository::default()),
        ),
    }
}

/// Construct the HTTP server described by `config`.
///
/// # Errors
/// Propagates [`std::io::Error`] when binding the socket fails.
pub fn create_server(config: ServerConfig) -> std::io::Result<Server> {
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let (snippets, users) = build_repositories(&config, &clock);
    let templates = Arc::new(TemplateCache::new());
    info!(pages = ?templates.names(), "template cache ready");

    let deps = AppDependencies::new(
        HttpState::new(snippets, users, templates, clock.clone()),
        config.session,
        MemorySessionStore::new(clock),
    );

    let server = HttpServer::new(move || build_app(deps.clone()))
        .keep_alive(KEEP_ALIVE)
        .client_request_timeout(CLIENT_REQUEST_TIMEOUT)
        .client_disconnect_timeout(CLIENT_DISCONNECT_TIMEOUT)
        .bind(config.bind_addr)?
        .run();
    Ok(server)
}
