//! Snippetbox entry-point: loads settings, installs logging and serves HTTP.

mod server;

use std::io;

use actix_web::cookie::time::Duration;
use mockable::DefaultEnv;
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use server::{ServerConfig, ServerSettings, create_server};
use snippetbox::inbound::http::session_config::{BuildMode, session_settings_from_env};
use snippetbox::middleware::install_panic_hook;
use snippetbox::outbound::persistence::{DbPool, PoolConfig};

/// Application bootstrap.
#[actix_web::main]
async fn main() -> io::Result<()> {
    let settings = ServerSettings::load_from_iter(std::env::args_os())
        .map_err(|e| io::Error::other(format!("failed to load settings: {e}")))?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.log_level()));
    if let Err(e) = fmt().with_env_filter(filter).json().try_init() {
        warn!(error = %e, "tracing init failed");
    }
    install_panic_hook();

    let bind_addr = settings
        .bind_addr()
        .map_err(|e| io::Error::other(format!("invalid listen address: {e}")))?;
    let session = session_settings_from_env(
        &DefaultEnv::new(),
        BuildMode::from_debug_assertions(),
        Duration::hours(settings.session_lifetime_hours()),
    )
    .map_err(|e| io::Error::other(format!("invalid session configuration: {e}")))?;

    let mut config = ServerConfig::new(session, bind_addr);
    if let Some(dsn) = settings.dsn.as_deref() {
        let pool = DbPool::new(PoolConfig::new(dsn))
            .await
            .map_err(|e| io::Error::other(format!("database unavailable: {e}")))?;
        config = config.with_db_pool(pool);
    }

    info!(addr = %config.bind_addr(), "starting server");
    create_server(config)?.await
}
