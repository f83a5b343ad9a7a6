//! Process settings and the HTTP server configuration object.

use std::net::{AddrParseError, SocketAddr};

use ortho_config::OrthoConfig;
use serde::Deserialize;
use snippetbox::inbound::http::session_config::SessionSettings;
use snippetbox::outbound::persistence::DbPool;

const DEFAULT_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_SESSION_LIFETIME_HOURS: i64 = 12;

/// Settings read from `SNIPPETBOX_*` variables and the command line.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "SNIPPETBOX")]
pub struct ServerSettings {
    /// Listen address, `host:port`.
    pub addr: Option<String>,
    /// SQLite URL; in-memory stores are used when absent.
    pub dsn: Option<String>,
    /// Filter used when `RUST_LOG` is unset.
    pub log_level: Option<String>,
    pub session_lifetime_hours: Option<i64>,
}

impl ServerSettings {
    /// Parse the configured listen address.
    pub fn bind_addr(&self) -> Result<SocketAddr, AddrParseError> {
        self.addr.as_deref().unwrap_or(DEFAULT_ADDR).parse()
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    /// Session lifetime in hours; non-positive values fall back to the default.
    pub fn session_lifetime_hours(&self) -> i64 {
        self.session_lifetime_hours
            .filter(|hours| *hours > 0)
            .unwrap_or(DEFAULT_SESSION_LIFETIME_HOURS)
    }
}

/// Builder-style configuration for creating the HTTP server.
pub struct ServerConfig {
    pub(crate) session: SessionSettings,
    pub(crate) bind_addr: SocketAddr,
    pub(crate) db_pool: Option<DbPool>,
}

impl ServerConfig {
    #[must_use]
    pub fn new(session: SessionSettings, bind_addr: SocketAddr) -> Self {
        Self {
            session,
            bind_addr,
            db_pool: None,
        }
    }

    /// Attach a database pool; SQLite repositories replace the in-memory ones.
    #[must_use]
    pub fn with_db_pool(mut self, pool: DbPool) -> Self {
        self.db_pool = Some(pool);
        self
    }

    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }
}
