//! Snippetbox: share and browse short text snippets.
//!
//! The library holds everything but process startup so integration tests can
//! build the complete application with [`inbound::http::build_app`].

pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
