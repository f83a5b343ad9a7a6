//! HTTP inbound adapter: page handlers, session and CSRF plumbing, error
//! mapping, and the composed application.

pub mod adapter;
pub mod app;
pub mod auth;
pub mod csrf;
pub mod error;
pub mod form;
pub mod health;
pub mod session;
pub mod session_config;
pub mod session_store;
pub mod snippets;
pub mod state;
pub mod static_assets;
pub mod templates;
#[cfg(test)]
pub mod test_utils;
pub mod users;

pub use app::{AppDependencies, build_app};
pub use error::ApiResult;
