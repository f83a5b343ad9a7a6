//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain ports and remain testable without I/O.

use std::sync::Arc;

use mockable::Clock;

use super::templates::TemplateCache;
use crate::domain::ports::{SnippetRepository, UserRepository};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub snippets: Arc<dyn SnippetRepository>,
    pub users: Arc<dyn UserRepository>,
    pub templates: Arc<TemplateCache>,
    pub clock: Arc<dyn Clock>,
}

impl HttpState {
    pub fn new(
        snippets: Arc<dyn SnippetRepository>,
        users: Arc<dyn UserRepository>,
        templates: Arc<TemplateCache>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            snippets,
            users,
            templates,
            clock,
        }
    }
}
