//! Template render cache.
//!
//! Pages are compiled by askama at build time; [`TemplateCache`] maps each
//! page name to its render function. The cache is built once at startup and
//! shared read-only through `web::Data`.
//!
//! Rendering fills an in-memory `String` before the response is built, so a
//! render failure still yields a clean 500 and never a partial page.

use std::collections::{BTreeMap, HashMap};

use actix_web::dev::Payload;
use actix_web::http::StatusCode;
use actix_web::http::header::ContentType;
use actix_web::{FromRequest, HttpMessage, HttpRequest, HttpResponse};
use askama::Template;
use chrono::{DateTime, Datelike, Utc};
use futures_util::future::LocalBoxFuture;

use super::ApiResult;
use super::csrf::CsrfToken;
use super::session::SessionContext;
use crate::domain::{AuthContext, Error, Snippet, Validator};

pub const HOME: &str = "home.html";
pub const VIEW: &str = "view.html";
pub const CREATE: &str = "create.html";
pub const SIGNUP: &str = "signup.html";
pub const LOGIN: &str = "login.html";
pub const NOT_FOUND: &str = "not_found.html";

/// Format `at` as `02 Jan 2006 at 15:04` in UTC; empty for `None`.
///
/// # Examples
/// ```
/// use chrono::{TimeZone, Utc};
/// use snippetbox::inbound::http::templates::human_date;
///
/// let at = Utc.with_ymd_and_hms(2024, 3, 17, 10, 15, 0).single();
/// assert_eq!(human_date(at.as_ref()), "17 Mar 2024 at 10:15");
/// assert_eq!(human_date(None), "");
/// ```
pub fn human_date(at: Option<&DateTime<Utc>>) -> String {
    at.map(|at| at.format("%d %b %Y at %H:%M").to_string())
        .unwrap_or_default()
}

/// Snippet prepared for display.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnippetView {
    pub id: String,
    pub title: String,
    pub content: String,
    pub created: String,
    pub expires: String,
}

impl From<&Snippet> for SnippetView {
    fn from(snippet: &Snippet) -> Self {
        Self {
            id: snippet.id.to_string(),
            title: snippet.title.clone(),
            content: snippet.content.clone(),
            created: human_date(Some(&snippet.created_at)),
            expires: human_date(Some(&snippet.expires_at)),
        }
    }
}

/// Submitted form values and their validation errors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormView {
    values: BTreeMap<String, String>,
    validator: Validator,
}

impl FormView {
    pub fn new(validator: Validator) -> Self {
        Self {
            values: BTreeMap::new(),
            validator,
        }
    }

    pub fn with_value(mut self, field: &str, value: impl Into<String>) -> Self {
        self.values.insert(field.to_owned(), value.into());
        self
    }

    pub fn value(&self, field: &str) -> &str {
        self.values.get(field).map_or("", String::as_str)
    }

    /// Whether `field` currently holds `candidate`; used for radio buttons.
    pub fn holds(&self, field: &str, candidate: &str) -> bool {
        self.value(field) == candidate
    }

    pub fn has_error(&self, field: &str) -> bool {
        self.validator.field_error(field).is_some()
    }

    pub fn error(&self, field: &str) -> &str {
        self.validator.field_error(field).unwrap_or_default()
    }

    pub fn general_errors(&self) -> &[String] {
        self.validator.general_errors()
    }
}

/// Values shared by every page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateData {
    pub current_year: i32,
    pub snippet: Option<SnippetView>,
    pub snippets: Vec<SnippetView>,
    pub form: FormView,
    pub toast: String,
    pub is_authenticated: bool,
    pub csrf_token: String,
}

impl TemplateData {
    pub fn has_toast(&self) -> bool {
        !self.toast.is_empty()
    }
}

#[derive(Template)]
#[template(path = "pages/home.html")]
struct HomePage<'a> {
    data: &'a TemplateData,
}

#[derive(Template)]
#[template(path = "pages/view.html")]
struct ViewPage<'a> {
    data: &'a TemplateData,
    snippet: &'a SnippetView,
}

#[derive(Template)]
#[template(path = "pages/create.html")]
struct CreatePage<'a> {
    data: &'a TemplateData,
}

#[derive(Template)]
#[template(path = "pages/signup.html")]
struct SignupPage<'a> {
    data: &'a TemplateData,
}

#[derive(Template)]
#[template(path = "pages/login.html")]
struct LoginPage<'a> {
    data: &'a TemplateData,
}

#[derive(Template)]
#[template(path = "pages/not_found.html")]
struct NotFoundPage<'a> {
    data: &'a TemplateData,
}

/// Render function stored in the cache.
pub type RenderFn = fn(&TemplateData) -> askama::Result<String>;

fn render_home(data: &TemplateData) -> askama::Result<String> {
    HomePage { data }.render()
}

fn render_view(data: &TemplateData) -> askama::Result<String> {
    let snippet = data
        .snippet
        .as_ref()
        .ok_or_else(|| askama::Error::Custom("view page rendered without a snippet".into()))?;
    ViewPage { data, snippet }.render()
}

fn render_create(data: &TemplateData) -> askama::Result<String> {
    CreatePage { data }.render()
}

fn render_signup(data: &TemplateData) -> askama::Result<String> {
    SignupPage { data }.render()
}

fn render_login(data: &TemplateData) -> askama::Result<String> {
    LoginPage { data }.render()
}

fn render_not_found(data: &TemplateData) -> askama::Result<String> {
    NotFoundPage { data }.render()
}

/// Immutable mapping from page name to compiled template.
#[derive(Clone)]
pub struct TemplateCache {
    pages: HashMap<&'static str, RenderFn>,
}

impl Default for TemplateCache {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateCache {
    /// Cache holding every page of the application.
    pub fn new() -> Self {
        Self::with_pages([
            (HOME, render_home as RenderFn),
            (VIEW, render_view),
            (CREATE, render_create),
            (SIGNUP, render_signup),
            (LOGIN, render_login),
            (NOT_FOUND, render_not_found),
        ])
    }

    /// Cache holding only `pages`.
    pub fn with_pages(pages: impl IntoIterator<Item = (&'static str, RenderFn)>) -> Self {
        Self {
            pages: pages.into_iter().collect(),
        }
    }

    /// Registered page names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.pages.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Render `page` into a complete HTML response with `status`.
    ///
    /// An unknown page or a render failure is an `INTERNAL` error whose
    /// cause names the page.
    pub fn render(&self, page: &str, status: StatusCode, data: &TemplateData) -> ApiResult<HttpResponse> {
        let render = self
            .pages
            .get(page)
            .ok_or_else(|| Error::internal_from(format!("the template {page} does not exist")))?;
        let html = render(data)
            .map_err(|error| Error::internal_from(format!("rendering {page} failed: {error}")))?;
        Ok(HttpResponse::build(status)
            .content_type(ContentType::html())
            .body(html))
    }
}

/// Per-request inputs for [`TemplateData`]: session, auth state and the
/// CSRF token issued for this response.
pub struct PageContext {
    pub session: SessionContext,
    pub auth: AuthContext,
    pub csrf: CsrfToken,
}

impl PageContext {
    /// Base template data; pops any pending toast from the session.
    pub fn template_data(&self, now: DateTime<Utc>) -> ApiResult<TemplateData> {
        Ok(TemplateData {
            current_year: now.year(),
            toast: self.session.pop_toast()?,
            is_authenticated: self.auth.is_authenticated(),
            csrf_token: self.csrf.as_str().to_owned(),
            ..TemplateData::default()
        })
    }
}

impl FromRequest for PageContext {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let session = SessionContext::from_request(req, payload);
        let auth = req.extensions().get::<AuthContext>().cloned().unwrap_or_default();
        let csrf = req.extensions().get::<CsrfToken>().cloned().unwrap_or_default();
        Box::pin(async move {
            Ok(PageContext {
                session: session.await?,
                auth,
                csrf,
            })
        })
    }
}
