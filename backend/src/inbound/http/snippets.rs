//! Snippet pages.
//!
//! ```text
//! GET  /                   latest snippets
//! GET  /snippet/view/{id}  one snippet, 404 page when missing or expired
//! GET  /snippet/create     create form (authenticated)
//! POST /snippet/create     create a snippet (authenticated)
//! ```

use actix_web::http::StatusCode;
use actix_web::http::header;
use actix_web::{HttpResponse, web};
use serde::Deserialize;

use super::ApiResult;
use super::form::{FormDecode, decode_post_form, parse_field};
use super::state::HttpState;
use super::templates::{self, FormView, PageContext, SnippetView};
use crate::domain::validation::{max_chars, not_blank, permitted_value};
use crate::domain::{Error, Expiry, FieldViolation, SnippetDraft, SnippetId, Validator};

const DEFAULT_EXPIRY_DAYS: u32 = 365;
const TITLE_MAX_CHARS: usize = 100;

/// Submitted create form.
#[derive(Debug, Default)]
pub struct SnippetCreateForm {
    pub title: String,
    pub content: String,
    pub expires: u32,
    pub validator: Validator,
}

/// Create form as submitted, before `expires` is converted.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawSnippetCreateForm {
    title: String,
    content: String,
    expires: String,
}

impl FormDecode for SnippetCreateForm {
    type Raw = RawSnippetCreateForm;

    fn from_raw(raw: RawSnippetCreateForm, violations: &mut Vec<FieldViolation>) -> Self {
        Self {
            title: raw.title,
            content: raw.content,
            expires: parse_field("expires", &raw.expires, violations).unwrap_or_default(),
            validator: Validator::default(),
        }
    }
}

impl SnippetCreateForm {
    /// Run every check; returns the draft when all passed.
    pub fn validate(&mut self) -> Option<SnippetDraft> {
        let v = &mut self.validator;
        v.check_field(not_blank(&self.title), "title", "This field can't be blank");
        v.check_field(
            max_chars(&self.title, TITLE_MAX_CHARS),
            "title",
            "This field cannot be more than 100 characters long",
        );
        v.check_field(not_blank(&self.content), "content", "This field can't be blank");
        v.check_field(
            permitted_value(&self.expires, &Expiry::PERMITTED_DAYS),
            "expires",
            "This field must equal 1, 7, or 365",
        );
        if !v.valid() {
            return None;
        }
        let expiry = Expiry::try_from(self.expires).ok()?;
        Some(SnippetDraft {
            title: self.title.clone(),
            content: self.content.clone(),
            expiry,
        })
    }

    fn into_view(self) -> FormView {
        let expires = if self.expires == 0 {
            String::new()
        } else {
            self.expires.to_string()
        };
        FormView::new(self.validator)
            .with_value("title", self.title)
            .with_value("content", self.content)
            .with_value("expires", expires)
    }
}

pub(crate) fn see_other(location: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location))
        .finish()
}

pub async fn home(state: web::Data<HttpState>, page: PageContext) -> ApiResult<HttpResponse> {
    let snippets = state.snippets.list_recent().await?;
    let mut data = page.template_data(state.clock.utc())?;
    data.snippets = snippets.iter().map(SnippetView::from).collect();
    state.templates.render(templates::HOME, StatusCode::OK, &data)
}

pub async fn snippet_view(
    state: web::Data<HttpState>,
    page: PageContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let id: SnippetId = path.parse().map_err(|error: uuid::Error| {
        Error::bad_request("invalid UUID", [FieldViolation::new("id", error.to_string())])
    })?;
    let mut data = page.template_data(state.clock.utc())?;
    match state.snippets.get_by_id(&id).await? {
        Some(snippet) => {
            data.snippet = Some(SnippetView::from(&snippet));
            state.templates.render(templates::VIEW, StatusCode::OK, &data)
        }
        None => state
            .templates
            .render(templates::NOT_FOUND, StatusCode::NOT_FOUND, &data),
    }
}

pub async fn snippet_create(state: web::Data<HttpState>, page: PageContext) -> ApiResult<HttpResponse> {
    let mut data = page.template_data(state.clock.utc())?;
    data.form = FormView::default().with_value("expires", DEFAULT_EXPIRY_DAYS.to_string());
    state.templates.render(templates::CREATE, StatusCode::OK, &data)
}

pub async fn snippet_create_post(
    state: web::Data<HttpState>,
    page: PageContext,
    body: web::Bytes,
) -> ApiResult<HttpResponse> {
    let mut form: SnippetCreateForm = decode_post_form(&body)?;
    let Some(draft) = form.validate() else {
        let mut data = page.template_data(state.clock.utc())?;
        data.form = form.into_view();
        return state
            .templates
            .render(templates::CREATE, StatusCode::UNPROCESSABLE_ENTITY, &data);
    };

    let id = state.snippets.insert(&draft).await?;
    page.session.put_toast("Snippet successfully created!")?;
    Ok(see_other(&format!("/snippet/view/{id}")))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn form(title: &str, content: &str, expires: u32) -> SnippetCreateForm {
        SnippetCreateForm {
            title: title.to_owned(),
            content: content.to_owned(),
            expires,
            validator: Validator::default(),
        }
    }

    #[rstest]
    fn every_check_runs_after_an_early_failure() {
        let mut f = form("", "", 3);
        assert!(f.validate().is_none());
        let errors = f.validator.field_errors();
        assert_eq!(errors.len(), 3);
        assert_eq!(errors["title"], "This field can't be blank");
        assert_eq!(errors["content"], "This field can't be blank");
        assert_eq!(errors["expires"], "This field must equal 1, 7, or 365");
    }

    #[rstest]
    fn long_titles_are_rejected() {
        let mut f = form(&"x".repeat(101), "body", 7);
        assert!(f.validate().is_none());
        assert_eq!(
            f.validator.field_error("title"),
            Some("This field cannot be more than 100 characters long")
        );
    }

    #[rstest]
    #[case(1, Expiry::OneDay)]
    #[case(7, Expiry::OneWeek)]
    #[case(365, Expiry::OneYear)]
    fn valid_forms_produce_drafts(#[case] days: u32, #[case] expiry: Expiry) {
        let draft = form("Title", "Body", days).validate().expect("valid form");
        assert_eq!(draft.expiry, expiry);
        assert_eq!(draft.title, "Title");
    }

    #[rstest]
    fn invalid_form_view_keeps_submitted_values() {
        let mut f = form("Kept", "", 7);
        assert!(f.validate().is_none());
        let view = f.into_view();
        assert_eq!(view.value("title"), "Kept");
        assert!(view.holds("expires", "7"));
        assert!(view.has_error("content"));
    }
}
