//! Account pages: signup, login and logout.
//!
//! ```text
//! GET  /user/signup   signup form
//! POST /user/signup   create an account and log in
//! GET  /user/login    login form
//! POST /user/login    log in
//! POST /user/logout   log out (authenticated)
//! ```
//!
//! Every privilege change renews the session token before the session is
//! written, so a token issued to an anonymous visitor never becomes an
//! authenticated one.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, web};
use serde::Deserialize;

use super::ApiResult;
use super::form::{FormDecode, decode_post_form};
use super::snippets::see_other;
use super::state::HttpState;
use super::templates::{self, FormView, PageContext};
use crate::domain::ports::UserRepositoryError;
use crate::domain::validation::{email_regex, matches, min_chars, not_blank};
use crate::domain::{FieldViolation, NewUser, Validator};

const PASSWORD_MIN_CHARS: usize = 8;
const AFTER_LOGIN: &str = "/snippet/create";
const BLANK: &str = "This field cannot be blank";
const BAD_EMAIL: &str = "This field must be a valid email address";

/// Submitted signup form.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SignupForm {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(skip)]
    pub validator: Validator,
}

impl FormDecode for SignupForm {
    type Raw = Self;

    fn from_raw(raw: Self, _: &mut Vec<FieldViolation>) -> Self {
        raw
    }
}

impl SignupForm {
    pub fn validate(&mut self) -> bool {
        let v = &mut self.validator;
        v.check_field(not_blank(&self.name), "name", BLANK);
        v.check_field(not_blank(&self.email), "email", BLANK);
        v.check_field(matches(&self.email, email_regex()), "email", BAD_EMAIL);
        v.check_field(not_blank(&self.password), "password", BLANK);
        v.check_field(
            min_chars(&self.password, PASSWORD_MIN_CHARS),
            "password",
            "This field must be at least 8 characters long",
        );
        v.valid()
    }

    /// Password is never echoed back into the page.
    fn into_view(self) -> FormView {
        FormView::new(self.validator)
            .with_value("name", self.name)
            .with_value("email", self.email)
    }
}

/// Submitted login form.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    #[serde(skip)]
    pub validator: Validator,
}

impl FormDecode for LoginForm {
    type Raw = Self;

    fn from_raw(raw: Self, _: &mut Vec<FieldViolation>) -> Self {
        raw
    }
}

impl LoginForm {
    pub fn validate(&mut self) -> bool {
        let v = &mut self.validator;
        v.check_field(not_blank(&self.email), "email", BLANK);
        v.check_field(matches(&self.email, email_regex()), "email", BAD_EMAIL);
        v.check_field(not_blank(&self.password), "password", BLANK);
        v.valid()
    }

    fn into_view(self) -> FormView {
        FormView::new(self.validator).with_value("email", self.email)
    }
}

async fn render_form(
    state: &HttpState,
    page: &PageContext,
    name: &str,
    status: StatusCode,
    form: FormView,
) -> ApiResult<HttpResponse> {
    let mut data = page.template_data(state.clock.utc())?;
    data.form = form;
    state.templates.render(name, status, &data)
}

pub async fn signup(state: web::Data<HttpState>, page: PageContext) -> ApiResult<HttpResponse> {
    render_form(&state, &page, templates::SIGNUP, StatusCode::OK, FormView::default()).await
}

pub async fn signup_post(
    state: web::Data<HttpState>,
    page: PageContext,
    body: web::Bytes,
) -> ApiResult<HttpResponse> {
    let mut form: SignupForm = decode_post_form(&body)?;
    if !form.validate() {
        let view = form.into_view();
        return render_form(&state, &page, templates::SIGNUP, StatusCode::UNPROCESSABLE_ENTITY, view)
            .await;
    }

    let user = NewUser {
        name: form.name.clone(),
        email: form.email.clone(),
        password: std::mem::take(&mut form.password),
    };
    let id = match state.users.insert(&user).await {
        Ok(id) => id,
        Err(UserRepositoryError::DuplicateEmail) => {
            form.validator
                .add_field_error("email", "Email address is already in use");
            let view = form.into_view();
            return render_form(&state, &page, templates::SIGNUP, StatusCode::UNPROCESSABLE_ENTITY, view)
                .await;
        }
        Err(error) => return Err(error.into()),
    };

    page.session.renew_token();
    page.session.persist_user(&id)?;
    Ok(see_other(AFTER_LOGIN))
}

pub async fn login(state: web::Data<HttpState>, page: PageContext) -> ApiResult<HttpResponse> {
    render_form(&state, &page, templates::LOGIN, StatusCode::OK, FormView::default()).await
}

pub async fn login_post(
    state: web::Data<HttpState>,
    page: PageContext,
    body: web::Bytes,
) -> ApiResult<HttpResponse> {
    let mut form: LoginForm = decode_post_form(&body)?;
    if !form.validate() {
        let view = form.into_view();
        return render_form(&state, &page, templates::LOGIN, StatusCode::UNPROCESSABLE_ENTITY, view)
            .await;
    }

    let id = match state.users.authenticate(&form.email, &form.password).await {
        Ok(id) => id,
        Err(UserRepositoryError::InvalidCredentials) => {
            form.validator.add_general_error("Invalid credentials");
            let view = form.into_view();
            return render_form(&state, &page, templates::LOGIN, StatusCode::UNAUTHORIZED, view).await;
        }
        Err(error) => return Err(error.into()),
    };

    page.session.renew_token();
    page.session.persist_user(&id)?;
    Ok(see_other(AFTER_LOGIN))
}

pub async fn logout_post(page: PageContext) -> ApiResult<HttpResponse> {
    page.session.renew_token();
    page.session.forget_user();
    page.session.put_toast("Successful logout")?;
    Ok(see_other("/"))
}
