//! Anti-forgery protection for state-changing requests.
//!
//! Each session holds a random 32-byte token. Pages receive a masked copy
//! (`pad || pad ^ token`, hex encoded) which changes on every request, so
//! the raw token never appears in rendered HTML. `POST`, `PUT`, `PATCH` and
//! `DELETE` requests must echo a masked token in the `x-csrf-token` header
//! or in the `csrf_token` form field.

use std::rc::Rc;
use std::task::{Context, Poll};

use actix_session::SessionExt;
use actix_web::body::EitherBody;
use actix_web::dev::{Payload, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::{Method, header};
use actix_web::web::Bytes;
use actix_web::{FromRequest, HttpMessage, HttpRequest, ResponseError};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use rand::RngCore;
use tracing::warn;

use super::session::CSRF_KEY;
use crate::domain::Error;
use crate::domain::password::constant_time_eq;

const TOKEN_LEN: usize = 32;
pub const CSRF_HEADER: &str = "x-csrf-token";
pub const CSRF_FIELD: &str = "csrf_token";

/// Masked token for embedding in the rendered page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsrfToken(String);

impl CsrfToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromRequest for CsrfToken {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(Ok(req.extensions().get::<CsrfToken>().cloned().unwrap_or_default()))
    }
}

fn random_bytes() -> [u8; TOKEN_LEN] {
    let mut bytes = [0_u8; TOKEN_LEN];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

fn mask(token: &[u8]) -> String {
    let pad = random_bytes();
    let mut out = Vec::with_capacity(TOKEN_LEN * 2);
    out.extend_from_slice(&pad);
    out.extend(pad.iter().zip(token).map(|(p, t)| p ^ t));
    hex::encode(out)
}

fn unmask(masked: &str) -> Option<Vec<u8>> {
    let raw = hex::decode(masked.trim()).ok()?;
    if raw.len() != TOKEN_LEN * 2 {
        return None;
    }
    let (pad, cipher) = raw.split_at(TOKEN_LEN);
    Some(pad.iter().zip(cipher).map(|(p, c)| p ^ c).collect())
}

/// Whether `submitted` is a masking of the session token `expected`.
pub(crate) fn token_matches(submitted: &str, expected: &[u8]) -> bool {
    unmask(submitted).is_some_and(|token| constant_time_eq(&token, expected))
}

fn is_state_changing(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

fn is_form(req: &ServiceRequest) -> bool {
    req.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/x-www-form-urlencoded"))
}

fn form_token(body: &[u8]) -> Option<String> {
    serde_urlencoded::from_bytes::<Vec<(String, String)>>(body)
        .ok()?
        .into_iter()
        .find_map(|(name, value)| (name == CSRF_FIELD).then_some(value))
}

/// Put `body` back so downstream extractors can read it again.
fn restore_body(req: &mut ServiceRequest, body: Bytes) {
    let (_, mut payload) = actix_http::h1::Payload::create(true);
    payload.unread_data(body);
    req.set_payload(payload.into());
}

async fn submitted_token(req: &mut ServiceRequest) -> Option<String> {
    if let Some(value) = req
        .headers()
        .get(CSRF_HEADER)
        .and_then(|value| value.to_str().ok())
    {
        return Some(value.to_owned());
    }
    if !is_form(req) {
        return None;
    }
    let body = req.extract::<Bytes>().await.ok()?;
    let token = form_token(&body);
    restore_body(req, body);
    token
}

/// Session token for `req`, created on first use.
fn session_token(req: &ServiceRequest) -> Result<Vec<u8>, Error> {
    let session = req.get_session();
    let stored = session
        .get::<String>(CSRF_KEY)
        .map_err(Error::internal_from)?
        .and_then(|raw| hex::decode(raw).ok())
        .filter(|raw| raw.len() == TOKEN_LEN);
    if let Some(token) = stored {
        return Ok(token);
    }
    let token = random_bytes().to_vec();
    session
        .insert(CSRF_KEY, hex::encode(&token))
        .map_err(Error::internal_from)?;
    Ok(token)
}

/// Middleware validating anti-forgery tokens.
///
/// Must sit inside the session middleware.
#[derive(Clone, Default)]
pub struct CsrfProtect;

impl<S, B> Transform<S, ServiceRequest> for CsrfProtect
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = actix_web::Error;
    type InitError = ();
    type Transform = CsrfProtectMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(CsrfProtectMiddleware {
            service: Rc::new(service),
        }))
    }
}

/// Service wrapper produced by [`CsrfProtect`].
pub struct CsrfProtectMiddleware<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for CsrfProtectMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        Box::pin(async move {
            let expected = match session_token(&req) {
                Ok(token) => token,
                Err(error) => {
                    let response = error.error_response();
                    return Ok(req.into_response(response).map_into_right_body());
                }
            };

            if is_state_changing(req.method()) {
                let submitted = submitted_token(&mut req).await;
                let valid = submitted
                    .as_deref()
                    .is_some_and(|token| token_matches(token, &expected));
                if !valid {
                    warn!(
                        method = %req.method(),
                        uri = %req.uri(),
                        present = submitted.is_some(),
                        "rejected request with missing or invalid CSRF token"
                    );
                    let response =
                        Error::bad_request("CSRF token missing or invalid", []).error_response();
                    return Ok(req.into_response(response).map_into_right_body());
                }
            }

            req.extensions_mut().insert(CsrfToken(mask(&expected)));
            let res = service.call(req).await?;
            Ok(res.map_into_left_body())
        })
    }
}
