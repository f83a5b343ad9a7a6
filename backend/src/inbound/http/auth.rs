//! Authentication middleware.
//!
//! [`Authenticate`] derives an [`AuthContext`] for every request on the
//! session-aware routes. [`RequireAuthentication`] gates protected routes,
//! redirecting anonymous visitors to the login page.

use std::rc::Rc;
use std::sync::Arc;
use std::task::{Context, Poll};

use actix_session::SessionExt;
use actix_web::body::EitherBody;
use actix_web::dev::{Payload, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header::{self, HeaderValue};
use actix_web::{FromRequest, HttpMessage, HttpRequest, HttpResponse};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use tracing::warn;

use super::session::SessionContext;
use crate::domain::AuthContext;
use crate::domain::ports::UserRepository;

pub const LOGIN_PATH: &str = "/user/login";

impl FromRequest for AuthContext {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    /// Anonymous unless [`Authenticate`] ran for this request.
    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(Ok(req
            .extensions()
            .get::<AuthContext>()
            .cloned()
            .unwrap_or_default()))
    }
}

/// Resolve the session user against the user store.
///
/// Missing, malformed or deleted accounts all yield an anonymous context.
async fn resolve(session: SessionContext, users: &dyn UserRepository) -> AuthContext {
    let user_id = match session.user_id() {
        Ok(Some(id)) => id,
        Ok(None) => return AuthContext::anonymous(),
        Err(error) => {
            warn!(%error, "failed to read session user");
            return AuthContext::anonymous();
        }
    };
    match users.exists(&user_id).await {
        Ok(true) => AuthContext::authenticated(user_id),
        Ok(false) => AuthContext::anonymous(),
        Err(error) => {
            warn!(%error, user_id = %user_id, "failed to verify session user");
            AuthContext::anonymous()
        }
    }
}

/// Middleware inserting an [`AuthContext`] into request extensions.
///
/// Must sit inside the session middleware.
#[derive(Clone)]
pub struct Authenticate {
    users: Arc<dyn UserRepository>,
}

impl Authenticate {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }
}

impl<S, B> Transform<S, ServiceRequest> for Authenticate
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = actix_web::Error;
    type InitError = ();
    type Transform = AuthenticateMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthenticateMiddleware {
            service: Rc::new(service),
            users: Arc::clone(&self.users),
        }))
    }
}

/// Service wrapper produced by [`Authenticate`].
pub struct AuthenticateMiddleware<S> {
    service: Rc<S>,
    users: Arc<dyn UserRepository>,
}

impl<S, B> Service<ServiceRequest> for AuthenticateMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let users = Arc::clone(&self.users);
        Box::pin(async move {
            let session = SessionContext::new(req.get_session());
            let context = resolve(session, users.as_ref()).await;
            req.extensions_mut().insert(context);
            service.call(req).await
        })
    }
}

/// Gate for protected routes.
///
/// Anonymous requests receive `303 See Other` to the login page. Responses
/// served to authenticated users carry `Cache-Control: no-store`.
#[derive(Clone, Copy, Default)]
pub struct RequireAuthentication;

impl<S, B> Transform<S, ServiceRequest> for RequireAuthentication
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = actix_web::Error;
    type InitError = ();
    type Transform = RequireAuthenticationMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequireAuthenticationMiddleware { service }))
    }
}

/// Service wrapper produced by [`RequireAuthentication`].
pub struct RequireAuthenticationMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for RequireAuthenticationMiddleware<S>
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

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let authenticated = req
            .extensions()
            .get::<AuthContext>()
            .is_some_and(AuthContext::is_authenticated);
        if !authenticated {
            let response = HttpResponse::SeeOther()
                .insert_header((header::LOCATION, LOGIN_PATH))
                .finish();
            return Box::pin(ready(Ok(req.into_response(response).map_into_right_body())));
        }

        let fut = self.service.call(req);
        Box::pin(async move {
            let mut res = fut.await?;
            res.headers_mut()
                .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
            Ok(res.map_into_left_body())
        })
    }
}
