//! Handler adapter: the single place where handler failures are logged.
//!
//! Handlers return `Result<_, domain::Error>`; actix renders the error into
//! the response and keeps it attached. [`ReportErrors`] inspects that error,
//! logs it once with the request method and URI, and guarantees that the
//! client only ever sees a domain JSON body. Errors that are not domain
//! errors become a generic `INTERNAL` response.

use std::task::{Context, Poll};

use actix_web::body::EitherBody;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::{Method, Uri};
use actix_web::{HttpResponse, ResponseError};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use tracing::error;

use crate::domain::Error;

fn log_failure(method: &Method, uri: &Uri, error: &Error) {
    error!(
        method = %method,
        uri = %uri,
        code = %error.code(),
        error = %error,
        "request failed"
    );
}

/// Classify an actix error: domain errors pass through, anything else is
/// promoted to `INTERNAL` keeping its text as the logged cause.
fn classify(err: &actix_web::Error) -> (Error, bool) {
    match err.as_error::<Error>() {
        Some(domain) => (domain.clone(), true),
        None => (Error::internal_from(err), false),
    }
}

/// Middleware logging and normalising handler errors.
#[derive(Clone, Copy, Default)]
pub struct ReportErrors;

impl<S, B> Transform<S, ServiceRequest> for ReportErrors
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = actix_web::Error;
    type InitError = ();
    type Transform = ReportErrorsMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(ReportErrorsMiddleware { service }))
    }
}

/// Service wrapper produced by [`ReportErrors`].
pub struct ReportErrorsMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for ReportErrorsMiddleware<S>
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
        let method = req.method().clone();
        let uri = req.uri().clone();
        let request = req.request().clone();
        let fut = self.service.call(req);
        Box::pin(async move {
            let res = match fut.await {
                Ok(res) => res,
                Err(err) => {
                    let (domain, _) = classify(&err);
                    log_failure(&method, &uri, &domain);
                    let response = HttpResponse::from_error(domain);
                    return Ok(ServiceResponse::new(request, response).map_into_right_body());
                }
            };

            let Some((domain, is_domain)) = res.response().error().map(classify) else {
                return Ok(res.map_into_left_body());
            };
            log_failure(&method, &uri, &domain);
            if is_domain {
                Ok(res.map_into_left_body())
            } else {
                let response = domain.error_response();
                Ok(res.into_response(response).map_into_right_body())
            }
        })
    }
}
