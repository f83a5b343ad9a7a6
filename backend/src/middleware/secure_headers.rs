//! Fixed security headers on every response, errors included.
//!
//! An error escaping the inner service is rendered here so that it too
//! carries the headers.

use std::task::{Context, Poll};

use actix_web::Error;
use actix_web::body::EitherBody;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header::{HeaderMap, HeaderName, HeaderValue};
use futures_util::future::{LocalBoxFuture, Ready, ready};

pub(crate) const HEADERS: [(&str, &str); 5] = [
    (
        "content-security-policy",
        "default-src 'self'; style-src 'self' fonts.googleapis.com; font-src fonts.gstatic.com",
    ),
    ("referrer-policy", "origin-when-cross-origin"),
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "deny"),
    ("x-xss-protection", "0"),
];

/// Insert the fixed security headers into `headers`.
pub(crate) fn apply(headers: &mut HeaderMap) {
    for (name, value) in HEADERS {
        headers.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
    }
}

/// Middleware setting CSP, referrer, sniffing, framing and XSS headers.
#[derive(Clone, Copy, Default)]
pub struct SecureHeaders;

impl<S, B> Transform<S, ServiceRequest> for SecureHeaders
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = SecureHeadersMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SecureHeadersMiddleware { service }))
    }
}

/// Service wrapper produced by [`SecureHeaders`].
pub struct SecureHeadersMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for SecureHeadersMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let request = req.request().clone();
        let fut = self.service.call(req);
        Box::pin(async move {
            let mut res = match fut.await {
                Ok(res) => res.map_into_left_body(),
                Err(err) => ServiceResponse::from_err(err, request).map_into_right_body(),
            };
            apply(res.response_mut().headers_mut());
            Ok(res)
        })
    }
}

#[cfg(test)]
mod tests {
    use actix_web::{App, HttpResponse, test, web};
    use rstest::rstest;

    use super::*;
    use crate::domain;

    async fn ok() -> HttpResponse {
        HttpResponse::Ok().finish()
    }

    async fn failing() -> Result<HttpResponse, domain::Error> {
        Err(domain::Error::internal())
    }

    #[rstest]
    #[case("/ok")]
    #[case("/failing")]
    #[case("/missing")]
    #[actix_web::test]
    async fn headers_are_set_on_every_response(#[case] uri: &str) {
        let app = test::init_service(
            App::new()
                .wrap(SecureHeaders)
                .route("/ok", web::get().to(ok))
                .route("/failing", web::get().to(failing)),
        )
        .await;
        let res = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
        for (name, value) in HEADERS {
            assert_eq!(
                res.headers().get(name).and_then(|v| v.to_str().ok()),
                Some(value),
                "{name} on {uri}"
            );
        }
    }
}
