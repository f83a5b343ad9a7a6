//! Panic containment for the whole request pipeline.
//!
//! [`RecoverPanic`] catches a panic raised while building or polling the
//! inner service future and answers with a generic `500` that closes the
//! connection. The panic message is logged together with the backtrace
//! captured at the panic site by [`install_panic_hook`].
//!
//! actix workers run each request future on a single thread, so the
//! backtrace recorded by the hook is read back on the same thread by the
//! middleware that caught the unwind.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;
use std::task::{Context, Poll};

use actix_web::body::EitherBody;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::{ConnectionType, header};
use actix_web::{Error, ResponseError};
use futures_util::FutureExt;
use futures_util::future::{LocalBoxFuture, Ready, ready};
use tracing::error;

use super::secure_headers;
use crate::domain;

thread_local! {
    static LAST_BACKTRACE: RefCell<Option<String>> = const { RefCell::new(None) };
}

static INSTALL: Once = Once::new();

/// Record a backtrace for every panic before the previous hook runs.
///
/// Idempotent; call once from `main`.
pub fn install_panic_hook() {
    INSTALL.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let trace = Backtrace::force_capture().to_string();
            LAST_BACKTRACE.with(|slot| *slot.borrow_mut() = Some(trace));
            previous(info);
        }));
    });
}

fn take_backtrace() -> String {
    LAST_BACKTRACE
        .with(|slot| slot.borrow_mut().take())
        .unwrap_or_default()
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

/// Middleware turning handler panics into `500 Internal Error`.
///
/// # Examples
/// ```
/// use actix_web::App;
/// use snippetbox::middleware::RecoverPanic;
///
/// let _app = App::new().wrap(RecoverPanic);
/// ```
#[derive(Clone, Copy, Default)]
pub struct RecoverPanic;

impl<S, B> Transform<S, ServiceRequest> for RecoverPanic
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = RecoverPanicMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RecoverPanicMiddleware { service }))
    }
}

/// Service wrapper produced by [`RecoverPanic`].
pub struct RecoverPanicMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for RecoverPanicMiddleware<S>
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
        let called = panic::catch_unwind(AssertUnwindSafe(|| self.service.call(req)));
        Box::pin(async move {
            let outcome = match called {
                Ok(fut) => AssertUnwindSafe(fut).catch_unwind().await,
                Err(payload) => Err(payload),
            };
            match outcome {
                Ok(result) => result.map(ServiceResponse::map_into_left_body),
                Err(payload) => {
                    error!(
                        method = %request.method(),
                        uri = %request.uri(),
                        panic = panic_message(payload.as_ref()),
                        backtrace = %take_backtrace(),
                        "request handler panicked"
                    );
                    let mut response = domain::Error::internal().error_response();
                    response
                        .headers_mut()
                        .insert(header::CONNECTION, header::HeaderValue::from_static("close"));
                    response.head_mut().set_connection_type(ConnectionType::Close);
                    // The unwind skipped the outer header middleware.
                    secure_headers::apply(response.headers_mut());
                    Ok(ServiceResponse::new(request, response).map_into_right_body())
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::{App, HttpResponse, test::{self}, web};
    use rstest::rstest;
    use serde_json::Value;

    use super::*;

    async fn boom() -> HttpResponse {
        panic!("handler exploded");
    }

    async fn fine() -> HttpResponse {
        HttpResponse::Ok().body("ok")
    }

    #[rstest]
    #[actix_web::test]
    async fn panic_becomes_internal_error_and_closes_connection() {
        install_panic_hook();
        let app = test::init_service(
            App::new()
                .wrap(RecoverPanic)
                .route("/boom", web::get().to(boom)),
        )
        .await;
        let res = test::call_service(&app, test::TestRequest::get().uri("/boom").to_request()).await;
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            res.headers()
                .get(header::CONNECTION)
                .and_then(|v| v.to_str().ok()),
            Some("close")
        );
        for (name, value) in secure_headers::HEADERS {
            assert_eq!(
                res.headers().get(name).and_then(|v| v.to_str().ok()),
                Some(value),
                "{name}"
            );
        }
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["code"], "INTERNAL");
        assert_eq!(body["message"], "Internal Error");
    }

    #[rstest]
    #[actix_web::test]
    async fn app_keeps_serving_after_a_panic() {
        let app = test::init_service(
            App::new()
                .wrap(RecoverPanic)
                .route("/boom", web::get().to(boom))
                .route("/fine", web::get().to(fine)),
        )
        .await;
        let _ = test::call_service(&app, test::TestRequest::get().uri("/boom").to_request()).await;
        let res = test::call_service(&app, test::TestRequest::get().uri("/fine").to_request()).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(test::read_body(res).await, "ok");
    }

    #[rstest]
    #[case(Box::new("static"), "static")]
    #[case(Box::new(String::from("owned")), "owned")]
    #[case(Box::new(7_u8), "non-string panic payload")]
    fn panic_messages_are_extracted(#[case] payload: Box<dyn Any + Send>, #[case] expected: &str) {
        assert_eq!(panic_message(payload.as_ref()), expected);
    }
}
