//! Access log: one `info` event per request, emitted before delegating.

use std::task::{Context, Poll};

use actix_web::Error;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use futures_util::future::{Ready, ready};
use tracing::info;

/// Middleware logging method, URI, protocol and remote address.
#[derive(Clone, Copy, Default)]
pub struct LogRequest;

impl<S, B> Transform<S, ServiceRequest> for LogRequest
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = LogRequestMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(LogRequestMiddleware { service }))
    }
}

/// Service wrapper produced by [`LogRequest`].
pub struct LogRequestMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for LogRequestMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = S::Future;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let remote_addr = req
            .peer_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_default();
        info!(
            method = %req.method(),
            uri = %req.uri(),
            protocol = ?req.version(),
            remote_addr = %remote_addr,
            "received request"
        );
        self.service.call(req)
    }
}
