//! Transport-wide request middleware.
//!
//! Applied around every route, outermost first: [`RecoverPanic`],
//! [`LogRequest`], [`SecureHeaders`]. Session, CSRF and authentication
//! layers are route-group specific and live in `inbound::http`.

pub mod recover;
pub mod request_log;
pub mod secure_headers;

pub use recover::{RecoverPanic, install_panic_hook};
pub use request_log::LogRequest;
pub use secure_headers::SecureHeaders;
