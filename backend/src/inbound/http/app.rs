//! Application composition: routes and their middleware chains.
//!
//! ```text
//! RecoverPanic > LogRequest > SecureHeaders          every route
//!   GET /ping, GET /static/*                         no session state
//!   session > CsrfProtect > Authenticate > ReportErrors
//!     GET  /, GET /snippet/view/{id}, /user/signup, /user/login
//!     RequireAuthentication
//!       /snippet/create, POST /user/logout
//! ```

use actix_web::body::MessageBody;
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, web};

use super::adapter::ReportErrors;
use super::auth::{Authenticate, RequireAuthentication};
use super::csrf::CsrfProtect;
use super::health::ping;
use super::session_config::SessionSettings;
use super::session_store::MemorySessionStore;
use super::snippets::{home, snippet_create, snippet_create_post, snippet_view};
use super::state::HttpState;
use super::static_assets::static_file;
use super::users::{login, login_post, logout_post, signup, signup_post};
use crate::middleware::{LogRequest, RecoverPanic, SecureHeaders};

/// Everything [`build_app`] needs; cloned into each worker.
#[derive(Clone)]
pub struct AppDependencies {
    pub http_state: web::Data<HttpState>,
    pub session: SessionSettings,
    pub session_store: MemorySessionStore,
}

impl AppDependencies {
    pub fn new(
        http_state: HttpState,
        session: SessionSettings,
        session_store: MemorySessionStore,
    ) -> Self {
        Self {
            http_state: web::Data::new(http_state),
            session,
            session_store,
        }
    }
}

/// Build the application with every route and middleware chain attached.
pub fn build_app(
    deps: AppDependencies,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let AppDependencies {
        http_state,
        session,
        session_store,
    } = deps;
    let users = http_state.users.clone();

    let dynamic = web::scope("")
        .wrap(ReportErrors)
        .wrap(Authenticate::new(users))
        .wrap(CsrfProtect)
        .wrap(session.middleware(session_store))
        .route("/", web::get().to(home))
        .route("/snippet/view/{id}", web::get().to(snippet_view))
        .service(
            web::resource("/snippet/create")
                .wrap(RequireAuthentication)
                .route(web::get().to(snippet_create))
                .route(web::post().to(snippet_create_post)),
        )
        .service(
            web::resource("/user/signup")
                .route(web::get().to(signup))
                .route(web::post().to(signup_post)),
        )
        .service(
            web::resource("/user/login")
                .route(web::get().to(login))
                .route(web::post().to(login_post)),
        )
        .service(
            web::resource("/user/logout")
                .wrap(RequireAuthentication)
                .route(web::post().to(logout_post)),
        );

    App::new()
        .app_data(http_state)
        .wrap(SecureHeaders)
        .wrap(LogRequest)
        .wrap(RecoverPanic)
        .service(ping)
        .service(static_file)
        .service(dynamic)
}
