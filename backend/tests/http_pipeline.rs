//! End-to-end tests of the composed application: routing, middleware order,
//! sessions, CSRF and error mapping.

mod support;

use actix_http::Request;
use actix_web::body::MessageBody;
use actix_web::cookie::Cookie;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::{StatusCode, header};
use actix_web::test::{self, TestRequest};
use actix_web::{HttpResponse, web};
use rstest::rstest;
use serde_json::Value;
use snippetbox::domain::ports::{
    FIXTURE_DUPLICATE_EMAIL, FIXTURE_EMAIL, FIXTURE_PASSWORD, FIXTURE_SNIPPET_ID,
};
use snippetbox::inbound::http::build_app;
use snippetbox::inbound::http::templates::TemplateCache;
use support::{csrf_token, deps, deps_with, form_post, location, session_cookie};

macro_rules! app {
    () => {
        test::init_service(build_app(deps())).await
    };
    ($deps:expr) => {
        test::init_service(build_app($deps)).await
    };
}

async fn boom() -> HttpResponse {
    panic!("handler exploded");
}

async fn body_text<B: MessageBody>(res: ServiceResponse<B>) -> String {
    String::from_utf8(test::read_body(res).await.to_vec()).expect("utf8 body")
}

/// Load `uri`, returning the session cookie and the form's CSRF token.
async fn open_form<S, B>(app: &S, uri: &str, cookie: Option<Cookie<'static>>) -> (Cookie<'static>, String)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let mut req = TestRequest::get().uri(uri);
    if let Some(cookie) = cookie.clone() {
        req = req.cookie(cookie);
    }
    let res = test::call_service(app, req.to_request()).await;
    assert_eq!(res.status(), StatusCode::OK, "GET {uri}");
    let cookie = session_cookie(&res).or(cookie).expect("session cookie");
    let token = csrf_token(&body_text(res).await).expect("csrf token in form");
    (cookie, token)
}

/// POST an empty login form with `cookie` and the token issued alongside it.
///
/// A live session passes the CSRF check and fails validation with 422; a
/// revoked one loads as a fresh session whose secret rejects the token.
async fn stale_login_status<S, B>(app: &S, cookie: Cookie<'static>, token: &str) -> StatusCode
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let res = test::call_service(
        app,
        form_post("/user/login", cookie, &[("csrf_token", token)]).to_request(),
    )
    .await;
    res.status()
}

/// Log in with the fixture account; returns the renewed cookie and a token.
async fn log_in<S, B>(app: &S) -> (Cookie<'static>, String)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let (cookie, token) = open_form(app, "/user/login", None).await;
    let res = test::call_service(
        app,
        form_post(
            "/user/login",
            cookie,
            &[
                ("csrf_token", token.as_str()),
                ("email", FIXTURE_EMAIL),
                ("password", FIXTURE_PASSWORD),
            ],
        )
        .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res).as_deref(), Some("/snippet/create"));
    let cookie = session_cookie(&res).expect("renewed session cookie");
    (cookie, token)
}

#[rstest]
#[actix_web::test]
async fn ping_answers_without_a_session() {
    let app = app!();
    let res = test::call_service(&app, TestRequest::get().uri("/ping").to_request()).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(session_cookie(&res).is_none());
    assert_eq!(body_text(res).await, "pong");
}

#[rstest]
#[case("/ping")]
#[case("/")]
#[case("/snippet/view/foo")]
#[case("/static/css/main.css")]
#[case("/boom")]
#[actix_web::test]
async fn security_headers_are_always_present(#[case] uri: &str) {
    let app = test::init_service(build_app(deps()).route("/boom", web::get().to(boom))).await;
    let res = test::call_service(&app, TestRequest::get().uri(uri).to_request()).await;
    let headers = res.headers();
    assert_eq!(
        headers.get("x-frame-options").and_then(|v| v.to_str().ok()),
        Some("deny")
    );
    assert_eq!(
        headers.get("x-content-type-options").and_then(|v| v.to_str().ok()),
        Some("nosniff")
    );
    assert!(headers.contains_key("content-security-policy"));
    assert!(headers.contains_key("referrer-policy"));
    assert!(headers.contains_key("x-xss-protection"));
}

#[rstest]
#[actix_web::test]
async fn home_lists_snippets() {
    let app = app!();
    let res = test::call_service(&app, TestRequest::get().uri("/").to_request()).await;
    assert_eq!(res.status(), StatusCode::OK);
    let html = body_text(res).await;
    assert!(html.contains("An old silent pond"));
    assert!(html.contains(&format!("/snippet/view/{FIXTURE_SNIPPET_ID}")));
}

#[rstest]
#[case("-1")]
#[case("1.23")]
#[case("foo")]
#[actix_web::test]
async fn malformed_snippet_ids_are_invalid_arguments(#[case] id: &str) {
    let app = app!();
    let uri = format!("/snippet/view/{id}");
    let res = test::call_service(&app, TestRequest::get().uri(&uri).to_request()).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["code"], "INVALID_ARGUMENT");
    assert_eq!(body["details"][0]["fieldViolations"][0]["field"], "id");
}

#[rstest]
#[actix_web::test]
async fn unknown_snippet_renders_not_found_page() {
    let app = app!();
    let uri = format!("/snippet/view/{}", uuid::Uuid::new_v4());
    let res = test::call_service(&app, TestRequest::get().uri(&uri).to_request()).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert!(body_text(res).await.contains("Not Found"));
}

#[rstest]
#[actix_web::test]
async fn fixture_snippet_is_shown() {
    let app = app!();
    let uri = format!("/snippet/view/{FIXTURE_SNIPPET_ID}");
    let res = test::call_service(&app, TestRequest::get().uri(&uri).to_request()).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(body_text(res).await.contains("An old silent pond..."));
}

#[rstest]
#[actix_web::test]
async fn missing_template_is_an_internal_error() {
    let app = app!(deps_with(TemplateCache::with_pages([])));
    let res = test::call_service(&app, TestRequest::get().uri("/").to_request()).await;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["code"], "INTERNAL");
    assert_eq!(body["message"], "Internal Error");
}

#[rstest]
#[actix_web::test]
async fn post_without_csrf_token_is_rejected() {
    let app = app!();
    let (cookie, _) = open_form(&app, "/user/login", None).await;
    let res = test::call_service(
        &app,
        form_post(
            "/user/login",
            cookie,
            &[("email", FIXTURE_EMAIL), ("password", FIXTURE_PASSWORD)],
        )
        .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[rstest]
#[actix_web::test]
async fn anonymous_create_redirects_to_login() {
    let app = app!();
    let res = test::call_service(&app, TestRequest::get().uri("/snippet/create").to_request()).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res).as_deref(), Some("/user/login"));
}

#[rstest]
#[actix_web::test]
async fn login_renews_the_session_token() {
    let app = app!();
    let (anonymous, token) = open_form(&app, "/user/login", None).await;
    let res = test::call_service(
        &app,
        form_post(
            "/user/login",
            anonymous.clone(),
            &[
                ("csrf_token", token.as_str()),
                ("email", FIXTURE_EMAIL),
                ("password", FIXTURE_PASSWORD),
            ],
        )
        .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    let renewed = session_cookie(&res).expect("renewed session cookie");
    assert_ne!(renewed.value(), anonymous.value());

    assert_eq!(
        stale_login_status(&app, anonymous.clone(), &token).await,
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        stale_login_status(&app, renewed.clone(), &token).await,
        StatusCode::UNPROCESSABLE_ENTITY
    );

    let res = test::call_service(
        &app,
        TestRequest::get().uri("/snippet/create").cookie(renewed).to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.headers()
            .get(header::CACHE_CONTROL)
            .and_then(|v| v.to_str().ok()),
        Some("no-store")
    );

    let res = test::call_service(
        &app,
        TestRequest::get().uri("/snippet/create").cookie(anonymous).to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res).as_deref(), Some("/user/login"));
}

#[rstest]
#[actix_web::test]
async fn wrong_password_is_unauthorized() {
    let app = app!();
    let (cookie, token) = open_form(&app, "/user/login", None).await;
    let res = test::call_service(
        &app,
        form_post(
            "/user/login",
            cookie,
            &[
                ("csrf_token", token.as_str()),
                ("email", FIXTURE_EMAIL),
                ("password", "not the password"),
            ],
        )
        .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert!(body_text(res).await.contains("Invalid credentials"));
}

#[rstest]
#[actix_web::test]
async fn invalid_snippet_form_is_unprocessable() {
    let app = app!();
    let (cookie, token) = log_in(&app).await;
    let res = test::call_service(
        &app,
        form_post(
            "/snippet/create",
            cookie,
            &[("csrf_token", token.as_str()), ("title", ""), ("content", "kept content"), ("expires", "7")],
        )
        .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let html = body_text(res).await;
    assert!(html.contains("This field can&#x27;t be blank"));
    assert!(html.contains(">kept content</textarea>"));
}

#[rstest]
#[actix_web::test]
async fn undecodable_snippet_form_is_an_invalid_argument() {
    let app = app!();
    let (cookie, token) = log_in(&app).await;
    let res = test::call_service(
        &app,
        form_post(
            "/snippet/create",
            cookie,
            &[("csrf_token", token.as_str()), ("title", "t"), ("content", "c"), ("expires", "abc")],
        )
        .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["message"], "invalid form");
    assert_eq!(body["details"][0]["fieldViolations"][0]["field"], "expires");
}

#[rstest]
#[actix_web::test]
async fn created_snippet_redirects_and_shows_toast_once() {
    let app = app!();
    let (cookie, token) = log_in(&app).await;
    let res = test::call_service(
        &app,
        form_post(
            "/snippet/create",
            cookie.clone(),
            &[("csrf_token", token.as_str()), ("title", "Haiku"), ("content", "Lines"), ("expires", "7")],
        )
        .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    let target = format!("/snippet/view/{FIXTURE_SNIPPET_ID}");
    assert_eq!(location(&res).as_deref(), Some(target.as_str()));
    let cookie = session_cookie(&res).unwrap_or(cookie);

    let res = test::call_service(
        &app,
        TestRequest::get().uri(&target).cookie(cookie.clone()).to_request(),
    )
    .await;
    assert!(body_text(res).await.contains("Snippet successfully created!"));

    let res = test::call_service(&app, TestRequest::get().uri(&target).cookie(cookie).to_request()).await;
    assert!(!body_text(res).await.contains("Snippet successfully created!"));
}

#[rstest]
#[actix_web::test]
async fn duplicate_signup_is_unprocessable() {
    let app = app!();
    let (cookie, token) = open_form(&app, "/user/signup", None).await;
    let res = test::call_service(
        &app,
        form_post(
            "/user/signup",
            cookie,
            &[
                ("csrf_token", token.as_str()),
                ("name", "Dupe"),
                ("email", FIXTURE_DUPLICATE_EMAIL),
                ("password", "long enough"),
            ],
        )
        .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body_text(res).await.contains("Email address is already in use"));
}

#[rstest]
#[actix_web::test]
async fn signup_logs_in_with_a_single_redirect() {
    let app = app!();
    let (anonymous, token) = open_form(&app, "/user/signup", None).await;
    let res = test::call_service(
        &app,
        form_post(
            "/user/signup",
            anonymous.clone(),
            &[
                ("csrf_token", token.as_str()),
                ("name", "Alice"),
                ("email", "new@example.com"),
                ("password", "long enough"),
            ],
        )
        .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res).as_deref(), Some("/snippet/create"));
    let cookie = session_cookie(&res).expect("renewed session cookie");
    assert_ne!(cookie.value(), anonymous.value());
    assert_eq!(
        stale_login_status(&app, anonymous, &token).await,
        StatusCode::BAD_REQUEST
    );

    let res = test::call_service(
        &app,
        TestRequest::get().uri("/snippet/create").cookie(cookie).to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[rstest]
#[actix_web::test]
async fn logout_forgets_the_user() {
    let app = app!();
    let (cookie, token) = log_in(&app).await;
    let res = test::call_service(
        &app,
        form_post("/user/logout", cookie, &[("csrf_token", token.as_str())]).to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res).as_deref(), Some("/"));
    let cookie = session_cookie(&res).expect("renewed session cookie");

    let res = test::call_service(&app, TestRequest::get().uri("/").cookie(cookie.clone()).to_request()).await;
    let html = body_text(res).await;
    assert!(html.contains("Successful logout"));
    assert!(html.contains("/user/login"));

    let res = test::call_service(
        &app,
        TestRequest::get().uri("/snippet/create").cookie(cookie).to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
}
