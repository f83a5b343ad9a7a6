//! Liveness probe served outside the session-aware routes.

use actix_web::{HttpResponse, get, http::header};

/// Always `200 pong`; touches no session, CSRF or store state.
#[get("/ping")]
pub async fn ping() -> HttpResponse {
    HttpResponse::Ok()
        .insert_header((header::CACHE_CONTROL, "no-store"))
        .content_type("text/plain; charset=utf-8")
        .body("pong")
}
