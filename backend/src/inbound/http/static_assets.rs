//! Static assets bundled into the binary.

use actix_web::http::header;
use actix_web::{HttpResponse, get, web};

struct Asset {
    path: &'static str,
    content_type: &'static str,
    bytes: &'static [u8],
}

const ASSETS: &[Asset] = &[
    Asset {
        path: "css/main.css",
        content_type: "text/css; charset=utf-8",
        bytes: include_bytes!("../../../static/css/main.css"),
    },
    Asset {
        path: "js/main.js",
        content_type: "text/javascript; charset=utf-8",
        bytes: include_bytes!("../../../static/js/main.js"),
    },
];

fn lookup(path: &str) -> Option<&'static Asset> {
    ASSETS.iter().find(|asset| asset.path == path)
}

/// Serve a bundled file; unknown paths are `404` with an empty body.
#[get("/static/{path:.*}")]
pub async fn static_file(path: web::Path<String>) -> HttpResponse {
    match lookup(&path) {
        Some(asset) => HttpResponse::Ok()
            .insert_header((header::CACHE_CONTROL, "public, max-age=3600"))
            .content_type(asset.content_type)
            .body(asset.bytes),
        None => HttpResponse::NotFound().finish(),
    }
}
