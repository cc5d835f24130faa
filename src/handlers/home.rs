use actix_web::{http::header::ContentType, HttpResponse};

/// Landing page compiled into the binary at build time.
const INDEX_HTML: &str = include_str!("../../templates/index.html");

/// `GET /` - serve the upload form.
pub async fn home() -> HttpResponse {
    HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(INDEX_HTML)
}
