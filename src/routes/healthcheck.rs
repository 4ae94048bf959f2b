use actix_web::HttpResponse;

/// Health check handler, answers as soon as the HTTP server is up
pub async fn healthcheck() -> HttpResponse {
    HttpResponse::Ok().finish()
}
