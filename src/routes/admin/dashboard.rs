use actix_web::http::header::ContentType;
use actix_web::web::ReqData;
use actix_web::HttpResponse;

use crate::authentication::AuthenticatedUser;

/// Admin dashboard handler
pub async fn dashboard(user: ReqData<AuthenticatedUser>) -> HttpResponse {
    // The middleware already resolved the logged-in admin
    HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(format!(include_str!("dashboard.html"), user.name))
}
