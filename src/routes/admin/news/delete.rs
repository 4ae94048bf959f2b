use actix_web::{web, HttpResponse};
use anyhow::Context;
use sqlx::PgPool;

use super::{get_subscribed_recipients, NewsChangeResponse, NewsError};
use crate::dispatcher::{Dispatcher, Notification, NotificationJob};
use crate::domain::ArticleId;
use crate::startup::ApplicationBaseUrl;

/// Web query parameters
#[derive(serde::Deserialize)]
pub struct Parameters {
    id: Option<String>,
}

/// Remove an article and tell subscribers it is gone
#[tracing::instrument(
    name = "Delete a news article",
    skip(parameters, db_pool, dispatcher, base_url),
    fields(news_id = ?parameters.id)
)]
pub async fn delete_news(
    parameters: web::Query<Parameters>,
    db_pool: web::Data<PgPool>,
    dispatcher: web::Data<Dispatcher>,
    base_url: web::Data<ApplicationBaseUrl>,
) -> Result<HttpResponse, NewsError> {
    let id = parameters
        .into_inner()
        .id
        .ok_or_else(|| NewsError::ValidationError("News ID is required".into()))?;
    let news_id = ArticleId::parse(&id).map_err(NewsError::ValidationError)?;

    // Keep the title around, the notification needs it
    let title = delete_article(&db_pool, news_id)
        .await
        .context("Failed to delete the news article")?
        .ok_or(NewsError::NotFound)?;

    let recipients = get_subscribed_recipients(&db_pool)
        .await
        .context("Failed to fetch subscribed users")?;
    let job = NotificationJob::new(
        Notification::Deleted { title },
        base_url.0.clone(),
        recipients,
    );
    let delivery = dispatcher.dispatch(&job).await;

    Ok(HttpResponse::Ok().json(NewsChangeResponse::new(
        "News article deleted successfully",
        delivery,
    )))
}

/// Delete an article, returning its title if it existed
#[tracing::instrument(skip(db_pool))]
async fn delete_article(db_pool: &PgPool, news_id: ArticleId) -> sqlx::Result<Option<String>> {
    sqlx::query_scalar::<_, String>(
        r"
        DELETE FROM news
        WHERE news_id = $1
        RETURNING title
        ",
    )
    .bind(*news_id)
    .fetch_optional(db_pool)
    .await
}
