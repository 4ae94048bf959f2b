use actix_web::{web, HttpResponse};
use anyhow::Context;
use sqlx::PgPool;

use super::{get_subscribed_recipients, ArticleData, NewsChangeResponse, NewsError};
use crate::dispatcher::{Dispatcher, Notification, NotificationJob};
use crate::domain::{ArticleId, NewArticle};
use crate::startup::ApplicationBaseUrl;

/// Article update request body
#[derive(serde::Deserialize)]
pub struct UpdateData {
    id: String,
    #[serde(flatten)]
    article: ArticleData,
}

/// Edit an existing article and tell subscribers about it
#[tracing::instrument(
    name = "Update a news article",
    skip(body, db_pool, dispatcher, base_url),
    fields(news_id = %body.id)
)]
pub async fn update_news(
    body: web::Json<UpdateData>,
    db_pool: web::Data<PgPool>,
    dispatcher: web::Data<Dispatcher>,
    base_url: web::Data<ApplicationBaseUrl>,
) -> Result<HttpResponse, NewsError> {
    let UpdateData { id, article } = body.into_inner();
    let news_id = ArticleId::parse(&id).map_err(NewsError::ValidationError)?;
    let article: NewArticle = article.try_into().map_err(NewsError::ValidationError)?;

    let updated = update_article(&db_pool, news_id, &article)
        .await
        .context("Failed to update the news article")?;
    if !updated {
        return Err(NewsError::NotFound);
    }

    let recipients = get_subscribed_recipients(&db_pool)
        .await
        .context("Failed to fetch subscribed users")?;
    let job = NotificationJob::new(
        Notification::Updated {
            title: article.title.as_ref().to_string(),
        },
        base_url.0.clone(),
        recipients,
    );
    let delivery = dispatcher.dispatch(&job).await;

    Ok(HttpResponse::Ok().json(NewsChangeResponse::new(
        "News article updated successfully",
        delivery,
    )))
}

/// Overwrite the article fields, returning `false` if it does not exist
#[tracing::instrument(skip(db_pool, article))]
async fn update_article(
    db_pool: &PgPool,
    news_id: ArticleId,
    article: &NewArticle,
) -> sqlx::Result<bool> {
    let result = sqlx::query(
        r"
        UPDATE news
        SET title = $1, image_url = $2, content = $3, rating = $4, updated_at = now()
        WHERE news_id = $5
        ",
    )
    .bind(article.title.as_ref())
    .bind(article.image_url.as_ref())
    .bind(article.content.as_ref())
    .bind(i32::from(article.rating))
    .bind(*news_id)
    .execute(db_pool)
    .await?;

    Ok(result.rows_affected() > 0)
}
