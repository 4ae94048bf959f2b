use actix_web::{web, HttpResponse};
use anyhow::Context;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::utils::e500;

/// Maximum number of articles returned by the news feed
const NEWS_FEED_LIMIT: i64 = 50;

/// Published article, as shown to readers
#[derive(Debug, serde::Serialize, sqlx::FromRow)]
pub struct Article {
    #[serde(rename = "id")]
    pub news_id: Uuid,
    pub title: String,
    pub image_url: String,
    pub content: String,
    pub rating: i32,
    pub author: String,
    pub published_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub sent_to: i32,
}

/// News feed response body
#[derive(serde::Serialize)]
struct NewsFeed {
    articles: Vec<Article>,
}

/// News feed handler
pub async fn list_news(db_pool: web::Data<PgPool>) -> actix_web::Result<HttpResponse> {
    let articles = get_latest_articles(&db_pool).await.map_err(e500)?;
    Ok(HttpResponse::Ok().json(NewsFeed { articles }))
}

/// Fetch the most recent articles, newest first
#[tracing::instrument(name = "Get latest articles", skip(db_pool))]
async fn get_latest_articles(db_pool: &PgPool) -> anyhow::Result<Vec<Article>> {
    sqlx::query_as::<_, Article>(
        r"
        SELECT news_id, title, image_url, content, rating, author, published_at, updated_at, sent_to
        FROM news
        ORDER BY published_at DESC
        LIMIT $1
        ",
    )
    .bind(NEWS_FEED_LIMIT)
    .fetch_all(db_pool)
    .await
    .context("Failed to fetch the latest articles")
}
