use actix_web::web::ReqData;
use actix_web::{web, HttpResponse};
use anyhow::Context;
use sqlx::PgPool;
use tracing::field::display;
use tracing::Span;
use uuid::Uuid;

use super::{get_subscribed_recipients, ArticleData, NewsChangeResponse, NewsError};
use crate::authentication::AuthenticatedUser;
use crate::dispatcher::{Dispatcher, Notification, NotificationJob};
use crate::domain::{ArticleId, NewArticle};
use crate::startup::ApplicationBaseUrl;

/// Publication response body
#[derive(serde::Serialize)]
struct PublishResponse {
    #[serde(flatten)]
    outcome: NewsChangeResponse,
    news_id: ArticleId,
}

/// Publish a new article and announce it to subscribers
#[tracing::instrument(
    name = "Publish a news article",
    skip(body, db_pool, dispatcher, base_url, user),
    fields(user_id = %user.user_id, news_id = tracing::field::Empty)
)]
pub async fn publish_news(
    body: web::Json<ArticleData>,
    db_pool: web::Data<PgPool>,
    dispatcher: web::Data<Dispatcher>,
    base_url: web::Data<ApplicationBaseUrl>,
    user: ReqData<AuthenticatedUser>,
) -> Result<HttpResponse, NewsError> {
    let article: NewArticle = body.0.try_into().map_err(NewsError::ValidationError)?;
    let user = user.into_inner();

    // Save the article before telling anyone about it
    let news_id = insert_article(&db_pool, &article, &user)
        .await
        .context("Failed to store the news article")?;
    Span::current().record("news_id", display(news_id));

    // Announce it to subscribers, whatever the outcome the article stays published
    let recipients = get_subscribed_recipients(&db_pool)
        .await
        .context("Failed to fetch subscribed users")?;
    let job = NotificationJob::new(
        Notification::Published(article),
        base_url.0.clone(),
        recipients,
    );
    let delivery = dispatcher.dispatch(&job).await;

    record_sent_count(&db_pool, news_id, delivery.sent)
        .await
        .context("Failed to record the number of notified subscribers")?;

    let message = if delivery.attempted == 0 {
        "News published but no subscribers to send to".to_string()
    } else {
        format!("News published and sent to {} subscribers", delivery.sent)
    };
    Ok(HttpResponse::Ok().json(PublishResponse {
        outcome: NewsChangeResponse::new(message, delivery),
        news_id,
    }))
}

/// Save a new article, not yet sent to anybody
#[tracing::instrument(skip_all)]
async fn insert_article(
    db_pool: &PgPool,
    article: &NewArticle,
    author: &AuthenticatedUser,
) -> sqlx::Result<ArticleId> {
    let news_id = ArticleId::new(Uuid::new_v4());
    sqlx::query(
        r"
        INSERT INTO news (
            news_id,
            title,
            image_url,
            content,
            rating,
            author,
            author_email,
            published_at,
            sent_to
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, now(), 0)
        ",
    )
    .bind(*news_id)
    .bind(article.title.as_ref())
    .bind(article.image_url.as_ref())
    .bind(article.content.as_ref())
    .bind(i32::from(article.rating))
    .bind(&author.name)
    .bind(&author.email)
    .execute(db_pool)
    .await?;

    Ok(news_id)
}

/// Store how many subscribers received the article
#[tracing::instrument(skip(db_pool))]
async fn record_sent_count(
    db_pool: &PgPool,
    news_id: ArticleId,
    sent: usize,
) -> anyhow::Result<()> {
    let sent = i32::try_from(sent).context("Sent count does not fit the database column")?;
    sqlx::query(
        r"
        UPDATE news
        SET sent_to = $1
        WHERE news_id = $2
        ",
    )
    .bind(sent)
    .bind(*news_id)
    .execute(db_pool)
    .await?;

    Ok(())
}
