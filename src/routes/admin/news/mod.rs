mod delete;
mod post;
mod put;

use std::fmt;

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use sqlx::PgPool;

use crate::dispatcher::{DispatchResult, Recipient};
use crate::domain::{ArticleContent, ArticleTitle, EmailAddress, ImageUrl, NewArticle, Rating};
use crate::utils::{error_chain_fmt, json_error};

pub use delete::delete_news;
pub use post::publish_news;
pub use put::update_news;

/// Article fields submitted by an admin
#[derive(serde::Deserialize)]
pub struct ArticleData {
    title: String,
    image_url: String,
    content: String,
    rating: i32,
}

impl TryFrom<ArticleData> for NewArticle {
    type Error = String;

    fn try_from(value: ArticleData) -> Result<Self, Self::Error> {
        Ok(Self {
            title: ArticleTitle::parse(value.title)?,
            image_url: ImageUrl::parse(value.image_url)?,
            content: ArticleContent::parse(value.content)?,
            rating: Rating::parse(value.rating)?,
        })
    }
}

/// News management error type
#[derive(thiserror::Error)]
pub enum NewsError {
    #[error("{0}")]
    ValidationError(String),
    #[error("News article not found")]
    NotFound,
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl fmt::Debug for NewsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for NewsError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            Self::UnexpectedError(_) => json_error(self.status_code(), "Something went wrong"),
            _ => json_error(self.status_code(), self.to_string()),
        }
    }
}

/// Response to an article change, with the outcome of the notification
#[derive(serde::Serialize)]
struct NewsChangeResponse {
    success: bool,
    message: String,
    #[serde(flatten)]
    delivery: DispatchResult,
}

impl NewsChangeResponse {
    fn new(message: impl Into<String>, delivery: DispatchResult) -> Self {
        Self {
            success: true,
            message: message.into(),
            delivery,
        }
    }
}

#[derive(sqlx::FromRow)]
struct SubscribedUser {
    email: String,
    name: String,
}

/// Get the users who opted into the newsletter
///
/// Stored addresses that do not parse are skipped, so they are never attempted.
#[tracing::instrument(name = "Get subscribed recipients", skip(db_pool))]
async fn get_subscribed_recipients(db_pool: &PgPool) -> anyhow::Result<Vec<Recipient>> {
    let rows = sqlx::query_as::<_, SubscribedUser>(
        r"
        SELECT email, name
        FROM users
        WHERE is_subscribed = true
        ORDER BY created_at
        ",
    )
    .fetch_all(db_pool)
    .await?;

    let recipients = rows
        .into_iter()
        .filter_map(|r| match EmailAddress::parse(r.email) {
            Ok(email) => Some(Recipient {
                email,
                display_name: r.name,
            }),
            Err(error) => {
                tracing::warn!(
                    error.message = %error,
                    "Skipping a subscriber because their stored contact details are invalid"
                );
                None
            }
        })
        .collect();

    Ok(recipients)
}
