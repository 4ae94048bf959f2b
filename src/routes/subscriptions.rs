use std::fmt;

use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use anyhow::Context;
use chrono::Utc;
use sqlx::PgPool;

use crate::domain::EmailAddress;
use crate::email_client::EmailClient;
use crate::startup::ApplicationBaseUrl;
use crate::templates;
use crate::utils::{error_chain_fmt, json_error};

/// Newsletter form data
#[derive(serde::Deserialize)]
pub struct SubscribeData {
    email: String,
    #[serde(default)]
    consent: bool,
}

/// Subscription error type
#[derive(thiserror::Error)]
pub enum SubscribeError {
    #[error("{0}")]
    ValidationError(String),
    #[error("This email is already subscribed")]
    AlreadySubscribed,
    #[error("An error occurred. Please try again.")]
    UnexpectedError(#[from] anyhow::Error),
}

impl fmt::Debug for SubscribeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for SubscribeError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::ValidationError(_) | Self::AlreadySubscribed => StatusCode::BAD_REQUEST,
            Self::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        json_error(self.status_code(), self.to_string())
    }
}

/// Response to a successful operation
#[derive(serde::Serialize)]
pub struct SuccessResponse {
    pub success: bool,
    pub message: String,
}

impl SuccessResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Newsletter form handler
#[tracing::instrument(
    name = "Adding a new subscriber",
    skip(body, db_pool, email_client, base_url),
    fields(subscriber_email = %body.email)
)]
pub async fn subscribe(
    body: web::Json<SubscribeData>,
    db_pool: web::Data<PgPool>,
    email_client: web::Data<EmailClient>,
    base_url: web::Data<ApplicationBaseUrl>,
) -> Result<HttpResponse, SubscribeError> {
    // Validate subscriber data
    let SubscribeData { email, consent } = body.0;
    let email = EmailAddress::parse(email)
        .map_err(|_| SubscribeError::ValidationError("Invalid email address".into()))?;
    if !consent {
        return Err(SubscribeError::ValidationError(
            "You must agree to the privacy policy".into(),
        ));
    }

    // Store the subscriber
    let inserted = insert_subscriber(&email, &db_pool)
        .await
        .context("Failed to store the new subscriber in the database")?;
    if !inserted {
        return Err(SubscribeError::AlreadySubscribed);
    }

    // A failing welcome email does not fail the subscription
    if let Err(e) = send_welcome_email(&email_client, &email, &base_url.0).await {
        tracing::error!(
            error.cause_chain = ?e,
            error.message = %e,
            "Failed to send welcome email"
        );
    }

    Ok(HttpResponse::Ok().json(SuccessResponse::new(
        "Successfully subscribed! Check your email for a welcome message.",
    )))
}

/// Send the welcome email to a new subscriber
#[tracing::instrument(name = "Send a welcome email", skip_all)]
async fn send_welcome_email(
    email_client: &EmailClient,
    email: &EmailAddress,
    base_url: &str,
) -> anyhow::Result<()> {
    let welcome = templates::welcome("", base_url).context("Failed to render the welcome email")?;
    email_client
        .send_email(
            email,
            &welcome.subject,
            &welcome.html_content,
            &welcome.text_content,
        )
        .await
}

/// Insert an active subscriber, returning `false` if the email is already known
#[tracing::instrument(name = "Saving new subscriber in the database", skip(email, db_pool))]
async fn insert_subscriber(email: &EmailAddress, db_pool: &PgPool) -> sqlx::Result<bool> {
    let result = sqlx::query(
        r"
        INSERT INTO subscribers (email, consent, status, subscribed_at)
        VALUES ($1, true, 'active', $2)
        ON CONFLICT (email) DO NOTHING
        ",
    )
    .bind(email.as_ref().to_lowercase())
    .bind(Utc::now())
    .execute(db_pool)
    .await?;

    Ok(result.rows_affected() == 1)
}
