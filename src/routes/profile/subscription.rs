use actix_web::web::ReqData;
use actix_web::{web, HttpResponse};
use anyhow::Context;
use chrono::Utc;
use sqlx::{Executor, PgPool, Postgres, Transaction};

use crate::authentication::AuthenticatedUser;
use crate::domain::EmailAddress;
use crate::email_client::EmailClient;
use crate::routes::SuccessResponse;
use crate::startup::ApplicationBaseUrl;
use crate::templates;
use crate::utils::e500;

/// Subscription toggle request body
#[derive(serde::Deserialize)]
pub struct SubscriptionData {
    subscribe: bool,
}

/// Turn the newsletter on or off for the logged-in user
#[tracing::instrument(
    name = "Toggle newsletter subscription",
    skip(body, db_pool, email_client, base_url, user),
    fields(user_id = %user.user_id, subscribe = body.subscribe)
)]
pub async fn toggle_subscription(
    body: web::Json<SubscriptionData>,
    db_pool: web::Data<PgPool>,
    email_client: web::Data<EmailClient>,
    base_url: web::Data<ApplicationBaseUrl>,
    user: ReqData<AuthenticatedUser>,
) -> actix_web::Result<HttpResponse> {
    let user = user.into_inner();
    let subscribe = body.subscribe;

    // Update the user flag and the newsletter list together
    let mut transaction = db_pool
        .begin()
        .await
        .context("Failed to acquire a database connection")
        .map_err(e500)?;
    set_user_subscription(&mut transaction, &user, subscribe)
        .await
        .map_err(e500)?;
    if subscribe {
        activate_subscriber(&mut transaction, &user.email)
            .await
            .map_err(e500)?;
    } else {
        deactivate_subscriber(&mut transaction, &user.email)
            .await
            .map_err(e500)?;
    }
    transaction
        .commit()
        .await
        .context("Failed to commit the subscription change")
        .map_err(e500)?;

    // Confirm the change by email, failures are only logged
    if let Err(e) = send_subscription_email(&email_client, &user, subscribe, &base_url.0).await {
        tracing::error!(
            error.cause_chain = ?e,
            error.message = %e,
            "Failed to send subscription confirmation email"
        );
    }

    let message = if subscribe {
        "Successfully subscribed! You will receive emails about new casino reviews."
    } else {
        "Successfully unsubscribed. You will no longer receive newsletter emails."
    };
    Ok(HttpResponse::Ok().json(SuccessResponse::new(message)))
}

/// Tell the user that their newsletter subscription changed
#[tracing::instrument(name = "Send a subscription confirmation email", skip_all)]
async fn send_subscription_email(
    email_client: &EmailClient,
    user: &AuthenticatedUser,
    subscribe: bool,
    base_url: &str,
) -> anyhow::Result<()> {
    let recipient = EmailAddress::parse(user.email.clone()).map_err(anyhow::Error::msg)?;
    let email = if subscribe {
        templates::subscribed(&user.name, base_url)
    } else {
        templates::unsubscribed(&user.name, base_url)
    }
    .context("Failed to render the subscription confirmation email")?;
    email_client
        .send_email(
            &recipient,
            &email.subject,
            &email.html_content,
            &email.text_content,
        )
        .await
}

#[tracing::instrument(skip_all)]
async fn set_user_subscription(
    transaction: &mut Transaction<'_, Postgres>,
    user: &AuthenticatedUser,
    subscribe: bool,
) -> anyhow::Result<()> {
    transaction
        .execute(
            sqlx::query(
                r"
                UPDATE users
                SET is_subscribed = $1
                WHERE user_id = $2
                ",
            )
            .bind(subscribe)
            .bind(*user.user_id),
        )
        .await
        .context("Failed to update the user subscription flag")?;
    Ok(())
}

/// Add the user to the newsletter list, reactivating a previous subscription
#[tracing::instrument(skip_all)]
async fn activate_subscriber(
    transaction: &mut Transaction<'_, Postgres>,
    email: &str,
) -> anyhow::Result<()> {
    transaction
        .execute(
            sqlx::query(
                r"
                INSERT INTO subscribers (email, consent, status, subscribed_at)
                VALUES ($1, true, 'active', $2)
                ON CONFLICT (email) DO UPDATE
                SET status = 'active', unsubscribed_at = NULL
                ",
            )
            .bind(email)
            .bind(Utc::now()),
        )
        .await
        .context("Failed to activate the subscriber")?;
    Ok(())
}

#[tracing::instrument(skip_all)]
async fn deactivate_subscriber(
    transaction: &mut Transaction<'_, Postgres>,
    email: &str,
) -> anyhow::Result<()> {
    transaction
        .execute(
            sqlx::query(
                r"
                UPDATE subscribers
                SET status = 'inactive', unsubscribed_at = $2
                WHERE email = $1
                ",
            )
            .bind(email)
            .bind(Utc::now()),
        )
        .await
        .context("Failed to deactivate the subscriber")?;
    Ok(())
}
