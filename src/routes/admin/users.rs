use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse};
use anyhow::Context;
use chrono::{DateTime, Utc};
use sqlx::{Executor, PgPool};
use uuid::Uuid;

use crate::domain::EmailAddress;
use crate::email_client::EmailClient;
use crate::routes::SuccessResponse;
use crate::templates;
use crate::utils::{e500, json_error};

/// User, as listed to admins
#[derive(serde::Serialize, sqlx::FromRow)]
pub struct UserSummary {
    #[serde(rename = "id")]
    user_id: Uuid,
    name: String,
    email: String,
    role: String,
    is_subscribed: bool,
    created_at: DateTime<Utc>,
}

#[derive(serde::Serialize)]
struct UserList {
    users: Vec<UserSummary>,
}

/// List every user, newest first, without their credentials
#[tracing::instrument(name = "List users", skip(db_pool))]
pub async fn list_users(db_pool: web::Data<PgPool>) -> actix_web::Result<HttpResponse> {
    let users = sqlx::query_as::<_, UserSummary>(
        r"
        SELECT user_id, name, email, role, is_subscribed, created_at
        FROM users
        ORDER BY created_at DESC
        ",
    )
    .fetch_all(db_pool.get_ref())
    .await
    .context("Failed to fetch users")
    .map_err(e500)?;

    Ok(HttpResponse::Ok().json(UserList { users }))
}

/// User deletion request body
#[derive(serde::Deserialize)]
pub struct DeleteUserData {
    user_id: Uuid,
}

#[derive(sqlx::FromRow)]
struct DeletedUser {
    name: String,
    email: String,
}

/// Delete a user and their newsletter subscription
#[tracing::instrument(
    name = "Delete a user",
    skip(body, db_pool, email_client),
    fields(deleted_user_id = %body.user_id)
)]
pub async fn delete_user(
    body: web::Json<DeleteUserData>,
    db_pool: web::Data<PgPool>,
    email_client: web::Data<EmailClient>,
) -> actix_web::Result<HttpResponse> {
    let user = sqlx::query_as::<_, DeletedUser>(
        r"
        SELECT name, email
        FROM users
        WHERE user_id = $1
        ",
    )
    .bind(body.user_id)
    .fetch_optional(db_pool.get_ref())
    .await
    .context("Failed to fetch the user to delete")
    .map_err(e500)?;
    let Some(user) = user else {
        return Ok(json_error(StatusCode::NOT_FOUND, "User not found"));
    };

    // Say goodbye first, a failure does not prevent the deletion
    if let Err(e) = send_account_deleted_email(&email_client, &user).await {
        tracing::error!(
            error.cause_chain = ?e,
            error.message = %e,
            "Failed to send account deletion email"
        );
    }

    let mut transaction = db_pool
        .begin()
        .await
        .context("Failed to acquire a database connection")
        .map_err(e500)?;
    transaction
        .execute(sqlx::query("DELETE FROM users WHERE user_id = $1").bind(body.user_id))
        .await
        .context("Failed to delete the user")
        .map_err(e500)?;
    transaction
        .execute(sqlx::query("DELETE FROM subscribers WHERE email = $1").bind(&user.email))
        .await
        .context("Failed to delete the user subscription")
        .map_err(e500)?;
    transaction
        .commit()
        .await
        .context("Failed to commit the user deletion")
        .map_err(e500)?;

    Ok(HttpResponse::Ok().json(SuccessResponse::new(
        "User and all associated data deleted successfully",
    )))
}

/// Tell a user that their account is about to be removed
#[tracing::instrument(name = "Send an account deletion email", skip_all)]
async fn send_account_deleted_email(
    email_client: &EmailClient,
    user: &DeletedUser,
) -> anyhow::Result<()> {
    let recipient = EmailAddress::parse(user.email.clone()).map_err(anyhow::Error::msg)?;
    let goodbye = templates::account_deleted(&user.name, &user.email)
        .context("Failed to render the account deletion email")?;
    email_client
        .send_email(
            &recipient,
            &goodbye.subject,
            &goodbye.html_content,
            &goodbye.text_content,
        )
        .await
}
