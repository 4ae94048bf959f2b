use std::fmt;

use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use anyhow::Context;
use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use uuid::Uuid;

use crate::authentication::{compute_password_hash, Role, UserId};
use crate::configuration::AdminSettings;
use crate::domain::{EmailAddress, NewUser, Password, UserName};
use crate::email_client::EmailClient;
use crate::startup::ApplicationBaseUrl;
use crate::telemetry::spawn_blocking_with_tracing;
use crate::templates;
use crate::utils::{error_chain_fmt, json_error};

/// Registration request body
#[derive(serde::Deserialize)]
pub struct RegisterData {
    name: String,
    email: String,
    password: SecretString,
}

impl TryFrom<RegisterData> for NewUser {
    type Error = String;

    fn try_from(value: RegisterData) -> Result<Self, Self::Error> {
        let name = UserName::parse(value.name)?;
        let email = EmailAddress::parse(value.email)?;
        let password = Password::parse(value.password)?;
        Ok(Self {
            name,
            email,
            password,
        })
    }
}

/// Registration response body
#[derive(serde::Serialize)]
struct RegisterResponse {
    success: bool,
    message: &'static str,
    role: Role,
}

/// Registration error type
#[derive(thiserror::Error)]
pub enum RegisterError {
    #[error("{0}")]
    ValidationError(String),
    #[error("User already exists with this email")]
    AlreadyRegistered,
    #[error("An error occurred during registration")]
    UnexpectedError(#[from] anyhow::Error),
}

impl fmt::Debug for RegisterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for RegisterError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::ValidationError(_) | Self::AlreadyRegistered => StatusCode::BAD_REQUEST,
            Self::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        json_error(self.status_code(), self.to_string())
    }
}

/// Registration handler
#[tracing::instrument(
    name = "Register a new user",
    skip(body, db_pool, email_client, base_url, admin),
    fields(user_email = %body.email, user_name = %body.name)
)]
pub async fn register(
    body: web::Json<RegisterData>,
    db_pool: web::Data<PgPool>,
    email_client: web::Data<EmailClient>,
    base_url: web::Data<ApplicationBaseUrl>,
    admin: web::Data<AdminSettings>,
) -> Result<HttpResponse, RegisterError> {
    // Parse user data
    let new_user: NewUser = body.0.try_into().map_err(RegisterError::ValidationError)?;
    let role = if admin.grants_admin(new_user.email.as_ref(), new_user.password.expose_secret()) {
        Role::Admin
    } else {
        Role::User
    };

    // Hash the password off the async runtime
    let password = new_user.password.expose_secret().to_string();
    let password_hash = spawn_blocking_with_tracing(move || compute_password_hash(&password))
        .await
        .context("Failed to spawn blocking task")?
        .context("Failed to hash password")?;

    // Store the user, duplicate emails are rejected by the database
    let stored = insert_user(&new_user, &password_hash, role, &db_pool)
        .await
        .context("Failed to store the new user in the database")?;
    if stored.is_none() {
        return Err(RegisterError::AlreadyRegistered);
    }

    // A failing welcome email does not fail the registration
    if let Err(e) = send_welcome_email(&email_client, &new_user, &base_url.0).await {
        tracing::error!(
            error.cause_chain = ?e,
            error.message = %e,
            "Failed to send welcome email"
        );
    }

    Ok(HttpResponse::Ok().json(RegisterResponse {
        success: true,
        message: "User registered successfully",
        role,
    }))
}

/// Send the welcome email to a newly registered user
#[tracing::instrument(name = "Send a welcome email", skip_all)]
async fn send_welcome_email(
    email_client: &EmailClient,
    new_user: &NewUser,
    base_url: &str,
) -> anyhow::Result<()> {
    let welcome = templates::welcome(new_user.name.as_ref(), base_url)
        .context("Failed to render the welcome email")?;
    email_client
        .send_email(
            &new_user.email,
            &welcome.subject,
            &welcome.html_content,
            &welcome.text_content,
        )
        .await
}

/// Insert a user into the database, returning `None` if the email is already taken
#[tracing::instrument(
    name = "Saving new user details in the database",
    skip(new_user, password_hash, db_pool)
)]
async fn insert_user(
    new_user: &NewUser,
    password_hash: &SecretString,
    role: Role,
    db_pool: &PgPool,
) -> sqlx::Result<Option<UserId>> {
    let user_id = Uuid::new_v4();
    let result = sqlx::query(
        r"
        INSERT INTO users (user_id, name, email, password_hash, role, is_subscribed, created_at)
        VALUES ($1, $2, $3, $4, $5, false, $6)
        ON CONFLICT (email) DO NOTHING
        ",
    )
    .bind(user_id)
    .bind(new_user.name.as_ref())
    .bind(new_user.email.as_ref().to_lowercase())
    .bind(password_hash.expose_secret())
    .bind(role.as_str())
    .bind(Utc::now())
    .execute(db_pool)
    .await?;

    Ok((result.rows_affected() == 1).then_some(UserId::new(user_id)))
}
