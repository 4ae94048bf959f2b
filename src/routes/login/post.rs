use std::fmt;

use actix_web::error::InternalError;
use actix_web::{web, HttpResponse};
use actix_web_flash_messages::FlashMessage;
use secrecy::SecretString;
use sqlx::PgPool;

use crate::authentication::{get_authenticated_user, validate_creds, AuthError, Credentials};
use crate::session_state::TypedSession;
use crate::utils::{error_chain_fmt, see_other};

/// Web form data
#[derive(serde::Deserialize)]
pub struct FormData {
    email: String,
    password: SecretString,
}

/// Login error type
#[derive(thiserror::Error)]
pub enum LoginError {
    #[error("Authentication failed")]
    AuthError(#[source] anyhow::Error),
    #[error("Something went wrong")]
    UnexpectedError(#[from] anyhow::Error),
}

impl fmt::Debug for LoginError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        error_chain_fmt(self, f)
    }
}

/// Login POST handler
#[allow(clippy::future_not_send)]
#[tracing::instrument(
    skip(form, db_pool, session),
    fields(email=tracing::field::Empty, user_id=tracing::field::Empty)
)]
pub async fn login(
    form: web::Form<FormData>,
    db_pool: web::Data<PgPool>,
    session: TypedSession,
) -> Result<HttpResponse, InternalError<LoginError>> {
    // Extract authentication credentials
    let creds = Credentials {
        email: form.0.email,
        password: form.0.password,
    };
    tracing::Span::current().record("email", tracing::field::display(&creds.email));

    // Validate authentication credentials
    let user_id = validate_creds(creds, &db_pool).await.map_err(|e| {
        let e = match e {
            AuthError::InvalidCredentials(_) => LoginError::AuthError(e.into()),
            AuthError::UnexpectedError(_) => LoginError::UnexpectedError(e.into()),
        };
        login_redirect(e)
    })?;
    tracing::Span::current().record("user_id", tracing::field::display(&user_id));

    // Start a new session and send admins straight to their dashboard
    session
        .log_in(user_id)
        .map_err(|e| login_redirect(LoginError::UnexpectedError(e.into())))?;
    let user = get_authenticated_user(user_id, &db_pool)
        .await
        .map_err(|e| login_redirect(LoginError::UnexpectedError(e)))?;
    let location = match user {
        Some(user) if user.is_admin() => "/admin/dashboard",
        _ => "/",
    };
    Ok(see_other(location))
}

/// Redirect to the login page with an error message
fn login_redirect(e: LoginError) -> InternalError<LoginError> {
    FlashMessage::error(e.to_string()).send();
    let response = see_other("/login");
    InternalError::from_response(e, response)
}
