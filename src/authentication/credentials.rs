use anyhow::Context;
use argon2::password_hash::SaltString;
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};
use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use uuid::Uuid;

use crate::authentication::UserId;
use crate::telemetry::spawn_blocking_with_tracing;

/// Fallback hash in case an unknown email is provided during authentication
const FALLBACK_HASH: &str =
    "$argon2id$v=19$m=15000,t=2,p=1$gZiV/M1gPc22ElAH/Jh1Hw$CWOrkoo7oJBQ/iyh7uJ0LO2aLEfrHwTWllSAxT0zRno";

/// Authentication credentials data
pub struct Credentials {
    pub email: String,
    pub password: SecretString,
}

/// Authentication error type
#[derive(thiserror::Error, Debug)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials(#[source] anyhow::Error),
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

/// Validate provided authentication credentials and return `user_id` if they are valid
#[tracing::instrument(name = "Validate credentials", skip(creds, db_pool))]
pub async fn validate_creds(creds: Credentials, db_pool: &PgPool) -> Result<UserId, AuthError> {
    // Fallback `user_id` and password hash to prevent timing attacks
    let mut user_id = None;
    let mut expected_password_hash = SecretString::from(FALLBACK_HASH.to_string());

    // Extract stored authentication credentials for the provided email
    if let Some((stored_user_id, stored_password_hash)) =
        get_stored_creds(&creds.email, db_pool).await?
    {
        user_id = Some(stored_user_id);
        expected_password_hash = stored_password_hash;
    }

    // Verify provided password against stored password hash
    spawn_blocking_with_tracing(move || {
        verify_password_hash(&expected_password_hash, &creds.password)
    })
    .await
    .context("Failed to spawn blocking task")??;

    user_id.ok_or_else(|| AuthError::InvalidCredentials(anyhow::anyhow!("Unknown email")))
}

/// Stored credentials row
#[derive(sqlx::FromRow)]
struct StoredCreds {
    user_id: Uuid,
    password_hash: String,
}

/// Extract stored authentication credentials from the database
#[tracing::instrument(name = "Get stored credentials", skip(email, db_pool))]
async fn get_stored_creds(
    email: &str,
    db_pool: &PgPool,
) -> anyhow::Result<Option<(UserId, SecretString)>> {
    let row = sqlx::query_as::<_, StoredCreds>(
        r"
        SELECT user_id, password_hash
        FROM users
        WHERE email = $1
        ",
    )
    .bind(email.trim().to_lowercase())
    .fetch_optional(db_pool)
    .await
    .context("Failed to perform a query to validate auth credentials")?
    .map(|r| (UserId::new(r.user_id), SecretString::from(r.password_hash)));

    Ok(row)
}

/// Compare computed and stored password hashes
#[tracing::instrument(name = "Verify password hash", skip(password_hash, password))]
fn verify_password_hash(
    password_hash: &SecretString,
    password: &SecretString,
) -> Result<(), AuthError> {
    // Parse stored password hash from PHC string format
    let password_hash =
        PasswordHash::new(password_hash.expose_secret()).context("Invalid stored password hash")?;

    // Compare computed and stored password hashes
    Argon2::default()
        .verify_password(password.expose_secret().as_bytes(), &password_hash)
        .context("Invalid password")
        .map_err(AuthError::InvalidCredentials)
}

/// Compute a password hash based on the provided password
pub fn compute_password_hash(password: &str) -> anyhow::Result<SecretString> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    let params = Params::new(15000, 2, 1, None).map_err(anyhow::Error::msg)?;
    let password_hash = Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
        .hash_password(password.as_bytes(), &salt)
        .map_err(anyhow::Error::msg)?
        .to_string();

    Ok(SecretString::from(password_hash))
}
