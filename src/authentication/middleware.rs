use std::fmt;
use std::ops::Deref;

use actix_web::body::MessageBody;
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::error::InternalError;
use actix_web::http::StatusCode;
use actix_web::middleware::Next;
use actix_web::{web, FromRequest, HttpMessage};
use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

use crate::session_state::TypedSession;
use crate::utils::{e500, json_error, see_other};

/// User identifier
#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct UserId(Uuid);

impl UserId {
    pub const fn new(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Deref for UserId {
    type Target = Uuid;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Role granted to a user
#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
        }
    }
}

impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "admin" => Ok(Self::Admin),
            "user" => Ok(Self::User),
            other => Err(format!("`{other}` is not a known role")),
        }
    }
}

/// Logged-in user, resolved once per request by `reject_logged_out_users`
#[derive(Clone, Debug)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl AuthenticatedUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    name: String,
    email: String,
    role: String,
}

/// Load the user owning a session
#[tracing::instrument(name = "Get authenticated user", skip(db_pool))]
pub async fn get_authenticated_user(
    user_id: UserId,
    db_pool: &PgPool,
) -> anyhow::Result<Option<AuthenticatedUser>> {
    let row = sqlx::query_as::<_, UserRow>(
        r"
        SELECT name, email, role
        FROM users
        WHERE user_id = $1
        ",
    )
    .bind(*user_id)
    .fetch_optional(db_pool)
    .await
    .context("Failed to perform a query to fetch the session user")?;

    row.map(|r| {
        let role = Role::try_from(r.role).map_err(anyhow::Error::msg)?;
        Ok(AuthenticatedUser {
            user_id,
            name: r.name,
            email: r.email,
            role,
        })
    })
    .transpose()
}

/// Reject users that are not logged in, expose the logged-in user to handlers otherwise
#[allow(clippy::future_not_send)]
pub async fn reject_logged_out_users(
    mut req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> actix_web::Result<ServiceResponse<impl MessageBody>> {
    // Retrieve session
    let session = {
        let (http_request, payload) = req.parts_mut();
        TypedSession::from_request(http_request, payload).await
    }?;

    // Check if the session state contains a `user_id` that still matches a user
    let user = match session.get_user_id().map_err(e500)? {
        Some(user_id) => {
            let db_pool = req
                .app_data::<web::Data<PgPool>>()
                .cloned()
                .ok_or_else(|| e500("Database pool is not configured"))?;
            get_authenticated_user(user_id, &db_pool)
                .await
                .map_err(e500)?
        }
        None => None,
    };

    if let Some(user) = user {
        req.extensions_mut().insert(user);
        next.call(req).await
    } else {
        session.logout();
        let response = see_other("/login");
        let e = anyhow::anyhow!("The user is not logged in");
        Err(InternalError::from_response(e, response).into())
    }
}

/// Reject logged-in users without the admin role
///
/// Must run after `reject_logged_out_users`.
#[allow(clippy::future_not_send)]
pub async fn reject_non_admin_users(
    req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> actix_web::Result<ServiceResponse<impl MessageBody>> {
    let is_admin = req
        .extensions()
        .get::<AuthenticatedUser>()
        .is_some_and(AuthenticatedUser::is_admin);

    if is_admin {
        next.call(req).await
    } else {
        let response = json_error(StatusCode::FORBIDDEN, "Unauthorized");
        let e = anyhow::anyhow!("The user is not an admin");
        Err(InternalError::from_response(e, response).into())
    }
}
