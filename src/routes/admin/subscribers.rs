use actix_web::{web, HttpResponse};
use anyhow::Context;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::utils::e500;

/// Number of recent subscribers shown to admins
const RECENT_SUBSCRIBERS: i64 = 10;

#[derive(serde::Serialize, sqlx::FromRow)]
struct RecentSubscriber {
    email: String,
    subscribed_at: DateTime<Utc>,
}

/// Newsletter statistics
#[derive(serde::Serialize)]
struct SubscriberStats {
    total: i64,
    new_today: i64,
    recent: Vec<RecentSubscriber>,
}

/// Newsletter statistics handler, only active subscribers are counted
#[tracing::instrument(name = "Get subscriber statistics", skip(db_pool))]
pub async fn list_subscribers(db_pool: web::Data<PgPool>) -> actix_web::Result<HttpResponse> {
    let (total, new_today) = sqlx::query_as::<_, (i64, i64)>(
        r"
        SELECT
            COUNT(*),
            COUNT(*) FILTER (WHERE subscribed_at >= date_trunc('day', now()))
        FROM subscribers
        WHERE status = 'active'
        ",
    )
    .fetch_one(db_pool.get_ref())
    .await
    .context("Failed to count subscribers")
    .map_err(e500)?;

    let recent = sqlx::query_as::<_, RecentSubscriber>(
        r"
        SELECT email, subscribed_at
        FROM subscribers
        WHERE status = 'active'
        ORDER BY subscribed_at DESC
        LIMIT $1
        ",
    )
    .bind(RECENT_SUBSCRIBERS)
    .fetch_all(db_pool.get_ref())
    .await
    .context("Failed to fetch recent subscribers")
    .map_err(e500)?;

    Ok(HttpResponse::Ok().json(SubscriberStats {
        total,
        new_today,
        recent,
    }))
}
