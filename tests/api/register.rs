use sqlx::postgres::{PgConnectOptions, PgPoolOptions};

use crate::helpers::{init_test_db_pool, TestApp};

#[sqlx::test]
async fn register_stores_the_user_and_sends_a_welcome_email(
    _pool_opts: PgPoolOptions,
    conn_opts: PgConnectOptions,
) {
    let db_pool = init_test_db_pool(conn_opts);
    let app = TestApp::spawn(&db_pool).await;
    app.expect_emails(1).await;

    let response = app
        .post_json(
            "/register",
            &serde_json::json!({
                "name": "Satoshi",
                "email": "Satoshi@Example.com",
                "password": "hodl-forever",
            }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["role"], "user");

    // Emails are stored lowercase, new users are not subscribed
    let (email, is_subscribed) = sqlx::query_as::<_, (String, bool)>(
        "SELECT email, is_subscribed FROM users WHERE name = 'Satoshi'",
    )
    .fetch_one(&db_pool)
    .await
    .expect("Failed to fetch the registered user");
    assert_eq!(email, "satoshi@example.com");
    assert!(!is_subscribed);

    db_pool.close().await;
}

#[sqlx::test]
async fn register_grants_admin_role_to_the_configured_credentials(
    _pool_opts: PgPoolOptions,
    conn_opts: PgConnectOptions,
) {
    let db_pool = init_test_db_pool(conn_opts);
    let app = TestApp::spawn(&db_pool).await;
    app.expect_emails(1).await;

    // Matches `config/base.yaml`
    let response = app
        .post_json(
            "/register",
            &serde_json::json!({
                "name": "Site Admin",
                "email": "admin@email.com",
                "password": "change-me-admin-password",
            }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["role"], "admin");

    db_pool.close().await;
}

#[sqlx::test]
async fn register_rejects_an_already_used_email(
    _pool_opts: PgPoolOptions,
    conn_opts: PgConnectOptions,
) {
    let db_pool = init_test_db_pool(conn_opts);
    let app = TestApp::spawn(&db_pool).await;
    app.expect_emails(0).await;

    let response = app
        .post_json(
            "/register",
            &serde_json::json!({
                "name": "Impostor",
                "email": app.admin.email.to_uppercase(),
                "password": "another-password",
            }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "User already exists with this email");

    db_pool.close().await;
}

#[sqlx::test]
async fn register_returns_400_for_invalid_data(
    _pool_opts: PgPoolOptions,
    conn_opts: PgConnectOptions,
) {
    let db_pool = init_test_db_pool(conn_opts);
    let app = TestApp::spawn(&db_pool).await;

    let test_cases = [
        (
            serde_json::json!({ "name": "", "email": "a@example.com", "password": "secret-pw" }),
            "empty name",
        ),
        (
            serde_json::json!({ "name": "Bob", "email": "not-an-email", "password": "secret-pw" }),
            "invalid email",
        ),
        (
            serde_json::json!({ "name": "Bob", "email": "bob@example.com", "password": "123" }),
            "short password",
        ),
        (
            serde_json::json!({ "name": "Bob", "email": "bob@example.com" }),
            "missing password",
        ),
    ];
    for (body, description) in test_cases {
        let response = app.post_json("/register", &body).await;
        assert_eq!(
            response.status().as_u16(),
            400,
            "The API did not fail with 400 Bad Request when the payload had an {description}"
        );
    }

    db_pool.close().await;
}
