use sqlx::postgres::{PgConnectOptions, PgPoolOptions};

use crate::helpers::{init_test_db_pool, TestApp};

#[sqlx::test]
async fn subscribe_stores_an_active_subscriber(
    _pool_opts: PgPoolOptions,
    conn_opts: PgConnectOptions,
) {
    let db_pool = init_test_db_pool(conn_opts);
    let app = TestApp::spawn(&db_pool).await;
    app.expect_emails(1).await;

    let response = app
        .post_json(
            "/subscriptions",
            &serde_json::json!({ "email": "ursula@example.com", "consent": true }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 200);

    let (status, consent) = sqlx::query_as::<_, (String, bool)>(
        "SELECT status, consent FROM subscribers WHERE email = 'ursula@example.com'",
    )
    .fetch_one(&db_pool)
    .await
    .expect("Failed to fetch saved subscription");
    assert_eq!(status, "active");
    assert!(consent);

    db_pool.close().await;
}

#[sqlx::test]
async fn subscribe_succeeds_even_if_the_welcome_email_fails(
    _pool_opts: PgPoolOptions,
    conn_opts: PgConnectOptions,
) {
    let db_pool = init_test_db_pool(conn_opts);
    let app = TestApp::spawn(&db_pool).await;
    wiremock::Mock::given(wiremock::matchers::any())
        .respond_with(wiremock::ResponseTemplate::new(500))
        .expect(1)
        .mount(&app.email_server)
        .await;

    let response = app
        .post_json(
            "/subscriptions",
            &serde_json::json!({ "email": "ursula@example.com", "consent": true }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 200);

    db_pool.close().await;
}

#[sqlx::test]
async fn subscribe_twice_returns_400(_pool_opts: PgPoolOptions, conn_opts: PgConnectOptions) {
    let db_pool = init_test_db_pool(conn_opts);
    let app = TestApp::spawn(&db_pool).await;
    app.expect_emails(1).await;
    let body = serde_json::json!({ "email": "ursula@example.com", "consent": true });

    let first = app.post_json("/subscriptions", &body).await;
    let second = app.post_json("/subscriptions", &body).await;

    assert_eq!(first.status().as_u16(), 200);
    assert_eq!(second.status().as_u16(), 400);
    let body: serde_json::Value = second.json().await.unwrap();
    assert_eq!(body["error"], "This email is already subscribed");

    db_pool.close().await;
}

#[sqlx::test]
async fn subscribe_returns_400_for_invalid_data(
    _pool_opts: PgPoolOptions,
    conn_opts: PgConnectOptions,
) {
    let db_pool = init_test_db_pool(conn_opts);
    let app = TestApp::spawn(&db_pool).await;
    app.expect_emails(0).await;

    let test_cases = [
        (
            serde_json::json!({ "email": "ursula@example.com" }),
            "You must agree to the privacy policy",
        ),
        (
            serde_json::json!({ "email": "ursula@example.com", "consent": false }),
            "You must agree to the privacy policy",
        ),
        (
            serde_json::json!({ "email": "definitely-not-an-email", "consent": true }),
            "Invalid email address",
        ),
    ];
    for (body, error) in test_cases {
        let response = app.post_json("/subscriptions", &body).await;
        assert_eq!(response.status().as_u16(), 400);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["error"], error);
    }

    db_pool.close().await;
}
