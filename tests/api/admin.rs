use casino_hub::authentication::Role;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};

use crate::helpers::{init_test_db_pool, store_subscribed_users, TestApp, TestUser};

#[sqlx::test]
async fn admins_can_list_users_without_their_password_hashes(
    _pool_opts: PgPoolOptions,
    conn_opts: PgConnectOptions,
) {
    let db_pool = init_test_db_pool(conn_opts);
    let app = TestApp::spawn(&db_pool).await;
    let user = TestUser::generate(Role::User);
    user.store(&db_pool).await;
    app.login(&app.admin).await;

    let response = app.get("/admin/users").await;

    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    let users = body["users"].as_array().unwrap();
    assert_eq!(users.len(), 2);
    for listed in users {
        assert!(listed.get("password_hash").is_none());
    }
    let listed = users
        .iter()
        .find(|u| u["email"] == user.email.as_str())
        .expect("The regular user is not listed");
    assert_eq!(listed["role"], "user");
    assert_eq!(listed["is_subscribed"], false);
    assert_eq!(listed["id"], user.user_id.to_string());

    db_pool.close().await;
}

#[sqlx::test]
async fn deleting_a_user_removes_their_data_and_says_goodbye(
    _pool_opts: PgPoolOptions,
    conn_opts: PgConnectOptions,
) {
    let db_pool = init_test_db_pool(conn_opts);
    let app = TestApp::spawn(&db_pool).await;
    let user = TestUser::generate(Role::User);
    user.store_with_subscription(&db_pool, true).await;
    sqlx::query("INSERT INTO subscribers (email, consent) VALUES ($1, true)")
        .bind(&user.email)
        .execute(&db_pool)
        .await
        .unwrap();
    app.expect_emails(1).await;
    app.login(&app.admin).await;

    let response = app
        .delete(
            "/admin/users",
            Some(&serde_json::json!({ "user_id": user.user_id })),
        )
        .await;

    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(app.email_recipients().await, [user.email.clone()]);
    let (users, subscribers) = sqlx::query_as::<_, (i64, i64)>(
        r"
        SELECT
            (SELECT COUNT(*) FROM users WHERE user_id = $1),
            (SELECT COUNT(*) FROM subscribers WHERE email = $2)
        ",
    )
    .bind(user.user_id)
    .bind(&user.email)
    .fetch_one(&db_pool)
    .await
    .unwrap();
    assert_eq!((users, subscribers), (0, 0));

    db_pool.close().await;
}

#[sqlx::test]
async fn deleting_a_user_succeeds_even_if_the_goodbye_email_fails(
    _pool_opts: PgPoolOptions,
    conn_opts: PgConnectOptions,
) {
    let db_pool = init_test_db_pool(conn_opts);
    let app = TestApp::spawn(&db_pool).await;
    let user = TestUser::generate(Role::User);
    user.store(&db_pool).await;
    wiremock::Mock::given(wiremock::matchers::any())
        .respond_with(wiremock::ResponseTemplate::new(500))
        .expect(1)
        .mount(&app.email_server)
        .await;
    app.login(&app.admin).await;

    let response = app
        .delete(
            "/admin/users",
            Some(&serde_json::json!({ "user_id": user.user_id })),
        )
        .await;

    assert_eq!(response.status().as_u16(), 200);

    db_pool.close().await;
}

#[sqlx::test]
async fn deleting_an_unknown_user_returns_404(
    _pool_opts: PgPoolOptions,
    conn_opts: PgConnectOptions,
) {
    let db_pool = init_test_db_pool(conn_opts);
    let app = TestApp::spawn(&db_pool).await;
    app.expect_emails(0).await;
    app.login(&app.admin).await;

    let response = app
        .delete(
            "/admin/users",
            Some(&serde_json::json!({ "user_id": uuid::Uuid::new_v4() })),
        )
        .await;

    assert_eq!(response.status().as_u16(), 404);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "User not found");

    db_pool.close().await;
}

#[sqlx::test]
async fn subscriber_statistics_only_count_active_subscribers(
    _pool_opts: PgPoolOptions,
    conn_opts: PgConnectOptions,
) {
    let db_pool = init_test_db_pool(conn_opts);
    let app = TestApp::spawn(&db_pool).await;
    for (email, status) in [
        ("a@example.com", "active"),
        ("b@example.com", "active"),
        ("c@example.com", "inactive"),
    ] {
        sqlx::query("INSERT INTO subscribers (email, consent, status) VALUES ($1, true, $2)")
            .bind(email)
            .bind(status)
            .execute(&db_pool)
            .await
            .unwrap();
    }
    app.login(&app.admin).await;

    let response = app.get("/admin/subscribers").await;

    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["total"], 2);
    assert_eq!(body["new_today"], 2);
    assert_eq!(body["recent"].as_array().unwrap().len(), 2);

    db_pool.close().await;
}

#[sqlx::test]
async fn dashboard_is_only_for_admins(_pool_opts: PgPoolOptions, conn_opts: PgConnectOptions) {
    let db_pool = init_test_db_pool(conn_opts);
    let app = TestApp::spawn(&db_pool).await;
    let subscribers = store_subscribed_users(&db_pool, 1).await;

    app.login(&subscribers[0]).await;
    assert_eq!(app.get("/admin/dashboard").await.status().as_u16(), 403);

    db_pool.close().await;
}
