use sqlx::postgres::{PgConnectOptions, PgPoolOptions};

use crate::helpers::{init_test_db_pool, TestApp};

#[sqlx::test]
async fn healthcheck_works(_pool_opts: PgPoolOptions, conn_opts: PgConnectOptions) {
    let db_pool = init_test_db_pool(conn_opts);
    let app = TestApp::spawn(&db_pool).await;

    let response = app.get("/healthcheck").await;

    assert!(response.status().is_success());
    assert_eq!(Some(0), response.content_length());

    db_pool.close().await;
}

#[sqlx::test]
async fn home_page_is_served(_pool_opts: PgPoolOptions, conn_opts: PgConnectOptions) {
    let db_pool = init_test_db_pool(conn_opts);
    let app = TestApp::spawn(&db_pool).await;

    let html = app.get_html("/").await;

    assert!(html.contains("Crypto Casino Hub"));

    db_pool.close().await;
}
