use std::num::NonZeroUsize;
use std::{env, io, sync};

use casino_hub::authentication::{compute_password_hash, Role};
use casino_hub::configuration::Settings;
use casino_hub::startup::Application;
use casino_hub::telemetry::{get_subscriber, init_subscriber};
use fake::faker::internet::en::{Password, SafeEmail};
use fake::faker::name::en::Name;
use fake::Fake;
use fdlimit::raise_fd_limit;
use secrecy::{ExposeSecret, SecretString};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Ensure the tracing stack is initialized only once
static TRACING: sync::LazyLock<()> = sync::LazyLock::new(|| {
    let default_filter_level = "info".to_string();
    let subscriber_name = "test".to_string();
    if env::var("TEST_LOG").is_ok() {
        init_subscriber(get_subscriber(
            subscriber_name,
            default_filter_level,
            io::stdout,
        ));
    } else {
        init_subscriber(get_subscriber(
            subscriber_name,
            default_filter_level,
            io::sink,
        ));
    };
});

/// Batch size used by test applications, small enough to get several batches
pub const TEST_BATCH_SIZE: usize = 2;

/// Test application data
pub struct TestApp {
    pub address: String,
    pub email_server: MockServer,
    pub admin: TestUser,
    pub db_pool: PgPool,
    pub api_client: reqwest::Client,
}

impl TestApp {
    /// Spin up a test application and return its data
    pub async fn spawn(db_pool: &PgPool) -> Self {
        // Initialize logging
        sync::LazyLock::force(&TRACING);

        // Raise file descriptors limit to avoid "Too many open files" error
        raise_fd_limit().expect("Failed to raise fd limit");

        // Launch a mock server to stand in for the email API
        let email_server = MockServer::start().await;

        // Get settings and modify them for testing
        let config = {
            let mut c = Settings::get_config().expect("Failed to read configuration");
            // Listen on a random TCP port
            c.application.app_port = 0;
            // Use the mock server as email API
            c.email_client.base_url = email_server.uri();
            c.email_client.timeout_millis = 200;
            // Several small batches without waiting between them
            c.notifications.batch_size = NonZeroUsize::new(TEST_BATCH_SIZE).unwrap();
            c.notifications.inter_batch_delay_millis = 0;
            c
        };

        // Add the admin user
        let admin = TestUser::generate(Role::Admin);
        admin.store(db_pool).await;

        // Build the application and get its address
        let app = Application::build_with_db_pool(config, db_pool)
            .await
            .expect("Failed to build application");
        let address = format!("http://127.0.0.1:{}", app.port());

        // Build the API client
        let api_client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .cookie_store(true)
            .build()
            .unwrap();

        // Run the application and return its data
        #[allow(clippy::let_underscore_future)]
        let _ = tokio::spawn(app.run_until_stopped());
        Self {
            address,
            email_server,
            admin,
            db_pool: db_pool.clone(),
            api_client,
        }
    }

    /// Accept every request to the email API, expecting exactly `count` of them
    pub async fn expect_emails(&self, count: u64) {
        Mock::given(path("/emails"))
            .and(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(count)
            .mount(&self.email_server)
            .await;
    }

    /// Recipients of the emails received by the mock email API, in arrival order
    pub async fn email_recipients(&self) -> Vec<String> {
        self.email_server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .map(|r| {
                let body: serde_json::Value = serde_json::from_slice(&r.body).unwrap();
                body["to"][0].as_str().unwrap().to_owned()
            })
            .collect()
    }

    /// Subjects of the emails received by the mock email API, in arrival order
    pub async fn email_subjects(&self) -> Vec<String> {
        self.email_server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .map(|r| {
                let body: serde_json::Value = serde_json::from_slice(&r.body).unwrap();
                body["subject"].as_str().unwrap().to_owned()
            })
            .collect()
    }

    /// GET an endpoint
    pub async fn get(&self, endpoint: &str) -> reqwest::Response {
        self.api_client
            .get(format!("{}{endpoint}", &self.address))
            .send()
            .await
            .expect("Failed to send request")
    }

    /// GET an endpoint, extract HTML
    pub async fn get_html(&self, endpoint: &str) -> String {
        self.get(endpoint).await.text().await.unwrap()
    }

    /// POST a JSON body to an endpoint
    pub async fn post_json(&self, endpoint: &str, body: &serde_json::Value) -> reqwest::Response {
        self.api_client
            .post(format!("{}{endpoint}", &self.address))
            .json(body)
            .send()
            .await
            .expect("Failed to send request")
    }

    /// PUT a JSON body to an endpoint
    pub async fn put_json(&self, endpoint: &str, body: &serde_json::Value) -> reqwest::Response {
        self.api_client
            .put(format!("{}{endpoint}", &self.address))
            .json(body)
            .send()
            .await
            .expect("Failed to send request")
    }

    /// DELETE an endpoint, with an optional JSON body
    pub async fn delete(
        &self,
        endpoint: &str,
        body: Option<&serde_json::Value>,
    ) -> reqwest::Response {
        let request = self
            .api_client
            .delete(format!("{}{endpoint}", &self.address));
        let request = match body {
            Some(body) => request.json(body),
            None => request,
        };
        request.send().await.expect("Failed to send request")
    }

    /// POST to the login endpoint
    #[allow(clippy::future_not_send)]
    pub async fn post_login<Body>(&self, body: &Body) -> reqwest::Response
    where
        Body: serde::Serialize,
    {
        self.api_client
            .post(format!("{}/login", &self.address))
            .form(body)
            .send()
            .await
            .expect("Failed to send request")
    }

    /// Log in with the credentials of a test user
    pub async fn login(&self, user: &TestUser) -> reqwest::Response {
        self.post_login(&serde_json::json!({
            "email": &user.email,
            "password": &user.password,
        }))
        .await
    }

    /// POST to the logout endpoint
    pub async fn post_logout(&self) -> reqwest::Response {
        self.api_client
            .post(format!("{}/logout", &self.address))
            .send()
            .await
            .expect("Failed to send request")
    }

    /// Publish an article as the admin, returning the JSON response
    pub async fn publish_article(&self, title: &str) -> serde_json::Value {
        let response = self.post_json("/admin/news", &article_body(title, 4)).await;
        assert_eq!(response.status().as_u16(), 200);
        response.json().await.unwrap()
    }
}

/// Request body of a valid article
pub fn article_body(title: &str, rating: i32) -> serde_json::Value {
    serde_json::json!({
        "title": title,
        "image_url": "https://cdn.example.com/review.png",
        "content": "Fast withdrawals and a generous welcome bonus.",
        "rating": rating,
    })
}

/// Test user data
pub struct TestUser {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

impl TestUser {
    /// Generate new test user data and credentials
    pub fn generate(role: Role) -> Self {
        Self {
            user_id: Uuid::new_v4(),
            name: Name().fake(),
            email: SafeEmail().fake::<String>().to_lowercase(),
            password: Password(16..17).fake(),
            role,
        }
    }

    /// Store test user data in the database
    pub async fn store(&self, db_pool: &PgPool) {
        self.store_with_subscription(db_pool, false).await;
    }

    /// Store test user data in the database, opted into the newsletter or not
    pub async fn store_with_subscription(&self, db_pool: &PgPool, is_subscribed: bool) {
        let password_hash: SecretString =
            compute_password_hash(&self.password).expect("Failed to hash password");
        sqlx::query(
            r"
            INSERT INTO users (user_id, name, email, password_hash, role, is_subscribed)
            VALUES ($1, $2, $3, $4, $5, $6)
            ",
        )
        .bind(self.user_id)
        .bind(&self.name)
        .bind(&self.email)
        .bind(password_hash.expose_secret())
        .bind(self.role.as_str())
        .bind(is_subscribed)
        .execute(db_pool)
        .await
        .expect("Failed to store test user in the database");
    }
}

/// Store `count` users opted into the newsletter
pub async fn store_subscribed_users(db_pool: &PgPool, count: usize) -> Vec<TestUser> {
    let mut users = Vec::with_capacity(count);
    for _ in 0..count {
        let user = TestUser::generate(Role::User);
        user.store_with_subscription(db_pool, true).await;
        users.push(user);
    }
    users
}

/// Initialize test database pool
pub fn init_test_db_pool(conn_opts: PgConnectOptions) -> PgPool {
    PgPoolOptions::new().connect_lazy_with(conn_opts)
}

/// Assert: response is a redirect to the specified location
pub fn assert_is_redirect_to(response: &reqwest::Response, location: &str) {
    assert_eq!(response.status(), 303);
    assert_eq!(response.headers().get("Location").unwrap(), location);
}
