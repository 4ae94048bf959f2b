use std::sync::Arc;
use std::{io, net, time};

use actix_session::storage::RedisSessionStore;
use actix_session::SessionMiddleware;
use actix_web::cookie::Key;
use actix_web::dev::Server;
use actix_web::middleware::from_fn;
use actix_web::{web, App, HttpServer};
use actix_web_flash_messages::storage::CookieMessageStore;
use actix_web_flash_messages::FlashMessagesFramework;
use secrecy::{ExposeSecret, SecretString};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing_actix_web::TracingLogger;

use crate::authentication::{reject_logged_out_users, reject_non_admin_users};
use crate::configuration::{AdminSettings, Settings};
use crate::dispatcher::{Dispatcher, TokioPacer};
use crate::email_client::EmailClient;
use crate::routes::{
    dashboard, delete_news, delete_user, healthcheck, home, list_news, list_subscribers,
    list_users, login, login_form, logout, publish_news, register, subscribe, toggle_subscription,
    update_news,
};

/// Application base URL, used for links in emails
pub struct ApplicationBaseUrl(pub String);

/// Application
pub struct Application {
    server: Server,
    port: u16,
}

impl Application {
    /// Build an application based on settings
    pub async fn build(config: Settings) -> anyhow::Result<Self> {
        // Connect to the database
        let db_pool = PgPoolOptions::new()
            .acquire_timeout(time::Duration::from_secs(2))
            .connect_lazy_with(config.database.db_options());

        // Run the HTTP server and return its data
        Self::build_with_db_pool(config, &db_pool).await
    }

    /// Build an application based on settings and database pool
    pub async fn build_with_db_pool(config: Settings, db_pool: &PgPool) -> anyhow::Result<Self> {
        // Build the email client, shared by the dispatcher and the single-recipient emails
        let email_client = Arc::new(config.email_client.client()?);
        let dispatcher = Dispatcher::new(
            email_client.clone(),
            Arc::new(TokioPacer),
            config.notifications.dispatch_settings(),
        );

        // Run the HTTP server and return its data
        let listener = net::TcpListener::bind(format!(
            "{}:{}",
            config.application.app_host, config.application.app_port
        ))?;
        let port = listener.local_addr()?.port();
        let server = run_server(
            listener,
            db_pool.clone(),
            email_client,
            dispatcher,
            AppSettings {
                base_url: config.application.base_url,
                admin: config.admin,
                hmac_secret: config.application.hmac_secret,
                redis_uri: config.redis_uri,
            },
        )
        .await?;
        Ok(Self { server, port })
    }

    /// Get application port
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Run application until it is stopped
    pub async fn run_until_stopped(self) -> io::Result<()> {
        self.server.await
    }
}

/// Settings consumed by the HTTP server itself
pub struct AppSettings {
    pub base_url: String,
    pub admin: AdminSettings,
    pub hmac_secret: SecretString,
    pub redis_uri: SecretString,
}

/// Run the HTTP server
pub async fn run_server(
    listener: net::TcpListener,
    db_pool: PgPool,
    email_client: Arc<EmailClient>,
    dispatcher: Dispatcher,
    settings: AppSettings,
) -> anyhow::Result<Server> {
    // Extract secret key from HMAC secret
    let signing_key = Key::from(settings.hmac_secret.expose_secret().as_bytes());

    // Build message framework
    let message_store = CookieMessageStore::builder(signing_key.clone()).build();
    let message_framework = FlashMessagesFramework::builder(message_store).build();

    // Set up Redis session store
    let redis_store = RedisSessionStore::new(settings.redis_uri.expose_secret()).await?;

    // Prepare data to be added the application context
    let db_pool = web::Data::new(db_pool);
    let email_client = web::Data::from(email_client);
    let dispatcher = web::Data::new(dispatcher);
    let base_url = web::Data::new(ApplicationBaseUrl(settings.base_url));
    let admin = web::Data::new(settings.admin);

    // Start the HTTP server
    Ok(HttpServer::new(move || {
        App::new()
            .wrap(message_framework.clone())
            .wrap(SessionMiddleware::new(
                redis_store.clone(),
                signing_key.clone(),
            ))
            .wrap(TracingLogger::default())
            .route("/", web::get().to(home))
            .route("/healthcheck", web::get().to(healthcheck))
            .route("/login", web::get().to(login_form))
            .route("/login", web::post().to(login))
            .route("/logout", web::post().to(logout))
            .route("/register", web::post().to(register))
            .route("/news", web::get().to(list_news))
            .route("/subscriptions", web::post().to(subscribe))
            .service(
                web::scope("/profile")
                    .wrap(from_fn(reject_logged_out_users))
                    .route("/subscription", web::post().to(toggle_subscription)),
            )
            .service(
                // Middlewares run in reverse registration order: login check first
                web::scope("/admin")
                    .wrap(from_fn(reject_non_admin_users))
                    .wrap(from_fn(reject_logged_out_users))
                    .route("/dashboard", web::get().to(dashboard))
                    .route("/news", web::post().to(publish_news))
                    .route("/news", web::put().to(update_news))
                    .route("/news", web::delete().to(delete_news))
                    .route("/users", web::get().to(list_users))
                    .route("/users", web::delete().to(delete_user))
                    .route("/subscribers", web::get().to(list_subscribers)),
            )
            .app_data(db_pool.clone())
            .app_data(email_client.clone())
            .app_data(dispatcher.clone())
            .app_data(base_url.clone())
            .app_data(admin.clone())
    })
    .listen(listener)?
    .run())
}
