use std::num::NonZeroUsize;
use std::{env, time};

use anyhow::Context;
use config::{Config, ConfigError, Environment, File};
use reqwest::Url;
use secrecy::{ExposeSecret, SecretString};
use sqlx::postgres::{PgConnectOptions, PgSslMode};
use sqlx::ConnectOptions;
use tracing::log::LevelFilter;
use url::ParseError;

use crate::dispatcher::DispatchSettings;
use crate::domain::EmailAddress;
use crate::email_client::EmailClient;

/// Settings
#[derive(Clone, serde::Deserialize)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub database: DatabaseSettings,
    pub email_client: EmailClientSettings,
    pub notifications: NotificationSettings,
    pub admin: AdminSettings,
    pub redis_uri: SecretString,
}

impl Settings {
    /// Get settings from configuration files
    pub fn get_config() -> Result<Self, ConfigError> {
        let path = env::current_dir().map_err(|e| {
            ConfigError::Message(format!("Failed to determine the current directory: {e}"))
        })?;
        let config_dir = path.join("config");

        // Detect the running environment (default: `dev`)
        let env: Env = env::var("APP_ENVIRONMENT")
            .unwrap_or_else(|_| "dev".into())
            .try_into()
            .map_err(ConfigError::Message)?;

        // Read the configuration from files and environment variables
        Config::builder()
            // Base configuration file
            .add_source(File::from(config_dir.join("base.yaml")).required(true))
            // Environment-specific configuration file
            .add_source(
                File::from(config_dir.join(format!("{}.yaml", env.as_str()))).required(true),
            )
            // Environment variables (e.g., `CASINO_HUB__APPLICATION__APP_PORT=8888`
            // would set Settings.application.app_port to 8888)
            .add_source(Environment::with_prefix("CASINO_HUB").separator("__"))
            .build()?
            .try_deserialize()
    }
}

/// Application settings
#[derive(Clone, serde::Deserialize)]
pub struct ApplicationSettings {
    pub app_host: String,
    pub app_port: u16,
    pub base_url: String,
    pub hmac_secret: SecretString,
}

/// Database settings
#[derive(Clone, serde::Deserialize)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: SecretString,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub require_ssl: bool,
}

impl DatabaseSettings {
    /// Generate options and flags that can be used to configure a database connection
    pub fn db_options(&self) -> PgConnectOptions {
        let ssl_mode = if self.require_ssl {
            PgSslMode::Require
        } else {
            PgSslMode::Prefer
        };
        PgConnectOptions::new()
            .username(&self.username)
            .password(self.password.expose_secret())
            .host(&self.host)
            .port(self.port)
            .database(&self.database)
            .ssl_mode(ssl_mode)
            .log_statements(LevelFilter::Trace)
    }
}

/// Email client settings
#[derive(Clone, serde::Deserialize)]
pub struct EmailClientSettings {
    pub base_url: String,
    pub sender_email: String,
    pub sender_name: String,
    pub authorization_token: SecretString,
    pub timeout_millis: u64,
}

impl EmailClientSettings {
    /// Build the email client
    pub fn client(self) -> anyhow::Result<EmailClient> {
        let base_url = self.base_url()?;
        let sender_email = self.sender_email().map_err(anyhow::Error::msg)?;
        let timeout = self.timeout();
        let client = EmailClient::new(
            base_url,
            sender_email,
            self.sender_name,
            self.authorization_token,
            timeout,
        )
        .context("Failed to build the email HTTP client")?;
        Ok(client)
    }

    /// Parse base URL
    pub fn base_url(&self) -> Result<Url, ParseError> {
        Url::parse(&self.base_url)
    }

    /// Parse sender email
    pub fn sender_email(&self) -> Result<EmailAddress, String> {
        EmailAddress::parse(self.sender_email.clone())
    }

    /// Get configured timeout
    pub const fn timeout(&self) -> time::Duration {
        time::Duration::from_millis(self.timeout_millis)
    }
}

/// Batching of the notifications sent when articles change
#[derive(Clone, Copy, serde::Deserialize)]
pub struct NotificationSettings {
    #[serde(default = "default_batch_size")]
    pub batch_size: NonZeroUsize,
    #[serde(default = "default_inter_batch_delay_millis")]
    pub inter_batch_delay_millis: u64,
}

const fn default_batch_size() -> NonZeroUsize {
    match NonZeroUsize::new(DispatchSettings::DEFAULT_BATCH_SIZE) {
        Some(size) => size,
        None => NonZeroUsize::MIN,
    }
}

#[allow(clippy::cast_possible_truncation)]
const fn default_inter_batch_delay_millis() -> u64 {
    DispatchSettings::DEFAULT_INTER_BATCH_DELAY.as_millis() as u64
}

impl NotificationSettings {
    /// Get dispatcher settings
    pub const fn dispatch_settings(&self) -> DispatchSettings {
        DispatchSettings {
            batch_size: self.batch_size,
            inter_batch_delay: time::Duration::from_millis(self.inter_batch_delay_millis),
        }
    }
}

/// Admin account settings
#[derive(Clone, serde::Deserialize)]
pub struct AdminSettings {
    /// Users registering with these credentials are granted the admin role
    pub email: String,
    pub password: SecretString,
}

impl AdminSettings {
    /// Check whether a registration should be granted the admin role
    pub fn grants_admin(&self, email: &str, password: &str) -> bool {
        email.eq_ignore_ascii_case(&self.email) && password == self.password.expose_secret()
    }
}

/// Available runtime environments
#[derive(Debug)]
pub enum Env {
    Development,
    Production,
}

impl Env {
    /// Represent environment as a string
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "dev",
            Self::Production => "prd",
        }
    }
}

impl TryFrom<String> for Env {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "dev" => Ok(Self::Development),
            "prd" => Ok(Self::Production),
            other => Err(format!(
                "`{other}` is not a supported environment. Use either `dev` or `prd`"
            )),
        }
    }
}
