use std::io;

use casino_hub::configuration::Settings;
use casino_hub::startup::Application;
use casino_hub::telemetry::{get_subscriber, init_subscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let subscriber = get_subscriber("casino_hub".into(), "info".into(), io::stdout);
    init_subscriber(subscriber);

    // Retrieve settings
    let config = Settings::get_config()?;

    // Build the application and serve until the server stops
    let application = Application::build(config).await?;
    application.run_until_stopped().await?;

    Ok(())
}
