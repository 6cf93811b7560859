use anyhow::Result;
use resume_builder::{start_web_server, ConfigManager};
use tracing::info;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

#[tokio::main]
async fn main() -> Result<()> {
    Registry::default()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or(EnvFilter::new("resume_builder=info,rocket::server=off")),
        )
        .init();

    let config = ConfigManager::load()?;

    info!(
        "Environment: {}",
        std::env::var("ENVIRONMENT").unwrap_or_else(|_| "local".to_string())
    );
    info!(
        "Database: {}",
        config.environment.database_path.display()
    );
    info!("AI service: {}", config.service.ai_service_url);
    info!("Autosave quiet period: {:?}", config.autosave.debounce);

    let database_path = config.environment.database_path.clone();
    start_web_server(database_path, config).await
}
