mod application;
mod config;
mod domain;
mod infrastructure;
mod presentation;

use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;
use crate::infrastructure::AppContainer;
use crate::presentation::http::HttpServer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Configuration problems (missing API keys, bad dimensions) are fatal
    // here, before any request is served.
    let config = AppConfig::from_env()?;
    let port = config.port;

    let container = AppContainer::new(&config).await?;

    let server = HttpServer::new(
        container.chat_handler.clone(),
        container.embed_handler.clone(),
        container.search_handler.clone(),
        container.feedback_handler.clone(),
        container.history_handler.clone(),
        port,
    );

    server.run().await
}
