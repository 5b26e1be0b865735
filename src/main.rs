use std::sync::Arc;

use anyhow::Result;
use docket::{config::Config, fetcher::HttpTransport, logging, runner};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let config = Config::from_env()?;
    info!("Scraping {}", config.target_url());

    let transport = Arc::new(HttpTransport::new().with_max_body_size(config.max_document_bytes()));

    runner::run_discovery(&config, transport.as_ref()).await?;
    let summary = runner::run_retrieval(&config, transport).await?;
    let imported = runner::import_exceptions(&config).await?;

    info!("{}; {} exception documents imported", summary, imported);
    Ok(())
}
