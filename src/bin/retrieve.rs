use std::sync::Arc;

use anyhow::Result;
use docket::{config::Config, fetcher::HttpTransport, logging, runner};

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let config = Config::from_env()?;
    let transport = Arc::new(HttpTransport::new().with_max_body_size(config.max_document_bytes()));

    runner::run_retrieval(&config, transport).await?;

    Ok(())
}
