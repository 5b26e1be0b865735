use anyhow::Result;
use docket::{config::Config, fetcher::HttpTransport, logging, runner};

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let config = Config::from_env()?;
    let transport = HttpTransport::new();

    let report = runner::run_discovery(&config, &transport).await?;
    tracing::info!(
        "Saved {} minutes links and {} video links",
        report.stats.minutes_links,
        report.stats.video_links
    );

    Ok(())
}
