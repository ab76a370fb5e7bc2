use anyhow::Result;
use tracing::{error, info};

use lang_metrics::{config::Config, github::GithubClient, orchestrator, output};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("lang_metrics=info".parse()?)
                .add_directive("contributions=info".parse()?),
        )
        .init();

    let config = Config::from_env().inspect_err(|e| error!("Error: {:#}", e))?;
    let client = GithubClient::new(&config)?;

    let contributions = match orchestrator::run_contributions(&client, &config).await {
        Ok(contributions) => contributions,
        Err(e) => {
            error!("✗ Fatal error: {:#}", e);
            return Err(e);
        }
    };

    output::write_json(&config.contributions_output, &contributions)?;

    info!(
        "✓ Done! Saved {} contributions to {}",
        contributions.len(),
        config.contributions_output
    );
    info!("Languages fetched: {}", config.locales.join(", "));

    Ok(())
}
