use anyhow::Result;
use tracing::{error, info, warn};

use lang_metrics::{config::Config, github::GithubClient, orchestrator, output};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored when variables come from the environment)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("lang_metrics=info".parse()?),
        )
        .init();

    // Fails before any request when GITHUB_TOKEN is missing
    let config = Config::from_env().inspect_err(|e| error!("Error: {:#}", e))?;

    info!("Starting release metrics collection");

    let client = GithubClient::new(&config)?;
    let run = match orchestrator::run_release_metrics(&client, &config).await {
        Ok(run) => run,
        Err(e) => {
            error!("✗ Fatal error: {:#}", e);
            return Err(e);
        }
    };

    output::write_json(&config.metrics_output, &run.records)?;

    info!(
        "✓ Done! Saved {} records to {}",
        run.records.len(),
        config.metrics_output
    );
    info!("Releases processed: {}", run.releases.len());
    info!("Languages: {}", config.locales.join(", "));
    if run.failures > 0 {
        warn!(
            "{} fetches failed during the run and were counted as zero; see errors above",
            run.failures
        );
    }

    Ok(())
}
