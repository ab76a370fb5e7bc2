use anyhow::Result;
use std::path::PathBuf;
use tracing::info;

use lang_metrics::accumulate;

/// Which JSON result to turn into a cumulative CSV.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Source {
    Prs,
    Releases,
    Both,
}

fn parse_source(arg: Option<&str>) -> Result<Source> {
    match arg {
        None => Ok(Source::Both),
        Some("prs") => Ok(Source::Prs),
        Some("releases") => Ok(Source::Releases),
        Some(other) => anyhow::bail!("Unknown source '{}'. Expected 'prs' or 'releases'", other),
    }
}

fn env_path(var: &str, default: &str) -> PathBuf {
    std::env::var(var)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(default))
}

fn main() -> Result<()> {
    // Load .env file
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("lang_metrics=info".parse()?),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let source = parse_source(args.get(1).map(String::as_str))?;

    if matches!(source, Source::Prs | Source::Both) {
        let input = env_path("CONTRIBUTIONS_OUTPUT", "data/lang_contributions.json");
        accumulate::accumulate_contributions_file(&input)?;
    }

    if matches!(source, Source::Releases | Source::Both) {
        let input = env_path("METRICS_OUTPUT", "data/release_metrics.json");
        if accumulate::accumulate_metrics_file(&input)?.is_none() {
            info!("Nothing to accumulate for release metrics");
        }
    }

    Ok(())
}
