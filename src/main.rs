//! One-shot runner: advance the job state machine by one step.
//!
//! Reads search options from `SEARCH_OPTIONS` (JSON), the previous state from
//! `SEARCH_STATE_PATH`, runs a single `search`, writes the next state back and
//! prints the returned items as JSON lines. Schedule it (cron, systemd timer)
//! to keep polling.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use masa_source::{ConnectorConfig, LastProcessedState, SearchOptions, SourceConnector};
use tokio::fs;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_STATE_PATH: &str = "state/last_processed.json";

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("masa_source=info,warn"));
    let json = std::env::var("SEARCH_LOG_JSON").is_ok_and(|v| v == "1");

    // Logs go to stderr; stdout carries the items.
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .init();
    }
}

async fn read_state(path: &Path) -> Result<Option<LastProcessedState>> {
    match fs::read_to_string(path).await {
        Ok(s) if s.trim().is_empty() || s.trim() == "null" => Ok(None),
        Ok(s) => serde_json::from_str(&s)
            .map(Some)
            .with_context(|| format!("parsing state from {}", path.display())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("reading state from {}", path.display())),
    }
}

async fn write_state(path: &Path, state: Option<&LastProcessedState>) -> Result<()> {
    let Some(state) = state else {
        if fs::try_exists(path).await.unwrap_or(false) {
            fs::remove_file(path)
                .await
                .with_context(|| format!("removing {}", path.display()))?;
        }
        return Ok(());
    };
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .await
            .with_context(|| format!("creating {}", dir.display()))?;
    }
    let bytes = serde_json::to_vec_pretty(state)?;
    fs::write(path, bytes)
        .await
        .with_context(|| format!("writing state to {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = match std::env::var("MASA_CONFIG_PATH") {
        Ok(p) => ConnectorConfig::load_from_file(&p)?,
        Err(_) => ConnectorConfig::from_env()?,
    };
    let raw_options = std::env::var("SEARCH_OPTIONS")
        .context("SEARCH_OPTIONS must hold the search options as JSON")?;
    let options: SearchOptions =
        serde_json::from_str(&raw_options).context("parsing SEARCH_OPTIONS")?;
    let state_path = std::env::var("SEARCH_STATE_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_STATE_PATH));

    let connector = SourceConnector::initialize(config).await?;
    let previous = read_state(&state_path).await?;

    let result = connector.search(previous.as_ref(), &options).await;
    let failures = connector.shutdown().await;
    if !failures.is_empty() {
        tracing::warn!(?failures, "some services failed to shut down");
    }
    let result = result?;

    write_state(&state_path, result.next_last_processed_state.as_ref()).await?;
    if let Some(job) = result
        .next_last_processed_state
        .as_ref()
        .and_then(|s| s.data.current_async_job.as_ref())
    {
        tracing::info!(job_id = %job.job_id, status = %job.status, "job state persisted");
    }

    for item in &result.items {
        println!("{}", serde_json::to_string(item)?);
    }
    Ok(())
}
