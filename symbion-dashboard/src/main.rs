//! Symbion Dashboard - two-host CPU / RAM / disk glyph display
//!
//! - Loads `dashboard.yaml` (or `SYMBION_DASHBOARD_CONFIG`), `.env` first
//! - Full-screen terminal canvas by default (q / Esc to quit, r to refresh)
//! - `SYMBION_DASHBOARD_HEADLESS=1` polls and logs frames without a terminal

use anyhow::{Context, Result};
use std::sync::Mutex;
use symbion_dashboard::config::{load_config, ConfigOrigin, LogConf};
use symbion_dashboard::{terminal, Dashboard};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const HEADLESS_ENV: &str = "SYMBION_DASHBOARD_HEADLESS";

fn headless_requested() -> bool {
    std::env::var(HEADLESS_ENV)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// The terminal belongs to the canvas, so interactive runs log to a file.
fn init_logging(log: &LogConf, headless: bool) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(log.filter.as_deref().unwrap_or("symbion_dashboard=info"))
            .context("Invalid log filter")?,
    };

    if headless {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log.file)
            .with_context(|| format!("Failed to open log file {}", log.file.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let (config, origin) = load_config()
        .await
        .context("Failed to load dashboard configuration")?;

    let headless = headless_requested();
    init_logging(&config.log, headless)?;

    info!("Symbion Dashboard v{} starting", env!("CARGO_PKG_VERSION"));
    match origin {
        ConfigOrigin::File(path) => info!("Configuration loaded from {}", path.display()),
        ConfigOrigin::Defaults { missing } => {
            warn!("No {} found, using built-in hosts", missing.display())
        }
    }
    for host in &config.hosts {
        info!("Monitoring {} at {}", host.display_name, host.endpoint_url);
    }

    let mut dashboard = Dashboard::from_config(&config).context("Failed to create dashboard")?;

    if headless {
        dashboard
            .run_headless(async {
                tokio::signal::ctrl_c().await.ok();
            })
            .await;
    } else {
        terminal::run(&mut dashboard)
            .await
            .context("Terminal dashboard failed")?;
    }

    Ok(())
}
