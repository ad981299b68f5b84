//! Start every configured account

use std::net::SocketAddr;
use std::path::Path;

use tracing::warn;

use crate::config::AppConfig;
use crate::error::Result;
use crate::input::StdinPrompt;
use crate::metrics;
use crate::supervisor::AccountManager;

/// Load the config and run all accounts until Ctrl+C.
///
/// `metrics_running` is true when the CLI already started the metrics
/// endpoint; otherwise `metrics_addr` from the config is used.
pub async fn run(config_path: Option<&Path>, metrics_running: bool) -> Result<()> {
    let config = AppConfig::discover(config_path)?;

    if !metrics_running {
        if let Some(addr) = config.metrics_addr.as_deref() {
            start_metrics(addr);
        }
    }

    let mut prompt = StdinPrompt;
    AccountManager::new(config).run_all(&mut prompt).await
}

/// Spawn the metrics endpoint; an unparsable address is only a warning.
pub fn start_metrics(addr: &str) -> bool {
    match addr.parse::<SocketAddr>() {
        Ok(socket) => {
            metrics::spawn_metrics_server(socket);
            true
        }
        Err(err) => {
            warn!(%addr, "Invalid metrics address: {}", err);
            false
        }
    }
}
