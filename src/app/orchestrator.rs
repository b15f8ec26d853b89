//! Feeder orchestration: bind registry, matrix and adapters together.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

use super::config::Config;
use super::supervisor;
use crate::adapter::{Backpack, EdgeX, FeedAdapter, Hyperliquid, Lighter, ZeroOne};
use crate::app::config::ExchangeConfig;
use crate::domain::identity::Venue;
use crate::error::Result;
use crate::matrix::{shm_path, MarketMatrix, DEFAULT_SHM_NAME, REGION_SIZE};

/// Environment variable overriding the shared-memory leaf name.
pub const SHM_NAME_ENV: &str = "ALEPH_SHM";

/// Main application.
pub struct App;

impl App {
    /// Run until an external shutdown signal arrives.
    pub async fn run(config: Config) -> Result<()> {
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        Self::run_with_shutdown(config, shutdown_rx).await
    }

    /// Run with an externally controlled shutdown signal.
    ///
    /// Fail-fast startup: the matrix must map before any adapter spawns.
    /// Each enabled venue gets one supervised task; the call returns when
    /// every task has observed shutdown and unwound.
    pub async fn run_with_shutdown(
        config: Config,
        shutdown: watch::Receiver<bool>,
    ) -> Result<()> {
        let shm_name =
            std::env::var(SHM_NAME_ENV).unwrap_or_else(|_| DEFAULT_SHM_NAME.to_string());
        let matrix = Arc::new(MarketMatrix::create(&shm_name)?);
        info!(
            path = %shm_path(&shm_name).display(),
            bytes = REGION_SIZE,
            "shared matrix created"
        );

        let mut tasks = Vec::new();
        for (venue, exchange) in config.enabled() {
            if exchange.symbols.is_empty() {
                warn!(venue = %venue, "enabled venue has no symbols configured");
            }
            info!(venue = %venue, url = %exchange.ws_url, testnet = exchange.testnet, "starting adapter");
            let adapter = build_adapter(venue, exchange.clone(), Arc::clone(&matrix));
            tasks.push(tokio::spawn(supervisor::supervise(
                adapter,
                shutdown.clone(),
            )));
        }

        if tasks.is_empty() {
            warn!("no venues enabled, feeder is idle");
        }

        for task in tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "adapter task aborted");
            }
        }

        // The mapping unmaps on drop; the backing file stays in place.
        info!("feeder stopped");
        Ok(())
    }
}

fn build_adapter(
    venue: Venue,
    exchange: ExchangeConfig,
    matrix: Arc<MarketMatrix>,
) -> Arc<dyn FeedAdapter> {
    match venue {
        Venue::Hyperliquid => Arc::new(Hyperliquid::new(exchange, matrix)),
        Venue::Lighter => Arc::new(Lighter::new(exchange, matrix)),
        Venue::EdgeX => Arc::new(EdgeX::new(exchange, matrix)),
        Venue::ZeroOne => Arc::new(ZeroOne::new(exchange, matrix)),
        Venue::Backpack => Arc::new(Backpack::new(exchange, matrix)),
    }
}
