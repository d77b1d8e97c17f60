//! Runtime assembly: the engine plus the loops that drive it.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::domain::{ExchangeId, Symbol};
use crate::error::Result;
use crate::feed::SyntheticFeed;

use super::Engine;

const MAINTENANCE_INTERVAL: Duration = Duration::from_secs(30);

/// Main application struct.
pub struct App;

impl App {
    /// Run the engine's loops until the process is stopped.
    pub async fn run(config: Config) -> Result<()> {
        let engine = Arc::new(Engine::new(&config));

        if config.feed.enabled {
            spawn_synthetic_feed(&config, engine.clone());
        }

        let mut detection = tokio::time::interval(config.engine.detection_interval());
        detection.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut snapshots = tokio::time::interval(config.engine.snapshot_interval());
        snapshots.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut maintenance = tokio::time::interval(MAINTENANCE_INTERVAL);
        maintenance.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            detection_secs = config.engine.detection_interval_secs,
            snapshot_secs = config.engine.snapshot_interval_secs,
            "Engine loops started"
        );

        loop {
            tokio::select! {
                _ = detection.tick() => engine.detection_tick().await,
                _ = snapshots.tick() => engine.snapshot_tick().await,
                _ = maintenance.tick() => engine.maintenance_tick(),
            }
        }
    }
}

/// Stand-in for the real exchange adapters: a random-walk feed pushing
/// quotes through the rate-limited ingest surface.
fn spawn_synthetic_feed(config: &Config, engine: Arc<Engine>) {
    let symbols: Vec<Symbol> = config.feed.symbols.iter().map(Symbol::new).collect();
    let exchanges: Vec<ExchangeId> = config.feed.exchanges.iter().map(ExchangeId::new).collect();
    let feed = SyntheticFeed::new(
        symbols,
        exchanges,
        Duration::from_millis(config.feed.interval_ms),
        config.feed.funding_interval_hours,
    );
    info!(
        symbols = config.feed.symbols.len(),
        exchanges = config.feed.exchanges.len(),
        interval_ms = config.feed.interval_ms,
        "Synthetic feed started"
    );

    tokio::spawn(async move {
        let result = feed
            .run(move |quote| {
                if let Err(error) = engine.ingest_quote(quote) {
                    debug!(error = %error, "Quote dropped");
                }
            })
            .await;
        if let Err(error) = result {
            error!(error = %error, "Synthetic feed stopped");
        }
    });
}
