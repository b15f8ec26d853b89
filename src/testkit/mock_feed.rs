//! Random-walk BBO generator.
//!
//! Produces realistic BTC/ETH quotes (drifting mids, venue-like spreads,
//! noisy sizes) for soak and latency testing when real venues are
//! unreachable. Deterministic per exchange id so test runs reproduce.

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::watch;

use crate::adapter::local_timestamp_ns;
use crate::domain::identity::{SYMBOL_BTC_PERP, SYMBOL_ETH_PERP};
use crate::matrix::MarketMatrix;

const TICK_INTERVAL: Duration = Duration::from_millis(100);

fn cents(price: f64) -> f64 {
    (price * 100.0).round() / 100.0
}

pub struct MockFeed {
    matrix: Arc<MarketMatrix>,
    exchange_id: u8,
    btc_mid: f64,
    eth_mid: f64,
    rng: StdRng,
}

impl MockFeed {
    pub fn new(matrix: Arc<MarketMatrix>, exchange_id: u8) -> Self {
        Self {
            matrix,
            exchange_id,
            btc_mid: 63_100.0,
            eth_mid: 1_825.0,
            rng: StdRng::seed_from_u64(0xA1EF ^ u64::from(exchange_id)),
        }
    }

    /// Advance the walk one step and publish both symbols.
    pub fn tick(&mut self) {
        let ts = local_timestamp_ns();

        // ±0.01% drift per tick.
        self.btc_mid += self.btc_mid * (self.rng.gen::<f64>() - 0.5) * 0.0002;
        self.eth_mid += self.eth_mid * (self.rng.gen::<f64>() - 0.5) * 0.0002;

        // Venue-like spreads: BTC ~$1, ETH ~$0.10, prices at cent
        // precision.
        let btc_spread = 0.5 + self.rng.gen::<f64>();
        let eth_spread = 0.05 + self.rng.gen::<f64>() * 0.10;

        let btc = (
            cents(self.btc_mid - btc_spread / 2.0),
            0.1 + self.rng.gen::<f64>() * 2.0,
            cents(self.btc_mid + btc_spread / 2.0),
            0.1 + self.rng.gen::<f64>() * 2.0,
        );
        let eth = (
            cents(self.eth_mid - eth_spread / 2.0),
            1.0 + self.rng.gen::<f64>() * 20.0,
            cents(self.eth_mid + eth_spread / 2.0),
            1.0 + self.rng.gen::<f64>() * 20.0,
        );

        self.matrix
            .write_bbo(self.exchange_id, SYMBOL_BTC_PERP, ts, btc.0, btc.1, btc.2, btc.3);
        self.matrix
            .write_bbo(self.exchange_id, SYMBOL_ETH_PERP, ts, eth.0, eth.1, eth.2, eth.3);
    }

    /// Publish ten updates per second until shutdown.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(TICK_INTERVAL);
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        return;
                    }
                }
                _ = interval.tick() => self.tick(),
            }
        }
    }
}
