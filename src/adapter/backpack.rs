//! Backpack depth feed.
//!
//! Subscribes to `depth.<venueSymbol>` streams. Depth frames are flat
//! objects with single-letter keys (`e`, `s`, `T`, `b`, `a`) and
//! `[price, size]` string pairs per level.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::SinkExt;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::Message;
use tracing::info;

use super::{dial, event_timestamp_ns, parse_level, read_loop, FeedAdapter};
use crate::app::config::ExchangeConfig;
use crate::domain::identity::{reverse_symbol_map, Venue};
use crate::error::Result;
use crate::matrix::MarketMatrix;

pub struct Backpack {
    cfg: ExchangeConfig,
    matrix: Arc<MarketMatrix>,
    /// Venue symbol to global symbol id.
    symbols: HashMap<String, u16>,
}

impl Backpack {
    pub fn new(cfg: ExchangeConfig, matrix: Arc<MarketMatrix>) -> Self {
        let symbols = reverse_symbol_map(&cfg.symbols);
        Self { cfg, matrix, symbols }
    }

    /// Process one raw frame.
    pub fn handle_frame(&self, text: &str) {
        let Ok(depth) = serde_json::from_str::<BackpackDepth>(text) else {
            return;
        };
        if depth.event != "depth" {
            return;
        }
        let Some(&symbol_id) = self.symbols.get(&depth.symbol) else {
            return;
        };
        let (Some(bid), Some(ask)) = (depth.bids.first(), depth.asks.first()) else {
            return;
        };
        let (Some((bid_px, bid_sz)), Some((ask_px, ask_sz))) =
            (parse_pair(bid), parse_pair(ask))
        else {
            return;
        };

        self.matrix.write_bbo(
            Venue::Backpack.exchange_id(),
            symbol_id,
            event_timestamp_ns(depth.timestamp),
            bid_px,
            bid_sz,
            ask_px,
            ask_sz,
        );
    }
}

#[async_trait]
impl FeedAdapter for Backpack {
    fn name(&self) -> &'static str {
        "backpack"
    }

    async fn connect(&self, shutdown: watch::Receiver<bool>) -> Result<()> {
        let mut ws = dial(&self.cfg.ws_url).await?;

        for symbol in self.symbols.keys() {
            let sub = BackpackSubscribe::depth(symbol);
            ws.send(Message::Text(serde_json::to_string(&sub)?)).await?;
        }
        info!(symbols = ?self.symbols.keys().collect::<Vec<_>>(), "subscribed");

        read_loop(ws, shutdown, |text| self.handle_frame(text)).await
    }
}

fn parse_pair(level: &[String]) -> Option<(f64, f64)> {
    match level {
        [price, size, ..] => parse_level(price, size),
        _ => None,
    }
}

#[derive(Debug, Serialize)]
struct BackpackSubscribe {
    method: &'static str,
    params: Vec<String>,
    id: u32,
}

impl BackpackSubscribe {
    fn depth(symbol: &str) -> Self {
        Self {
            method: "SUBSCRIBE",
            params: vec![format!("depth.{symbol}")],
            id: 1,
        }
    }
}

#[derive(Debug, Deserialize)]
struct BackpackDepth {
    #[serde(rename = "e", default)]
    event: String,
    #[serde(rename = "s", default)]
    symbol: String,
    #[serde(rename = "T", default)]
    timestamp: i64,
    #[serde(rename = "b", default)]
    bids: Vec<Vec<String>>,
    #[serde(rename = "a", default)]
    asks: Vec<Vec<String>>,
}
