//! 01 exchange order-book feed.
//!
//! Subscribes to the `orderbook` topic per market string and accepts
//! both `snapshot` and `update` events. Levels arrive as `[price, size]`
//! string pairs; 01 reports no event time, so cells carry the local
//! clock.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::SinkExt;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::Message;
use tracing::info;

use super::{dial, local_timestamp_ns, parse_level, read_loop, FeedAdapter};
use crate::app::config::ExchangeConfig;
use crate::domain::identity::{reverse_symbol_map, Venue};
use crate::error::Result;
use crate::matrix::MarketMatrix;

pub struct ZeroOne {
    cfg: ExchangeConfig,
    matrix: Arc<MarketMatrix>,
    /// Venue market string to global symbol id.
    markets: HashMap<String, u16>,
}

impl ZeroOne {
    pub fn new(cfg: ExchangeConfig, matrix: Arc<MarketMatrix>) -> Self {
        let markets = reverse_symbol_map(&cfg.symbols);
        Self { cfg, matrix, markets }
    }

    /// Process one raw frame.
    pub fn handle_frame(&self, text: &str) {
        let Ok(event) = serde_json::from_str::<ZeroOneEvent>(text) else {
            return;
        };
        if event.topic != "orderbook" || (event.kind != "snapshot" && event.kind != "update") {
            return;
        }
        let Some(&symbol_id) = self.markets.get(&event.market) else {
            return;
        };
        let (Some(bid), Some(ask)) = (event.data.bids.first(), event.data.asks.first()) else {
            return;
        };
        let (Some((bid_px, bid_sz)), Some((ask_px, ask_sz))) =
            (parse_pair(bid), parse_pair(ask))
        else {
            return;
        };

        self.matrix.write_bbo(
            Venue::ZeroOne.exchange_id(),
            symbol_id,
            local_timestamp_ns(),
            bid_px,
            bid_sz,
            ask_px,
            ask_sz,
        );
    }
}

#[async_trait]
impl FeedAdapter for ZeroOne {
    fn name(&self) -> &'static str {
        "01"
    }

    async fn connect(&self, shutdown: watch::Receiver<bool>) -> Result<()> {
        let mut ws = dial(&self.cfg.ws_url).await?;

        for market in self.markets.keys() {
            let sub = ZeroOneSubscribe::orderbook(market);
            ws.send(Message::Text(serde_json::to_string(&sub)?)).await?;
            info!(market = %market, "subscribed");
        }

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
struct ZeroOneSubscribe<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    topic: &'static str,
    market: &'a str,
}

impl<'a> ZeroOneSubscribe<'a> {
    fn orderbook(market: &'a str) -> Self {
        Self {
            kind: "subscribe",
            topic: "orderbook",
            market,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ZeroOneEvent {
    #[serde(default)]
    topic: String,
    #[serde(default)]
    market: String,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    data: ZeroOneData,
}

#[derive(Debug, Default, Deserialize)]
struct ZeroOneData {
    #[serde(default)]
    bids: Vec<Vec<String>>,
    #[serde(default)]
    asks: Vec<Vec<String>>,
}
