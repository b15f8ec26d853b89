//! Hyperliquid L2 book feed.
//!
//! Subscribes to the `l2Book` channel per coin. Frames arrive as an
//! envelope with `channel`/`data`; `data.levels` is a two-element array
//! of bid levels then ask levels, prices and sizes as strings.

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

pub struct Hyperliquid {
    cfg: ExchangeConfig,
    matrix: Arc<MarketMatrix>,
    /// Venue coin (e.g. "BTC") to global symbol id.
    coins: HashMap<String, u16>,
}

impl Hyperliquid {
    pub fn new(cfg: ExchangeConfig, matrix: Arc<MarketMatrix>) -> Self {
        let coins = reverse_symbol_map(&cfg.symbols);
        Self { cfg, matrix, coins }
    }

    /// Process one raw frame. Anything that is not a well-formed l2Book
    /// update for a configured coin is dropped without touching the
    /// matrix.
    pub fn handle_frame(&self, text: &str) {
        let Ok(envelope) = serde_json::from_str::<HlEnvelope>(text) else {
            return;
        };
        if envelope.channel != "l2Book" {
            return;
        }
        let Ok(book) = serde_json::from_value::<HlL2Book>(envelope.data) else {
            return;
        };
        let Some(&symbol_id) = self.coins.get(&book.coin) else {
            return;
        };
        if book.levels.len() < 2 {
            return;
        }
        let (Some(bid), Some(ask)) = (book.levels[0].first(), book.levels[1].first()) else {
            return;
        };
        let (Some((bid_px, bid_sz)), Some((ask_px, ask_sz))) =
            (parse_level(&bid.px, &bid.sz), parse_level(&ask.px, &ask.sz))
        else {
            return;
        };

        self.matrix.write_bbo(
            Venue::Hyperliquid.exchange_id(),
            symbol_id,
            event_timestamp_ns(book.time),
            bid_px,
            bid_sz,
            ask_px,
            ask_sz,
        );
    }
}

#[async_trait]
impl FeedAdapter for Hyperliquid {
    fn name(&self) -> &'static str {
        "hyperliquid"
    }

    async fn connect(&self, shutdown: watch::Receiver<bool>) -> Result<()> {
        let mut ws = dial(&self.cfg.ws_url).await?;

        for coin in self.coins.keys() {
            let sub = HlSubscribe::l2_book(coin);
            ws.send(Message::Text(serde_json::to_string(&sub)?)).await?;
        }
        info!(coins = ?self.coins.keys().collect::<Vec<_>>(), "subscribed");

        read_loop(ws, shutdown, |text| self.handle_frame(text)).await
    }
}

#[derive(Debug, Serialize)]
struct HlSubscribe<'a> {
    method: &'static str,
    subscription: HlSubscription<'a>,
}

#[derive(Debug, Serialize)]
struct HlSubscription<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    coin: &'a str,
}

impl<'a> HlSubscribe<'a> {
    fn l2_book(coin: &'a str) -> Self {
        Self {
            method: "subscribe",
            subscription: HlSubscription {
                kind: "l2Book",
                coin,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct HlEnvelope {
    #[serde(default)]
    channel: String,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct HlL2Book {
    #[serde(default)]
    coin: String,
    #[serde(default)]
    time: i64,
    #[serde(default)]
    levels: Vec<Vec<HlLevel>>,
}

#[derive(Debug, Deserialize)]
struct HlLevel {
    px: String,
    sz: String,
}
