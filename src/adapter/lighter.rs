//! Lighter (zkLighter) order-book feed.
//!
//! Markets are addressed by numeric index; the config maps internal
//! names to index strings. Both the initial `subscribed/order_book`
//! snapshot and `update/order_book` deltas carry a full top of book.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::SinkExt;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::Message;
use tracing::{info, warn};

use super::{dial, event_timestamp_ns, parse_level, read_loop, FeedAdapter};
use crate::app::config::ExchangeConfig;
use crate::domain::identity::{symbol_id, Venue};
use crate::error::Result;
use crate::matrix::MarketMatrix;

pub struct Lighter {
    cfg: ExchangeConfig,
    matrix: Arc<MarketMatrix>,
    /// Venue market index to global symbol id.
    markets: HashMap<i64, u16>,
}

impl Lighter {
    pub fn new(cfg: ExchangeConfig, matrix: Arc<MarketMatrix>) -> Self {
        let mut markets = HashMap::with_capacity(cfg.symbols.len());
        for (internal, index) in &cfg.symbols {
            let Some(id) = symbol_id(internal) else {
                warn!(symbol = %internal, "unknown internal symbol in config, ignoring");
                continue;
            };
            match index.parse::<i64>() {
                Ok(index) => {
                    markets.insert(index, id);
                }
                Err(_) => warn!(symbol = %internal, index = %index, "market index is not numeric, ignoring"),
            }
        }
        Self { cfg, matrix, markets }
    }

    /// Process one raw frame.
    pub fn handle_frame(&self, text: &str) {
        let Ok(envelope) = serde_json::from_str::<LighterEnvelope>(text) else {
            return;
        };
        if envelope.kind != "subscribed/order_book" && envelope.kind != "update/order_book" {
            return;
        }
        let Some(book) = envelope.order_book else {
            return;
        };
        let Some(index) = market_index(&envelope.channel) else {
            return;
        };
        let Some(&symbol_id) = self.markets.get(&index) else {
            return;
        };
        let (Some(bid), Some(ask)) = (book.bids.first(), book.asks.first()) else {
            return;
        };
        let (Some((bid_px, bid_sz)), Some((ask_px, ask_sz))) = (
            parse_level(&bid.price, &bid.size),
            parse_level(&ask.price, &ask.size),
        ) else {
            return;
        };

        self.matrix.write_bbo(
            Venue::Lighter.exchange_id(),
            symbol_id,
            event_timestamp_ns(envelope.timestamp),
            bid_px,
            bid_sz,
            ask_px,
            ask_sz,
        );
    }
}

#[async_trait]
impl FeedAdapter for Lighter {
    fn name(&self) -> &'static str {
        "lighter"
    }

    async fn connect(&self, shutdown: watch::Receiver<bool>) -> Result<()> {
        let mut ws = dial(&self.cfg.ws_url).await?;

        for index in self.markets.keys() {
            let sub = LighterSubscribe::order_book(*index);
            ws.send(Message::Text(serde_json::to_string(&sub)?)).await?;
            info!(market = index, "subscribed");
        }

        read_loop(ws, shutdown, |text| self.handle_frame(text)).await
    }
}

#[derive(Debug, Serialize)]
struct LighterSubscribe {
    #[serde(rename = "type")]
    kind: &'static str,
    channel: String,
}

impl LighterSubscribe {
    fn order_book(index: i64) -> Self {
        Self {
            kind: "subscribe",
            channel: format!("order_book/{index}"),
        }
    }
}

/// Market index from a channel name such as `order_book/3` or
/// `order_book:3`.
fn market_index(channel: &str) -> Option<i64> {
    let at = channel.rfind(|c| c == '/' || c == ':')?;
    channel[at + 1..].parse().ok()
}

#[derive(Debug, Deserialize)]
struct LighterEnvelope {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    channel: String,
    #[serde(default)]
    order_book: Option<LighterBook>,
    #[serde(default)]
    timestamp: i64,
}

#[derive(Debug, Deserialize)]
struct LighterBook {
    #[serde(default)]
    bids: Vec<LighterLevel>,
    #[serde(default)]
    asks: Vec<LighterLevel>,
}

#[derive(Debug, Deserialize)]
struct LighterLevel {
    price: String,
    size: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn adapter() -> (tempfile::TempDir, Lighter) {
        let dir = tempfile::tempdir().unwrap();
        let matrix = Arc::new(MarketMatrix::create_at(dir.path().join("matrix")).unwrap());
        let mut symbols = BTreeMap::new();
        symbols.insert("BTC".to_string(), "0".to_string());
        symbols.insert("ETH".to_string(), "1".to_string());
        let cfg = ExchangeConfig {
            enabled: true,
            ws_url: "wss://mainnet.zklighter.elliot.ai/stream".into(),
            symbols,
            ..ExchangeConfig::default()
        };
        let adapter = Lighter::new(cfg, matrix);
        (dir, adapter)
    }

    #[test]
    fn subscribe_frame_matches_venue_schema() {
        let json = serde_json::to_string(&LighterSubscribe::order_book(3)).unwrap();
        assert_eq!(json, r#"{"type":"subscribe","channel":"order_book/3"}"#);
    }

    #[test]
    fn market_index_parses_both_separators() {
        assert_eq!(market_index("order_book/3"), Some(3));
        assert_eq!(market_index("order_book:21"), Some(21));
        assert_eq!(market_index("order_book"), None);
        assert_eq!(market_index("order_book/x"), None);
    }

    #[test]
    fn snapshot_and_update_both_write() {
        let (_dir, adapter) = adapter();
        adapter.handle_frame(
            r#"{"type":"subscribed/order_book","channel":"order_book/0","timestamp":1700000000000,
               "order_book":{"bids":[{"price":"50000.5","size":"0.1"}],
                             "asks":[{"price":"50001.0","size":"0.2"}]}}"#,
        );
        adapter.handle_frame(
            r#"{"type":"update/order_book","channel":"order_book/0","timestamp":1700000000001,
               "order_book":{"bids":[{"price":"50000.6","size":"0.1"}],
                             "asks":[{"price":"50001.1","size":"0.2"}]}}"#,
        );
        assert_eq!(adapter.matrix.version(1001), 2);
    }

    #[test]
    fn other_message_kinds_are_dropped() {
        let (_dir, adapter) = adapter();
        adapter.handle_frame(r#"{"type":"ping","channel":"order_book/0"}"#);
        adapter.handle_frame(r#"{"type":"subscribed/trades","channel":"trades/0"}"#);
        assert_eq!(adapter.matrix.version(1001), 0);
    }

    #[test]
    fn unconfigured_market_is_dropped() {
        let (_dir, adapter) = adapter();
        adapter.handle_frame(
            r#"{"type":"update/order_book","channel":"order_book/7","timestamp":1,
               "order_book":{"bids":[{"price":"1","size":"1"}],"asks":[{"price":"2","size":"1"}]}}"#,
        );
        assert_eq!(adapter.matrix.version(1001), 0);
        assert_eq!(adapter.matrix.version(1002), 0);
    }

    #[test]
    fn empty_book_side_is_dropped() {
        let (_dir, adapter) = adapter();
        adapter.handle_frame(
            r#"{"type":"update/order_book","channel":"order_book/0","timestamp":1,
               "order_book":{"bids":[],"asks":[{"price":"2","size":"1"}]}}"#,
        );
        assert_eq!(adapter.matrix.version(1001), 0);
    }

    #[test]
    fn zero_timestamp_uses_local_clock() {
        let (_dir, adapter) = adapter();
        adapter.handle_frame(
            r#"{"type":"update/order_book","channel":"order_book/0","timestamp":0,
               "order_book":{"bids":[{"price":"1","size":"1"}],"asks":[{"price":"2","size":"1"}]}}"#,
        );
        // Written with a local wall-clock timestamp, not zero.
        assert_eq!(adapter.matrix.version(1001), 1);
    }

    #[test]
    fn non_numeric_config_index_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let matrix = Arc::new(MarketMatrix::create_at(dir.path().join("matrix")).unwrap());
        let mut symbols = BTreeMap::new();
        symbols.insert("BTC".to_string(), "not-a-number".to_string());
        let cfg = ExchangeConfig {
            enabled: true,
            symbols,
            ..ExchangeConfig::default()
        };
        let adapter = Lighter::new(cfg, matrix);
        assert!(adapter.markets.is_empty());
    }
}
