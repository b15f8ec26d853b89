//! EdgeX quote feed.
//!
//! Subscribes to `depth.<contractId>.15` and accepts `quote-event`
//! frames on `depth.` channels. EdgeX reports no event time, so cells
//! carry the local clock.

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

pub struct EdgeX {
    cfg: ExchangeConfig,
    matrix: Arc<MarketMatrix>,
    /// Venue contract id to global symbol id.
    contracts: HashMap<String, u16>,
}

impl EdgeX {
    pub fn new(cfg: ExchangeConfig, matrix: Arc<MarketMatrix>) -> Self {
        let contracts = reverse_symbol_map(&cfg.symbols);
        Self { cfg, matrix, contracts }
    }

    /// Process one raw frame.
    pub fn handle_frame(&self, text: &str) {
        let Ok(event) = serde_json::from_str::<EdgexEvent>(text) else {
            return;
        };
        if event.kind != "quote-event" || !event.channel.starts_with("depth.") {
            return;
        }
        let Some(depth) = event.content.data.first() else {
            return;
        };
        let Some(&symbol_id) = self.contracts.get(&depth.contract_id) else {
            return;
        };
        let (Some(bid), Some(ask)) = (depth.bids.first(), depth.asks.first()) else {
            return;
        };
        let (Some((bid_px, bid_sz)), Some((ask_px, ask_sz))) = (
            parse_level(&bid.price, &bid.size),
            parse_level(&ask.price, &ask.size),
        ) else {
            return;
        };

        self.matrix.write_bbo(
            Venue::EdgeX.exchange_id(),
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
impl FeedAdapter for EdgeX {
    fn name(&self) -> &'static str {
        "edgex"
    }

    async fn connect(&self, shutdown: watch::Receiver<bool>) -> Result<()> {
        let mut ws = dial(&self.cfg.ws_url).await?;

        for contract in self.contracts.keys() {
            let sub = EdgexSubscribe::depth(contract);
            ws.send(Message::Text(serde_json::to_string(&sub)?)).await?;
            info!(channel = %sub.channel, "subscribed");
        }

        read_loop(ws, shutdown, |text| self.handle_frame(text)).await
    }
}

#[derive(Debug, Serialize)]
struct EdgexSubscribe {
    #[serde(rename = "type")]
    kind: &'static str,
    channel: String,
}

impl EdgexSubscribe {
    /// Depth stream at 15 levels, the venue's coarsest granularity.
    fn depth(contract_id: &str) -> Self {
        Self {
            kind: "subscribe",
            channel: format!("depth.{contract_id}.15"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct EdgexEvent {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    channel: String,
    #[serde(default)]
    content: EdgexContent,
}

#[derive(Debug, Default, Deserialize)]
struct EdgexContent {
    #[serde(default)]
    data: Vec<EdgexDepth>,
}

#[derive(Debug, Deserialize)]
struct EdgexDepth {
    #[serde(rename = "contractId", default)]
    contract_id: String,
    #[serde(default)]
    bids: Vec<EdgexLevel>,
    #[serde(default)]
    asks: Vec<EdgexLevel>,
}

#[derive(Debug, Deserialize)]
struct EdgexLevel {
    price: String,
    size: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn adapter() -> (tempfile::TempDir, EdgeX) {
        let dir = tempfile::tempdir().unwrap();
        let matrix = Arc::new(MarketMatrix::create_at(dir.path().join("matrix")).unwrap());
        let mut symbols = BTreeMap::new();
        symbols.insert("BTC".to_string(), "10000001".to_string());
        let cfg = ExchangeConfig {
            enabled: true,
            ws_url: "wss://quote.edgex.exchange/api/v1/public/ws".into(),
            symbols,
            ..ExchangeConfig::default()
        };
        let adapter = EdgeX::new(cfg, matrix);
        (dir, adapter)
    }

    #[test]
    fn subscribe_frame_matches_venue_schema() {
        let json = serde_json::to_string(&EdgexSubscribe::depth("10000001")).unwrap();
        assert_eq!(json, r#"{"type":"subscribe","channel":"depth.10000001.15"}"#);
    }

    #[test]
    fn quote_event_writes_top_of_book() {
        let (_dir, adapter) = adapter();
        adapter.handle_frame(
            r#"{"type":"quote-event","channel":"depth.10000001.15",
               "content":{"channel":"depth.10000001.15","dataType":"Snapshot",
                          "data":[{"contractId":"10000001",
                                   "bids":[{"price":"50000.5","size":"0.1"}],
                                   "asks":[{"price":"50001.0","size":"0.2"}]}]}}"#,
        );
        assert_eq!(adapter.matrix.version(1001), 1);
    }

    #[test]
    fn non_quote_events_are_dropped() {
        let (_dir, adapter) = adapter();
        adapter.handle_frame(r#"{"type":"connected","channel":""}"#);
        adapter.handle_frame(
            r#"{"type":"quote-event","channel":"ticker.10000001","content":{"data":[]}}"#,
        );
        assert_eq!(adapter.matrix.version(1001), 0);
    }

    #[test]
    fn empty_payload_is_dropped() {
        let (_dir, adapter) = adapter();
        adapter.handle_frame(
            r#"{"type":"quote-event","channel":"depth.10000001.15","content":{"data":[]}}"#,
        );
        assert_eq!(adapter.matrix.version(1001), 0);
    }

    #[test]
    fn unknown_contract_is_dropped() {
        let (_dir, adapter) = adapter();
        adapter.handle_frame(
            r#"{"type":"quote-event","channel":"depth.99.15",
               "content":{"data":[{"contractId":"99",
                                   "bids":[{"price":"1","size":"1"}],
                                   "asks":[{"price":"2","size":"1"}]}]}}"#,
        );
        assert_eq!(adapter.matrix.version(1001), 0);
    }
}
