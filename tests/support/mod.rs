//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use aleph_feeder::app::ExchangeConfig;
use aleph_feeder::matrix::{MarketMatrix, MatrixReader};
use tempfile::TempDir;

/// A fresh matrix region in a temp directory, mapped for writing and
/// reading. Keep the `TempDir` alive for the duration of the test.
pub struct Region {
    pub dir: TempDir,
    pub path: PathBuf,
    pub matrix: Arc<MarketMatrix>,
}

pub fn region() -> Region {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("aleph-matrix");
    let matrix = Arc::new(MarketMatrix::create_at(&path).expect("create matrix"));
    Region { dir, path, matrix }
}

impl Region {
    pub fn reader(&self) -> MatrixReader {
        MatrixReader::open(&self.path).expect("open reader")
    }
}

/// Exchange config with a single-entry symbol map.
pub fn exchange_config(internal: &str, venue_symbol: &str) -> ExchangeConfig {
    let mut symbols = BTreeMap::new();
    symbols.insert(internal.to_string(), venue_symbol.to_string());
    ExchangeConfig {
        enabled: true,
        ws_url: "wss://unused.invalid/ws".into(),
        symbols,
        ..ExchangeConfig::default()
    }
}
