//! aleph-feeder - Market-data fan-in for the shared market matrix.
//!
//! Many concurrent WebSocket adapters, one per exchange, normalize
//! best-bid/best-offer updates into a single canonical 64-byte record and
//! publish them into a lock-free shared-memory matrix that independent
//! consumer processes poll with bounded latency.
//!
//! # Architecture
//!
//! ```text
//! src/
//! ├── domain/      # Identity registry (exchange ids, symbol ids)
//! ├── matrix/      # Shared matrix ABI, seqlock producer, reference reader
//! ├── adapter/     # One WebSocket adapter per venue
//! └── app/         # Config, reconnect supervisor, orchestration
//! ```
//!
//! Data flow: WebSocket frame → JSON decode → normalized BBO tuple →
//! `MarketMatrix::write_bbo`. Adapters are mutually independent; the
//! matrix is the only shared state.

pub mod adapter;
pub mod app;
pub mod domain;
pub mod error;
pub mod matrix;
#[cfg(any(test, feature = "testkit"))]
pub mod testkit;

pub use app::{App, Config};
pub use error::{Error, Result};
pub use matrix::{BboCell, MarketMatrix, MatrixReader};
