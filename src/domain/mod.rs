//! Exchange-agnostic identity primitives shared by producer and consumers.

pub mod identity;

pub use identity::{symbol_id, Venue, SYMBOL_BTC_PERP, SYMBOL_ETH_PERP};
