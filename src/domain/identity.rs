//! Identity registry: the closed, ABI-stable mapping of venue names to
//! exchange ids and instrument names to symbol ids.
//!
//! These integers are shared with every consumer process that maps the
//! matrix. They are never reused; adding a venue takes the next free id.

use std::collections::{BTreeMap, HashMap};

use tracing::warn;

/// Supported venues, each carrying its stable wire-level exchange id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Venue {
    Hyperliquid,
    Lighter,
    EdgeX,
    ZeroOne,
    Backpack,
}

impl Venue {
    pub const ALL: [Venue; 5] = [
        Venue::Hyperliquid,
        Venue::Lighter,
        Venue::EdgeX,
        Venue::ZeroOne,
        Venue::Backpack,
    ];

    /// The stable exchange id published in every cell. Id 0 is reserved.
    pub const fn exchange_id(self) -> u8 {
        match self {
            Venue::Hyperliquid => 1,
            Venue::Lighter => 2,
            Venue::EdgeX => 3,
            Venue::ZeroOne => 4,
            Venue::Backpack => 5,
        }
    }

    /// Lowercase key used in the config file and in logs.
    pub const fn name(self) -> &'static str {
        match self {
            Venue::Hyperliquid => "hyperliquid",
            Venue::Lighter => "lighter",
            Venue::EdgeX => "edgex",
            Venue::ZeroOne => "01",
            Venue::Backpack => "backpack",
        }
    }

    pub fn from_key(key: &str) -> Option<Venue> {
        Venue::ALL.into_iter().find(|v| v.name() == key)
    }
}

impl std::fmt::Display for Venue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

pub const SYMBOL_BTC_PERP: u16 = 1001;
pub const SYMBOL_ETH_PERP: u16 = 1002;

/// Internal instrument name to global symbol id. Ids are stable once
/// assigned; the 1000+ range is reserved for perpetuals.
const SYMBOLS: &[(&str, u16)] = &[("BTC", SYMBOL_BTC_PERP), ("ETH", SYMBOL_ETH_PERP)];

/// Resolve an internal instrument name (e.g. `"BTC"`) to its symbol id.
pub fn symbol_id(name: &str) -> Option<u16> {
    SYMBOLS.iter().find(|(n, _)| *n == name).map(|(_, id)| *id)
}

/// Build the inbound dispatch map for one venue: venue-specific symbol
/// string directly to our global symbol id.
///
/// Internal names missing from the registry are logged and skipped, so a
/// config typo cannot route a foreign instrument into a reserved row.
pub fn reverse_symbol_map(symbols: &BTreeMap<String, String>) -> HashMap<String, u16> {
    let mut map = HashMap::with_capacity(symbols.len());
    for (internal, venue_sym) in symbols {
        match symbol_id(internal) {
            Some(id) => {
                map.insert(venue_sym.clone(), id);
            }
            None => warn!(symbol = %internal, "unknown internal symbol in config, ignoring"),
        }
    }
    map
}
