//! Feeder configuration loading and validation.
//!
//! Configuration is a single TOML file whose path comes from
//! `ALEPH_FEEDER_CONFIG` (default `config.toml`). The `exchanges` table
//! is keyed by lowercase venue name; each entry gates one adapter and
//! carries its venue-specific symbol map.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing_subscriber::{fmt, EnvFilter};

use crate::domain::identity::Venue;
use crate::error::{Error, Result};

/// Environment variable overriding the config file path.
pub const CONFIG_PATH_ENV: &str = "ALEPH_FEEDER_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub exchanges: BTreeMap<String, ExchangeConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Per-venue configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExchangeConfig {
    /// Disabled venues are not spawned.
    #[serde(default)]
    pub enabled: bool,
    /// Informational only; URLs already point at the right network.
    #[serde(default)]
    pub testnet: bool,
    #[serde(default)]
    pub ws_url: String,
    /// Reserved for future REST-assisted startup.
    #[serde(default)]
    pub rest_url: Option<String>,
    /// Internal symbol name (e.g. "BTC") to venue-specific identifier
    /// (e.g. "BTC_USDC_PERP", or a market index rendered as a string).
    #[serde(default)]
    pub symbols: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// "pretty" or "json".
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Config file path: `ALEPH_FEEDER_CONFIG` or `config.toml`.
    pub fn path() -> PathBuf {
        std::env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("read {}: {e}", path.display())))?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Startup-fatal checks: every enabled venue must resolve to a known
    /// exchange id and carry a WebSocket URL.
    fn validate(&self) -> Result<()> {
        for (key, exchange) in &self.exchanges {
            if !exchange.enabled {
                continue;
            }
            if Venue::from_key(key).is_none() {
                return Err(Error::Config(format!("unknown venue in config: {key}")));
            }
            if exchange.ws_url.is_empty() {
                return Err(Error::Config(format!("missing ws_url for venue: {key}")));
            }
        }
        Ok(())
    }

    /// Enabled venues in config order.
    pub fn enabled(&self) -> impl Iterator<Item = (Venue, &ExchangeConfig)> + '_ {
        self.exchanges
            .iter()
            .filter(|(_, exchange)| exchange.enabled)
            .filter_map(|(key, exchange)| Venue::from_key(key).map(|venue| (venue, exchange)))
    }

    pub fn init_logging(&self) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&self.logging.level));

        match self.logging.format.as_str() {
            "json" => fmt().json().with_env_filter(filter).init(),
            _ => fmt().with_env_filter(filter).init(),
        }
    }
}
