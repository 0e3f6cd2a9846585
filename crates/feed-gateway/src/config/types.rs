use feed_core::{InstrumentType, Symbol};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::application::MarketDataConfig;
use crate::domain::Channel;

/// Root configuration for the gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfigFile {
    pub exchanges: Vec<ExchangeConfig>,
    #[serde(default)]
    pub global: GlobalConfig,
}

/// Configuration for a single venue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeConfig {
    /// Venue identifier ("kucoin", "vertex")
    pub id: String,
    /// Display name
    pub name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// REST API base URL
    pub rest_url: String,
    /// WebSocket URL
    pub ws_url: String,
    /// Static headers sent with every REST request
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Account or subaccount for private channels
    #[serde(default)]
    pub account: Option<String>,
    /// Symbol table: canonical symbol and venue identifier
    #[serde(default)]
    pub symbols: Vec<SymbolConfig>,
    #[serde(default = "default_channels")]
    pub channels: Vec<Channel>,
    #[serde(default)]
    pub market_data: MarketDataConfigJson,
}

impl ExchangeConfig {
    pub fn subscribes(&self, channel: Channel) -> bool {
        self.channels.contains(&channel)
    }
}

/// One symbol table entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolConfig {
    pub base: String,
    pub quote: String,
    #[serde(default)]
    pub instrument_type: InstrumentType,
    /// Identifier the venue uses on the wire
    pub venue_id: String,
}

impl SymbolConfig {
    pub fn to_symbol(&self) -> Symbol {
        Symbol::new(&self.base, &self.quote, self.instrument_type)
    }
}

/// Market data configuration (JSON representation)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketDataConfigJson {
    /// `null` keeps the full book
    #[serde(default = "default_max_depth")]
    pub max_depth: Option<usize>,
    #[serde(default = "default_snapshot_depth")]
    pub snapshot_depth: usize,
    #[serde(default)]
    pub max_symbols_per_connection: Option<usize>,
    #[serde(default)]
    pub shard_connections: bool,
    #[serde(default = "default_snapshot_retries")]
    pub snapshot_retries: u32,
    #[serde(default = "default_snapshot_retry_delay")]
    pub snapshot_retry_delay_ms: u64,
}

impl Default for MarketDataConfigJson {
    fn default() -> Self {
        MarketDataConfigJson {
            max_depth: default_max_depth(),
            snapshot_depth: default_snapshot_depth(),
            max_symbols_per_connection: None,
            shard_connections: false,
            snapshot_retries: default_snapshot_retries(),
            snapshot_retry_delay_ms: default_snapshot_retry_delay(),
        }
    }
}

impl MarketDataConfigJson {
    /// Convert to application-layer MarketDataConfig
    pub fn to_market_data_config(
        &self,
        exchange_id: impl Into<feed_core::ExchangeId>,
    ) -> MarketDataConfig {
        MarketDataConfig::new(exchange_id)
            .with_max_depth(self.max_depth)
            .with_snapshot_depth(self.snapshot_depth)
            .with_max_symbols_per_connection(self.max_symbols_per_connection)
            .with_sharding(self.shard_connections)
            .with_snapshot_retries(
                self.snapshot_retries,
                Duration::from_millis(self.snapshot_retry_delay_ms),
            )
    }
}

/// Global configuration that applies to all venues
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Delay between reconnection attempts in milliseconds
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_ms: u64,
    /// Consecutive failed connects before a connection gives up
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
    /// Application ping interval in milliseconds
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_ms: u64,
    /// Per-subscriber event buffer
    #[serde(default = "default_event_buffer_size")]
    pub event_buffer_size: usize,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        GlobalConfig {
            reconnect_delay_ms: default_reconnect_delay(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            heartbeat_interval_ms: default_heartbeat_interval(),
            event_buffer_size: default_event_buffer_size(),
        }
    }
}

impl GlobalConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }
}

// Default value functions for serde
fn default_true() -> bool {
    true
}

fn default_channels() -> Vec<Channel> {
    vec![Channel::L2Book]
}

fn default_max_depth() -> Option<usize> {
    Some(2)
}

fn default_snapshot_depth() -> usize {
    100
}

fn default_snapshot_retries() -> u32 {
    1
}

fn default_snapshot_retry_delay() -> u64 {
    1000
}

fn default_reconnect_delay() -> u64 {
    5000
}

fn default_max_reconnect_attempts() -> u32 {
    10
}

fn default_heartbeat_interval() -> u64 {
    20000
}

fn default_event_buffer_size() -> usize {
    4096
}
