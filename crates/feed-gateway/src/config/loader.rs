use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use url::Url;

use super::types::{ExchangeConfig, GatewayConfigFile};
use crate::domain::{FeedError, RegistryError, SymbolRegistry};
use crate::infrastructure::build_adapter;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("No enabled exchanges in config")]
    NoEnabledExchanges,
    #[error("Exchange not found: {0}")]
    ExchangeNotFound(String),
    #[error("Unsupported venue: {0}")]
    UnsupportedVenue(String),
    #[error("{0}: max_depth must be positive")]
    InvalidMaxDepth(String),
    #[error("{exchange}: {count} symbols exceed the limit of {limit} per connection")]
    SymbolLimitExceeded {
        exchange: String,
        count: usize,
        limit: usize,
    },
    #[error("{exchange}: duplicate symbol {symbol}")]
    DuplicateSymbol { exchange: String, symbol: String },
    #[error("{0}: empty symbol table")]
    EmptySymbolTable(String),
    #[error("{exchange}: invalid URL {url}")]
    InvalidUrl { exchange: String, url: String },
}

impl From<RegistryError> for ConfigError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::DuplicateSymbol { exchange, symbol } => ConfigError::DuplicateSymbol {
                exchange: exchange.to_string(),
                symbol,
            },
            RegistryError::DuplicateVenueId { exchange, venue_id } => {
                ConfigError::DuplicateSymbol {
                    exchange: exchange.to_string(),
                    symbol: venue_id,
                }
            }
        }
    }
}

impl From<ConfigError> for FeedError {
    fn from(err: ConfigError) -> Self {
        FeedError::Config(err.to_string())
    }
}

/// Load gateway configuration from a JSON file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<GatewayConfigFile, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: GatewayConfigFile = serde_json::from_str(&content)?;
    Ok(config)
}

/// Load configuration from a JSON string
pub fn load_config_from_str(json: &str) -> Result<GatewayConfigFile, ConfigError> {
    let config: GatewayConfigFile = serde_json::from_str(json)?;
    Ok(config)
}

/// Load the default embedded configuration
pub fn load_default_config() -> Result<GatewayConfigFile, ConfigError> {
    let default_config = include_str!("gateway_config.json");
    load_config_from_str(default_config)
}

impl ExchangeConfig {
    /// Build the venue's symbol registry from the configured table
    pub fn registry(&self) -> Result<SymbolRegistry, ConfigError> {
        if self.symbols.is_empty() {
            return Err(ConfigError::EmptySymbolTable(self.id.clone()));
        }
        let entries = self
            .symbols
            .iter()
            .map(|s| (s.to_symbol(), s.venue_id.clone()));
        Ok(SymbolRegistry::with_symbols(self.id.as_str(), entries)?)
    }

    /// Check one venue's settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.check_url(&self.rest_url, &["http", "https"])?;
        self.check_url(&self.ws_url, &["ws", "wss"])?;

        let registry = Arc::new(self.registry()?);
        let count = registry.len();
        let adapter = build_adapter(&self.id, registry)
            .ok_or_else(|| ConfigError::UnsupportedVenue(self.id.clone()))?;

        if self.market_data.max_depth == Some(0) {
            return Err(ConfigError::InvalidMaxDepth(self.id.clone()));
        }

        let md = self.market_data.to_market_data_config(self.id.as_str());
        if let Some(limit) = md.connection_limit(adapter.max_symbols_per_connection()) {
            if limit == 0 || (count > limit && !md.shard_connections) {
                return Err(ConfigError::SymbolLimitExceeded {
                    exchange: self.id.clone(),
                    count,
                    limit,
                });
            }
        }

        Ok(())
    }

    fn check_url(&self, url: &str, schemes: &[&str]) -> Result<(), ConfigError> {
        match Url::parse(url) {
            Ok(parsed) if schemes.contains(&parsed.scheme()) => Ok(()),
            _ => Err(ConfigError::InvalidUrl {
                exchange: self.id.clone(),
                url: url.to_string(),
            }),
        }
    }
}

impl GatewayConfigFile {
    /// Get only enabled exchanges
    pub fn enabled_exchanges(&self) -> Vec<&ExchangeConfig> {
        self.exchanges.iter().filter(|e| e.enabled).collect()
    }

    /// Get a specific exchange by ID
    pub fn get_exchange(&self, id: &str) -> Result<&ExchangeConfig, ConfigError> {
        self.exchanges
            .iter()
            .find(|e| e.id == id)
            .ok_or_else(|| ConfigError::ExchangeNotFound(id.to_string()))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let enabled = self.enabled_exchanges();
        if enabled.is_empty() {
            return Err(ConfigError::NoEnabledExchanges);
        }
        for exchange in enabled {
            exchange.validate()?;
        }
        Ok(())
    }
}
