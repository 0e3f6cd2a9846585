use feed_core::ExchangeId;
use std::time::Duration;

/// Configuration for one venue's book synchronization
/// Application-level configuration
#[derive(Debug, Clone, PartialEq)]
pub struct MarketDataConfig {
    /// Exchange the books belong to
    pub exchange_id: ExchangeId,
    /// Levels kept per side; `None` keeps the full book
    pub max_depth: Option<usize>,
    /// Depth requested from the snapshot endpoint
    pub snapshot_depth: usize,
    /// Symbols per stream connection; `None` uses the venue's own limit
    pub max_symbols_per_connection: Option<usize>,
    /// Split the symbol table across connections instead of failing
    pub shard_connections: bool,
    /// Extra attempts for a failed snapshot request
    pub snapshot_retries: u32,
    pub snapshot_retry_delay: Duration,
}

impl MarketDataConfig {
    pub fn new(exchange_id: impl Into<ExchangeId>) -> Self {
        MarketDataConfig {
            exchange_id: exchange_id.into(),
            max_depth: Some(2),
            snapshot_depth: 100,
            max_symbols_per_connection: None,
            shard_connections: false,
            snapshot_retries: 1,
            snapshot_retry_delay: Duration::from_millis(1000),
        }
    }

    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_snapshot_depth(mut self, depth: usize) -> Self {
        self.snapshot_depth = depth;
        self
    }

    pub fn with_max_symbols_per_connection(mut self, limit: Option<usize>) -> Self {
        self.max_symbols_per_connection = limit;
        self
    }

    pub fn with_sharding(mut self, shard: bool) -> Self {
        self.shard_connections = shard;
        self
    }

    pub fn with_snapshot_retries(mut self, retries: u32, delay: Duration) -> Self {
        self.snapshot_retries = retries;
        self.snapshot_retry_delay = delay;
        self
    }

    /// Effective per-connection limit given the venue's own cap
    pub fn connection_limit(&self, venue_limit: Option<usize>) -> Option<usize> {
        match (self.max_symbols_per_connection, venue_limit) {
            (Some(configured), Some(venue)) => Some(configured.min(venue)),
            (configured, venue) => configured.or(venue),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MarketDataConfig::new("vertex");
        assert_eq!(config.max_depth, Some(2));
        assert_eq!(config.snapshot_depth, 100);
        assert!(!config.shard_connections);
    }

    #[test]
    fn test_connection_limit() {
        let config = MarketDataConfig::new("kucoin");
        assert_eq!(config.connection_limit(Some(300)), Some(300));
        assert_eq!(config.connection_limit(None), None);

        let config = config.with_max_symbols_per_connection(Some(50));
        assert_eq!(config.connection_limit(Some(300)), Some(50));
        assert_eq!(config.connection_limit(None), Some(50));

        let config = config.with_max_symbols_per_connection(Some(500));
        assert_eq!(config.connection_limit(Some(300)), Some(300));
    }
}
