use feed_core::ExchangeId;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::{ConfigError, ExchangeConfig, GatewayConfigFile, GlobalConfig};
use crate::domain::{Channel, OrderBook, VenueAdapter, WsEvent};
use crate::infrastructure::{
    RestClient, RestSnapshotFetcher, WsClient, WsError, WsRequestSender, build_adapter,
};
use crate::presentation::{EventPublisher, EventSubscriber};

use super::dispatcher::MessageDispatcher;
use super::synchronizer::BookSynchronizer;

pub type VenueSynchronizer = BookSynchronizer<RestSnapshotFetcher>;

/// Split a symbol table into per-connection groups of at most `limit`
pub fn shard_symbols(symbols: &[String], limit: Option<usize>) -> Vec<Vec<String>> {
    match limit {
        Some(limit) if limit > 0 && symbols.len() > limit => {
            symbols.chunks(limit).map(<[String]>::to_vec).collect()
        }
        _ => vec![symbols.to_vec()],
    }
}

/// Everything one venue's connections share
struct Venue {
    config: ExchangeConfig,
    adapter: Arc<dyn VenueAdapter>,
    fetcher: Arc<RestSnapshotFetcher>,
    synchronizer: Arc<VenueSynchronizer>,
    shards: Vec<Vec<String>>,
}

impl Venue {
    fn build(config: &ExchangeConfig, publisher: EventPublisher) -> Result<Self, ConfigError> {
        let registry = Arc::new(config.registry()?);
        let adapter = build_adapter(&config.id, Arc::clone(&registry))
            .ok_or_else(|| ConfigError::UnsupportedVenue(config.id.clone()))?;
        let md = config.market_data.to_market_data_config(adapter.exchange_id());

        let rest = RestClient::new(&config.rest_url)
            .with_headers(config.headers.clone())
            .with_retries(md.snapshot_retries, md.snapshot_retry_delay);
        let fetcher = Arc::new(RestSnapshotFetcher::new(
            rest,
            Arc::clone(&adapter),
            md.snapshot_depth,
        ));
        let synchronizer = Arc::new(BookSynchronizer::new(
            adapter.exchange_id(),
            Arc::clone(&fetcher),
            md.max_depth,
            publisher,
        ));
        let shards = shard_symbols(
            &registry.symbols(),
            md.connection_limit(adapter.max_symbols_per_connection()),
        );

        Ok(Venue {
            config: config.clone(),
            adapter,
            fetcher,
            synchronizer,
            shards,
        })
    }
}

/// Manages stream connections to every enabled venue
pub struct FeedManager {
    global: GlobalConfig,
    publisher: EventPublisher,
    venues: HashMap<ExchangeId, Venue>,
    tasks: Vec<JoinHandle<()>>,
}

impl FeedManager {
    /// Validate the configuration and build every enabled venue
    pub fn new(config: GatewayConfigFile) -> Result<Self, ConfigError> {
        config.validate()?;

        let publisher = EventPublisher::new(config.global.event_buffer_size);
        let mut venues = HashMap::new();
        for exchange in config.enabled_exchanges() {
            let venue = Venue::build(exchange, publisher.clone())?;
            tracing::info!(
                "{}: {} symbols over {} connection(s)",
                venue.adapter.exchange_id(),
                venue.adapter.registry().len(),
                venue.shards.len()
            );
            venues.insert(venue.adapter.exchange_id(), venue);
        }

        Ok(FeedManager {
            global: config.global,
            publisher,
            venues,
            tasks: Vec::new(),
        })
    }

    /// Spawn one connection task per venue shard
    pub fn start(&mut self) {
        for venue in self.venues.values() {
            for (index, symbols) in venue.shards.iter().enumerate() {
                let connection = Connection {
                    index,
                    ws_url: venue.config.ws_url.clone(),
                    account: venue.config.account.clone(),
                    channels: venue.config.channels.clone(),
                    symbols: symbols.clone(),
                    adapter: Arc::clone(&venue.adapter),
                    fetcher: Arc::clone(&venue.fetcher),
                    synchronizer: Arc::clone(&venue.synchronizer),
                    publisher: self.publisher.clone(),
                    global: self.global.clone(),
                };
                self.tasks.push(tokio::spawn(connection.run()));
            }
        }
    }

    /// Abort every connection task and close every symbol
    pub fn stop(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
        for venue in self.venues.values() {
            venue.synchronizer.reset_all();
        }
    }

    pub fn is_running(&self) -> bool {
        self.tasks.iter().any(|t| !t.is_finished())
    }

    pub fn publisher(&self) -> &EventPublisher {
        &self.publisher
    }

    /// Subscribe to events from every venue
    pub fn subscribe(&self) -> EventSubscriber {
        self.publisher.subscribe()
    }

    /// Configured venues, sorted
    pub fn exchanges(&self) -> Vec<ExchangeId> {
        let mut ids: Vec<ExchangeId> = self.venues.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn synchronizer(&self, exchange: &ExchangeId) -> Option<&Arc<VenueSynchronizer>> {
        self.venues.get(exchange).map(|v| &v.synchronizer)
    }

    /// Copy of a book; `None` unless the symbol is synced
    pub fn book(&self, exchange: &ExchangeId, symbol: &str) -> Option<OrderBook> {
        self.synchronizer(exchange)?.book(symbol)
    }

    /// Symbols with a live book on a venue
    pub fn book_symbols(&self, exchange: &ExchangeId) -> Vec<String> {
        self.synchronizer(exchange)
            .map(|s| s.store().symbols())
            .unwrap_or_default()
    }

    pub fn connection_count(&self, exchange: &ExchangeId) -> usize {
        self.venues.get(exchange).map_or(0, |v| v.shards.len())
    }
}

impl Drop for FeedManager {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// One stream connection serving a shard of a venue's symbols
struct Connection {
    index: usize,
    ws_url: String,
    account: Option<String>,
    channels: Vec<Channel>,
    symbols: Vec<String>,
    adapter: Arc<dyn VenueAdapter>,
    fetcher: Arc<RestSnapshotFetcher>,
    synchronizer: Arc<VenueSynchronizer>,
    publisher: EventPublisher,
    global: GlobalConfig,
}

impl Connection {
    async fn run(self) {
        let exchange = self.adapter.exchange_id();
        let client = WsClient::new(self.ws_url.clone());
        let mut failures = 0;

        loop {
            match client.connect().await {
                Ok((sender, events)) => {
                    failures = 0;
                    tracing::info!("{}[{}]: connected to {}", exchange, self.index, client.url());
                    self.session(sender, events).await;

                    let reset = self.synchronizer.reset_symbols(&self.symbols);
                    tracing::warn!(
                        "{}[{}]: disconnected, {} symbol(s) reset",
                        exchange,
                        self.index,
                        reset.len()
                    );
                }
                Err(e) => {
                    failures += 1;
                    tracing::error!(
                        "{}[{}]: connect failed ({}/{}): {}",
                        exchange,
                        self.index,
                        failures,
                        self.global.max_reconnect_attempts,
                        e
                    );
                    if failures >= self.global.max_reconnect_attempts {
                        tracing::error!("{}[{}]: giving up", exchange, self.index);
                        return;
                    }
                }
            }

            tokio::time::sleep(self.global.reconnect_delay()).await;
        }
    }

    /// Subscribe, then pump frames into the dispatcher until the stream ends
    async fn session(&self, sender: WsRequestSender, mut events: mpsc::Receiver<WsEvent>) {
        let exchange = self.adapter.exchange_id();

        if let Err(e) = self.subscribe(&sender).await {
            tracing::error!("{}[{}]: subscribe failed: {}", exchange, self.index, e);
            let _ = sender.close().await;
            return;
        }

        let dispatcher = MessageDispatcher::new(
            Arc::clone(&self.adapter),
            Arc::clone(&self.synchronizer),
            self.publisher.clone(),
        );

        let period = self.global.heartbeat_interval();
        let heartbeat = self.adapter.heartbeat_message().filter(|_| !period.is_zero());
        let period = period.max(Duration::from_millis(1));
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(WsEvent::Message { text, receipt_ms }) => dispatcher.handle(&text, receipt_ms),
                    Some(WsEvent::Connected) => {}
                    Some(WsEvent::Error(e)) => {
                        tracing::warn!("{}[{}]: stream error: {}", exchange, self.index, e);
                    }
                    Some(WsEvent::Disconnected) | None => break,
                },
                _ = ticker.tick(), if heartbeat.is_some() => {
                    if let Some(ping) = &heartbeat {
                        if let Err(e) = sender.send(ping.clone()).await {
                            tracing::warn!("{}[{}]: heartbeat failed: {}", exchange, self.index, e);
                            break;
                        }
                    }
                }
            }
        }

        let _ = sender.close().await;
    }

    async fn subscribe(&self, sender: &WsRequestSender) -> Result<(), WsError> {
        let registry = self.adapter.registry();
        let venue_ids: Vec<String> = self
            .symbols
            .iter()
            .filter_map(|s| registry.venue_id(s).map(str::to_string))
            .collect();

        for &channel in &self.channels {
            // account-wide streams ride on the first connection only
            if channel.is_private() && self.index > 0 {
                continue;
            }
            if channel == Channel::Balances {
                self.publish_balances().await;
            }
            for frame in
                self.adapter
                    .subscribe_messages(channel, &venue_ids, self.account.as_deref())
            {
                sender.send(frame).await?;
            }
        }

        if self.channels.contains(&Channel::L2Book) {
            for symbol in &self.symbols {
                self.synchronizer.subscribe(symbol);
            }
        }

        Ok(())
    }

    async fn publish_balances(&self) {
        match self.fetcher.fetch_balances(self.account.as_deref()).await {
            Ok(balances) => {
                tracing::info!(
                    "{}: {} balance(s) from snapshot",
                    self.adapter.exchange_id(),
                    balances.len()
                );
                for balance in balances {
                    self.publisher.publish(balance);
                }
            }
            Err(e) => {
                tracing::warn!("{}: balance snapshot failed: {}", self.adapter.exchange_id(), e);
            }
        }
    }
}
