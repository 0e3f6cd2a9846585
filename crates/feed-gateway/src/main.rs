use feed_core::FeedEvent;
use feed_gateway::{FeedManager, SubscriberError, load_config, load_default_config};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("feed_gateway=info".parse()?))
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => {
            tracing::info!("Loading configuration from {}", path);
            load_config(&path)?
        }
        None => {
            tracing::info!("Using embedded default configuration");
            load_default_config()?
        }
    };

    let mut manager = FeedManager::new(config)?;
    let mut events = manager.subscribe();
    manager.start();
    tracing::info!("Feed gateway started for {:?}", manager.exchanges());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down");
                break;
            }
            event = events.next() => match event {
                Ok(event) => log_event(&event),
                Err(SubscriberError::Lagged(n)) => {
                    tracing::warn!("Event logger lagged, {} events skipped", n);
                }
                Err(SubscriberError::Closed) => break,
            },
        }
    }

    manager.stop();
    Ok(())
}

fn log_event(event: &FeedEvent) {
    match event {
        FeedEvent::OrderBook(book) => tracing::debug!(
            "{}:{} {:?} bid={:?} ask={:?} seq={:?}",
            book.exchange,
            book.symbol,
            book.kind,
            book.bids.first().map(|l| l.price),
            book.asks.first().map(|l| l.price),
            book.sequence
        ),
        FeedEvent::Trade(trade) => tracing::debug!(
            "{}:{} trade {:?} {} @ {}",
            trade.exchange,
            trade.symbol,
            trade.side,
            trade.size,
            trade.price
        ),
        FeedEvent::OrderStatus(order) => tracing::info!(
            "{}:{} order {} {:?} remaining {}",
            order.exchange,
            order.symbol,
            order.order_id,
            order.status,
            order.remaining
        ),
        FeedEvent::Balance(balance) => tracing::info!(
            "{} balance {} available {} reserved {}",
            balance.exchange,
            balance.currency,
            balance.available,
            balance.reserved
        ),
    }
}
