use serde_json::Value;
use std::sync::Arc;

use crate::domain::{Channel, Envelope, FeedError, ParseError, SnapshotFetcher, VenueAdapter};
use crate::presentation::EventPublisher;

use super::synchronizer::{BookSynchronizer, DeltaOutcome};

/// What a frame turned into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatched {
    Book(DeltaOutcome),
    Trade,
    OrderStatus,
    Balance,
    Control,
}

/// Routes raw venue frames through the adapter to the synchronizer or
/// straight to the publisher.
pub struct MessageDispatcher<F>
where
    F: SnapshotFetcher + 'static,
{
    adapter: Arc<dyn VenueAdapter>,
    synchronizer: Arc<BookSynchronizer<F>>,
    publisher: EventPublisher,
}

impl<F> MessageDispatcher<F>
where
    F: SnapshotFetcher + 'static,
{
    pub fn new(
        adapter: Arc<dyn VenueAdapter>,
        synchronizer: Arc<BookSynchronizer<F>>,
        publisher: EventPublisher,
    ) -> Self {
        MessageDispatcher {
            adapter,
            synchronizer,
            publisher,
        }
    }

    pub fn synchronizer(&self) -> &Arc<BookSynchronizer<F>> {
        &self.synchronizer
    }

    /// Decode, classify and route one text frame
    pub fn handle_text(&self, text: &str, receipt_ms: i64) -> Result<Dispatched, FeedError> {
        let msg: Value = serde_json::from_str(text).map_err(ParseError::from)?;
        let raw = Arc::new(msg);

        let topic = match self.adapter.inspect(&raw) {
            Envelope::Control => return Ok(Dispatched::Control),
            Envelope::VenueError(message) => return Err(FeedError::Venue(message)),
            Envelope::Data { topic } => topic,
        };

        let channel = self
            .adapter
            .classify_channel(&topic)
            .ok_or(FeedError::UnknownChannel(topic))?;

        match channel {
            Channel::L2Book => {
                let mut delta = self.adapter.parse_delta(&raw)?;
                delta.raw = Some(raw);
                Ok(Dispatched::Book(self.synchronizer.on_delta(delta, receipt_ms)))
            }
            Channel::Trades => {
                let mut trade = self.adapter.parse_trade(&raw, receipt_ms)?;
                trade.raw = Some(raw);
                self.publisher.publish(trade);
                Ok(Dispatched::Trade)
            }
            Channel::OrderInfo => {
                let mut order = self.adapter.parse_order_status(&raw, receipt_ms)?;
                order.raw = Some(raw);
                self.publisher.publish(order);
                Ok(Dispatched::OrderStatus)
            }
            Channel::Balances => {
                let mut balance = self.adapter.parse_balance(&raw, receipt_ms)?;
                balance.raw = Some(raw);
                self.publisher.publish(balance);
                Ok(Dispatched::Balance)
            }
        }
    }

    /// Like [`handle_text`](Self::handle_text) but logs and swallows the
    /// non-fatal error kinds. Used by the receive loop.
    pub fn handle(&self, text: &str, receipt_ms: i64) {
        match self.handle_text(text, receipt_ms) {
            Ok(_) => {}
            Err(FeedError::UnknownChannel(topic)) => {
                tracing::warn!("{}: unknown channel {}, dropped", self.adapter.exchange_id(), topic);
            }
            Err(FeedError::UnknownSymbol(symbol)) => {
                tracing::warn!("{}: unknown symbol {}, dropped", self.adapter.exchange_id(), symbol);
            }
            Err(FeedError::Venue(message)) => {
                tracing::warn!("{}: venue error: {}", self.adapter.exchange_id(), message);
            }
            Err(e) => {
                tracing::warn!("{}: {}, message dropped", self.adapter.exchange_id(), e);
                tracing::debug!("dropped message: {}", text);
            }
        }
    }
}
