use feed_core::{
    BalanceEvent, ExchangeId, OrderStatus, OrderStatusEvent, OrderType, Side, TradeEvent, clock,
};
use serde_json::{Value, json};
use std::sync::Arc;

use crate::domain::{
    BookDelta, BookSnapshot, Channel, Envelope, LevelChange, ParseError, SequenceRange,
    SymbolRegistry, VenueAdapter,
};

use super::fields::{
    array_field, decimal_field, decimal_value, field, id_field, levels_with, opt_field,
    opt_i64_field, str_field, u64_field,
};

const L2_BOOK: &str = "/market/level2";
const TRADES: &str = "/market/match";
const ORDER_INFO: &str = "/spotMarket/tradeOrders";
const BALANCES: &str = "/account/balance";

/// Public topics accept this many symbols per subscribe frame
const SYMBOLS_PER_FRAME: usize = 100;
const MAX_SYMBOLS_PER_CONNECTION: usize = 300;
const SUCCESS_CODE: &str = "200000";

/// KuCoin spot
///
/// Book deltas are sequenced (`sequenceStart`/`sequenceEnd`); trade and
/// order timestamps are nanoseconds, book and balance timestamps
/// milliseconds.
pub struct KucoinAdapter {
    registry: Arc<SymbolRegistry>,
}

impl KucoinAdapter {
    pub fn new(registry: Arc<SymbolRegistry>) -> Self {
        KucoinAdapter { registry }
    }

    fn side(value: &str) -> Result<Side, ParseError> {
        match value.to_lowercase().as_str() {
            "buy" => Ok(Side::Buy),
            "sell" => Ok(Side::Sell),
            other => Err(ParseError::InvalidField {
                field: "side",
                value: other.to_string(),
            }),
        }
    }

    fn order_status(event_type: &str, remaining: rust_decimal::Decimal) -> Result<OrderStatus, ParseError> {
        match event_type {
            "open" | "update" => Ok(OrderStatus::New),
            "match" if remaining.is_zero() => Ok(OrderStatus::Filled),
            "match" => Ok(OrderStatus::PartiallyFilled),
            "filled" => Ok(OrderStatus::Filled),
            "canceled" => Ok(OrderStatus::Canceled),
            other => Err(ParseError::InvalidField {
                field: "type",
                value: other.to_string(),
            }),
        }
    }

    fn data<'a>(&self, msg: &'a Value) -> Result<&'a Value, ParseError> {
        field(msg, "data")
    }
}

impl VenueAdapter for KucoinAdapter {
    fn exchange_id(&self) -> ExchangeId {
        ExchangeId::kucoin()
    }

    fn registry(&self) -> &SymbolRegistry {
        &self.registry
    }

    fn inspect(&self, msg: &Value) -> Envelope {
        if let Some(topic) = msg.get("topic").and_then(Value::as_str) {
            return Envelope::Data {
                topic: topic.to_string(),
            };
        }

        match msg.get("type").and_then(Value::as_str) {
            Some("welcome") | Some("ack") | Some("pong") => Envelope::Control,
            Some("error") => Envelope::VenueError(
                msg.get("data")
                    .map(Value::to_string)
                    .unwrap_or_else(|| msg.to_string()),
            ),
            Some(other) => Envelope::Data {
                topic: other.to_string(),
            },
            None => Envelope::VenueError(format!("unrecognized frame: {}", msg)),
        }
    }

    fn classify_channel(&self, topic: &str) -> Option<Channel> {
        let channel = topic.split_once(':').map_or(topic, |(chan, _)| chan);
        match channel {
            L2_BOOK => Some(Channel::L2Book),
            TRADES => Some(Channel::Trades),
            ORDER_INFO => Some(Channel::OrderInfo),
            BALANCES => Some(Channel::Balances),
            _ => None,
        }
    }

    fn venue_channel(&self, channel: Channel) -> &'static str {
        match channel {
            Channel::L2Book => L2_BOOK,
            Channel::Trades => TRADES,
            Channel::OrderInfo => ORDER_INFO,
            Channel::Balances => BALANCES,
        }
    }

    fn parse_delta(&self, msg: &Value) -> Result<BookDelta, ParseError> {
        let data = self.data(msg)?;
        let symbol = self.registry.resolve(str_field(data, "symbol")?)?;

        let start = u64_field(data, "sequenceStart")?;
        let end = u64_field(data, "sequenceEnd")?;
        if start > end {
            return Err(ParseError::InvalidField {
                field: "sequenceStart",
                value: format!("{} > {}", start, end),
            });
        }

        let changes_obj = field(data, "changes")?;
        let mut changes = Vec::new();
        for level in levels_with(changes_obj, "bids", decimal_value)? {
            changes.push(LevelChange::bid(level.price, level.size));
        }
        for level in levels_with(changes_obj, "asks", decimal_value)? {
            changes.push(LevelChange::ask(level.price, level.size));
        }

        Ok(BookDelta {
            symbol: symbol.to_string(),
            changes,
            sequence: Some(SequenceRange::new(start, end)),
            exchange_timestamp_ms: opt_i64_field(data, "time")?,
            raw: None,
        })
    }

    fn parse_snapshot(&self, response: &Value) -> Result<BookSnapshot, ParseError> {
        if let Some(code) = opt_field(response, "code") {
            let code = code.as_str().map(str::to_string).unwrap_or_else(|| code.to_string());
            if code != SUCCESS_CODE {
                return Err(ParseError::InvalidField {
                    field: "code",
                    value: code,
                });
            }
        }

        let data = self.data(response)?;
        Ok(BookSnapshot {
            bids: levels_with(data, "bids", decimal_value)?,
            asks: levels_with(data, "asks", decimal_value)?,
            sequence: Some(u64_field(data, "sequence")?),
            exchange_timestamp_ms: opt_i64_field(data, "time")?,
            raw: None,
        })
    }

    fn parse_trade(&self, msg: &Value, receipt_ms: i64) -> Result<TradeEvent, ParseError> {
        let data = self.data(msg)?;
        let symbol = self.registry.resolve(str_field(data, "symbol")?)?;

        Ok(TradeEvent {
            exchange: self.exchange_id(),
            symbol: symbol.to_string(),
            side: Self::side(str_field(data, "side")?)?,
            price: decimal_field(data, "price")?,
            size: decimal_field(data, "size")?,
            trade_id: opt_field(data, "tradeId").map(|_| id_field(data, "tradeId")).transpose()?,
            exchange_timestamp_ms: opt_i64_field(data, "time")?.map(clock::nanos_to_millis),
            receipt_timestamp_ms: receipt_ms,
            raw: None,
        })
    }

    fn parse_order_status(
        &self,
        msg: &Value,
        receipt_ms: i64,
    ) -> Result<OrderStatusEvent, ParseError> {
        let data = self.data(msg)?;
        let symbol = self.registry.resolve(str_field(data, "symbol")?)?;
        let remaining = decimal_field(data, "remainSize")?;

        let order_type = match opt_field(data, "orderType").and_then(Value::as_str) {
            Some(t) if t.eq_ignore_ascii_case("limit") => Some(OrderType::Limit),
            Some(t) if t.eq_ignore_ascii_case("market") => Some(OrderType::Market),
            _ => None,
        };
        let price = match opt_field(data, "price") {
            Some(v) => Some(decimal_value(v, "price")?),
            None => None,
        };

        Ok(OrderStatusEvent {
            exchange: self.exchange_id(),
            symbol: symbol.to_string(),
            order_id: id_field(data, "orderId")?,
            side: Self::side(str_field(data, "side")?)?,
            order_type,
            status: Self::order_status(str_field(data, "type")?, remaining)?,
            price,
            size: decimal_field(data, "size")?,
            remaining,
            account: None,
            exchange_timestamp_ms: opt_i64_field(data, "ts")?.map(clock::nanos_to_millis),
            receipt_timestamp_ms: receipt_ms,
            raw: None,
        })
    }

    fn parse_balance(&self, msg: &Value, receipt_ms: i64) -> Result<BalanceEvent, ParseError> {
        let data = self.data(msg)?;
        let available = decimal_field(data, "available")?;
        let total = decimal_field(data, "total")?;

        Ok(BalanceEvent {
            exchange: self.exchange_id(),
            currency: str_field(data, "currency")?.to_string(),
            available,
            reserved: total - available,
            account: None,
            exchange_timestamp_ms: opt_i64_field(data, "time")?,
            receipt_timestamp_ms: receipt_ms,
            raw: None,
        })
    }

    fn parse_balance_snapshot(
        &self,
        response: &Value,
        receipt_ms: i64,
    ) -> Result<Vec<BalanceEvent>, ParseError> {
        let mut balances = Vec::new();
        for entry in array_field(response, "data")? {
            let available = decimal_field(entry, "available")?;
            let total = decimal_field(entry, "balance")?;
            balances.push(BalanceEvent {
                exchange: self.exchange_id(),
                currency: str_field(entry, "currency")?.to_string(),
                available,
                reserved: total - available,
                account: opt_field(entry, "type")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                exchange_timestamp_ms: None,
                receipt_timestamp_ms: receipt_ms,
                raw: Some(Arc::new(entry.clone())),
            });
        }
        Ok(balances)
    }

    fn snapshot_path(&self, venue_symbol: &str, _depth: usize) -> String {
        // v3 always returns the full book
        format!("/api/v3/market/orderbook/level2?symbol={}", venue_symbol)
    }

    fn balance_path(&self, _account: Option<&str>) -> Option<String> {
        Some("/api/v1/accounts".to_string())
    }

    fn subscribe_messages(
        &self,
        channel: Channel,
        venue_symbols: &[String],
        _account: Option<&str>,
    ) -> Vec<Value> {
        let topic = self.venue_channel(channel);

        if channel.is_private() {
            return vec![json!({
                "type": "subscribe",
                "topic": topic,
                "privateChannel": true,
                "response": true,
            })];
        }

        venue_symbols
            .chunks(SYMBOLS_PER_FRAME)
            .map(|chunk| {
                json!({
                    "type": "subscribe",
                    "topic": format!("{}:{}", topic, chunk.join(",")),
                    "privateChannel": false,
                    "response": true,
                })
            })
            .collect()
    }

    fn heartbeat_message(&self) -> Option<Value> {
        Some(json!({ "type": "ping" }))
    }

    fn max_symbols_per_connection(&self) -> Option<usize> {
        Some(MAX_SYMBOLS_PER_CONNECTION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feed_core::{PriceLevel, Symbol};
    use rust_decimal_macros::dec;

    fn adapter() -> KucoinAdapter {
        let registry = SymbolRegistry::with_symbols(
            ExchangeId::kucoin(),
            vec![
                (Symbol::spot("BTC", "USDT"), "BTC-USDT"),
                (Symbol::spot("ETH", "USDT"), "ETH-USDT"),
            ],
        )
        .unwrap();
        KucoinAdapter::new(Arc::new(registry))
    }

    #[test]
    fn test_inspect() {
        let a = adapter();
        assert_eq!(
            a.inspect(&json!({"id": "1", "type": "welcome"})),
            Envelope::Control
        );
        assert_eq!(a.inspect(&json!({"id": "2", "type": "ack"})), Envelope::Control);
        assert_eq!(a.inspect(&json!({"id": "3", "type": "pong"})), Envelope::Control);
        assert!(matches!(
            a.inspect(&json!({"type": "error", "data": "token expired"})),
            Envelope::VenueError(_)
        ));
        assert_eq!(
            a.inspect(&json!({"type": "message", "topic": "/market/level2:BTC-USDT"})),
            Envelope::Data {
                topic: "/market/level2:BTC-USDT".to_string()
            }
        );
    }

    #[test]
    fn test_classify_channel() {
        let a = adapter();
        assert_eq!(a.classify_channel("/market/level2:BTC-USDT"), Some(Channel::L2Book));
        assert_eq!(a.classify_channel("/market/match:ETH-USDT"), Some(Channel::Trades));
        assert_eq!(a.classify_channel("/spotMarket/tradeOrders"), Some(Channel::OrderInfo));
        assert_eq!(a.classify_channel("/account/balance"), Some(Channel::Balances));
        assert_eq!(a.classify_channel("/market/candles:BTC-USDT_1min"), None);
    }

    #[test]
    fn test_parse_delta() {
        let msg = json!({
            "data": {
                "sequenceStart": 1615591136351_u64,
                "symbol": "BTC-USDT",
                "changes": {
                    "asks": [],
                    "bids": [["49746.9", "0.1488295", "1615591136351"]]
                },
                "sequenceEnd": 1615591136352_u64,
                "time": 1663747970273_i64
            },
            "subject": "trade.l2update",
            "topic": "/market/level2:BTC-USDT",
            "type": "message"
        });

        let delta = adapter().parse_delta(&msg).unwrap();
        assert_eq!(delta.symbol, "BTC-USDT");
        assert_eq!(
            delta.sequence,
            Some(SequenceRange::new(1_615_591_136_351, 1_615_591_136_352))
        );
        assert_eq!(
            delta.changes,
            vec![LevelChange::bid(dec!(49746.9), dec!(0.1488295))]
        );
        assert_eq!(delta.exchange_timestamp_ms, Some(1_663_747_970_273));
    }

    #[test]
    fn test_parse_delta_without_time_and_unknown_symbol() {
        let a = adapter();
        let msg = json!({"data": {
            "sequenceStart": "10", "sequenceEnd": "12", "symbol": "ETH-USDT",
            "changes": {"asks": [["2000", "0", "11"]], "bids": []}
        }});
        let delta = a.parse_delta(&msg).unwrap();
        assert_eq!(delta.exchange_timestamp_ms, None);
        assert!(delta.changes[0].is_removal());

        let unknown = json!({"data": {
            "sequenceStart": 1, "sequenceEnd": 1, "symbol": "DOGE-USDT",
            "changes": {"asks": [], "bids": []}
        }});
        assert_eq!(
            a.parse_delta(&unknown),
            Err(ParseError::UnknownSymbol("DOGE-USDT".to_string()))
        );
    }

    #[test]
    fn test_parse_delta_rejects_inverted_range() {
        let msg = json!({"data": {
            "sequenceStart": 12, "sequenceEnd": 10, "symbol": "BTC-USDT",
            "changes": {"asks": [], "bids": []}
        }});
        assert!(matches!(
            adapter().parse_delta(&msg),
            Err(ParseError::InvalidField { field: "sequenceStart", .. })
        ));
    }

    #[test]
    fn test_parse_snapshot() {
        let response = json!({
            "code": "200000",
            "data": {
                "time": 1550653727731_i64,
                "sequence": "1550467636704",
                "bids": [["6500.12", "0.45054140"], ["6500.11", "0.45054140"]],
                "asks": [["6500.16", "0.57753524"]]
            }
        });

        let snapshot = adapter().parse_snapshot(&response).unwrap();
        assert_eq!(snapshot.sequence, Some(1_550_467_636_704));
        assert_eq!(snapshot.bids.len(), 2);
        assert_eq!(snapshot.asks, vec![PriceLevel::new(dec!(6500.16), dec!(0.57753524))]);
        assert_eq!(snapshot.exchange_timestamp_ms, Some(1_550_653_727_731));
    }

    #[test]
    fn test_parse_snapshot_error_code() {
        let response = json!({"code": "400100", "msg": "Invalid symbol"});
        assert!(matches!(
            adapter().parse_snapshot(&response),
            Err(ParseError::InvalidField { field: "code", .. })
        ));
    }

    #[test]
    fn test_parse_trade() {
        let msg = json!({
            "type": "message",
            "topic": "/market/match:BTC-USDT",
            "subject": "trade.l3match",
            "data": {
                "sequence": "1545896669145",
                "type": "match",
                "symbol": "BTC-USDT",
                "side": "buy",
                "price": "0.08200000000000000000",
                "size": "0.01022222000000000000",
                "tradeId": "5c24c5da03aa673885cd67aa",
                "takerOrderId": "5c24c5d903aa6772d55b371e",
                "makerOrderId": "5c2187d003aa677bd09d5c93",
                "time": "1545913818099033203"
            }
        });

        let trade = adapter().parse_trade(&msg, 42).unwrap();
        assert_eq!(trade.side, Side::Buy);
        assert_eq!(trade.price, dec!(0.082));
        assert_eq!(trade.size, dec!(0.01022222));
        assert_eq!(trade.trade_id.as_deref(), Some("5c24c5da03aa673885cd67aa"));
        assert_eq!(trade.exchange_timestamp_ms, Some(1_545_913_818_099));
        assert_eq!(trade.receipt_timestamp_ms, 42);
    }

    #[test]
    fn test_parse_order_status() {
        let msg = json!({
            "type": "message",
            "topic": "/spotMarket/tradeOrders",
            "subject": "orderChange",
            "channelType": "private",
            "data": {
                "symbol": "ETH-USDT",
                "orderType": "limit",
                "side": "buy",
                "orderId": "5efab07953bdea00089965d2",
                "type": "open",
                "orderTime": 1593487481683297666_i64,
                "size": "0.1",
                "filledSize": "0",
                "price": "0.937",
                "clientOid": "1593487481000906",
                "remainSize": "0.1",
                "status": "open",
                "ts": 1593487481683297666_i64
            }
        });

        let order = adapter().parse_order_status(&msg, 0).unwrap();
        assert_eq!(order.status, OrderStatus::New);
        assert_eq!(order.order_type, Some(OrderType::Limit));
        assert_eq!(order.price, Some(dec!(0.937)));
        assert_eq!(order.filled(), dec!(0));
        assert_eq!(order.exchange_timestamp_ms, Some(1_593_487_481_683));
    }

    #[test]
    fn test_order_status_mapping() {
        assert_eq!(KucoinAdapter::order_status("filled", dec!(0)), Ok(OrderStatus::Filled));
        assert_eq!(KucoinAdapter::order_status("canceled", dec!(1)), Ok(OrderStatus::Canceled));
        assert_eq!(
            KucoinAdapter::order_status("match", dec!(0.5)),
            Ok(OrderStatus::PartiallyFilled)
        );
        assert_eq!(KucoinAdapter::order_status("match", dec!(0)), Ok(OrderStatus::Filled));
        assert!(KucoinAdapter::order_status("bogus", dec!(0)).is_err());
    }

    #[test]
    fn test_parse_balance() {
        let msg = json!({
            "type": "message",
            "topic": "/account/balance",
            "subject": "account.balance",
            "channelType": "private",
            "data": {
                "total": "88",
                "available": "80",
                "availableChange": "88",
                "currency": "KCS",
                "hold": "8",
                "holdChange": "0",
                "relationEvent": "trade.setted",
                "time": "1545743136994"
            }
        });

        let balance = adapter().parse_balance(&msg, 0).unwrap();
        assert_eq!(balance.currency, "KCS");
        assert_eq!(balance.available, dec!(80));
        assert_eq!(balance.reserved, dec!(8));
        assert_eq!(balance.exchange_timestamp_ms, Some(1_545_743_136_994));
    }

    #[test]
    fn test_parse_balance_snapshot() {
        let response = json!({
            "code": "200000",
            "data": [
                {"id": "a", "currency": "BTC", "type": "trade", "balance": "1.5", "available": "1", "holds": "0.5"},
                {"id": "b", "currency": "USDT", "type": "main", "balance": "100", "available": "100", "holds": "0"}
            ]
        });

        let balances = adapter().parse_balance_snapshot(&response, 9).unwrap();
        assert_eq!(balances.len(), 2);
        assert_eq!(balances[0].reserved, dec!(0.5));
        assert_eq!(balances[0].account.as_deref(), Some("trade"));
        assert!(balances[1].raw.is_some());
    }

    #[test]
    fn test_subscribe_chunks_public_topics() {
        let symbols: Vec<String> = (0..250).map(|i| format!("S{}-USDT", i)).collect();
        let frames = adapter().subscribe_messages(Channel::L2Book, &symbols, None);

        assert_eq!(frames.len(), 3);
        let first = frames[0]["topic"].as_str().unwrap();
        assert!(first.starts_with("/market/level2:S0-USDT,S1-USDT"));
        assert_eq!(first.matches(',').count(), 99);
        assert_eq!(frames[2]["topic"].as_str().unwrap().matches(',').count(), 49);
        assert_eq!(frames[0]["privateChannel"], false);
    }

    #[test]
    fn test_subscribe_private_channel() {
        let frames = adapter().subscribe_messages(Channel::Balances, &[], None);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["topic"], "/account/balance");
        assert_eq!(frames[0]["privateChannel"], true);
    }

    #[test]
    fn test_paths_and_limits() {
        let a = adapter();
        assert_eq!(
            a.snapshot_path("BTC-USDT", 2),
            "/api/v3/market/orderbook/level2?symbol=BTC-USDT"
        );
        assert_eq!(a.balance_path(None).as_deref(), Some("/api/v1/accounts"));
        assert_eq!(a.max_symbols_per_connection(), Some(300));
        assert_eq!(a.heartbeat_message(), Some(json!({"type": "ping"})));
    }
}
