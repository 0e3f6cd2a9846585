use feed_core::{BalanceEvent, ExchangeId, OrderStatus, OrderStatusEvent, Side, TradeEvent, clock};
use rust_decimal::Decimal;
use serde_json::{Value, json};
use std::sync::Arc;

use crate::domain::{
    BookDelta, BookSnapshot, Channel, Envelope, LevelChange, ParseError, SymbolRegistry,
    VenueAdapter,
};

use super::fields::{
    array_field, bool_field, field, id_field, levels_with, opt_field, opt_i64_field, scaled_field,
    scaled_value, str_field,
};

/// Implied decimals of every x18 fixed-point quantity
const UNITS: u32 = 18;

/// Product 0 is the quote collateral and has no market
const QUOTE_PRODUCT: &str = "0";
const QUOTE_CURRENCY: &str = "USDC";

const L2_BOOK: &str = "book_depth";
const TRADES: &str = "trade";
const ORDER_INFO: &str = "fill";
const BALANCES: &str = "position_change";

/// Vertex Protocol
///
/// Products are numeric ids. Quantities are x18 integers and timestamps
/// nanoseconds. Book deltas carry no sequence numbers, so books are
/// bootstrapped once per subscription and deltas applied as they arrive.
pub struct VertexAdapter {
    registry: Arc<SymbolRegistry>,
}

impl VertexAdapter {
    pub fn new(registry: Arc<SymbolRegistry>) -> Self {
        VertexAdapter { registry }
    }

    fn product_symbol(&self, msg: &Value) -> Result<String, ParseError> {
        let product_id = id_field(msg, "product_id")?;
        self.registry.resolve(&product_id).map(str::to_string)
    }

    fn currency(&self, product_id: &str) -> Result<String, ParseError> {
        if product_id == QUOTE_PRODUCT {
            return Ok(QUOTE_CURRENCY.to_string());
        }
        let canonical = self.registry.resolve(product_id)?;
        Ok(self
            .registry
            .symbol(canonical)
            .map(|s| s.base().to_string())
            .unwrap_or_else(|| canonical.to_string()))
    }

    fn nanos_field(value: &Value, name: &'static str) -> Result<Option<i64>, ParseError> {
        Ok(opt_i64_field(value, name)?.map(clock::nanos_to_millis))
    }

    fn fill_status(remaining: Decimal) -> OrderStatus {
        if remaining.is_zero() {
            OrderStatus::Filled
        } else {
            OrderStatus::PartiallyFilled
        }
    }
}

impl VenueAdapter for VertexAdapter {
    fn exchange_id(&self) -> ExchangeId {
        ExchangeId::vertex()
    }

    fn registry(&self) -> &SymbolRegistry {
        &self.registry
    }

    fn inspect(&self, msg: &Value) -> Envelope {
        if let Some(kind) = msg.get("type").and_then(Value::as_str) {
            return Envelope::Data {
                topic: kind.to_string(),
            };
        }
        if let Some(error) = opt_field(msg, "error") {
            return Envelope::VenueError(
                error.as_str().map(str::to_string).unwrap_or_else(|| error.to_string()),
            );
        }
        match msg.get("result") {
            Some(Value::Null) => Envelope::Control,
            _ => Envelope::VenueError(format!("unrecognized frame: {}", msg)),
        }
    }

    fn classify_channel(&self, topic: &str) -> Option<Channel> {
        match topic {
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
        let symbol = self.product_symbol(msg)?;
        let read = |v: &Value, name: &'static str| scaled_value(v, name, UNITS);

        let mut changes = Vec::new();
        for level in levels_with(msg, "bids", read)? {
            changes.push(LevelChange::bid(level.price, level.size));
        }
        for level in levels_with(msg, "asks", read)? {
            changes.push(LevelChange::ask(level.price, level.size));
        }

        Ok(BookDelta {
            symbol,
            changes,
            sequence: None,
            exchange_timestamp_ms: Self::nanos_field(msg, "max_timestamp")?,
            raw: None,
        })
    }

    fn parse_snapshot(&self, response: &Value) -> Result<BookSnapshot, ParseError> {
        if let Some(status) = opt_field(response, "status").and_then(Value::as_str) {
            if status != "success" {
                return Err(ParseError::InvalidField {
                    field: "status",
                    value: status.to_string(),
                });
            }
        }

        let data = field(response, "data")?;
        let read = |v: &Value, name: &'static str| scaled_value(v, name, UNITS);

        Ok(BookSnapshot {
            bids: levels_with(data, "bids", read)?,
            asks: levels_with(data, "asks", read)?,
            sequence: None,
            exchange_timestamp_ms: Self::nanos_field(data, "timestamp")?,
            raw: None,
        })
    }

    fn parse_trade(&self, msg: &Value, receipt_ms: i64) -> Result<TradeEvent, ParseError> {
        let side = if bool_field(msg, "is_taker_buyer")? {
            Side::Buy
        } else {
            Side::Sell
        };

        Ok(TradeEvent {
            exchange: self.exchange_id(),
            symbol: self.product_symbol(msg)?,
            side,
            price: scaled_field(msg, "price", UNITS)?,
            size: scaled_field(msg, "taker_qty", UNITS)?,
            trade_id: None,
            exchange_timestamp_ms: Self::nanos_field(msg, "timestamp")?,
            receipt_timestamp_ms: receipt_ms,
            raw: None,
        })
    }

    fn parse_order_status(
        &self,
        msg: &Value,
        receipt_ms: i64,
    ) -> Result<OrderStatusEvent, ParseError> {
        let side = if bool_field(msg, "is_bid")? {
            Side::Buy
        } else {
            Side::Sell
        };
        let remaining = scaled_field(msg, "remaining_qty", UNITS)?;

        Ok(OrderStatusEvent {
            exchange: self.exchange_id(),
            symbol: self.product_symbol(msg)?,
            order_id: str_field(msg, "order_digest")?.to_string(),
            side,
            order_type: None,
            status: Self::fill_status(remaining),
            price: Some(scaled_field(msg, "price", UNITS)?),
            size: scaled_field(msg, "original_qty", UNITS)?,
            remaining,
            account: opt_field(msg, "subaccount")
                .and_then(Value::as_str)
                .map(str::to_string),
            exchange_timestamp_ms: Self::nanos_field(msg, "timestamp")?,
            receipt_timestamp_ms: receipt_ms,
            raw: None,
        })
    }

    fn parse_balance(&self, msg: &Value, receipt_ms: i64) -> Result<BalanceEvent, ParseError> {
        Ok(BalanceEvent {
            exchange: self.exchange_id(),
            currency: self.currency(&id_field(msg, "product_id")?)?,
            available: scaled_field(msg, "amount", UNITS)?,
            reserved: Decimal::ZERO,
            account: opt_field(msg, "subaccount")
                .and_then(Value::as_str)
                .map(str::to_string),
            exchange_timestamp_ms: Self::nanos_field(msg, "timestamp")?,
            receipt_timestamp_ms: receipt_ms,
            raw: None,
        })
    }

    fn parse_balance_snapshot(
        &self,
        response: &Value,
        receipt_ms: i64,
    ) -> Result<Vec<BalanceEvent>, ParseError> {
        let data = field(response, "data")?;
        let mut balances = Vec::new();

        for entry in array_field(data, "spot_balances")? {
            let balance = field(entry, "balance")?;
            balances.push(BalanceEvent {
                exchange: self.exchange_id(),
                currency: self.currency(&id_field(entry, "product_id")?)?,
                available: scaled_field(balance, "amount", UNITS)?,
                reserved: Decimal::ZERO,
                account: None,
                exchange_timestamp_ms: None,
                receipt_timestamp_ms: receipt_ms,
                raw: Some(Arc::new(entry.clone())),
            });
        }

        Ok(balances)
    }

    fn snapshot_path(&self, venue_symbol: &str, depth: usize) -> String {
        format!(
            "/query?type=market_liquidity&product_id={}&depth={}",
            venue_symbol, depth
        )
    }

    fn balance_path(&self, account: Option<&str>) -> Option<String> {
        account.map(|a| format!("/query?type=subaccount_info&subaccount={}", a))
    }

    fn subscribe_messages(
        &self,
        channel: Channel,
        venue_symbols: &[String],
        account: Option<&str>,
    ) -> Vec<Value> {
        let kind = self.venue_channel(channel);

        venue_symbols
            .iter()
            .map(|product| {
                let product_id = product
                    .parse::<u64>()
                    .map(Value::from)
                    .unwrap_or_else(|_| Value::from(product.as_str()));
                let mut stream = json!({ "type": kind, "product_id": product_id });
                if channel.is_private() {
                    if let Some(account) = account {
                        stream["subaccount"] = Value::from(account);
                    }
                }
                json!({ "method": "subscribe", "stream": stream })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feed_core::{PriceLevel, Symbol};
    use rust_decimal_macros::dec;

    const SUBACCOUNT: &str = "0x7a5ec2748e9065794491a8d29dcf3f9edb8d7c43000000000000000000000000";

    fn adapter() -> VertexAdapter {
        let registry = SymbolRegistry::with_symbols(
            ExchangeId::vertex(),
            vec![
                (Symbol::spot("WBTC", "USDC"), "1"),
                (Symbol::spot("WETH", "USDC"), "3"),
            ],
        )
        .unwrap();
        VertexAdapter::new(Arc::new(registry))
    }

    #[test]
    fn test_inspect() {
        let a = adapter();
        assert_eq!(
            a.inspect(&json!({"type": "book_depth", "product_id": 1})),
            Envelope::Data {
                topic: "book_depth".to_string()
            }
        );
        assert_eq!(a.inspect(&json!({"result": null, "id": 10})), Envelope::Control);
        assert!(matches!(
            a.inspect(&json!({"error": "invalid product", "id": 10})),
            Envelope::VenueError(_)
        ));
        assert_eq!(a.classify_channel("position_change"), Some(Channel::Balances));
        assert_eq!(a.classify_channel("best_bid_offer"), None);
    }

    #[test]
    fn test_parse_delta_scales_x18() {
        let msg = json!({
            "type": "book_depth",
            "min_timestamp": "1695081920633151000",
            "max_timestamp": "1695081920633151000",
            "last_max_timestamp": "1695081920605059000",
            "product_id": 1,
            "bids": [["26745000000000000000000", "350000000000000000"]],
            "asks": [["26750500000000000000000", "0"]]
        });

        let delta = adapter().parse_delta(&msg).unwrap();
        assert_eq!(delta.symbol, "WBTC-USDC");
        assert_eq!(delta.sequence, None);
        assert_eq!(
            delta.changes,
            vec![
                LevelChange::bid(dec!(26745), dec!(0.35)),
                LevelChange::ask(dec!(26750.5), dec!(0)),
            ]
        );
        assert_eq!(delta.exchange_timestamp_ms, Some(1_695_081_920_633));
    }

    #[test]
    fn test_parse_delta_unknown_product() {
        let msg = json!({"type": "book_depth", "product_id": 99, "bids": [], "asks": []});
        assert_eq!(
            adapter().parse_delta(&msg),
            Err(ParseError::UnknownSymbol("99".to_string()))
        );
    }

    #[test]
    fn test_parse_snapshot() {
        let response = json!({
            "status": "success",
            "data": {
                "bids": [["30000000000000000000000", "1000000000000000000"]],
                "asks": [["30010000000000000000000", "2500000000000000000"]],
                "timestamp": "1694375575610529000"
            },
            "request_type": "query_market_liquidity"
        });

        let snapshot = adapter().parse_snapshot(&response).unwrap();
        assert_eq!(snapshot.bids, vec![PriceLevel::new(dec!(30000), dec!(1))]);
        assert_eq!(snapshot.asks, vec![PriceLevel::new(dec!(30010), dec!(2.5))]);
        assert_eq!(snapshot.sequence, None);
        assert_eq!(snapshot.exchange_timestamp_ms, Some(1_694_375_575_610));
    }

    #[test]
    fn test_parse_snapshot_failure_status() {
        let response = json!({"status": "failure", "error": "unknown product"});
        assert!(matches!(
            adapter().parse_snapshot(&response),
            Err(ParseError::InvalidField { field: "status", .. })
        ));
    }

    #[test]
    fn test_parse_trade() {
        let msg = json!({
            "type": "trade",
            "timestamp": "1676151190656903000",
            "product_id": 3,
            "price": "1550000000000000000000",
            "taker_qty": "2000000000000000000",
            "maker_qty": "-2000000000000000000",
            "is_taker_buyer": false
        });

        let trade = adapter().parse_trade(&msg, 5).unwrap();
        assert_eq!(trade.symbol, "WETH-USDC");
        assert_eq!(trade.side, Side::Sell);
        assert_eq!(trade.price, dec!(1550));
        assert_eq!(trade.size, dec!(2));
        assert_eq!(trade.exchange_timestamp_ms, Some(1_676_151_190_656));
    }

    #[test]
    fn test_parse_fill() {
        let msg = json!({
            "type": "fill",
            "timestamp": "1676151190656903000",
            "product_id": 1,
            "subaccount": SUBACCOUNT,
            "order_digest": "0xf4f7a8767faf0c7f72251a1f9e5da590f708fd9842bf8fcdeacbaa0237958fff",
            "filled_qty": "1000000000000000000",
            "remaining_qty": "2000000000000000000",
            "original_qty": "3000000000000000000",
            "price": "24991000000000000000000",
            "is_taker": true,
            "is_bid": true
        });

        let order = adapter().parse_order_status(&msg, 0).unwrap();
        assert_eq!(order.status, OrderStatus::PartiallyFilled);
        assert_eq!(order.side, Side::Buy);
        assert_eq!(order.size, dec!(3));
        assert_eq!(order.remaining, dec!(2));
        assert_eq!(order.filled(), dec!(1));
        assert_eq!(order.price, Some(dec!(24991)));
        assert_eq!(order.account.as_deref(), Some(SUBACCOUNT));
    }

    #[test]
    fn test_fill_status() {
        assert_eq!(VertexAdapter::fill_status(dec!(0)), OrderStatus::Filled);
        assert_eq!(VertexAdapter::fill_status(dec!(0.1)), OrderStatus::PartiallyFilled);
    }

    #[test]
    fn test_parse_balance() {
        let a = adapter();
        let quote = json!({
            "type": "position_change",
            "timestamp": "1676151190656903000",
            "product_id": 0,
            "is_lp": false,
            "subaccount": SUBACCOUNT,
            "amount": "125500000000000000000",
            "v_quote_amount": "0"
        });
        let balance = a.parse_balance(&quote, 0).unwrap();
        assert_eq!(balance.currency, "USDC");
        assert_eq!(balance.available, dec!(125.5));
        assert_eq!(balance.reserved, dec!(0));

        let base = json!({"type": "position_change", "product_id": 1, "amount": "-500000000000000000"});
        let balance = a.parse_balance(&base, 0).unwrap();
        assert_eq!(balance.currency, "WBTC");
        assert_eq!(balance.available, dec!(-0.5));
        assert_eq!(balance.exchange_timestamp_ms, None);
    }

    #[test]
    fn test_parse_balance_snapshot() {
        let response = json!({
            "status": "success",
            "data": {
                "subaccount": SUBACCOUNT,
                "exists": true,
                "spot_balances": [
                    {"product_id": 0, "lp_balance": {"amount": "0"}, "balance": {"amount": "1000000000000000000000", "last_cumulative_multiplier_x18": "1"}},
                    {"product_id": 3, "lp_balance": {"amount": "0"}, "balance": {"amount": "2000000000000000000", "last_cumulative_multiplier_x18": "1"}}
                ]
            }
        });

        let balances = adapter().parse_balance_snapshot(&response, 1).unwrap();
        assert_eq!(balances.len(), 2);
        assert_eq!(balances[0].currency, "USDC");
        assert_eq!(balances[0].available, dec!(1000));
        assert_eq!(balances[1].currency, "WETH");
        assert_eq!(balances[1].available, dec!(2));
    }

    #[test]
    fn test_subscribe_one_frame_per_product() {
        let a = adapter();
        let products = vec!["1".to_string(), "3".to_string()];

        let frames = a.subscribe_messages(Channel::L2Book, &products, Some(SUBACCOUNT));
        assert_eq!(
            frames,
            vec![
                json!({"method": "subscribe", "stream": {"type": "book_depth", "product_id": 1}}),
                json!({"method": "subscribe", "stream": {"type": "book_depth", "product_id": 3}}),
            ]
        );

        let frames = a.subscribe_messages(Channel::OrderInfo, &products[..1], Some(SUBACCOUNT));
        assert_eq!(frames[0]["stream"]["subaccount"], SUBACCOUNT);
        assert_eq!(frames[0]["stream"]["type"], "fill");
    }

    #[test]
    fn test_paths() {
        let a = adapter();
        assert_eq!(
            a.snapshot_path("1", 2),
            "/query?type=market_liquidity&product_id=1&depth=2"
        );
        assert_eq!(
            a.balance_path(Some("abc")).as_deref(),
            Some("/query?type=subaccount_info&subaccount=abc")
        );
        assert_eq!(a.balance_path(None), None);
        assert_eq!(a.heartbeat_message(), None);
        assert_eq!(a.max_symbols_per_connection(), None);
    }
}
