//! End-to-end tests against a local mock venue
//!
//! The mock speaks KuCoin's REST and WebSocket shapes. Its book has a
//! single bid at 99 whose size always equals the current sequence, so any
//! book the gateway holds must satisfy `size == sequence`.

use axum::{
    Json, Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
    routing::get,
};
use feed_core::{ExchangeId, FeedEvent};
use feed_gateway::{FeedManager, config::load_config_from_str};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::net::TcpListener;

// ============================================================================
// Mock venue
// ============================================================================

#[derive(Clone, Default)]
struct MockVenue {
    sequence: Arc<AtomicU64>,
    connections: Arc<AtomicUsize>,
    received: Arc<Mutex<Vec<Value>>>,
    /// Close the first connection right after its first frame
    drop_first: bool,
}

async fn level2(State(venue): State<MockVenue>) -> Json<Value> {
    let sequence = venue.sequence.load(Ordering::SeqCst);
    Json(json!({
        "code": "200000",
        "data": {
            "sequence": sequence.to_string(),
            "time": 1550653727731_i64,
            "bids": [["99", sequence.to_string()]],
            "asks": [["101", "1"]]
        }
    }))
}

async fn ws_handler(ws: WebSocketUpgrade, State(venue): State<MockVenue>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, venue))
}

async fn handle_socket(socket: WebSocket, venue: MockVenue) {
    let connection = venue.connections.fetch_add(1, Ordering::SeqCst) + 1;
    let (mut sender, mut receiver) = socket.split();

    // wait for the first subscribe
    let Some(Ok(Message::Text(first))) = receiver.next().await else {
        return;
    };
    if let Ok(frame) = serde_json::from_str(first.as_str()) {
        venue.received.lock().push(frame);
    }
    if venue.drop_first && connection == 1 {
        return;
    }

    let received = Arc::clone(&venue.received);
    tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Text(text) = msg {
                if let Ok(frame) = serde_json::from_str(text.as_str()) {
                    received.lock().push(frame);
                }
            }
        }
    });

    let trade = json!({
        "type": "message",
        "topic": "/market/match:BTC-USDT",
        "subject": "trade.l3match",
        "data": {
            "symbol": "BTC-USDT", "side": "buy", "price": "100.5", "size": "0.25",
            "tradeId": "t-1", "time": "1545913818099033203"
        }
    });
    if sender.send(Message::Text(trade.to_string().into())).await.is_err() {
        return;
    }

    loop {
        let seq = venue.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let delta = json!({
            "type": "message",
            "topic": "/market/level2:BTC-USDT",
            "subject": "trade.l2update",
            "data": {
                "sequenceStart": seq,
                "sequenceEnd": seq,
                "symbol": "BTC-USDT",
                "changes": {"asks": [], "bids": [["99", seq.to_string(), seq.to_string()]]},
                "time": 1663747970273_i64
            }
        });
        if sender.send(Message::Text(delta.to_string().into())).await.is_err() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

async fn serve(venue: MockVenue) -> String {
    let app = Router::new()
        .route("/", get(ws_handler))
        .route("/api/v3/market/orderbook/level2", get(level2))
        .with_state(venue);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr.to_string()
}

fn manager_for(addr: &str) -> FeedManager {
    let json = json!({
        "exchanges": [{
            "id": "kucoin",
            "name": "KuCoin",
            "rest_url": format!("http://{}", addr),
            "ws_url": format!("ws://{}/", addr),
            "symbols": [{"base": "BTC", "quote": "USDT", "venue_id": "BTC-USDT"}],
            "channels": ["l2_book", "trades"],
            "market_data": {"max_depth": 5}
        }],
        "global": {
            "reconnect_delay_ms": 10,
            "max_reconnect_attempts": 3,
            "heartbeat_interval_ms": 0,
            "event_buffer_size": 1024
        }
    });
    FeedManager::new(load_config_from_str(&json.to_string()).unwrap()).unwrap()
}

async fn wait_for_synced_book(manager: &FeedManager) -> (u64, Decimal) {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Some(book) = manager.book(&ExchangeId::kucoin(), "BTC-USDT") {
                if let (Some(seq), Some(bid)) = (book.sequence(), book.best_bid()) {
                    return (seq, bid.size);
                }
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("book never synced")
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_streams_book_and_trades() {
    let venue = MockVenue::default();
    let addr = serve(venue.clone()).await;
    let mut manager = manager_for(&addr);
    let mut events = manager.subscribe();
    manager.start();
    assert!(manager.is_running());

    let mut saw_trade = false;
    let mut snapshot_sequence = None;
    let mut delta_after_snapshot = false;
    tokio::time::timeout(Duration::from_secs(5), async {
        while !(saw_trade && delta_after_snapshot) {
            match events.next().await.unwrap() {
                FeedEvent::Trade(trade) => {
                    assert_eq!(trade.price, dec!(100.5));
                    assert!(trade.raw.is_some());
                    saw_trade = true;
                }
                FeedEvent::OrderBook(book) if book.is_snapshot() => {
                    snapshot_sequence = book.sequence;
                }
                FeedEvent::OrderBook(book) => {
                    assert!(snapshot_sequence.is_some());
                    assert!(book.sequence > snapshot_sequence);
                    let bid = &book.bids[0];
                    assert_eq!(bid.size, Decimal::from(book.sequence.unwrap()));
                    delta_after_snapshot = true;
                }
                other => panic!("unexpected event {:?}", other),
            }
        }
    })
    .await
    .expect("feed stalled");

    let (sequence, size) = wait_for_synced_book(&manager).await;
    assert_eq!(size, Decimal::from(sequence));

    let received = venue.received.lock().clone();
    let topics: Vec<&str> = received.iter().filter_map(|f| f["topic"].as_str()).collect();
    assert!(topics.contains(&"/market/level2:BTC-USDT"));
    assert!(topics.contains(&"/market/match:BTC-USDT"));
    assert!(received.iter().all(|f| f["type"] == "subscribe"));

    manager.stop();
    assert!(manager.book(&ExchangeId::kucoin(), "BTC-USDT").is_none());
}

#[tokio::test]
async fn test_reconnects_and_resyncs() {
    let venue = MockVenue {
        drop_first: true,
        ..Default::default()
    };
    let addr = serve(venue.clone()).await;
    let mut manager = manager_for(&addr);
    manager.start();

    tokio::time::timeout(Duration::from_secs(5), async {
        while venue.connections.load(Ordering::SeqCst) < 2 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("never reconnected");

    let (sequence, size) = wait_for_synced_book(&manager).await;
    assert_eq!(size, Decimal::from(sequence));

    manager.stop();
    assert!(!manager.book_symbols(&ExchangeId::kucoin()).contains(&"BTC-USDT".to_string()));
}

#[tokio::test]
async fn test_gives_up_after_failed_connects() {
    // nothing listens here
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    drop(listener);

    let mut manager = manager_for(&addr);
    manager.start();

    tokio::time::timeout(Duration::from_secs(5), async {
        while manager.is_running() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("connection never gave up");
    assert!(manager.book(&ExchangeId::kucoin(), "BTC-USDT").is_none());
}
