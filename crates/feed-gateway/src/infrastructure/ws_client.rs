use feed_core::clock;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::domain::WsEvent;

#[derive(Error, Debug)]
pub enum WsError {
    #[error("Connection error: {0}")]
    Connection(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Channel closed")]
    ChannelClosed,
}

enum Outgoing {
    Json(Value),
    Close,
}

/// WebSocket client for one venue stream connection
pub struct WsClient {
    url: String,
}

impl WsClient {
    pub fn new(url: impl Into<String>) -> Self {
        WsClient { url: url.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Connect and return channels for sending frames and receiving events.
    ///
    /// The receiver yields `Connected` first and ends with `Disconnected`.
    pub async fn connect(&self) -> Result<(WsRequestSender, mpsc::Receiver<WsEvent>), WsError> {
        let (ws_stream, _) = connect_async(self.url.as_str()).await?;
        let (mut write, mut read) = ws_stream.split();

        let (req_tx, mut req_rx) = mpsc::channel::<Outgoing>(64);
        let (event_tx, event_rx) = mpsc::channel::<WsEvent>(4096);

        let _ = event_tx.send(WsEvent::Connected).await;

        // Writer
        let event_tx_clone = event_tx.clone();
        tokio::spawn(async move {
            while let Some(req) = req_rx.recv().await {
                let message = match req {
                    Outgoing::Json(value) => match serde_json::to_string(&value) {
                        Ok(json) => Message::Text(json.into()),
                        Err(e) => {
                            let _ = event_tx_clone.send(WsEvent::Error(e.to_string())).await;
                            continue;
                        }
                    },
                    Outgoing::Close => {
                        let _ = write.send(Message::Close(None)).await;
                        break;
                    }
                };

                if let Err(e) = write.send(message).await {
                    let _ = event_tx_clone.send(WsEvent::Error(e.to_string())).await;
                    break;
                }
            }
        });

        // Reader
        tokio::spawn(async move {
            while let Some(msg) = read.next().await {
                match msg {
                    Ok(Message::Text(text)) => {
                        let event = WsEvent::Message {
                            text: text.to_string(),
                            receipt_ms: clock::now_millis(),
                        };
                        if event_tx.send(event).await.is_err() {
                            return;
                        }
                    }
                    Ok(Message::Close(frame)) => {
                        tracing::debug!("Close frame received: {:?}", frame);
                        break;
                    }
                    Ok(Message::Ping(data)) => {
                        tracing::trace!("Received ping: {:?}", data);
                    }
                    Ok(_) => {}
                    Err(e) => {
                        let _ = event_tx.send(WsEvent::Error(e.to_string())).await;
                        break;
                    }
                }
            }
            let _ = event_tx.send(WsEvent::Disconnected).await;
        });

        Ok((
            WsRequestSender {
                tx: req_tx,
                request_id: Arc::new(AtomicU64::new(1)),
            },
            event_rx,
        ))
    }
}

/// Handle for sending frames on an open connection
#[derive(Clone)]
pub struct WsRequestSender {
    tx: mpsc::Sender<Outgoing>,
    request_id: Arc<AtomicU64>,
}

impl WsRequestSender {
    fn next_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Send a JSON object, stamping it with the next request id
    pub async fn send(&self, mut frame: Value) -> Result<u64, WsError> {
        let id = self.next_id();
        if let Some(obj) = frame.as_object_mut() {
            obj.insert("id".to_string(), Value::from(id));
        }
        self.tx
            .send(Outgoing::Json(frame))
            .await
            .map_err(|_| WsError::ChannelClosed)?;
        Ok(id)
    }

    /// Send a frame as-is, without an id
    pub async fn send_raw(&self, frame: Value) -> Result<(), WsError> {
        self.tx
            .send(Outgoing::Json(frame))
            .await
            .map_err(|_| WsError::ChannelClosed)
    }

    pub async fn close(&self) -> Result<(), WsError> {
        self.tx
            .send(Outgoing::Close)
            .await
            .map_err(|_| WsError::ChannelClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sender() -> (WsRequestSender, mpsc::Receiver<Outgoing>) {
        let (tx, rx) = mpsc::channel(8);
        (
            WsRequestSender {
                tx,
                request_id: Arc::new(AtomicU64::new(1)),
            },
            rx,
        )
    }

    #[tokio::test]
    async fn test_send_stamps_increasing_ids() {
        let (sender, mut rx) = sender();
        assert_eq!(sender.send(json!({"type": "subscribe"})).await.unwrap(), 1);
        assert_eq!(sender.clone().send(json!({"type": "subscribe"})).await.unwrap(), 2);

        let Some(Outgoing::Json(first)) = rx.recv().await else {
            panic!("expected frame");
        };
        assert_eq!(first, json!({"type": "subscribe", "id": 1}));
        let Some(Outgoing::Json(second)) = rx.recv().await else {
            panic!("expected frame");
        };
        assert_eq!(second["id"], 2);
    }

    #[tokio::test]
    async fn test_send_after_close() {
        let (sender, rx) = sender();
        drop(rx);
        assert!(sender.is_closed());
        assert!(matches!(
            sender.send(json!({})).await,
            Err(WsError::ChannelClosed)
        ));
    }
}
