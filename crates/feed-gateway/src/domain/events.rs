/// Events produced by a venue stream connection
#[derive(Debug, Clone, PartialEq)]
pub enum WsEvent {
    Connected,
    /// Text frame with its wall-clock receipt time
    Message { text: String, receipt_ms: i64 },
    Disconnected,
    Error(String),
}
