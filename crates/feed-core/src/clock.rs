use chrono::Utc;

/// Wall-clock time in milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Convert a venue nanosecond timestamp to milliseconds.
pub fn nanos_to_millis(nanos: i64) -> i64 {
    nanos / 1_000_000
}
