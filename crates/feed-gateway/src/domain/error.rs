use std::fmt;
use thiserror::Error;

/// Malformed or unexpected message shape from a venue
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid JSON: {0}")]
    Json(String),
    #[error("Missing field: {0}")]
    MissingField(&'static str),
    #[error("Invalid value for {field}: {value}")]
    InvalidField { field: &'static str, value: String },
    #[error("Invalid decimal for {field}: {value}")]
    InvalidDecimal { field: &'static str, value: String },
    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),
    #[error("Unhandled message: {0}")]
    Unhandled(String),
}

impl From<serde_json::Error> for ParseError {
    fn from(err: serde_json::Error) -> Self {
        ParseError::Json(err.to_string())
    }
}

/// Domain error for snapshot fetching operations
///
/// Infrastructure implementations convert their transport errors to this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Network or communication failure
    Network(String),
    /// Venue returned an error response
    Api { code: String, message: String },
    /// Failed to parse the response
    Parse(String),
    /// Symbol has no venue identifier
    UnknownSymbol(String),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Network(msg) => write!(f, "Network error: {}", msg),
            FetchError::Api { code, message } => write!(f, "API error {}: {}", code, message),
            FetchError::Parse(msg) => write!(f, "Parse error: {}", msg),
            FetchError::UnknownSymbol(sym) => write!(f, "Unknown symbol: {}", sym),
        }
    }
}

impl std::error::Error for FetchError {}

impl From<ParseError> for FetchError {
    fn from(err: ParseError) -> Self {
        FetchError::Parse(err.to_string())
    }
}

/// Error kinds surfaced by the feed pipeline.
///
/// Only `Config` is fatal; everything else drops the offending message or
/// leaves a symbol unsynced until the next delta.
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Parse error: {0}")]
    Parse(ParseError),
    #[error("Unknown channel: {0}")]
    UnknownChannel(String),
    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),
    #[error("Snapshot fetch failed for {symbol}: {source}")]
    SnapshotFetch {
        symbol: String,
        #[source]
        source: FetchError,
    },
    #[error("Venue error: {0}")]
    Venue(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

impl FeedError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, FeedError::Config(_))
    }
}

impl From<ParseError> for FeedError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::UnknownSymbol(sym) => FeedError::UnknownSymbol(sym),
            other => FeedError::Parse(other),
        }
    }
}
