use async_trait::async_trait;
use feed_core::{BalanceEvent, clock};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::domain::{BookSnapshot, FetchError, SnapshotFetcher, VenueAdapter};

#[derive(Error, Debug)]
pub enum RestError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {code} - {msg}")]
    Api { code: String, msg: String },
    #[error("HTTP status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Parse error: {0}")]
    Parse(String),
}

impl RestError {
    /// Transport failures and server-side statuses are worth another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            RestError::Http(_) => true,
            RestError::Status { status, .. } => {
                *status >= 500 || *status == StatusCode::TOO_MANY_REQUESTS.as_u16()
            }
            RestError::Api { .. } | RestError::Parse(_) => false,
        }
    }
}

/// Convert infrastructure RestError to domain FetchError
impl From<RestError> for FetchError {
    fn from(err: RestError) -> Self {
        match err {
            RestError::Http(e) => FetchError::Network(e.to_string()),
            RestError::Api { code, msg } => FetchError::Api { code, message: msg },
            RestError::Status { status, body } => FetchError::Api {
                code: status.to_string(),
                message: body,
            },
            RestError::Parse(msg) => FetchError::Parse(msg),
        }
    }
}

/// JSON-over-HTTP client for one venue's REST API
#[derive(Clone)]
pub struct RestClient {
    client: Client,
    base_url: String,
    headers: HashMap<String, String>,
    retries: u32,
    retry_delay: Duration,
}

impl RestClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        RestClient {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            headers: HashMap::new(),
            retries: 0,
            retry_delay: Duration::from_secs(1),
        }
    }

    /// Static headers sent with every request
    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    /// Extra attempts after the first, for retryable failures only
    pub fn with_retries(mut self, retries: u32, delay: Duration) -> Self {
        self.retries = retries;
        self.retry_delay = delay;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET `path` and decode the body as JSON, retrying transient failures
    pub async fn get_json(&self, path: &str) -> Result<Value, RestError> {
        let mut attempt = 0;
        loop {
            match self.get_once(path).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.retries => {
                    attempt += 1;
                    tracing::warn!(
                        "GET {} failed ({}), retry {}/{}",
                        path,
                        e,
                        attempt,
                        self.retries
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn get_once(&self, path: &str) -> Result<Value, RestError> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.get(&url);
        for (name, value) in &self.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let resp = request.send().await?;
        self.handle_response(resp).await
    }

    async fn handle_response(&self, resp: reqwest::Response) -> Result<Value, RestError> {
        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            return Err(status_error(status, text));
        }

        serde_json::from_str(&text).map_err(|e| RestError::Parse(e.to_string()))
    }
}

/// Error for a non-success response.
///
/// Rate limits and server errors stay `Status` so they are retried even
/// when the venue wraps them in its own error body.
fn status_error(status: StatusCode, text: String) -> RestError {
    let transient = status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS;
    match api_error(&text) {
        Some((code, msg)) if !transient => RestError::Api { code, msg },
        _ => RestError::Status {
            status: status.as_u16(),
            body: text,
        },
    }
}

/// Venue error body: `{"code", "msg"}` or `{"error_code", "error"}`
fn api_error(text: &str) -> Option<(String, String)> {
    let body: Value = serde_json::from_str(text).ok()?;
    let code = body.get("code").or_else(|| body.get("error_code"))?;
    let msg = body
        .get("msg")
        .or_else(|| body.get("error"))
        .and_then(Value::as_str)
        .unwrap_or_default();
    let code = code
        .as_str()
        .map(str::to_string)
        .unwrap_or_else(|| code.to_string());
    Some((code, msg.to_string()))
}

/// Bootstraps books (and balances) over a venue's REST API.
///
/// Resolves canonical symbols through the adapter's registry, so it only
/// ever requests venue identifiers it was configured with.
pub struct RestSnapshotFetcher {
    rest: RestClient,
    adapter: Arc<dyn VenueAdapter>,
    depth: usize,
}

impl RestSnapshotFetcher {
    pub fn new(rest: RestClient, adapter: Arc<dyn VenueAdapter>, depth: usize) -> Self {
        RestSnapshotFetcher {
            rest,
            adapter,
            depth,
        }
    }

    /// Current balances, for venues with a balance listing
    pub async fn fetch_balances(
        &self,
        account: Option<&str>,
    ) -> Result<Vec<BalanceEvent>, FetchError> {
        let Some(path) = self.adapter.balance_path(account) else {
            return Ok(Vec::new());
        };

        let response = self.rest.get_json(&path).await?;
        let balances = self
            .adapter
            .parse_balance_snapshot(&response, clock::now_millis())?;
        Ok(balances)
    }
}

#[async_trait]
impl SnapshotFetcher for RestSnapshotFetcher {
    async fn fetch_snapshot(&self, symbol: &str) -> Result<BookSnapshot, FetchError> {
        let venue_id = self
            .adapter
            .registry()
            .venue_id(symbol)
            .ok_or_else(|| FetchError::UnknownSymbol(symbol.to_string()))?;
        let path = self.adapter.snapshot_path(venue_id, self.depth);

        let response = self.rest.get_json(&path).await?;
        let mut snapshot = self.adapter.parse_snapshot(&response)?;
        snapshot.raw = Some(Arc::new(response));
        Ok(snapshot)
    }
}
