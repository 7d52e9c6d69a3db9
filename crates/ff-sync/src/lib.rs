//! Backend sync for finished tasks.
//!
//! Posts each ended task's [`SyncPayload`] as JSON to
//! `{api_url}/api/activity`. [`Client`] is the async HTTP client;
//! [`HttpSink`] adapts it to the blocking [`SyncSink`] port used by the
//! tracker.

use std::fmt;
use std::time::Duration;

use ff_core::sync::{SyncFailure, SyncPayload, SyncSink};
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Default request timeout for sync calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const ACTIVITY_PATH: &str = "/api/activity";

/// Sync client errors.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The configured API URL is unusable.
    #[error("invalid API URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: &'static str },
    /// Failed to build HTTP client.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    /// Failed to start the runtime driving blocking delivery.
    #[error("failed to start sync runtime: {0}")]
    Runtime(#[source] std::io::Error),
    /// HTTP request failed.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// Backend returned a non-2xx status.
    #[error("backend returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
}

/// Activity endpoint client.
///
/// # Thread Safety
///
/// The client is safe to clone and share across threads. Each clone shares
/// the underlying HTTP connection pool.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    endpoint: String,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Creates a client posting to `{api_url}/api/activity`.
    ///
    /// # Errors
    ///
    /// Returns an error if `api_url` does not parse as an http(s) URL with a
    /// host, or if the HTTP client fails to build.
    pub fn new(api_url: &str, timeout: Duration) -> Result<Self, SyncError> {
        let invalid = |reason| SyncError::InvalidUrl {
            url: api_url.to_string(),
            reason,
        };
        let mut endpoint = Url::parse(api_url.trim()).map_err(|_| invalid("not a valid URL"))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(invalid("scheme must be http or https"));
        }
        if endpoint.host_str().is_none_or(str::is_empty) {
            return Err(invalid("missing host"));
        }
        let path = format!("{}{ACTIVITY_PATH}", endpoint.path().trim_end_matches('/'));
        endpoint.set_path(&path);
        endpoint.set_query(None);
        endpoint.set_fragment(None);

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(SyncError::ClientBuild)?;

        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Posts one task summary.
    pub async fn post_summary(&self, payload: &SyncPayload) -> Result<(), SyncError> {
        let response = self.http.post(&self.endpoint).json(payload).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::Status { status, body });
        }
        debug!(task = %payload.task_name, %status, "posted task summary");
        Ok(())
    }
}

/// Blocking [`SyncSink`] over [`Client`].
///
/// Owns a current-thread runtime, so it must not be used from inside another
/// tokio runtime.
pub struct HttpSink {
    client: Client,
    runtime: tokio::runtime::Runtime,
}

impl fmt::Debug for HttpSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpSink")
            .field("client", &self.client)
            .finish_non_exhaustive()
    }
}

impl HttpSink {
    pub fn new(client: Client) -> Result<Self, SyncError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(SyncError::Runtime)?;
        Ok(Self { client, runtime })
    }

    pub const fn client(&self) -> &Client {
        &self.client
    }
}

impl SyncSink for HttpSink {
    fn deliver(&self, payload: &SyncPayload) -> Result<(), SyncFailure> {
        self.runtime
            .block_on(self.client.post_summary(payload))
            .map_err(SyncFailure::new)
    }
}
