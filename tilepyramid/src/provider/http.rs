//! HTTP request provider backed by reqwest.

use std::time::Duration;

use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use super::types::{CancellableRequest, ProviderError, RequestProvider, Response, ResponseCallback};

/// Default user agent sent with tile requests.
pub const DEFAULT_USER_AGENT: &str = concat!("tilepyramid/", env!("CARGO_PKG_VERSION"));

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Fetches tiles over HTTP on a tokio runtime.
///
/// Each request runs as its own task on the supplied runtime handle and
/// races a cancellation token, so cancelling never waits for the network.
#[derive(Clone)]
pub struct HttpRequestProvider {
    client: reqwest::Client,
    runtime: Handle,
}

impl HttpRequestProvider {
    /// Creates a provider with the default timeout and user agent.
    pub fn new(runtime: Handle) -> Result<Self, ProviderError> {
        Self::with_settings(runtime, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT)
    }

    /// Creates a provider with a custom timeout and user agent.
    pub fn with_settings(
        runtime: Handle,
        timeout_secs: u64,
        user_agent: &str,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(user_agent)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_nodelay(true)
            .build()
            .map_err(|e| {
                ProviderError::HttpClient(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { client, runtime })
    }
}

impl RequestProvider for HttpRequestProvider {
    fn request(&self, url: &str, on_done: ResponseCallback) -> Box<dyn CancellableRequest> {
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let client = self.client.clone();
        let url = url.to_string();

        self.runtime.spawn(async move {
            tokio::select! {
                biased;
                _ = cancelled.cancelled() => {
                    trace!(url = %url, "HTTP request cancelled");
                }
                response = fetch(&client, &url) => {
                    if !cancelled.is_cancelled() {
                        on_done(response);
                    }
                }
            }
        });

        Box::new(HttpRequestHandle { token })
    }
}

async fn fetch(client: &reqwest::Client, url: &str) -> Response {
    trace!(url = url, "HTTP GET request starting");

    let response = match client.get(url).send().await {
        Ok(response) => response,
        Err(e) => return Response::failed(format!("Request failed: {}", e)),
    };

    let status = response.status();
    if !status.is_success() {
        return Response::failed(format!("HTTP {} from {}", status, url));
    }

    match response.bytes().await {
        Ok(body) => {
            trace!(url = url, bytes = body.len(), "HTTP GET request complete");
            Response::ok(body)
        }
        Err(e) => Response::failed(format!("Failed to read response: {}", e)),
    }
}

/// Cancellation handle for an [`HttpRequestProvider`] request.
///
/// Dropping the handle cancels the request as well.
struct HttpRequestHandle {
    token: CancellationToken,
}

impl CancellableRequest for HttpRequestHandle {
    fn cancel(&mut self) {
        self.token.cancel();
    }
}

impl Drop for HttpRequestHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
