//! Provider types and traits

use bytes::Bytes;
use thiserror::Error;

/// Errors raised while setting up a provider.
///
/// Fetch failures are not reported through this type; they travel inside
/// [`Response::error`] to the tile that issued the request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    /// The HTTP client could not be built
    #[error("HTTP client error: {0}")]
    HttpClient(String),
}

/// Outcome of one asynchronous fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    /// Transport-level failure message, if the fetch failed.
    pub error: Option<String>,
    /// Payload bytes, if any were received.
    pub data: Option<Bytes>,
}

impl Response {
    /// A successful response carrying `data`.
    pub fn ok(data: impl Into<Bytes>) -> Self {
        Self {
            error: None,
            data: Some(data.into()),
        }
    }

    /// A failed response carrying a transport error message.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            data: None,
        }
    }

    /// True if the transport reported an error.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Callback invoked by a provider when a fetch finishes.
///
/// Providers call it at most once per request and may call it from any
/// thread.
pub type ResponseCallback = Box<dyn FnOnce(Response) + Send + 'static>;

/// Handle to an in-flight request.
pub trait CancellableRequest: Send {
    /// Ask the transport to abort the request.
    ///
    /// Must not block waiting for the abort to be acknowledged. Calling it
    /// more than once is harmless.
    fn cancel(&mut self);
}

/// Asynchronous transport used to fetch tile payloads.
///
/// Implementations start the fetch and return immediately. The callback
/// fires at most once and should not fire after [`CancellableRequest::cancel`]
/// has returned; tiles guard against late callbacks regardless.
pub trait RequestProvider: Send + Sync {
    /// Start fetching `url`, reporting the result through `on_done`.
    fn request(&self, url: &str, on_done: ResponseCallback) -> Box<dyn CancellableRequest>;
}
