//! Fetch lifecycle of a single tile.
//!
//! A [`Tile`] issues one provider request per [`Tile::start`], and accepts
//! exactly one matching [`Completion`] for it. Provider callbacks never touch
//! the tile directly: they post a `Completion` to a [`CompletionSender`], and
//! the owner of the tile hands it back through [`Tile::deliver`] on its own
//! thread. Each request carries a [`RequestTicket`]; completions whose ticket
//! is not the tile's live one are ignored, which keeps late callbacks from
//! cancelled requests out even when the transport ignores cancellation.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::trace;

use super::decoder::{TileDecoder, TileKind};
use super::error::TileError;
use crate::coord::TileId;
use crate::provider::{CancellableRequest, RequestProvider, Response, TileSource};

static NEXT_TICKET: AtomicU64 = AtomicU64::new(1);

/// Validity token for one started request. Unique per process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestTicket(u64);

impl RequestTicket {
    fn next() -> Self {
        Self(NEXT_TICKET.fetch_add(1, Ordering::Relaxed))
    }
}

/// Identity of a tile under a data source.
///
/// Two tiles with the same [`TileId`] fetched from different sources are
/// different tiles. An empty source name is the same as `None`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileKey {
    id: TileId,
    source: Option<String>,
}

impl TileKey {
    pub fn new(id: TileId, source: Option<&str>) -> Self {
        Self {
            id,
            source: normalize_source(source).map(str::to_string),
        }
    }

    pub fn id(&self) -> TileId {
        self.id
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "{}@{}", self.id, source),
            None => write!(f, "{}@default", self.id),
        }
    }
}

/// Treat empty source names as "use the default".
pub(crate) fn normalize_source(source: Option<&str>) -> Option<&str> {
    source.filter(|name| !name.is_empty())
}

/// A provider response routed back to the tile that requested it.
#[derive(Debug)]
pub struct Completion {
    key: TileKey,
    ticket: RequestTicket,
    response: Response,
}

impl Completion {
    pub fn key(&self) -> &TileKey {
        &self.key
    }

    pub fn ticket(&self) -> RequestTicket {
        self.ticket
    }

    pub fn response(&self) -> &Response {
        &self.response
    }
}

/// Sending half of a completion channel. Cheap to clone, usable from any
/// thread.
#[derive(Debug, Clone)]
pub struct CompletionSender {
    tx: mpsc::UnboundedSender<Completion>,
}

impl CompletionSender {
    fn send(&self, completion: Completion) {
        // The receiver is gone only when the owner was dropped, and then
        // nobody is waiting for this tile.
        if self.tx.send(completion).is_err() {
            trace!("completion dropped, receiver closed");
        }
    }
}

/// Receiving half of a completion channel, owned by the tiles' owner.
#[derive(Debug)]
pub struct CompletionReceiver {
    rx: mpsc::UnboundedReceiver<Completion>,
}

impl CompletionReceiver {
    /// Take the next queued completion without waiting.
    pub fn try_next(&mut self) -> Option<Completion> {
        self.rx.try_recv().ok()
    }

    /// Wait for the next completion.
    pub async fn next(&mut self) -> Option<Completion> {
        self.rx.recv().await
    }
}

/// Create a linked sender/receiver pair.
pub fn completion_channel() -> (CompletionSender, CompletionReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (CompletionSender { tx }, CompletionReceiver { rx })
}

/// Lifecycle state of a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileState {
    /// Constructed, no request issued yet.
    Created,
    /// Waiting for the provider.
    Requesting,
    /// Finished, successfully or with an error.
    Loaded,
    /// Request abandoned before it completed.
    Cancelled,
}

/// One map tile and its fetch.
pub struct Tile<D: TileDecoder> {
    key: TileKey,
    decoder: Arc<D>,
    state: TileState,
    content: Option<D::Content>,
    error: Option<TileError>,
    request: Option<Box<dyn CancellableRequest>>,
    ticket: Option<RequestTicket>,
}

impl<D: TileDecoder> Tile<D> {
    /// Create a tile for `id` under `source`, decoded by `decoder`.
    pub fn new(id: TileId, source: Option<&str>, decoder: Arc<D>) -> Self {
        Self::from_key(TileKey::new(id, source), decoder)
    }

    pub(crate) fn from_key(key: TileKey, decoder: Arc<D>) -> Self {
        Self {
            key,
            decoder,
            state: TileState::Created,
            content: None,
            error: None,
            request: None,
            ticket: None,
        }
    }

    pub fn id(&self) -> TileId {
        self.key.id
    }

    pub fn source(&self) -> Option<&str> {
        self.key.source()
    }

    pub fn key(&self) -> &TileKey {
        &self.key
    }

    pub fn kind(&self) -> TileKind {
        self.decoder.kind()
    }

    pub fn state(&self) -> TileState {
        self.state
    }

    /// True once the fetch finished, whether or not it succeeded.
    pub fn is_loaded(&self) -> bool {
        self.state == TileState::Loaded
    }

    pub fn is_pending(&self) -> bool {
        self.state == TileState::Requesting
    }

    /// The recorded failure, if the fetch or decode failed.
    pub fn error(&self) -> Option<&TileError> {
        self.error.as_ref()
    }

    /// The decoded payload, if the tile loaded successfully.
    pub fn content(&self) -> Option<&D::Content> {
        self.content.as_ref()
    }

    /// Start fetching this tile.
    ///
    /// Any pending request is cancelled first, and previous results are
    /// cleared. The URL comes from `resolver`; the provider's response is
    /// posted to `on_complete` and must be handed back via [`Tile::deliver`].
    pub fn start(
        &mut self,
        resolver: &dyn TileSource,
        provider: &dyn RequestProvider,
        on_complete: &CompletionSender,
    ) {
        self.abort_request();
        self.error = None;
        self.content = None;

        let ticket = RequestTicket::next();
        let url = resolver.resolve_url(self.key.id, self.key.source());
        trace!(tile = %self.key, url = %url, "starting tile request");

        self.ticket = Some(ticket);
        self.state = TileState::Requesting;

        let sender = on_complete.clone();
        let key = self.key.clone();
        let handle = provider.request(
            &url,
            Box::new(move |response| {
                sender.send(Completion {
                    key,
                    ticket,
                    response,
                })
            }),
        );
        self.request = Some(handle);
    }

    /// Cancel the pending request, if any.
    ///
    /// Returns true if a request was actually cancelled. Calling this on a
    /// loaded or already cancelled tile does nothing.
    pub fn cancel(&mut self) -> bool {
        match self.state {
            TileState::Requesting => {
                self.abort_request();
                self.state = TileState::Cancelled;
                trace!(tile = %self.key, "tile request cancelled");
                true
            }
            TileState::Created => {
                self.state = TileState::Cancelled;
                false
            }
            TileState::Loaded | TileState::Cancelled => false,
        }
    }

    /// Hand a provider response back to the tile.
    ///
    /// Returns true exactly once per started request: when `completion`
    /// belongs to the live request. The tile is then loaded, with its error
    /// set on transport or decode failure. Completions for other tiles,
    /// superseded requests, or after cancellation return false and change
    /// nothing.
    pub fn deliver(&mut self, completion: Completion) -> bool {
        if self.state != TileState::Requesting
            || completion.key != self.key
            || self.ticket != Some(completion.ticket)
        {
            trace!(tile = %completion.key, "ignoring stale completion");
            return false;
        }

        self.request = None;
        self.ticket = None;

        let Completion { response, .. } = completion;
        self.error = match response.error {
            Some(message) => Some(TileError::Transport(message)),
            None => {
                let data = response.data.unwrap_or_default();
                match self.decoder.decode(&data) {
                    Ok(content) => {
                        self.content = Some(content);
                        None
                    }
                    Err(e) => Some(TileError::Decode(e)),
                }
            }
        };
        self.state = TileState::Loaded;
        true
    }

    fn abort_request(&mut self) {
        if let Some(mut request) = self.request.take() {
            request.cancel();
        }
        self.ticket = None;
    }
}

impl<D: TileDecoder> Drop for Tile<D> {
    fn drop(&mut self) {
        self.abort_request();
    }
}

impl<D: TileDecoder> fmt::Debug for Tile<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tile")
            .field("key", &self.key)
            .field("state", &self.state)
            .field("error", &self.error)
            .finish()
    }
}
