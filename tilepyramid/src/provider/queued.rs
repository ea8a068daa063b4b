//! Manually driven request provider.
//!
//! [`QueuedRequestProvider`] records every request and holds its callback
//! until the host resolves it. Hosts use it to replay responses
//! deterministically; tests use it to control completion order.

use std::sync::Arc;

use parking_lot::Mutex;

use super::types::{CancellableRequest, RequestProvider, Response, ResponseCallback};

/// A provider whose requests complete only when resolved explicitly.
///
/// Clones share the same queue.
#[derive(Clone, Default)]
pub struct QueuedRequestProvider {
    state: Arc<Mutex<QueueState>>,
}

#[derive(Default)]
struct QueueState {
    next_id: u64,
    pending: Vec<PendingRequest>,
    requested: Vec<String>,
    cancelled: Vec<String>,
    deliver_after_cancel: bool,
}

struct PendingRequest {
    id: u64,
    url: String,
    on_done: ResponseCallback,
    cancelled: bool,
}

impl QueuedRequestProvider {
    /// Creates an empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a provider that keeps cancelled requests queued and still
    /// delivers them when resolved, like a transport that ignores aborts.
    pub fn ignoring_cancellation() -> Self {
        let provider = Self::default();
        provider.state.lock().deliver_after_cancel = true;
        provider
    }

    /// URLs of requests that are waiting to be resolved.
    pub fn pending_urls(&self) -> Vec<String> {
        self.state
            .lock()
            .pending
            .iter()
            .map(|request| request.url.clone())
            .collect()
    }

    /// Number of requests waiting to be resolved.
    pub fn pending_count(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Every URL ever requested, in request order.
    pub fn requested_urls(&self) -> Vec<String> {
        self.state.lock().requested.clone()
    }

    /// URLs of requests that were cancelled, in cancellation order.
    pub fn cancelled_urls(&self) -> Vec<String> {
        self.state.lock().cancelled.clone()
    }

    /// Resolve every pending request using `respond`, in request order.
    ///
    /// Returns the number of callbacks invoked. Callbacks run without the
    /// queue lock held, so they may issue new requests.
    pub fn resolve_all<F>(&self, mut respond: F) -> usize
    where
        F: FnMut(&str) -> Response,
    {
        let drained = std::mem::take(&mut self.state.lock().pending);
        let count = drained.len();
        for request in drained {
            let response = respond(&request.url);
            (request.on_done)(response);
        }
        count
    }

    /// Resolve the oldest pending request whose URL contains `pattern`.
    ///
    /// Returns false if no pending request matched.
    pub fn resolve_matching(&self, pattern: &str, response: Response) -> bool {
        let request = {
            let mut state = self.state.lock();
            match state.pending.iter().position(|r| r.url.contains(pattern)) {
                Some(index) => state.pending.remove(index),
                None => return false,
            }
        };
        (request.on_done)(response);
        true
    }

    /// Resolve pending requests in reverse request order.
    pub fn resolve_all_reversed<F>(&self, mut respond: F) -> usize
    where
        F: FnMut(&str) -> Response,
    {
        let mut drained = std::mem::take(&mut self.state.lock().pending);
        drained.reverse();
        let count = drained.len();
        for request in drained {
            let response = respond(&request.url);
            (request.on_done)(response);
        }
        count
    }

    /// Number of pending requests that were cancelled but are still queued.
    ///
    /// Always zero unless built with [`Self::ignoring_cancellation`].
    pub fn cancelled_but_queued(&self) -> usize {
        self.state
            .lock()
            .pending
            .iter()
            .filter(|request| request.cancelled)
            .count()
    }

    fn cancel(&self, id: u64) {
        let mut state = self.state.lock();
        let Some(index) = state.pending.iter().position(|r| r.id == id) else {
            return;
        };
        if state.pending[index].cancelled {
            return;
        }

        let url = state.pending[index].url.clone();
        state.cancelled.push(url);
        if state.deliver_after_cancel {
            state.pending[index].cancelled = true;
        } else {
            state.pending.remove(index);
        }
    }
}

impl RequestProvider for QueuedRequestProvider {
    fn request(&self, url: &str, on_done: ResponseCallback) -> Box<dyn CancellableRequest> {
        let mut state = self.state.lock();
        let id = state.next_id;
        state.next_id += 1;
        state.requested.push(url.to_string());
        state.pending.push(PendingRequest {
            id,
            url: url.to_string(),
            on_done,
            cancelled: false,
        });

        Box::new(QueuedRequestHandle {
            id,
            provider: self.clone(),
        })
    }
}

struct QueuedRequestHandle {
    id: u64,
    provider: QueuedRequestProvider,
}

impl CancellableRequest for QueuedRequestHandle {
    fn cancel(&mut self) {
        self.provider.cancel(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_callback(counter: &Arc<AtomicUsize>) -> ResponseCallback {
        let counter = Arc::clone(counter);
        Box::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_requests_wait_until_resolved() {
        let provider = QueuedRequestProvider::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let _a = provider.request("https://t/1", counting_callback(&calls));
        let _b = provider.request("https://t/2", counting_callback(&calls));

        assert_eq!(provider.pending_count(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        assert_eq!(provider.resolve_all(|_| Response::ok(vec![1])), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(provider.pending_count(), 0);
    }

    #[test]
    fn test_cancel_removes_request() {
        let provider = QueuedRequestProvider::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handle = provider.request("https://t/1", counting_callback(&calls));
        handle.cancel();
        handle.cancel();

        assert_eq!(provider.resolve_all(|_| Response::ok(vec![1])), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(provider.cancelled_urls(), vec!["https://t/1".to_string()]);
    }

    #[test]
    fn test_ignoring_cancellation_still_delivers() {
        let provider = QueuedRequestProvider::ignoring_cancellation();
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handle = provider.request("https://t/1", counting_callback(&calls));
        handle.cancel();

        assert_eq!(provider.cancelled_but_queued(), 1);
        provider.resolve_all(|_| Response::ok(vec![1]));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_resolve_matching() {
        let provider = QueuedRequestProvider::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let _a = provider.request("https://t/a", counting_callback(&calls));
        let _b = provider.request("https://t/b", counting_callback(&calls));

        assert!(provider.resolve_matching("/b", Response::failed("boom")));
        assert!(!provider.resolve_matching("/c", Response::failed("boom")));
        assert_eq!(provider.pending_urls(), vec!["https://t/a".to_string()]);
        assert_eq!(provider.requested_urls().len(), 2);
    }
}
