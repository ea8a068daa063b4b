//! Completion notifications.
//!
//! Observers are held in registration order and called synchronously on the
//! map's thread while completions are dispatched. A panicking observer is
//! logged and skipped; it never stops delivery to the others.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tracing::warn;

use crate::tile::{Tile, TileDecoder};

/// Receives tile completion events from a [`TileMap`](super::TileMap).
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; hosts usually share state with an
/// observer through atomics or a mutex.
pub trait MapObserver<D: TileDecoder>: Send + Sync {
    /// A tile finished loading, successfully or with an error.
    ///
    /// Called once per delivered completion, in network order.
    fn on_tile_completed(&self, tile: &Tile<D>);

    /// Every tile of the current view is terminal.
    ///
    /// Called at most once per view change.
    fn on_all_completed(&self) {}
}

/// Handle returned by [`TileMap::subscribe`](super::TileMap::subscribe).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

pub(crate) struct ObserverRegistry<D: TileDecoder> {
    next_id: u64,
    observers: Vec<(SubscriptionId, Arc<dyn MapObserver<D>>)>,
}

impl<D: TileDecoder> ObserverRegistry<D> {
    pub(crate) fn new() -> Self {
        Self {
            next_id: 0,
            observers: Vec::new(),
        }
    }

    pub(crate) fn add(&mut self, observer: Arc<dyn MapObserver<D>>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.observers.push((id, observer));
        id
    }

    pub(crate) fn remove(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(sub, _)| *sub != id);
        self.observers.len() != before
    }

    pub(crate) fn len(&self) -> usize {
        self.observers.len()
    }

    pub(crate) fn tile_completed(&self, tile: &Tile<D>) {
        for (id, observer) in &self.observers {
            let result = catch_unwind(AssertUnwindSafe(|| observer.on_tile_completed(tile)));
            if result.is_err() {
                warn!(subscription = %id, tile = %tile.key(), "observer panicked on tile completion");
            }
        }
    }

    pub(crate) fn all_completed(&self) {
        for (id, observer) in &self.observers {
            let result = catch_unwind(AssertUnwindSafe(|| observer.on_all_completed()));
            if result.is_err() {
                warn!(subscription = %id, "observer panicked on aggregate completion");
            }
        }
    }
}
