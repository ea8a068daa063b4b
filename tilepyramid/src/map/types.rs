//! Map policy and statistics types.

use std::fmt;

/// What happens to tiles that leave the view.
///
/// Pending tiles are always cancelled when superseded. The policy only
/// decides whether *loaded* tiles are kept around for a later view that
/// needs them again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvictionPolicy {
    /// Drop superseded tiles immediately.
    #[default]
    Discard,
    /// Keep up to `capacity` loaded tiles in a least-recently-used cache and
    /// restore them without refetching. A capacity of zero behaves like
    /// [`EvictionPolicy::Discard`].
    RetainLoaded { capacity: usize },
}

impl EvictionPolicy {
    /// Retention policy from a tile count, zero meaning discard.
    pub fn from_capacity(capacity: usize) -> Self {
        if capacity == 0 {
            EvictionPolicy::Discard
        } else {
            EvictionPolicy::RetainLoaded { capacity }
        }
    }
}

/// Running counters for a [`TileMap`](super::TileMap).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MapStats {
    /// Requests issued to the provider.
    pub requested: u64,
    /// Completions accepted, successful or not.
    pub completed: u64,
    /// Accepted completions that carried an error.
    pub failed: u64,
    /// Pending requests abandoned because their tile left the view.
    pub cancelled: u64,
    /// Tiles brought back from retention instead of refetched.
    pub restored: u64,
    /// View changes that altered the held tile set.
    pub generations: u64,
}

impl MapStats {
    /// Accepted completions without an error.
    pub fn succeeded(&self) -> u64 {
        self.completed - self.failed
    }
}

impl fmt::Display for MapStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} requested, {} completed ({} failed), {} cancelled, {} restored",
            self.requested, self.completed, self.failed, self.cancelled, self.restored
        )
    }
}
