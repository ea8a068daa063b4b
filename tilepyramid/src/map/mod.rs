//! Tile map orchestration
//!
//! [`TileMap`] keeps the set of held tiles equal to the tiles covering the
//! current view. Every view change (bounds, center, zoom, source) recomputes
//! the required tile range and diffs it against what is held: stale tiles
//! are cancelled, new ones are created and started, tiles present in both
//! are left alone.
//!
//! # Threading
//!
//! The map is driven through `&mut self` from one thread. Providers answer
//! from wherever they like; their callbacks only post to the map's
//! completion channel. The host pumps that channel with
//! [`TileMap::dispatch_completions`] (non-blocking, e.g. once per frame) or
//! [`TileMap::settle`] (async, until the current view is complete), and
//! observers are notified from inside those calls.
//!
//! # Example
//!
//! ```ignore
//! use tilepyramid::coord::GeoCoordinate;
//! use tilepyramid::map::TileMap;
//! use tilepyramid::provider::{HttpRequestProvider, UrlTemplateSource};
//! use tilepyramid::tile::RasterDecoder;
//!
//! let provider = HttpRequestProvider::new(runtime.handle().clone())?;
//! let mut map = TileMap::new(RasterDecoder, provider, UrlTemplateSource::mapbox_raster(token));
//!
//! map.set_center_zoom(GeoCoordinate::new(60.1632, 24.9377), 13);
//! map.settle().await;
//! ```

mod observer;
mod types;
mod viewport;

pub use observer::{MapObserver, SubscriptionId};
pub use types::{EvictionPolicy, MapStats};
pub use viewport::Viewport;

use std::collections::{BTreeSet, HashMap};
use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use tracing::{debug, trace, warn};

use crate::coord::{tile_range, GeoBounds, GeoCoordinate, MAX_ZOOM};
use crate::provider::{RequestProvider, TileSource};
use crate::tile::{
    completion_channel, normalize_source, Completion, CompletionReceiver, CompletionSender, Tile,
    TileDecoder, TileKey,
};
use observer::ObserverRegistry;

/// Tracks completion of the tile set produced by one view change.
#[derive(Debug, Clone, Copy, Default)]
struct Generation {
    id: u64,
    outstanding: usize,
    notified: bool,
}

/// Keeps the held tiles in step with the view and fans out completions.
pub struct TileMap<D: TileDecoder> {
    decoder: Arc<D>,
    provider: Arc<dyn RequestProvider>,
    resolver: Arc<dyn TileSource>,

    viewport: Option<Viewport>,
    zoom: u8,
    source: Option<String>,

    held: HashMap<TileKey, Tile<D>>,
    retained: Option<LruCache<TileKey, Tile<D>>>,
    generation: Generation,

    observers: ObserverRegistry<D>,
    completions_tx: CompletionSender,
    completions_rx: CompletionReceiver,
    stats: MapStats,
}

impl<D: TileDecoder> TileMap<D> {
    /// Create an empty map.
    ///
    /// No tiles are held until a viewport is set. Superseded tiles are
    /// discarded; see [`TileMap::with_eviction`].
    pub fn new(
        decoder: D,
        provider: impl RequestProvider + 'static,
        resolver: impl TileSource + 'static,
    ) -> Self {
        let (completions_tx, completions_rx) = completion_channel();
        Self {
            decoder: Arc::new(decoder),
            provider: Arc::new(provider),
            resolver: Arc::new(resolver),
            viewport: None,
            zoom: 0,
            source: None,
            held: HashMap::new(),
            retained: None,
            generation: Generation::default(),
            observers: ObserverRegistry::new(),
            completions_tx,
            completions_rx,
            stats: MapStats::default(),
        }
    }

    /// Set the policy for tiles that leave the view.
    pub fn with_eviction(mut self, policy: EvictionPolicy) -> Self {
        self.retained = match policy {
            EvictionPolicy::Discard => None,
            EvictionPolicy::RetainLoaded { capacity } => {
                NonZeroUsize::new(capacity).map(LruCache::new)
            }
        };
        self
    }

    // ----- view parameters -----

    /// Cover `bounds` at the current zoom.
    pub fn set_bounds(&mut self, bounds: GeoBounds) {
        self.update(Some(Viewport::Bounds(bounds)), self.zoom, None);
    }

    /// Cover the single tile containing `center` at the current zoom.
    pub fn set_center(&mut self, center: GeoCoordinate) {
        self.update(Some(Viewport::Center(center)), self.zoom, None);
    }

    /// Change the zoom level. Values above [`MAX_ZOOM`] are clamped.
    pub fn set_zoom(&mut self, zoom: u8) {
        let zoom = clamp_zoom(zoom);
        self.update(self.viewport, zoom, None);
    }

    /// Change center and zoom together with a single reconcile.
    pub fn set_center_zoom(&mut self, center: GeoCoordinate, zoom: u8) {
        let zoom = clamp_zoom(zoom);
        self.update(Some(Viewport::Center(center)), zoom, None);
    }

    /// Switch the data source. `None` or an empty name selects the
    /// resolver's default.
    pub fn set_source(&mut self, source: Option<&str>) {
        let source = normalize_source(source);
        if source == self.source.as_deref() {
            return;
        }
        self.update(self.viewport, self.zoom, Some(source.map(str::to_string)));
    }

    fn update(&mut self, viewport: Option<Viewport>, zoom: u8, source: Option<Option<String>>) {
        let source_changed = source.as_ref().is_some_and(|s| *s != self.source);
        if viewport == self.viewport && zoom == self.zoom && !source_changed {
            return;
        }
        self.viewport = viewport;
        self.zoom = zoom;
        if let Some(source) = source {
            self.source = source;
        }
        self.reconcile();
    }

    // ----- observers -----

    /// Register an observer for tile and aggregate completion events.
    pub fn subscribe(&mut self, observer: Arc<dyn MapObserver<D>>) -> SubscriptionId {
        self.observers.add(observer)
    }

    /// Remove an observer. Returns false if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.remove(id)
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    // ----- completions -----

    /// Handle every completion queued so far without waiting.
    ///
    /// Returns the number of completions accepted by held tiles.
    pub fn dispatch_completions(&mut self) -> usize {
        let mut accepted = 0;
        while let Some(completion) = self.completions_rx.try_next() {
            if self.handle_completion(completion) {
                accepted += 1;
            }
        }
        accepted
    }

    /// Wait until every tile of the current view is terminal.
    ///
    /// Returns immediately if nothing is outstanding. Waits indefinitely on
    /// a provider that never answers; wrap in a timeout where that matters.
    pub async fn settle(&mut self) {
        while !self.is_complete() {
            match self.completions_rx.next().await {
                Some(completion) => {
                    self.handle_completion(completion);
                }
                None => break,
            }
        }
    }

    fn handle_completion(&mut self, completion: Completion) -> bool {
        let Some(tile) = self.held.get_mut(completion.key()) else {
            trace!(tile = %completion.key(), "completion for a tile no longer held");
            return false;
        };
        if !tile.deliver(completion) {
            return false;
        }

        self.stats.completed += 1;
        if let Some(error) = tile.error() {
            self.stats.failed += 1;
            debug!(tile = %tile.key(), error = %error, "tile failed");
        } else {
            trace!(tile = %tile.key(), "tile loaded");
        }
        self.observers.tile_completed(tile);

        self.generation.outstanding = self.generation.outstanding.saturating_sub(1);
        if self.generation.outstanding == 0 {
            self.notify_all_completed();
        }
        true
    }

    fn notify_all_completed(&mut self) {
        if self.generation.notified || self.held.is_empty() {
            return;
        }
        self.generation.notified = true;
        debug!(
            generation = self.generation.id,
            tiles = self.held.len(),
            "all tiles completed"
        );
        self.observers.all_completed();
    }

    // ----- reconcile -----

    fn required_keys(&self) -> BTreeSet<TileKey> {
        let Some(viewport) = self.viewport else {
            return BTreeSet::new();
        };
        tile_range(&viewport.bounds(), self.zoom)
            .into_iter()
            .map(|id| TileKey::new(id, self.source.as_deref()))
            .collect()
    }

    fn reconcile(&mut self) {
        let required = self.required_keys();

        let stale: Vec<TileKey> = self
            .held
            .keys()
            .filter(|key| !required.contains(*key))
            .cloned()
            .collect();

        let mut cancelled = 0;
        let mut retained = 0;
        for key in &stale {
            let Some(mut tile) = self.held.remove(key) else {
                continue;
            };
            if tile.is_loaded() {
                if let Some(cache) = self.retained.as_mut() {
                    cache.put(key.clone(), tile);
                    retained += 1;
                    continue;
                }
            }
            if tile.cancel() {
                cancelled += 1;
            }
        }

        let mut started = 0;
        let mut restored = 0;
        for key in required {
            if self.held.contains_key(&key) {
                continue;
            }
            let tile = match self.retained.as_mut().and_then(|cache| cache.pop(&key)) {
                Some(tile) => {
                    restored += 1;
                    tile
                }
                None => {
                    let mut tile = Tile::from_key(key.clone(), Arc::clone(&self.decoder));
                    tile.start(
                        self.resolver.as_ref(),
                        self.provider.as_ref(),
                        &self.completions_tx,
                    );
                    started += 1;
                    tile
                }
            };
            self.held.insert(key, tile);
        }

        self.stats.cancelled += cancelled;
        self.stats.requested += started;
        self.stats.restored += restored;

        if stale.is_empty() && started == 0 && restored == 0 {
            trace!("view change left the tile set unchanged");
            return;
        }

        self.generation = Generation {
            id: self.generation.id + 1,
            outstanding: self.held.values().filter(|tile| tile.is_pending()).count(),
            notified: false,
        };
        self.stats.generations += 1;

        debug!(
            generation = self.generation.id,
            zoom = self.zoom,
            source = self.source.as_deref().unwrap_or("default"),
            held = self.held.len(),
            started,
            cancelled,
            retained,
            restored,
            "reconciled tile set"
        );

        if self.generation.outstanding == 0 {
            self.notify_all_completed();
        }
    }

    // ----- teardown -----

    /// Cancel every pending tile and release the map.
    pub fn dispose(mut self) {
        let cancelled = self.cancel_all();
        debug!(cancelled, "tile map disposed");
    }

    fn cancel_all(&mut self) -> u64 {
        let mut cancelled = 0;
        for (_, mut tile) in self.held.drain() {
            if tile.cancel() {
                cancelled += 1;
            }
        }
        if let Some(cache) = self.retained.as_mut() {
            cache.clear();
        }
        self.stats.cancelled += cancelled;
        cancelled
    }

    // ----- accessors -----

    /// Iterate over the held tiles, in no particular order.
    pub fn tiles(&self) -> impl Iterator<Item = &Tile<D>> {
        self.held.values()
    }

    /// Look up a held tile.
    pub fn tile(&self, key: &TileKey) -> Option<&Tile<D>> {
        self.held.get(key)
    }

    pub fn held_count(&self) -> usize {
        self.held.len()
    }

    /// Held tiles still waiting for the provider.
    pub fn pending_count(&self) -> usize {
        self.held.values().filter(|tile| tile.is_pending()).count()
    }

    /// Loaded tiles kept for restoration.
    pub fn retained_count(&self) -> usize {
        self.retained.as_ref().map_or(0, LruCache::len)
    }

    /// True when no tile of the current view is outstanding.
    pub fn is_complete(&self) -> bool {
        self.generation.outstanding == 0
    }

    /// Identifier of the current view generation. Increments whenever a
    /// view change alters the held set.
    pub fn generation(&self) -> u64 {
        self.generation.id
    }

    pub fn stats(&self) -> MapStats {
        self.stats
    }

    pub fn viewport(&self) -> Option<Viewport> {
        self.viewport
    }

    /// Geographic area currently covered, if a viewport is set.
    pub fn bounds(&self) -> Option<GeoBounds> {
        self.viewport.map(|viewport| viewport.bounds())
    }

    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    /// Current data source, `None` for the resolver's default.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }
}

impl<D: TileDecoder> Drop for TileMap<D> {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

fn clamp_zoom(zoom: u8) -> u8 {
    if zoom > MAX_ZOOM {
        warn!(zoom, max = MAX_ZOOM, "zoom level clamped");
        MAX_ZOOM
    } else {
        zoom
    }
}

#[cfg(test)]
mod tests;
