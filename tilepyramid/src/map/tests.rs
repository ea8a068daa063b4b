//! Tests for tile map reconciliation and completion dispatch.

use super::*;
use crate::coord::TileId;
use crate::provider::{QueuedRequestProvider, Response, UrlTemplateSource};
use crate::tile::{DecodeError, TileError, TileKind};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Decodes payloads as UTF-8 text. Empty payloads fail.
struct TextDecoder;

impl TileDecoder for TextDecoder {
    type Content = String;

    fn kind(&self) -> TileKind {
        TileKind::Raster
    }

    fn decode(&self, data: &[u8]) -> Result<String, DecodeError> {
        if data.is_empty() {
            return Err(DecodeError::new("empty payload"));
        }
        String::from_utf8(data.to_vec()).map_err(|_| DecodeError::new("not text"))
    }
}

#[derive(Default)]
struct Recorder {
    tiles: Mutex<Vec<(TileKey, Option<String>, Option<TileError>)>>,
    all: AtomicUsize,
}

impl Recorder {
    fn tile_count(&self) -> usize {
        self.tiles.lock().len()
    }

    fn all_count(&self) -> usize {
        self.all.load(Ordering::SeqCst)
    }

    fn contents(&self) -> Vec<String> {
        self.tiles
            .lock()
            .iter()
            .filter_map(|(_, content, _)| content.clone())
            .collect()
    }
}

impl MapObserver<TextDecoder> for Recorder {
    fn on_tile_completed(&self, tile: &Tile<TextDecoder>) {
        self.tiles.lock().push((
            tile.key().clone(),
            tile.content().cloned(),
            tile.error().cloned(),
        ));
    }

    fn on_all_completed(&self) {
        self.all.fetch_add(1, Ordering::SeqCst);
    }
}

struct Panicker;

impl MapObserver<TextDecoder> for Panicker {
    fn on_tile_completed(&self, _tile: &Tile<TextDecoder>) {
        panic!("observer failure");
    }
}

const HELSINKI: GeoCoordinate = GeoCoordinate {
    latitude: 60.1632,
    longitude: 24.9377,
};

fn new_map(provider: &QueuedRequestProvider) -> (TileMap<TextDecoder>, Arc<Recorder>) {
    let mut map = TileMap::new(
        TextDecoder,
        provider.clone(),
        UrlTemplateSource::new("https://t.test/{source}/{z}/{x}/{y}", "base"),
    );
    let recorder = Arc::new(Recorder::default());
    map.subscribe(recorder.clone());
    (map, recorder)
}

/// Echo the URL back as the payload.
fn echo(url: &str) -> Response {
    Response::ok(url.as_bytes().to_vec())
}

fn key(zoom: u8, col: u32, row: u32, source: Option<&str>) -> TileKey {
    TileKey::new(TileId::new(zoom, col, row).unwrap(), source)
}

#[test]
fn test_world_zoom_3_completes_64_tiles_once() {
    let provider = QueuedRequestProvider::new();
    let (mut map, recorder) = new_map(&provider);

    map.set_zoom(3);
    map.set_bounds(GeoBounds::world());
    assert_eq!(map.held_count(), 64);
    assert_eq!(provider.pending_count(), 64);

    provider.resolve_all(echo);
    assert_eq!(map.dispatch_completions(), 64);

    let distinct: HashSet<TileKey> = recorder
        .tiles
        .lock()
        .iter()
        .map(|(key, _, _)| key.clone())
        .collect();
    assert_eq!(distinct.len(), 64);
    assert_eq!(recorder.all_count(), 1);
    assert!(map.is_complete());
    assert_eq!(map.stats().succeeded(), 64);
}

#[test]
fn test_center_holds_single_tile() {
    let provider = QueuedRequestProvider::new();
    let (mut map, _recorder) = new_map(&provider);

    map.set_center_zoom(HELSINKI, 13);

    assert_eq!(map.held_count(), 1);
    assert_eq!(
        provider.requested_urls(),
        vec!["https://t.test/base/13/4663/2371".to_string()]
    );
    assert!(map.tile(&key(13, 4663, 2371, None)).is_some());
}

#[test]
fn test_setting_same_source_is_noop() {
    let provider = QueuedRequestProvider::new();
    let (mut map, _recorder) = new_map(&provider);
    map.set_center_zoom(HELSINKI, 13);
    let generation = map.generation();

    map.set_source(None);
    map.set_source(Some(""));
    map.set_center_zoom(HELSINKI, 13);

    assert_eq!(provider.requested_urls().len(), 1);
    assert!(provider.cancelled_urls().is_empty());
    assert_eq!(map.generation(), generation);
}

#[test]
fn test_source_switch_cancels_and_refetches() {
    let provider = QueuedRequestProvider::new();
    let (mut map, _recorder) = new_map(&provider);
    map.set_center_zoom(HELSINKI, 13);

    map.set_source(Some("terrain"));

    assert_eq!(
        provider.cancelled_urls(),
        vec!["https://t.test/base/13/4663/2371".to_string()]
    );
    assert_eq!(
        provider.pending_urls(),
        vec!["https://t.test/terrain/13/4663/2371".to_string()]
    );
    assert_eq!(map.source(), Some("terrain"));
    assert!(map.tile(&key(13, 4663, 2371, None)).is_none());
    assert!(map.tile(&key(13, 4663, 2371, Some("terrain"))).is_some());
    assert_eq!(map.stats().cancelled, 1);
}

#[test]
fn test_switching_back_refetches_when_discarding() {
    let provider = QueuedRequestProvider::new();
    let (mut map, _recorder) = new_map(&provider);
    map.set_center_zoom(HELSINKI, 13);
    provider.resolve_all(echo);
    map.dispatch_completions();

    map.set_source(Some("terrain"));
    provider.resolve_all(echo);
    map.dispatch_completions();
    map.set_source(None);

    assert_eq!(provider.requested_urls().len(), 3);
    assert_eq!(map.stats().restored, 0);
    assert_eq!(map.retained_count(), 0);
}

#[test]
fn test_switching_back_restores_when_retaining() {
    let provider = QueuedRequestProvider::new();
    let (map, recorder) = new_map(&provider);
    let mut map = map.with_eviction(EvictionPolicy::RetainLoaded { capacity: 16 });
    map.set_center_zoom(HELSINKI, 13);
    provider.resolve_all(echo);
    map.dispatch_completions();

    map.set_source(Some("terrain"));
    assert!(provider.cancelled_urls().is_empty());
    assert_eq!(map.retained_count(), 1);
    provider.resolve_all(echo);
    map.dispatch_completions();

    map.set_source(None);

    assert_eq!(provider.requested_urls().len(), 2);
    assert_eq!(map.stats().restored, 1);
    let restored = map.tile(&key(13, 4663, 2371, None)).unwrap();
    assert_eq!(
        restored.content().map(String::as_str),
        Some("https://t.test/base/13/4663/2371")
    );
    // Fully restored view completes during the reconcile itself.
    assert_eq!(recorder.all_count(), 3);
    assert!(map.is_complete());
}

#[test]
fn test_pending_tiles_are_cancelled_even_when_retaining() {
    let provider = QueuedRequestProvider::new();
    let (map, _recorder) = new_map(&provider);
    let mut map = map.with_eviction(EvictionPolicy::RetainLoaded { capacity: 16 });
    map.set_center_zoom(HELSINKI, 13);

    map.set_source(Some("terrain"));

    assert_eq!(provider.cancelled_urls().len(), 1);
    assert_eq!(map.retained_count(), 0);
}

#[test]
fn test_late_callback_after_cancel_is_not_delivered() {
    let provider = QueuedRequestProvider::ignoring_cancellation();
    let (mut map, recorder) = new_map(&provider);
    map.set_center_zoom(HELSINKI, 13);
    map.set_source(Some("terrain"));
    assert_eq!(provider.cancelled_but_queued(), 1);

    provider.resolve_all(echo);

    assert_eq!(map.dispatch_completions(), 1);
    assert_eq!(map.stats().completed, 1);
    assert_eq!(
        recorder.contents(),
        vec!["https://t.test/terrain/13/4663/2371".to_string()]
    );
    assert_eq!(recorder.all_count(), 1);
}

#[test]
fn test_superseded_generation_never_completes() {
    let provider = QueuedRequestProvider::ignoring_cancellation();
    let (mut map, recorder) = new_map(&provider);
    map.set_center_zoom(HELSINKI, 5);
    map.set_center_zoom(GeoCoordinate::new(-33.8688, 151.2093), 5);

    provider.resolve_all(echo);
    map.dispatch_completions();

    assert_eq!(recorder.tile_count(), 1);
    assert_eq!(recorder.all_count(), 1);
}

#[test]
fn test_overlapping_generation_counts_carried_tiles() {
    let provider = QueuedRequestProvider::new();
    let (mut map, recorder) = new_map(&provider);
    map.set_zoom(1);
    map.set_bounds(GeoBounds::world());
    assert!(provider.resolve_matching("/1/0/0", echo("/1/0/0")));
    map.dispatch_completions();

    // Western hemisphere: keeps 1/0/0 (loaded) and 1/0/1 (pending).
    map.set_bounds(GeoBounds::from_edges(-80.0, -170.0, 80.0, -10.0));
    assert_eq!(map.held_count(), 2);
    assert_eq!(map.pending_count(), 1);
    assert_eq!(provider.cancelled_urls().len(), 2);
    assert_eq!(recorder.all_count(), 0);

    provider.resolve_all(echo);
    map.dispatch_completions();

    assert_eq!(recorder.all_count(), 1);
    assert_eq!(map.stats().requested, 4);
}

#[test]
fn test_failed_tiles_count_as_terminal() {
    let provider = QueuedRequestProvider::new();
    let (mut map, recorder) = new_map(&provider);
    map.set_zoom(1);
    map.set_bounds(GeoBounds::world());

    provider.resolve_all(|url| {
        if url.ends_with("/1/0/0") {
            Response::failed("HTTP 404 Not Found")
        } else if url.ends_with("/1/1/1") {
            Response::ok(Vec::new())
        } else {
            echo(url)
        }
    });
    map.dispatch_completions();

    let stats = map.stats();
    assert_eq!(stats.completed, 4);
    assert_eq!(stats.failed, 2);
    assert_eq!(recorder.all_count(), 1);

    let transport = map.tile(&key(1, 0, 0, None)).unwrap();
    assert!(transport.is_loaded());
    assert!(transport.error().unwrap().is_transport());
    let decode = map.tile(&key(1, 1, 1, None)).unwrap();
    assert!(decode.error().unwrap().is_decode());
    assert!(map.tile(&key(1, 0, 1, None)).unwrap().error().is_none());
}

#[test]
fn test_tiles_reported_in_network_order() {
    let provider = QueuedRequestProvider::new();
    let (mut map, recorder) = new_map(&provider);
    map.set_zoom(1);
    map.set_bounds(GeoBounds::world());

    let mut expected = provider.requested_urls();
    expected.reverse();
    provider.resolve_all_reversed(echo);
    map.dispatch_completions();

    assert_eq!(recorder.contents(), expected);
}

#[test]
fn test_moving_within_a_tile_keeps_generation() {
    let provider = QueuedRequestProvider::new();
    let (mut map, _recorder) = new_map(&provider);
    map.set_center_zoom(HELSINKI, 13);
    let generation = map.generation();

    map.set_center(GeoCoordinate::new(60.1633, 24.9378));

    assert_eq!(map.generation(), generation);
    assert_eq!(provider.requested_urls().len(), 1);
}

#[test]
fn test_no_viewport_holds_nothing() {
    let provider = QueuedRequestProvider::new();
    let (mut map, recorder) = new_map(&provider);

    map.set_zoom(5);
    map.set_source(Some("terrain"));

    assert_eq!(map.held_count(), 0);
    assert_eq!(provider.pending_count(), 0);
    assert_eq!(map.generation(), 0);
    assert_eq!(recorder.all_count(), 0);
    assert!(map.bounds().is_none());
}

#[test]
fn test_zoom_is_clamped() {
    let provider = QueuedRequestProvider::new();
    let (mut map, _recorder) = new_map(&provider);
    map.set_zoom(30);
    assert_eq!(map.zoom(), MAX_ZOOM);
}

#[test]
fn test_panicking_observer_does_not_stop_dispatch() {
    let provider = QueuedRequestProvider::new();
    let mut map = TileMap::new(
        TextDecoder,
        provider.clone(),
        UrlTemplateSource::new("https://t.test/{source}/{z}/{x}/{y}", "base"),
    );
    let recorder = Arc::new(Recorder::default());
    map.subscribe(Arc::new(Panicker));
    map.subscribe(recorder.clone());

    map.set_center_zoom(HELSINKI, 13);
    provider.resolve_all(echo);
    map.dispatch_completions();

    assert_eq!(recorder.tile_count(), 1);
    assert_eq!(recorder.all_count(), 1);
}

#[test]
fn test_unsubscribed_observer_is_silent() {
    let provider = QueuedRequestProvider::new();
    let (mut map, recorder) = new_map(&provider);
    let other = Arc::new(Recorder::default());
    let id = map.subscribe(other.clone());
    assert_eq!(map.observer_count(), 2);

    assert!(map.unsubscribe(id));
    assert!(!map.unsubscribe(id));
    map.set_center_zoom(HELSINKI, 13);
    provider.resolve_all(echo);
    map.dispatch_completions();

    assert_eq!(other.tile_count(), 0);
    assert_eq!(recorder.tile_count(), 1);
}

#[test]
fn test_dispose_cancels_pending_tiles() {
    let provider = QueuedRequestProvider::new();
    let (mut map, _recorder) = new_map(&provider);
    map.set_zoom(2);
    map.set_bounds(GeoBounds::world());
    assert_eq!(provider.pending_count(), 16);

    map.dispose();

    assert_eq!(provider.pending_count(), 0);
    assert_eq!(provider.cancelled_urls().len(), 16);
}

#[test]
fn test_drop_cancels_pending_tiles() {
    let provider = QueuedRequestProvider::new();
    let (mut map, _recorder) = new_map(&provider);
    map.set_center_zoom(HELSINKI, 13);

    drop(map);

    assert_eq!(provider.cancelled_urls().len(), 1);
}

#[tokio::test]
async fn test_settle_waits_for_outstanding_tiles() {
    let provider = QueuedRequestProvider::new();
    let (mut map, recorder) = new_map(&provider);
    map.set_zoom(1);
    map.set_bounds(GeoBounds::world());

    let responder = provider.clone();
    tokio::spawn(async move {
        tokio::task::yield_now().await;
        responder.resolve_all(echo);
    });
    map.settle().await;

    assert!(map.is_complete());
    assert_eq!(map.stats().completed, 4);
    assert_eq!(recorder.all_count(), 1);
}

#[tokio::test]
async fn test_settle_returns_when_nothing_outstanding() {
    let provider = QueuedRequestProvider::new();
    let (mut map, _recorder) = new_map(&provider);
    map.settle().await;
    assert!(map.is_complete());
}
