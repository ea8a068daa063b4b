//! Fetch command - load every tile covering an area over HTTP.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::runtime::{Handle, Runtime};
use tracing::{info, warn};

use tilepyramid::config::MapConfig;
use tilepyramid::coord::tile_range;
use tilepyramid::logging::{self, LoggingGuard, DEFAULT_LOG_FILE};
use tilepyramid::map::{MapObserver, MapStats, TileMap, Viewport};
use tilepyramid::tile::{
    RasterDecoder, RasterTile, Tile, TileDecoder, TileKind, VectorDecoder, VectorTile,
};

use super::common::ViewArgs;
use crate::error::CliError;

/// Arguments for the fetch command.
#[derive(Debug, Args)]
pub struct FetchArgs {
    #[command(flatten)]
    pub view: ViewArgs,

    /// Data source name (defaults to the configured source)
    #[arg(long)]
    pub source: Option<String>,

    /// Tile format: raster or vector
    #[arg(long, default_value = "raster")]
    pub format: TileKind,

    /// Access token substituted into the URL template
    #[arg(long)]
    pub token: Option<String>,

    /// Config file (defaults to ~/.tilepyramid/config.ini)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Also write logs to this directory
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Seconds to wait for all tiles (defaults to twice the HTTP timeout)
    #[arg(long)]
    pub wait: Option<u64>,

    /// Print one line per completed tile
    #[arg(long, short)]
    pub verbose: bool,
}

/// Run the fetch command.
pub fn run(args: FetchArgs) -> Result<(), CliError> {
    let _guard = init_logging(args.log_dir.as_deref())?;

    let mut config = match &args.config {
        Some(path) => MapConfig::load_from(path)?,
        None => MapConfig::load()?,
    };
    if let Some(token) = &args.token {
        config = config.with_access_token(token.as_str());
    }

    let viewport = args.view.viewport()?;
    let zoom = args.view.zoom.unwrap_or(config.zoom());
    let wait = args.wait.unwrap_or(config.timeout_secs() * 2);

    let runtime = Runtime::new().map_err(CliError::Runtime)?;
    let job = FetchJob {
        config: &config,
        viewport,
        zoom,
        source: args.source.as_deref(),
        wait: Duration::from_secs(wait),
        verbose: args.verbose,
    };

    let start = Instant::now();
    let stats = match args.format {
        TileKind::Raster => job.run(&runtime, RasterDecoder, describe_raster)?,
        TileKind::Vector => job.run(&runtime, VectorDecoder, describe_vector)?,
    };

    println!();
    println!("Fetched in {:.2}s: {}", start.elapsed().as_secs_f64(), stats);
    if stats.failed > 0 {
        warn!(failed = stats.failed, "some tiles failed");
    }
    Ok(())
}

fn init_logging(log_dir: Option<&std::path::Path>) -> Result<Option<LoggingGuard>, CliError> {
    match log_dir {
        Some(dir) => logging::init_logging(dir, DEFAULT_LOG_FILE)
            .map(Some)
            .map_err(CliError::LoggingInit),
        None => {
            logging::init_console_logging();
            Ok(None)
        }
    }
}

struct FetchJob<'a> {
    config: &'a MapConfig,
    viewport: Viewport,
    zoom: u8,
    source: Option<&'a str>,
    wait: Duration,
    verbose: bool,
}

impl FetchJob<'_> {
    fn run<D: TileDecoder>(
        &self,
        runtime: &Runtime,
        decoder: D,
        describe: fn(&D::Content) -> String,
    ) -> Result<MapStats, CliError> {
        let kind = decoder.kind();
        let total = tile_range(&self.viewport.bounds(), self.zoom).len();
        let resolver = self.config.tile_source(kind);

        println!("Fetching {} {} tile(s) at zoom {}", total, kind, self.zoom);
        println!("  Source: {}", resolver.source_name(self.source));
        info!(tiles = total, zoom = self.zoom, kind = %kind, "starting fetch");

        runtime.block_on(async {
            let provider = self
                .config
                .http_provider(Handle::current())
                .map_err(CliError::Provider)?;
            let mut map = TileMap::new(decoder, provider, resolver)
                .with_eviction(self.config.eviction_policy());

            let bar = progress_bar(total as u64);
            map.subscribe(Arc::new(ProgressObserver {
                bar: bar.clone(),
                describe,
                verbose: self.verbose,
            }));

            map.set_source(self.source);
            map.set_zoom(self.zoom);
            match self.viewport {
                Viewport::Bounds(bounds) => map.set_bounds(bounds),
                Viewport::Center(center) => map.set_center(center),
            }

            let settled = tokio::time::timeout(self.wait, map.settle()).await;
            bar.finish_and_clear();

            if settled.is_err() {
                return Err(CliError::Timeout {
                    seconds: self.wait.as_secs(),
                    pending: map.pending_count(),
                });
            }
            Ok(map.stats())
        })
    }
}

fn progress_bar(len: u64) -> ProgressBar {
    let bar = ProgressBar::new(len);
    if let Ok(style) =
        ProgressStyle::with_template("{spinner} {wide_bar} {pos:>6}/{len:6} {elapsed_precise}")
    {
        bar.set_style(style);
    }
    bar
}

/// Drives the progress bar from map events.
struct ProgressObserver<D: TileDecoder> {
    bar: ProgressBar,
    describe: fn(&D::Content) -> String,
    verbose: bool,
}

impl<D: TileDecoder> MapObserver<D> for ProgressObserver<D> {
    fn on_tile_completed(&self, tile: &Tile<D>) {
        self.bar.inc(1);
        match (tile.error(), tile.content()) {
            (Some(error), _) => {
                self.bar.println(format!("{}  failed: {}", tile.key(), error));
            }
            (None, Some(content)) if self.verbose => {
                self.bar
                    .println(format!("{}  {}", tile.key(), (self.describe)(content)));
            }
            _ => {}
        }
    }

    fn on_all_completed(&self) {
        info!("all tiles completed");
    }
}

fn describe_raster(tile: &RasterTile) -> String {
    let (width, height) = tile.size();
    format!("{}x{} px", width, height)
}

fn describe_vector(tile: &VectorTile) -> String {
    let names: Vec<&str> = tile.layer_names().collect();
    format!(
        "{} layer(s), {} feature(s): {}",
        tile.layers.len(),
        tile.feature_count(),
        names.join(", ")
    )
}
