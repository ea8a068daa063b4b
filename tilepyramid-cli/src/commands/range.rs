//! Range command - list the tiles covering an area without fetching them.

use clap::Args;
use tilepyramid::config::DEFAULT_ZOOM;
use tilepyramid::coord::{tile_range, TileId};

use super::common::ViewArgs;
use crate::error::CliError;

/// Arguments for the range command.
#[derive(Debug, Args)]
pub struct RangeArgs {
    #[command(flatten)]
    pub view: ViewArgs,

    /// Print the tiles as a JSON array
    #[arg(long)]
    pub json: bool,
}

/// Run the range command.
pub fn run(args: RangeArgs) -> Result<(), CliError> {
    let viewport = args.view.viewport()?;
    let zoom = args.view.zoom.unwrap_or(DEFAULT_ZOOM);
    let tiles: Vec<TileId> = tile_range(&viewport.bounds(), zoom).into_iter().collect();

    if args.json {
        let json = serde_json::to_string_pretty(&tiles).map_err(CliError::Output)?;
        println!("{}", json);
    } else {
        for tile in &tiles {
            println!("{}", tile);
        }
        eprintln!("{} tile(s) at zoom {}", tiles.len(), zoom);
    }

    Ok(())
}
