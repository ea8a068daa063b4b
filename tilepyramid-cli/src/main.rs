//! Tilepyramid CLI - Command-line interface
//!
//! Lists and fetches the Web Mercator tiles covering an area, using the
//! tilepyramid library.

mod commands;
mod error;

use clap::{Parser, Subcommand};

use commands::fetch::FetchArgs;
use commands::range::RangeArgs;
use error::CliError;

#[derive(Parser)]
#[command(name = "tilepyramid")]
#[command(version, about = "Compute and fetch map tiles for a viewport", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the tiles covering an area (no network access)
    Range(RangeArgs),
    /// Fetch and decode the tiles covering an area
    Fetch(FetchArgs),
}

fn main() {
    let cli = Cli::parse();

    let result: Result<(), CliError> = match cli.command {
        Commands::Range(args) => commands::range::run(args),
        Commands::Fetch(args) => commands::fetch::run(args),
    };

    if let Err(e) = result {
        e.exit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_fetch_arguments() {
        let cli = Cli::try_parse_from([
            "tilepyramid",
            "fetch",
            "--center",
            "60.1632,24.9377",
            "--zoom",
            "13",
            "--format",
            "vector",
            "--source",
            "mapbox.terrain-rgb",
        ])
        .unwrap();

        let Commands::Fetch(args) = cli.command else {
            panic!("expected fetch");
        };
        assert_eq!(args.view.zoom, Some(13));
        assert_eq!(args.format, tilepyramid::tile::TileKind::Vector);
        assert_eq!(args.source.as_deref(), Some("mapbox.terrain-rgb"));
    }

    #[test]
    fn test_negative_bounds_are_accepted() {
        let cli = Cli::try_parse_from([
            "tilepyramid",
            "range",
            "--bounds",
            "-10,-20,10,20",
            "-z",
            "4",
            "--json",
        ])
        .unwrap();

        let Commands::Range(args) = cli.command else {
            panic!("expected range");
        };
        assert!(args.json);
        assert_eq!(args.view.bounds.map(|b| b.west()), Some(-20.0));
    }

    #[test]
    fn test_bounds_and_center_conflict() {
        let result = Cli::try_parse_from([
            "tilepyramid",
            "range",
            "--bounds",
            "0,0,1,1",
            "--center",
            "0,0",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_zoom_out_of_range_rejected() {
        let result = Cli::try_parse_from(["tilepyramid", "range", "--center", "0,0", "-z", "23"]);
        assert!(result.is_err());
    }
}
