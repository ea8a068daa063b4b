//! Tilepyramid - Web Mercator tile pyramid orchestration
//!
//! This library keeps a set of map tiles in step with a moving view: it maps
//! a bounding box or center point and a zoom level to tile ids, fetches each
//! tile through a pluggable asynchronous transport, cancels tiles that leave
//! the view, and reports completions to observers.
//!
//! # Modules
//!
//! - [`coord`]: Web Mercator tile math and tile ranges
//! - [`provider`]: transport trait, HTTP and queued providers, URL templates
//! - [`tile`]: per-tile fetch lifecycle and payload decoders
//! - [`map`]: the [`TileMap`](map::TileMap) orchestrator and its observers
//! - [`config`]: INI-backed settings
//! - [`logging`]: tracing subscriber setup

pub mod config;
pub mod coord;
pub mod logging;
pub mod map;
pub mod provider;
pub mod tile;
