//! CLI command implementations.
//!
//! - [`range`] - List the tiles covering an area
//! - [`fetch`] - Fetch and decode those tiles over HTTP

pub mod common;
pub mod fetch;
pub mod range;
