//! Streaming: ground tiles around a moving viewpoint.
//!
//! # Invariants
//! - At most one tile per key; a tile is active only once its current-generation load has been applied.
//! - An active tile owns exactly the scene resources created for it, and unloading disposes exactly those.
//! - After an update, no active tile centre lies beyond twice the load distance from the viewer.
//! - A load whose generation is no longer pending never touches the scene.

mod budget;
mod buildings;
mod cities;
mod grid;
mod streamer;

pub use budget::{FrameTimer, StreamConfig, StreamStats};
pub use buildings::{BuildingSpec, MIN_DENSITY, density_factor, generate_field, tile_seed};
pub use cities::{AnchorCity, default_cities, nearest_city};
pub use grid::TileKey;
pub use streamer::{Tile, TileError, TileStreamer};

pub fn crate_info() -> &'static str {
    "geoworld-stream v0.1.0"
}
