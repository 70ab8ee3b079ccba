use std::fmt;

use geoworld_common::WorldPoint;
use serde::{Deserialize, Serialize};

/// Integer tile coordinate on the ground plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileKey {
    pub x: i32,
    pub z: i32,
}

impl TileKey {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Tile whose centre is nearest to `(x, z)`. Tiles are centred on multiples of `tile_size`.
    pub fn containing(x: f32, z: f32, tile_size: f32) -> Self {
        Self {
            x: (x / tile_size).round() as i32,
            z: (z / tile_size).round() as i32,
        }
    }

    pub fn center(self, tile_size: f32) -> WorldPoint {
        WorldPoint::new(self.x as f32 * tile_size, self.z as f32 * tile_size)
    }

    /// The `(2r+1)²` keys around `self`, row by row.
    pub fn neighborhood(self, radius: i32) -> impl Iterator<Item = TileKey> {
        let r = radius.max(0);
        (-r..=r).flat_map(move |dz| (-r..=r).map(move |dx| TileKey::new(self.x + dx, self.z + dz)))
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}
