//! Procedural building fields for ground tiles.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::grid::TileKey;

/// Density never drops below this, so outskirts still get a few buildings.
pub const MIN_DENSITY: f32 = 0.2;

/// Chance that a buildable block gets a building at full density.
const BASE_OCCUPANCY: f32 = 0.65;
/// Every third block row/column is left empty as a road.
const ROAD_EVERY: u32 = 3;

/// One box building, positioned relative to its tile centre.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BuildingSpec {
    pub x: f32,
    pub z: f32,
    pub width: f32,
    pub depth: f32,
    pub height: f32,
    pub yaw: f32,
    pub color: u32,
}

/// Urban density for a point `distance_m` from the city centre: 1 at the centre,
/// falling linearly to [`MIN_DENSITY`] at `falloff_m`.
pub fn density_factor(distance_m: f64, falloff_m: f64) -> f32 {
    if falloff_m <= 0.0 || !distance_m.is_finite() {
        return MIN_DENSITY;
    }
    let d = 1.0 - (distance_m / falloff_m) as f32;
    d.clamp(MIN_DENSITY, 1.0)
}

/// Deterministic per-tile seed.
pub fn tile_seed(seed: u64, key: TileKey) -> u64 {
    let packed = ((key.x as u32 as u64) << 32) | key.z as u32 as u64;
    seed ^ packed.wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

/// Buildings for one tile on a `blocks`×`blocks` block grid.
///
/// Same inputs always give the same field. Count and height both scale with `density`.
pub fn generate_field(
    key: TileKey,
    tile_size: f32,
    blocks: u32,
    density: f32,
    seed: u64,
) -> Vec<BuildingSpec> {
    let blocks = blocks.max(1);
    let density = density.clamp(MIN_DENSITY, 1.0);
    let block = tile_size / blocks as f32;
    let half = tile_size * 0.5;
    let mut rng = StdRng::seed_from_u64(tile_seed(seed, key));
    let mut out = Vec::new();

    for ix in 0..blocks {
        for iz in 0..blocks {
            if ix % ROAD_EVERY == 0 || iz % ROAD_EVERY == 0 {
                continue;
            }
            if rng.r#gen::<f32>() >= BASE_OCCUPANCY * density {
                continue;
            }
            let width = block * 0.6 * rng.gen_range(0.6..1.4);
            let depth = block * 0.6 * rng.gen_range(0.6..1.4);
            let floors = rng.gen_range(0..6u32);
            let height = (10.0 + floors as f32 * 8.0) * (0.5 + density);
            let shade = rng.gen_range(0..0x10u32);
            out.push(BuildingSpec {
                x: ix as f32 * block + block * 0.5 - half,
                z: iz as f32 * block + block * 0.5 - half,
                width,
                depth,
                height,
                yaw: rng.gen_range(-0.1..0.1),
                color: 0x0f2433 + (shade << 16) + (shade << 8) + shade,
            });
        }
    }
    out
}
