use std::collections::VecDeque;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cities::{AnchorCity, default_cities};

/// Tile streaming configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Side of a square tile in world meters.
    pub tile_size: f32,
    /// Tiles farther than twice this from the viewer are unloaded.
    pub load_distance: f32,
    /// Radius (in tiles) of the desired neighborhood; 1 gives 3×3.
    pub neighborhood_radius: i32,
    /// Requested imagery size in pixels.
    pub texture_size: u32,
    /// Block grid per tile side used for building placement.
    pub blocks_per_tile: u32,
    /// Distance from a city centre at which building density bottoms out.
    pub density_falloff_m: f64,
    /// Upper bound, in updates, on the wait before retrying a failed tile. 0 retries every update.
    pub max_retry_backoff: u32,
    pub seed: u64,
    pub cities: Vec<AnchorCity>,
    /// Imagery zoom when no anchor city applies.
    pub default_zoom: u8,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            tile_size: 1000.0,
            load_distance: 3000.0,
            neighborhood_radius: 1,
            texture_size: 512,
            blocks_per_tile: 10,
            density_falloff_m: 20_000.0,
            max_retry_backoff: 64,
            seed: 0x5eed,
            cities: default_cities(),
            default_zoom: 15,
        }
    }
}

impl StreamConfig {
    pub fn unload_distance(&self) -> f32 {
        self.load_distance * 2.0
    }

    /// Updates to wait after the `failures`-th consecutive failure.
    pub fn retry_delay(&self, failures: u32) -> u64 {
        if self.max_retry_backoff == 0 || failures == 0 {
            return 0;
        }
        let exp = 1u64 << (failures - 1).min(31);
        exp.min(u64::from(self.max_retry_backoff))
    }
}

/// Streaming counters. Totals are cumulative; `active`/`pending` are snapshots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub updates: u64,
    pub requested: u64,
    pub applied: u64,
    pub discarded_stale: u64,
    pub failed: u64,
    pub unloaded: u64,
    pub active: usize,
    pub pending: usize,
    pub last_update: Duration,
}

/// Rolling window of frame times for instrumentation.
#[derive(Debug, Clone)]
pub struct FrameTimer {
    history: VecDeque<Duration>,
    capacity: usize,
}

impl FrameTimer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            history: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn record(&mut self, dt: Duration) {
        if self.history.len() == self.capacity {
            self.history.pop_front();
        }
        self.history.push_back(dt);
    }

    pub fn average(&self) -> Duration {
        if self.history.is_empty() {
            return Duration::ZERO;
        }
        self.history.iter().sum::<Duration>() / self.history.len() as u32
    }

    pub fn max(&self) -> Duration {
        self.history.iter().copied().max().unwrap_or_default()
    }

    pub fn count(&self) -> usize {
        self.history.len()
    }
}
