//! Shared types for the geoworld runtime.
//!
//! # Invariants
//! - Geographic values are degrees (WGS84); world values are meters on the XZ plane.
//! - Handles never alias: a handle to a removed slot is detectably stale.

pub mod coords;
pub mod handle;
pub mod types;

pub use coords::{CoordinateMapper, METERS_PER_DEGREE_LAT};
pub use handle::{Arena, Handle};
pub use types::{EntityKey, GeoPoint, PropertyId, Transform, WorldPoint};

pub fn crate_info() -> &'static str {
    "geoworld-common v0.1.0"
}
