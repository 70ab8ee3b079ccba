//! Geographic ⇄ local world conversion.
//!
//! Equirectangular approximation around a single anchor. Accurate to well under
//! a percent within a few hundred kilometers of the anchor at tropical and
//! mid latitudes; error grows with distance because the longitude scale is
//! taken at the anchor latitude only.

use serde::{Deserialize, Serialize};

use crate::types::{GeoPoint, WorldPoint};

/// Meters per degree of latitude.
pub const METERS_PER_DEGREE_LAT: f64 = 111_320.0;

/// Floor for cos(latitude) so the longitude scale never reaches zero at the poles.
const MIN_LNG_SCALE: f64 = 1e-6;

/// Maps between WGS84 degrees and world meters around an anchor.
///
/// World axes: `x` grows east, `z` grows south (north is `-z`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoordinateMapper {
    anchor: GeoPoint,
    meters_per_degree_lng: f64,
}

impl CoordinateMapper {
    pub fn new(anchor: GeoPoint) -> Self {
        let scale = anchor.lat.to_radians().cos().max(MIN_LNG_SCALE);
        Self {
            anchor,
            meters_per_degree_lng: METERS_PER_DEGREE_LAT * scale,
        }
    }

    pub fn anchor(&self) -> GeoPoint {
        self.anchor
    }

    pub fn meters_per_degree_lng(&self) -> f64 {
        self.meters_per_degree_lng
    }

    pub fn to_world(&self, geo: GeoPoint) -> WorldPoint {
        let x = (geo.lng - self.anchor.lng) * self.meters_per_degree_lng;
        let z = -(geo.lat - self.anchor.lat) * METERS_PER_DEGREE_LAT;
        WorldPoint::new(x as f32, z as f32)
    }

    pub fn to_geo(&self, point: WorldPoint) -> GeoPoint {
        let lng = self.anchor.lng + point.x as f64 / self.meters_per_degree_lng;
        let lat = self.anchor.lat - point.z as f64 / METERS_PER_DEGREE_LAT;
        GeoPoint::new(lat, lng)
    }
}
