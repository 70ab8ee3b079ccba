use geoworld_common::GeoPoint;
use serde::{Deserialize, Serialize};

/// A city used to anchor tile imagery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorCity {
    pub name: String,
    pub center: GeoPoint,
    /// Imagery zoom used for tiles anchored on this city.
    pub zoom: u8,
}

impl AnchorCity {
    pub fn new(name: impl Into<String>, lat: f64, lng: f64, zoom: u8) -> Self {
        Self {
            name: name.into(),
            center: GeoPoint::new(lat, lng),
            zoom,
        }
    }
}

pub fn default_cities() -> Vec<AnchorCity> {
    vec![
        AnchorCity::new("Manila", 14.5995, 120.9842, 16),
        AnchorCity::new("Cebu", 10.3157, 123.8854, 15),
        AnchorCity::new("Davao", 7.1108, 125.6423, 15),
        AnchorCity::new("Cagayan de Oro", 8.4874, 124.6487, 15),
        AnchorCity::new("Iloilo", 10.6918, 122.5635, 15),
        AnchorCity::new("Bacolod", 10.3932, 122.9749, 15),
        AnchorCity::new("Zamboanga", 6.9271, 122.0724, 15),
        AnchorCity::new("Quezon City", 14.6760, 121.0437, 15),
        AnchorCity::new("Makati", 14.5560, 121.0227, 16),
        AnchorCity::new("Pasig", 14.5794, 121.5734, 15),
    ]
}

/// Brute-force nearest city. Ties keep the earlier entry.
pub fn nearest_city(cities: &[AnchorCity], geo: GeoPoint) -> Option<&AnchorCity> {
    cities.iter().min_by(|a, b| {
        a.center
            .approx_distance_m(&geo)
            .total_cmp(&b.center.approx_distance_m(&geo))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_ten_cities() {
        let cities = default_cities();
        assert_eq!(cities.len(), 10);
        assert!(cities.iter().all(|c| c.center.is_valid()));
    }

    #[test]
    fn picks_the_closest() {
        let cities = default_cities();
        let near_cebu = GeoPoint::new(10.30, 123.90);
        assert_eq!(nearest_city(&cities, near_cebu).unwrap().name, "Cebu");
        let near_davao = GeoPoint::new(7.0, 125.5);
        assert_eq!(nearest_city(&cities, near_davao).unwrap().name, "Davao");
    }

    #[test]
    fn empty_list_has_no_nearest() {
        assert!(nearest_city(&[], GeoPoint::new(0.0, 0.0)).is_none());
    }
}
