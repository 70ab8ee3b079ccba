use geoworld_common::{GeoPoint, PropertyId};
use serde::{Deserialize, Serialize};

/// Value used when a record carries neither `current_value` nor `price`.
pub const DEFAULT_VALUE: f64 = 50_000.0;

#[derive(Debug, thiserror::Error)]
pub enum PropertyError {
    #[error("property record has an empty id")]
    MissingId,
    #[error("property {id}: coordinates ({lat}, {lng}) are out of range")]
    InvalidCoordinates { id: String, lat: f64, lng: f64 },
    #[error("property {id}: {field} is not a finite number")]
    InvalidNumber { id: String, field: &'static str },
    #[error("invalid property JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyType {
    House,
    Business,
    Farm,
    Shop,
    Factory,
    Other,
}

impl PropertyType {
    /// Lenient: unknown names become `Other`, a missing type is a shop.
    pub fn parse(name: Option<&str>) -> Self {
        let Some(name) = name else {
            return Self::Shop;
        };
        match name.trim().to_ascii_lowercase().as_str() {
            "house" => Self::House,
            "business" => Self::Business,
            "farm" => Self::Farm,
            "shop" | "" => Self::Shop,
            "factory" => Self::Factory,
            _ => Self::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::House => "house",
            Self::Business => "business",
            Self::Farm => "farm",
            Self::Shop => "shop",
            Self::Factory => "factory",
            Self::Other => "other",
        }
    }

    pub fn color(&self) -> u32 {
        match self {
            Self::House => 0xff9800,
            Self::Business => 0x2196f3,
            Self::Farm => 0x4caf50,
            Self::Shop => 0xe91e63,
            Self::Factory => 0x9c27b0,
            Self::Other => 0x00bcd4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PropertyLocation {
    Geo(GeoPoint),
    /// Legacy normalized grid coordinates.
    Grid { x: f64, y: f64 },
}

/// Wire shape of a property record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawProperty {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub revenue_per_day: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawProperty", into = "RawProperty")]
pub struct Property {
    pub id: PropertyId,
    /// `None` when the record has no usable location; such records are not rendered.
    pub location: Option<PropertyLocation>,
    pub property_type: PropertyType,
    pub current_value: f64,
    pub owner_id: Option<String>,
    pub revenue_per_day: f64,
    pub name: Option<String>,
}

impl Property {
    pub fn is_owned(&self) -> bool {
        self.owner_id.is_some()
    }

    /// Name shown on the marker: the record's name, else its type.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(self.property_type.as_str())
    }
}

impl TryFrom<RawProperty> for Property {
    type Error = PropertyError;

    fn try_from(raw: RawProperty) -> Result<Self, Self::Error> {
        if raw.id.trim().is_empty() {
            return Err(PropertyError::MissingId);
        }
        let location = match (raw.lat, raw.lng, raw.location_x, raw.location_y) {
            (Some(lat), Some(lng), _, _) => {
                let geo = GeoPoint::new(lat, lng);
                if !geo.is_valid() {
                    return Err(PropertyError::InvalidCoordinates { id: raw.id, lat, lng });
                }
                Some(PropertyLocation::Geo(geo))
            }
            (_, _, Some(x), Some(y)) if x.is_finite() && y.is_finite() => {
                Some(PropertyLocation::Grid { x, y })
            }
            _ => None,
        };
        let current_value = raw.current_value.or(raw.price).unwrap_or(DEFAULT_VALUE);
        if !current_value.is_finite() {
            return Err(PropertyError::InvalidNumber {
                id: raw.id,
                field: "current_value",
            });
        }
        if !raw.revenue_per_day.is_finite() {
            return Err(PropertyError::InvalidNumber {
                id: raw.id,
                field: "revenue_per_day",
            });
        }
        Ok(Self {
            id: PropertyId::new(raw.id),
            location,
            property_type: PropertyType::parse(raw.property_type.as_deref()),
            current_value,
            owner_id: raw.owner_id.filter(|o| !o.is_empty()),
            revenue_per_day: raw.revenue_per_day,
            name: raw.name,
        })
    }
}

impl From<Property> for RawProperty {
    fn from(p: Property) -> Self {
        let (lat, lng, location_x, location_y) = match p.location {
            Some(PropertyLocation::Geo(g)) => (Some(g.lat), Some(g.lng), None, None),
            Some(PropertyLocation::Grid { x, y }) => (None, None, Some(x), Some(y)),
            None => (None, None, None, None),
        };
        Self {
            id: p.id.as_str().to_string(),
            lat,
            lng,
            location_x,
            location_y,
            property_type: Some(p.property_type.as_str().to_string()),
            current_value: Some(p.current_value),
            price: None,
            owner_id: p.owner_id,
            revenue_per_day: p.revenue_per_day,
            name: p.name,
        }
    }
}

/// Parse a JSON array of property records. Fails on the first invalid record.
pub fn parse_properties(json: &str) -> Result<Vec<Property>, PropertyError> {
    Ok(serde_json::from_str(json)?)
}

/// Parse a JSON array, keeping valid records and logging the rest.
pub fn parse_properties_lenient(json: &str) -> Result<Vec<Property>, PropertyError> {
    let raw: Vec<serde_json::Value> = serde_json::from_str(json)?;
    let mut out = Vec::with_capacity(raw.len());
    for (index, value) in raw.into_iter().enumerate() {
        match serde_json::from_value::<Property>(value) {
            Ok(p) => out.push(p),
            Err(e) => tracing::warn!(index, error = %e, "skipping invalid property record"),
        }
    }
    Ok(out)
}
