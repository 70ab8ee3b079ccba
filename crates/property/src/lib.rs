//! Property records rendered as labelled markers and procedural buildings.
//!
//! # Invariants
//! - Each rendered property owns exactly one marker and one building; `render` rebuilds both from scratch.
//! - Records without a usable location are skipped, never placed at the origin.

pub mod building;
mod format;
pub mod marker;
mod record;
mod renderer;

pub use building::{
    BASE_HEIGHT, BuildingNodes, MAX_HEIGHT_MULTIPLIER, MIN_HEIGHT_MULTIPLIER, SATURATION_VALUE,
    building_height, height_multiplier,
};
pub use format::{format_peso, truncate_chars};
pub use record::{
    DEFAULT_VALUE, Property, PropertyError, PropertyLocation, PropertyType, RawProperty,
    parse_properties, parse_properties_lenient,
};
pub use renderer::{PropertyRenderer, PropertyRendererConfig, RenderReport};

pub fn crate_info() -> &'static str {
    "geoworld-property v0.1.0"
}
