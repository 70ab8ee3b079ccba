//! World kernel: the scene arena and the entities that live in it.
//!
//! # Invariants
//! - Every scene resource has exactly one owner; disposal never double-frees.
//! - Entity motion is a pure function of the entity and its [`Motion`] parameters.

pub mod entity;
pub mod scene;
pub mod texture;

pub use entity::{ARRIVE_FACTOR, Entity, EntityKind, EntityRegistry, Motion, wrap_angle};
pub use scene::{
    Aabb, Geometry, GeometryHandle, Material, MaterialHandle, MaterialKind, Node, NodeHandle,
    NodeTag, ResourceStats, Scene, TextureHandle,
};
pub use texture::{Texture, TextureOrigin};

pub fn crate_info() -> &'static str {
    "geoworld-kernel v0.1.0"
}
