//! Procedural property buildings.

use geoworld_common::{PropertyId, Transform, WorldPoint};
use geoworld_kernel::{Geometry, Material, MaterialKind, NodeHandle, NodeTag, Scene};
use glam::Vec3;

use crate::record::PropertyType;

pub const BASE_HEIGHT: f32 = 40.0;
pub const FOOTPRINT: f32 = 30.0;
pub const MIN_HEIGHT_MULTIPLIER: f32 = 0.1;
pub const MAX_HEIGHT_MULTIPLIER: f32 = 3.0;
/// Value at which the log curve reaches [`MAX_HEIGHT_MULTIPLIER`].
pub const SATURATION_VALUE: f64 = 1e9;

pub const OWNED_COLOR: u32 = 0x4caf50;
pub const OWNED_EMISSIVE: u32 = 0x2e7d32;

const OUTLINE_SCALE: f32 = 1.03;
const ROOF_OUTLINE_SCALE: f32 = 1.02;
const ROOF_COLOR: u32 = 0x8b4513;
const WINDOW_COLOR: u32 = 0xffff00;
const WINDOW_SIZE: f32 = 8.0;
const WINDOW_SPACING: f32 = 12.0;

/// Log-scaled from the floor at 0 to the cap at [`SATURATION_VALUE`], clamped
/// beyond. Negative and non-finite values count as zero.
pub fn height_multiplier(value: f64) -> f32 {
    let v = if value.is_finite() { value.max(0.0) } else { 0.0 };
    let (min, max) = (MIN_HEIGHT_MULTIPLIER as f64, MAX_HEIGHT_MULTIPLIER as f64);
    let m = min + (max - min) * (v + 1.0).ln() / (SATURATION_VALUE + 1.0).ln();
    (m as f32).clamp(MIN_HEIGHT_MULTIPLIER, MAX_HEIGHT_MULTIPLIER)
}

pub fn building_height(value: f64) -> f32 {
    BASE_HEIGHT * height_multiplier(value)
}

/// Handles of a built property building.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildingNodes {
    pub root: NodeHandle,
    /// Main body; recoloured when the property becomes owned.
    pub body: NodeHandle,
}

fn outline(scene: &mut Scene, parent: NodeHandle, geometry: Geometry, at: Vec3, scale: f32) {
    scene.add_mesh(
        Some(parent),
        "outline",
        geometry,
        Material::new(MaterialKind::Basic, 0x000000).back_side(),
        Transform::from_position(at).with_scale(Vec3::splat(scale)),
    );
}

/// Build a property building at `position` under `parent`.
pub fn build(
    scene: &mut Scene,
    parent: Option<NodeHandle>,
    id: &PropertyId,
    kind: PropertyType,
    value: f64,
    position: WorldPoint,
) -> BuildingNodes {
    let height = building_height(value);
    let root = scene.add_group(
        parent,
        format!("building {id}"),
        Transform::from_position(position.to_vec3(0.0)),
    );
    scene.set_tag(root, NodeTag::PropertyBuilding(id.clone()));

    let (width, body_height) = match kind {
        // farms are low and wide, factories wide
        PropertyType::Farm => (FOOTPRINT * 1.4, height * 0.6),
        PropertyType::Factory => (FOOTPRINT * 1.2, height),
        _ => (FOOTPRINT, height),
    };
    let body_geometry = Geometry::Box {
        width,
        height: body_height,
        depth: FOOTPRINT,
    };
    let body_center = Vec3::new(0.0, body_height * 0.5, 0.0);
    outline(scene, root, body_geometry.clone(), body_center, OUTLINE_SCALE);
    let body = scene.add_mesh(
        Some(root),
        "body",
        body_geometry,
        Material::new(MaterialKind::Toon, kind.color()),
        Transform::from_position(body_center),
    );

    match kind {
        PropertyType::House | PropertyType::Business | PropertyType::Other => {
            let roof = Geometry::Cone {
                radius: 22.0,
                height: 15.0,
            };
            let at = Vec3::new(0.0, body_height + 7.5, 0.0);
            outline(scene, root, roof.clone(), at, ROOF_OUTLINE_SCALE);
            scene.add_mesh(
                Some(root),
                "roof",
                roof,
                Material::new(MaterialKind::Toon, ROOF_COLOR),
                Transform::from_position_yaw(at, std::f32::consts::FRAC_PI_4),
            );
        }
        PropertyType::Farm => {
            let silo_height = body_height * 1.5 + 10.0;
            scene.add_mesh(
                Some(root),
                "silo",
                Geometry::Cylinder {
                    radius: 6.0,
                    height: silo_height,
                },
                Material::new(MaterialKind::Toon, 0xbdbdbd),
                Transform::from_position(Vec3::new(width * 0.5 + 8.0, silo_height * 0.5, 0.0)),
            );
        }
        PropertyType::Shop => {
            scene.add_mesh(
                Some(root),
                "awning",
                Geometry::Box {
                    width: FOOTPRINT + 4.0,
                    height: 2.0,
                    depth: 8.0,
                },
                Material::new(MaterialKind::Toon, 0xffffff),
                Transform::from_position(Vec3::new(0.0, body_height.min(14.0), FOOTPRINT * 0.5 + 4.0)),
            );
        }
        PropertyType::Factory => {
            let chimney = body_height + 20.0;
            scene.add_mesh(
                Some(root),
                "chimney",
                Geometry::Cylinder {
                    radius: 3.0,
                    height: chimney,
                },
                Material::new(MaterialKind::Toon, 0x616161),
                Transform::from_position(Vec3::new(width * 0.3, chimney * 0.5, -FOOTPRINT * 0.25)),
            );
        }
    }

    add_windows(scene, body, body_height);
    BuildingNodes { root, body }
}

/// `ceil(h / 15)` rows of two lit windows on the front face, as children of the body.
fn add_windows(scene: &mut Scene, body: NodeHandle, height: f32) {
    let rows = (height / 15.0).ceil() as u32;
    for row in 0..rows {
        for side in [-8.0, 8.0] {
            // body origin is its centre
            let y = (row + 1) as f32 * WINDOW_SPACING + 5.0 - height * 0.5;
            scene.add_mesh(
                Some(body),
                "window",
                Geometry::Box {
                    width: WINDOW_SIZE,
                    height: WINDOW_SIZE,
                    depth: 0.5,
                },
                Material::new(MaterialKind::Standard, WINDOW_COLOR).with_emissive(WINDOW_COLOR),
                Transform::from_position(Vec3::new(side, y, FOOTPRINT * 0.5 + 0.5)),
            );
        }
    }
}

/// Recolour a building body to the owned palette.
pub fn mark_owned(scene: &mut Scene, body: NodeHandle) -> bool {
    let Some(material) = scene.node(body).and_then(|n| n.material) else {
        return false;
    };
    match scene.material_mut(material) {
        Some(m) => {
            m.color = OWNED_COLOR;
            m.emissive = Some(OWNED_EMISSIVE);
            true
        }
        None => false,
    }
}
