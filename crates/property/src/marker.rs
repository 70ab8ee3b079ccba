use geoworld_common::{Transform, WorldPoint};
use geoworld_kernel::{Geometry, Material, MaterialKind, NodeHandle, NodeTag, Scene, Texture};
use glam::Vec3;
use std::sync::Arc;

use crate::format::{format_peso, truncate_chars};
use crate::record::Property;

pub const OWNED_POLE_COLOR: u32 = 0x4caf50;
pub const UNOWNED_POLE_COLOR: u32 = 0xffd166;

/// The three label lines: name, value, revenue per day.
pub fn marker_label(property: &Property) -> [String; 3] {
    [
        truncate_chars(property.display_name(), 15).to_string(),
        truncate_chars(&format_peso(property.current_value), 12).to_string(),
        truncate_chars(&format!("{}/day", format_peso(property.revenue_per_day)), 20).to_string(),
    ]
}

/// Pole plus billboard, tagged so picks resolve to the property.
pub fn build(scene: &mut Scene, parent: Option<NodeHandle>, property: &Property, position: WorldPoint) -> NodeHandle {
    let root = scene.add_group(
        parent,
        format!("marker {}", property.id),
        Transform::from_position(position.to_vec3(0.0)),
    );
    scene.set_tag(root, NodeTag::PropertyMarker(property.id.clone()));

    let pole_color = if property.is_owned() {
        OWNED_POLE_COLOR
    } else {
        UNOWNED_POLE_COLOR
    };
    scene.add_mesh(
        Some(root),
        "pole",
        Geometry::Box {
            width: 3.0,
            height: 30.0,
            depth: 3.0,
        },
        Material::new(MaterialKind::Standard, pole_color),
        Transform::default(),
    );

    let text = marker_label(property).join("\n");
    let label = scene.create_texture(Arc::new(Texture::label(text, 512, 256)));
    scene.add_mesh(
        Some(root),
        "label",
        Geometry::Sprite {
            width: 150.0,
            height: 75.0,
        },
        Material::new(MaterialKind::Sprite, 0xffffff).with_texture(label),
        Transform::from_position(Vec3::new(0.0, 50.0, 0.0)),
    );
    root
}
