//! Scene figures for players and NPCs: loaded models, placeholders and nameplates.

use std::sync::Arc;

use geoworld_assets::AvatarModel;
use geoworld_common::{EntityKey, Transform};
use geoworld_kernel::{Geometry, Material, MaterialKind, NodeHandle, NodeTag, Scene, Texture};
use glam::Vec3;
use serde::{Deserialize, Serialize};

pub const NAMEPLATE_HEIGHT: f32 = 80.0;
pub const LEFT_ARM: &str = "leftArm";
pub const RIGHT_ARM: &str = "rightArm";

/// Who an entity is, as supplied by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: EntityKey,
    pub display_name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl Identity {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: EntityKey::new(id),
            display_name: display_name.into(),
            avatar_url: None,
        }
    }

    pub fn with_avatar(mut self, url: impl Into<String>) -> Self {
        self.avatar_url = Some(url.into());
        self
    }
}

fn part(scene: &mut Scene, parent: NodeHandle, name: &str, geometry: Geometry, color: u32, at: Vec3) {
    scene.add_mesh(
        Some(parent),
        name,
        geometry,
        Material::new(MaterialKind::Standard, color),
        Transform::from_position(at),
    );
}

/// Primitive figure: head, body, two arms and two legs.
pub fn placeholder(scene: &mut Scene, parent: NodeHandle, color: u32) -> NodeHandle {
    let root = scene.add_group(Some(parent), "avatar", Transform::default());
    let limb = Geometry::Box {
        width: 4.0,
        height: 18.0,
        depth: 4.0,
    };
    part(scene, root, "head", Geometry::Sphere { radius: 10.0 }, color, Vec3::new(0.0, 30.0, 0.0));
    part(
        scene,
        root,
        "body",
        Geometry::Box {
            width: 8.0,
            height: 20.0,
            depth: 8.0,
        },
        color,
        Vec3::new(0.0, 10.0, 0.0),
    );
    part(scene, root, LEFT_ARM, limb.clone(), color, Vec3::new(-8.0, 12.0, 0.0));
    part(scene, root, RIGHT_ARM, limb.clone(), color, Vec3::new(8.0, 12.0, 0.0));
    part(scene, root, "leftLeg", limb.clone(), color, Vec3::new(-4.0, -8.0, 0.0));
    part(scene, root, "rightLeg", limb, color, Vec3::new(4.0, -8.0, 0.0));
    root
}

/// Proxy for a loaded glTF avatar.
pub fn from_model(scene: &mut Scene, parent: NodeHandle, model: &Arc<AvatarModel>, color: u32) -> NodeHandle {
    scene.add_mesh(
        Some(parent),
        format!("avatar {}", model.url),
        Geometry::Model {
            mesh_count: model.mesh_count,
            half_extents: Vec3::new(10.0, 25.0, 10.0),
        },
        Material::new(MaterialKind::Standard, color),
        Transform::from_position(Vec3::new(0.0, 25.0, 0.0)),
    )
}

pub fn nameplate(scene: &mut Scene, parent: NodeHandle, name: &str, visible: bool) -> NodeHandle {
    let label = scene.create_texture(Arc::new(Texture::label(name, 256, 64)));
    let node = scene.add_mesh(
        Some(parent),
        "nameplate",
        Geometry::Sprite {
            width: 100.0,
            height: 25.0,
        },
        Material::new(MaterialKind::Sprite, 0xffffff).with_texture(label),
        Transform::from_position(Vec3::new(0.0, NAMEPLATE_HEIGHT, 0.0)),
    );
    scene.set_tag(node, NodeTag::Nameplate);
    scene.set_visible(node, visible);
    node
}

/// Direct child of `parent` with the given name.
pub fn find_child(scene: &Scene, parent: NodeHandle, name: &str) -> Option<NodeHandle> {
    scene
        .node(parent)?
        .children
        .iter()
        .copied()
        .find(|c| scene.node(*c).is_some_and(|n| n.name == name))
}
