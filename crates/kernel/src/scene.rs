//! Scene arena: nodes plus the GPU-side resources they own.
//!
//! Every node exclusively owns its geometry and material, and a material
//! exclusively owns its texture. Removing a subtree therefore disposes exactly
//! what was created for it, and [`Scene::stats`] reports what is still alive.
//! Handles held by other systems go stale (rather than dangling) once their
//! node is removed.

use std::sync::Arc;

use geoworld_common::{Arena, EntityKey, Handle, PropertyId, Transform};
use glam::{Mat4, Vec3};

use crate::texture::Texture;

pub type NodeHandle = Handle<Node>;
pub type GeometryHandle = Handle<Geometry>;
pub type MaterialHandle = Handle<Material>;
pub type TextureHandle = Handle<Arc<Texture>>;

/// Primitive shapes, sized in local units and centred on the node origin.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    /// Horizontal plane on XZ.
    Plane { width: f32, depth: f32 },
    Box { width: f32, height: f32, depth: f32 },
    Sphere { radius: f32 },
    Cone { radius: f32, height: f32 },
    Cylinder { radius: f32, height: f32 },
    /// Camera-facing quad.
    Sprite { width: f32, height: f32 },
    /// Square line grid on XZ.
    Lines { extent: f32, spacing: f32 },
    /// Loaded avatar model; bounds approximate the figure.
    Model { mesh_count: usize, half_extents: Vec3 },
}

impl Geometry {
    pub fn half_extents(&self) -> Vec3 {
        match *self {
            Geometry::Plane { width, depth } => Vec3::new(width * 0.5, 0.01, depth * 0.5),
            Geometry::Box {
                width,
                height,
                depth,
            } => Vec3::new(width, height, depth) * 0.5,
            Geometry::Sphere { radius } => Vec3::splat(radius),
            Geometry::Cone { radius, height } | Geometry::Cylinder { radius, height } => {
                Vec3::new(radius, height * 0.5, radius)
            }
            Geometry::Sprite { width, height } => Vec3::new(width * 0.5, height * 0.5, 0.5),
            Geometry::Lines { extent, .. } => Vec3::new(extent * 0.5, 0.01, extent * 0.5),
            Geometry::Model { half_extents, .. } => half_extents,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterialKind {
    Standard,
    Toon,
    Basic,
    Sprite,
    Line,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub kind: MaterialKind,
    /// 0xRRGGBB
    pub color: u32,
    pub emissive: Option<u32>,
    pub texture: Option<TextureHandle>,
    pub back_side: bool,
    pub opacity: f32,
}

impl Material {
    pub fn new(kind: MaterialKind, color: u32) -> Self {
        Self {
            kind,
            color,
            emissive: None,
            texture: None,
            back_side: false,
            opacity: 1.0,
        }
    }

    pub fn with_texture(mut self, texture: TextureHandle) -> Self {
        self.texture = Some(texture);
        self
    }

    pub fn with_emissive(mut self, emissive: u32) -> Self {
        self.emissive = Some(emissive);
        self
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }

    /// Back-face material, used for cel outlines.
    pub fn back_side(mut self) -> Self {
        self.back_side = true;
        self
    }
}

/// What a node represents, used to resolve picks back to their owner.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NodeTag {
    #[default]
    None,
    Ground,
    Streets,
    Tile { x: i32, z: i32 },
    Player(EntityKey),
    Npc(EntityKey),
    PropertyMarker(PropertyId),
    PropertyBuilding(PropertyId),
    Nameplate,
    ProgressBar,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub transform: Transform,
    pub parent: Option<NodeHandle>,
    pub children: Vec<NodeHandle>,
    pub geometry: Option<GeometryHandle>,
    pub material: Option<MaterialHandle>,
    pub tag: NodeTag,
    pub visible: bool,
}

/// Axis-aligned bounding box in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn from_half_extents(center: Vec3, half: Vec3) -> Self {
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Bounds of this box after an affine transform.
    pub fn transformed(&self, m: &Mat4) -> Self {
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);
        for i in 0..8 {
            let corner = Vec3::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            );
            let p = m.transform_point3(corner);
            min = min.min(p);
            max = max.max(p);
        }
        Self { min, max }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn contains(&self, p: Vec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }
}

/// Live resource counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceStats {
    pub nodes: usize,
    pub geometries: usize,
    pub materials: usize,
    pub textures: usize,
}

impl ResourceStats {
    pub fn is_empty(&self) -> bool {
        self.nodes == 0 && self.geometries == 0 && self.materials == 0 && self.textures == 0
    }
}

impl std::fmt::Display for ResourceStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "nodes={} geometries={} materials={} textures={}",
            self.nodes, self.geometries, self.materials, self.textures
        )
    }
}

#[derive(Debug, Default)]
pub struct Scene {
    nodes: Arena<Node>,
    geometries: Arena<Geometry>,
    materials: Arena<Material>,
    textures: Arena<Arc<Texture>>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> ResourceStats {
        ResourceStats {
            nodes: self.nodes.len(),
            geometries: self.geometries.len(),
            materials: self.materials.len(),
            textures: self.textures.len(),
        }
    }

    pub fn create_texture(&mut self, texture: Arc<Texture>) -> TextureHandle {
        self.textures.insert(texture)
    }

    pub fn create_geometry(&mut self, geometry: Geometry) -> GeometryHandle {
        self.geometries.insert(geometry)
    }

    pub fn create_material(&mut self, material: Material) -> MaterialHandle {
        self.materials.insert(material)
    }

    pub fn texture(&self, h: TextureHandle) -> Option<&Arc<Texture>> {
        self.textures.get(h)
    }

    pub fn geometry(&self, h: GeometryHandle) -> Option<&Geometry> {
        self.geometries.get(h)
    }

    pub fn material(&self, h: MaterialHandle) -> Option<&Material> {
        self.materials.get(h)
    }

    pub fn material_mut(&mut self, h: MaterialHandle) -> Option<&mut Material> {
        self.materials.get_mut(h)
    }

    /// Swap a material's texture, disposing the one it owned before.
    pub fn replace_texture(&mut self, material: MaterialHandle, texture: TextureHandle) -> bool {
        let Some(mat) = self.materials.get_mut(material) else {
            self.textures.remove(texture);
            return false;
        };
        if let Some(old) = mat.texture.replace(texture) {
            self.textures.remove(old);
        }
        true
    }

    /// Add an empty grouping node.
    pub fn add_group(
        &mut self,
        parent: Option<NodeHandle>,
        name: impl Into<String>,
        transform: Transform,
    ) -> NodeHandle {
        self.insert_node(parent, name.into(), transform, None, None)
    }

    /// Add a node that owns a freshly created geometry and material.
    pub fn add_mesh(
        &mut self,
        parent: Option<NodeHandle>,
        name: impl Into<String>,
        geometry: Geometry,
        material: Material,
        transform: Transform,
    ) -> NodeHandle {
        let g = self.geometries.insert(geometry);
        let m = self.materials.insert(material);
        self.insert_node(parent, name.into(), transform, Some(g), Some(m))
    }

    fn insert_node(
        &mut self,
        parent: Option<NodeHandle>,
        name: String,
        transform: Transform,
        geometry: Option<GeometryHandle>,
        material: Option<MaterialHandle>,
    ) -> NodeHandle {
        let parent = parent.filter(|p| self.nodes.contains(*p));
        let handle = self.nodes.insert(Node {
            name,
            transform,
            parent,
            children: Vec::new(),
            geometry,
            material,
            tag: NodeTag::None,
            visible: true,
        });
        if let Some(p) = parent.and_then(|p| self.nodes.get_mut(p)) {
            p.children.push(handle);
        }
        handle
    }

    pub fn node(&self, h: NodeHandle) -> Option<&Node> {
        self.nodes.get(h)
    }

    pub fn node_mut(&mut self, h: NodeHandle) -> Option<&mut Node> {
        self.nodes.get_mut(h)
    }

    pub fn contains(&self, h: NodeHandle) -> bool {
        self.nodes.contains(h)
    }

    pub fn set_tag(&mut self, h: NodeHandle, tag: NodeTag) -> bool {
        self.nodes.get_mut(h).map(|n| n.tag = tag).is_some()
    }

    pub fn set_transform(&mut self, h: NodeHandle, transform: Transform) -> bool {
        self.nodes.get_mut(h).map(|n| n.transform = transform).is_some()
    }

    pub fn set_visible(&mut self, h: NodeHandle, visible: bool) -> bool {
        self.nodes.get_mut(h).map(|n| n.visible = visible).is_some()
    }

    /// Nodes without a parent.
    pub fn roots(&self) -> Vec<NodeHandle> {
        self.nodes
            .iter()
            .filter(|(_, n)| n.parent.is_none())
            .map(|(h, _)| h)
            .collect()
    }

    /// `h` followed by each of its parents up to the root.
    pub fn ancestors(&self, h: NodeHandle) -> Vec<NodeHandle> {
        let mut out = Vec::new();
        let mut cursor = Some(h);
        while let Some(c) = cursor {
            let Some(node) = self.nodes.get(c) else { break };
            out.push(c);
            cursor = node.parent;
        }
        out
    }

    /// `h` and everything below it, parents before children.
    pub fn descendants(&self, h: NodeHandle) -> Vec<NodeHandle> {
        let mut out = Vec::new();
        let mut stack = vec![h];
        while let Some(c) = stack.pop() {
            if let Some(node) = self.nodes.get(c) {
                out.push(c);
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }

    /// False if the node or any ancestor is hidden.
    pub fn is_visible(&self, h: NodeHandle) -> bool {
        let chain = self.ancestors(h);
        !chain.is_empty()
            && chain
                .iter()
                .all(|a| self.nodes.get(*a).is_some_and(|n| n.visible))
    }

    pub fn world_matrix(&self, h: NodeHandle) -> Option<Mat4> {
        let chain = self.ancestors(h);
        if chain.is_empty() {
            return None;
        }
        let m = chain.iter().rev().fold(Mat4::IDENTITY, |acc, c| {
            let local = self.nodes.get(*c).map(|n| n.transform.matrix());
            acc * local.unwrap_or(Mat4::IDENTITY)
        });
        Some(m)
    }

    /// World-space bounds of this node's own geometry.
    pub fn world_bounds(&self, h: NodeHandle) -> Option<Aabb> {
        let node = self.nodes.get(h)?;
        let geometry = self.geometries.get(node.geometry?)?;
        let local = Aabb::from_half_extents(Vec3::ZERO, geometry.half_extents());
        Some(local.transformed(&self.world_matrix(h)?))
    }

    /// Detach and dispose a node, its descendants and every resource they own.
    /// Returns the number of nodes removed; stale handles remove nothing.
    pub fn remove_subtree(&mut self, h: NodeHandle) -> usize {
        let Some(parent) = self.nodes.get(h).map(|n| n.parent) else {
            return 0;
        };
        if let Some(p) = parent.and_then(|p| self.nodes.get_mut(p)) {
            p.children.retain(|c| *c != h);
        }
        let doomed = self.descendants(h);
        for c in &doomed {
            if let Some(node) = self.nodes.remove(*c) {
                self.dispose_resources(&node);
            }
        }
        tracing::trace!(nodes = doomed.len(), "removed subtree");
        doomed.len()
    }

    fn dispose_resources(&mut self, node: &Node) {
        if let Some(g) = node.geometry {
            self.geometries.remove(g);
        }
        let texture = node
            .material
            .and_then(|m| self.materials.remove(m))
            .and_then(|m| m.texture);
        if let Some(t) = texture {
            self.textures.remove(t);
        }
    }

    /// Dispose everything. Returns what was alive before the call.
    pub fn dispose_all(&mut self) -> ResourceStats {
        let before = self.stats();
        self.nodes.drain();
        self.geometries.drain();
        self.materials.drain();
        self.textures.drain();
        before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn textured_quad(scene: &mut Scene, parent: Option<NodeHandle>) -> NodeHandle {
        let tex = scene.create_texture(Arc::new(Texture::solid(2, 2, 0xffffff)));
        scene.add_mesh(
            parent,
            "quad",
            Geometry::Plane {
                width: 10.0,
                depth: 10.0,
            },
            Material::new(MaterialKind::Standard, 0xffffff).with_texture(tex),
            Transform::default(),
        )
    }

    #[test]
    fn remove_subtree_disposes_owned_resources() {
        let mut scene = Scene::new();
        let root = scene.add_group(None, "root", Transform::default());
        textured_quad(&mut scene, Some(root));
        textured_quad(&mut scene, Some(root));
        assert_eq!(
            scene.stats(),
            ResourceStats {
                nodes: 3,
                geometries: 2,
                materials: 2,
                textures: 2
            }
        );

        assert_eq!(scene.remove_subtree(root), 3);
        assert!(scene.stats().is_empty());
        assert_eq!(scene.remove_subtree(root), 0);
    }

    #[test]
    fn removing_child_detaches_from_parent() {
        let mut scene = Scene::new();
        let root = scene.add_group(None, "root", Transform::default());
        let child = textured_quad(&mut scene, Some(root));
        scene.remove_subtree(child);
        assert!(scene.node(root).unwrap().children.is_empty());
        assert!(scene.node(child).is_none());
    }

    #[test]
    fn world_matrix_composes_parent_chain() {
        let mut scene = Scene::new();
        let root = scene.add_group(
            None,
            "root",
            Transform::from_position(Vec3::new(100.0, 0.0, 50.0)),
        );
        let child = scene.add_mesh(
            Some(root),
            "box",
            Geometry::Box {
                width: 2.0,
                height: 2.0,
                depth: 2.0,
            },
            Material::new(MaterialKind::Standard, 0),
            Transform::from_position(Vec3::new(0.0, 10.0, 0.0)),
        );
        let bounds = scene.world_bounds(child).unwrap();
        assert!(bounds.contains(Vec3::new(100.0, 10.0, 50.0)));
        assert!(!bounds.contains(Vec3::new(0.0, 10.0, 0.0)));
    }

    #[test]
    fn replace_texture_disposes_previous() {
        let mut scene = Scene::new();
        let quad = textured_quad(&mut scene, None);
        let material = scene.node(quad).unwrap().material.unwrap();
        let fresh = scene.create_texture(Arc::new(Texture::solid(1, 1, 0)));
        assert_eq!(scene.stats().textures, 2);
        assert!(scene.replace_texture(material, fresh));
        assert_eq!(scene.stats().textures, 1);
        assert_eq!(scene.material(material).unwrap().texture, Some(fresh));
    }

    #[test]
    fn hidden_parent_hides_children() {
        let mut scene = Scene::new();
        let root = scene.add_group(None, "root", Transform::default());
        let child = textured_quad(&mut scene, Some(root));
        assert!(scene.is_visible(child));
        scene.set_visible(root, false);
        assert!(!scene.is_visible(child));
    }

    #[test]
    fn dispose_all_leaves_nothing() {
        let mut scene = Scene::new();
        let root = scene.add_group(None, "root", Transform::default());
        textured_quad(&mut scene, Some(root));
        let before = scene.dispose_all();
        assert_eq!(before.nodes, 2);
        assert!(scene.stats().is_empty());
        assert!(scene.node(root).is_none());
    }
}
