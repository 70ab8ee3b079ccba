use std::fmt::Write as _;

use geoworld_kernel::{NodeTag, Scene};
use glam::Vec3;

use crate::camera::Camera;

/// Camera/view configuration for rendering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderView {
    pub eye: Vec3,
    pub target: Vec3,
    /// Field of view in degrees.
    pub fov_degrees: f32,
    pub aspect: f32,
}

impl Default for RenderView {
    fn default() -> Self {
        Self {
            eye: Vec3::new(0.0, 600.0, 400.0),
            target: Vec3::ZERO,
            fov_degrees: 75.0,
            aspect: 16.0 / 9.0,
        }
    }
}

impl From<&Camera> for RenderView {
    fn from(camera: &Camera) -> Self {
        let pose = camera.pose();
        Self {
            eye: pose.position,
            target: pose.look_at,
            fov_degrees: camera.config().fov,
            aspect: camera.aspect(),
        }
    }
}

/// Renderer-agnostic interface.
///
/// A renderer reads the scene and a view and produces output. It never mutates
/// the scene; the runtime owns it.
pub trait Renderer {
    type Output;

    fn render(&self, scene: &Scene, view: &RenderView) -> Self::Output;
}

/// Text dump of the scene graph, for the CLI, logs and tests.
#[derive(Debug)]
pub struct DebugTextRenderer {
    /// Only the first `max_roots` root nodes are listed.
    pub max_roots: usize,
}

impl DebugTextRenderer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for DebugTextRenderer {
    fn default() -> Self {
        Self { max_roots: 64 }
    }
}

fn tag_label(tag: &NodeTag) -> String {
    match tag {
        NodeTag::None => String::new(),
        NodeTag::Ground => " [ground]".into(),
        NodeTag::Streets => " [streets]".into(),
        NodeTag::Tile { x, z } => format!(" [tile {x},{z}]"),
        NodeTag::Player(key) => format!(" [player {key}]"),
        NodeTag::Npc(key) => format!(" [npc {key}]"),
        NodeTag::PropertyMarker(id) => format!(" [marker {id}]"),
        NodeTag::PropertyBuilding(id) => format!(" [building {id}]"),
        NodeTag::Nameplate => " [nameplate]".into(),
        NodeTag::ProgressBar => " [progress]".into(),
    }
}

impl Renderer for DebugTextRenderer {
    type Output = String;

    fn render(&self, scene: &Scene, view: &RenderView) -> String {
        let mut out = String::new();
        let stats = scene.stats();
        let _ = writeln!(out, "=== Scene ({stats}) ===");
        let _ = writeln!(
            out,
            "Camera: eye=({:.1}, {:.1}, {:.1}) target=({:.1}, {:.1}, {:.1}) fov={:.0} aspect={:.2}",
            view.eye.x, view.eye.y, view.eye.z, view.target.x, view.target.y, view.target.z,
            view.fov_degrees, view.aspect
        );

        let roots = scene.roots();
        for root in roots.iter().take(self.max_roots) {
            let Some(node) = scene.node(*root) else { continue };
            let p = node.transform.position;
            let _ = writeln!(
                out,
                "  {}{} pos=({:.1}, {:.1}, {:.1}) children={}{}",
                node.name,
                tag_label(&node.tag),
                p.x,
                p.y,
                p.z,
                node.children.len(),
                if scene.is_visible(*root) { "" } else { " hidden" }
            );
        }
        if roots.len() > self.max_roots {
            let _ = writeln!(out, "  ... {} more", roots.len() - self.max_roots);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geoworld_common::{EntityKey, Transform};

    #[test]
    fn empty_scene() {
        let out = DebugTextRenderer::new().render(&Scene::new(), &RenderView::default());
        assert!(out.contains("nodes=0"));
        assert!(out.contains("fov=75"));
    }

    #[test]
    fn lists_tagged_roots() {
        let mut scene = Scene::new();
        let p = scene.add_group(None, "juan", Transform::from_position(Vec3::new(1.0, 0.0, 2.0)));
        scene.set_tag(p, NodeTag::Player(EntityKey::from("u1")));
        let hidden = scene.add_group(None, "ghost", Transform::default());
        scene.set_visible(hidden, false);

        let out = DebugTextRenderer::new().render(&scene, &RenderView::default());
        assert!(out.contains("juan [player u1] pos=(1.0, 0.0, 2.0)"));
        assert!(out.contains("ghost pos=(0.0, 0.0, 0.0) children=0 hidden"));
    }

    #[test]
    fn truncates_long_root_lists() {
        let mut scene = Scene::new();
        for i in 0..5 {
            scene.add_group(None, format!("n{i}"), Transform::default());
        }
        let r = DebugTextRenderer { max_roots: 2 };
        assert!(r.render(&scene, &RenderView::default()).contains("... 3 more"));
    }

    #[test]
    fn view_from_camera() {
        let camera = Camera::default();
        let view = RenderView::from(&camera);
        assert_eq!(view.fov_degrees, 75.0);
        assert_eq!(view.eye, camera.pose().position);
    }
}
