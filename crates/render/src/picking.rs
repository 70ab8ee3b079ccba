//! CPU ray picking against scene bounds.

use geoworld_common::{EntityKey, PropertyId};
use geoworld_kernel::{Aabb, NodeHandle, NodeTag, Scene};
use glam::{Mat4, Vec2, Vec3};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Unit length.
    pub dir: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, dir: Vec3) -> Option<Self> {
        let dir = dir.try_normalize()?;
        Some(Self { origin, dir })
    }

    /// Ray through a point in normalized device coordinates (`[-1, 1]`, +y up).
    /// Returns `None` if the view-projection is singular.
    pub fn from_ndc(ndc: Vec2, view_proj: Mat4) -> Option<Self> {
        let inv = view_proj.inverse();
        if !inv.is_finite() {
            return None;
        }
        // depth range is [0, 1]
        let near = inv.project_point3(Vec3::new(ndc.x, ndc.y, 0.0));
        let far = inv.project_point3(Vec3::new(ndc.x, ndc.y, 1.0));
        Self::new(near, far - near)
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.dir * t
    }

    /// Distance along the ray to where it enters `aabb`, 0 if it starts inside.
    pub fn intersect_aabb(&self, aabb: &Aabb) -> Option<f32> {
        let mut t_min = 0.0_f32;
        let mut t_max = f32::INFINITY;
        for axis in 0..3 {
            let o = self.origin[axis];
            let d = self.dir[axis];
            let (lo, hi) = (aabb.min[axis], aabb.max[axis]);
            if d.abs() < 1e-8 {
                if o < lo || o > hi {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / d;
            let (mut t0, mut t1) = ((lo - o) * inv, (hi - o) * inv);
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
            if t_min > t_max {
                return None;
            }
        }
        Some(t_min)
    }

    /// Where the ray crosses the horizontal plane at `height`, if in front of the origin.
    pub fn intersect_ground(&self, height: f32) -> Option<Vec3> {
        if self.dir.y.abs() < 1e-6 {
            return None;
        }
        let t = (height - self.origin.y) / self.dir.y;
        (t >= 0.0).then(|| self.at(t))
    }
}

/// What a pick resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickTarget {
    Player(EntityKey),
    Npc(EntityKey),
    Property(PropertyId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PickHit {
    pub target: PickTarget,
    /// Node whose bounds were hit.
    pub node: NodeHandle,
    /// Scene node carrying the owner tag.
    pub owner: NodeHandle,
    pub distance: f32,
}

/// Walk up from `node` to the first ancestor that is a pickable owner.
pub fn owner_of(scene: &Scene, node: NodeHandle) -> Option<(NodeHandle, PickTarget)> {
    scene.ancestors(node).into_iter().find_map(|h| {
        let target = match &scene.node(h)?.tag {
            NodeTag::Player(key) => PickTarget::Player(key.clone()),
            NodeTag::Npc(key) => PickTarget::Npc(key.clone()),
            NodeTag::PropertyMarker(id) => PickTarget::Property(id.clone()),
            _ => return None,
        };
        Some((h, target))
    })
}

/// Nearest visible player, NPC or property-marker geometry hit by `ray`.
pub fn pick(scene: &Scene, ray: &Ray) -> Option<PickHit> {
    let mut best: Option<PickHit> = None;
    for root in scene.roots() {
        for node in scene.descendants(root) {
            let Some(bounds) = scene.world_bounds(node) else {
                continue;
            };
            let Some(distance) = ray.intersect_aabb(&bounds) else {
                continue;
            };
            if best.as_ref().is_some_and(|b| b.distance <= distance) || !scene.is_visible(node) {
                continue;
            }
            if let Some((owner, target)) = owner_of(scene, node) {
                best = Some(PickHit {
                    target,
                    node,
                    owner,
                    distance,
                });
            }
        }
    }
    if let Some(hit) = &best {
        tracing::trace!(target = ?hit.target, distance = hit.distance, "pick hit");
    }
    best
}
