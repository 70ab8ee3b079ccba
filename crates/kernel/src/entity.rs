use std::collections::BTreeMap;
use std::f32::consts::{PI, TAU};

use geoworld_common::{EntityKey, Transform, WorldPoint};

use crate::scene::NodeHandle;

/// An entity counts as arrived once it is within `speed * ARRIVE_FACTOR` of its target.
pub const ARRIVE_FACTOR: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Player,
    Npc,
}

/// Per-tick motion parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Motion {
    /// World units per tick.
    pub speed: f32,
    /// Fraction of the remaining heading difference applied per tick.
    pub heading_damping: f32,
}

/// A player or NPC.
#[derive(Debug, Clone)]
pub struct Entity {
    pub key: EntityKey,
    pub kind: EntityKind,
    pub display_name: String,
    pub position: WorldPoint,
    pub target: WorldPoint,
    /// Radians about +Y; 0 faces +Z.
    pub heading: f32,
    pub moving: bool,
    /// Scene group holding the model and nameplate.
    pub root: NodeHandle,
    pub model: NodeHandle,
    pub nameplate: Option<NodeHandle>,
}

impl Entity {
    pub fn new(
        key: EntityKey,
        kind: EntityKind,
        display_name: impl Into<String>,
        position: WorldPoint,
        root: NodeHandle,
        model: NodeHandle,
    ) -> Self {
        Self {
            key,
            kind,
            display_name: display_name.into(),
            position,
            target: position,
            heading: 0.0,
            moving: false,
            root,
            model,
            nameplate: None,
        }
    }

    pub fn set_target(&mut self, target: WorldPoint) {
        self.target = target;
    }

    pub fn distance_to_target(&self) -> f32 {
        self.position.distance(self.target)
    }

    /// Advance one tick toward the target. Returns true if the position changed.
    ///
    /// Steps are clamped to the remaining distance so a fast entity lands on its
    /// target instead of overshooting and oscillating around it.
    pub fn step(&mut self, motion: Motion) -> bool {
        let dx = self.target.x - self.position.x;
        let dz = self.target.z - self.position.z;
        let dist = dx.hypot(dz);

        if dist > motion.speed * ARRIVE_FACTOR {
            let step = motion.speed.min(dist);
            self.position.x += dx / dist * step;
            self.position.z += dz / dist * step;

            let desired = dx.atan2(dz);
            let diff = wrap_angle(desired - self.heading);
            self.heading = wrap_angle(self.heading + diff * motion.heading_damping);
            self.moving = true;
            true
        } else {
            let changed = self.position != self.target;
            self.position = self.target;
            self.moving = false;
            changed
        }
    }

    pub fn transform(&self) -> Transform {
        Transform::from_position_yaw(self.position.to_vec3(0.0), self.heading)
    }
}

/// Wrap an angle into `[-PI, PI)`.
pub fn wrap_angle(angle: f32) -> f32 {
    (angle + PI).rem_euclid(TAU) - PI
}

/// Entities keyed by id. BTreeMap keeps iteration (and thus tick order) deterministic.
#[derive(Debug, Default)]
pub struct EntityRegistry {
    entities: BTreeMap<EntityKey, Entity>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert, returning the entity previously stored under the same key.
    pub fn insert(&mut self, entity: Entity) -> Option<Entity> {
        self.entities.insert(entity.key.clone(), entity)
    }

    pub fn remove(&mut self, key: &EntityKey) -> Option<Entity> {
        self.entities.remove(key)
    }

    pub fn get(&self, key: &EntityKey) -> Option<&Entity> {
        self.entities.get(key)
    }

    pub fn get_mut(&mut self, key: &EntityKey) -> Option<&mut Entity> {
        self.entities.get_mut(key)
    }

    pub fn contains(&self, key: &EntityKey) -> bool {
        self.entities.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn first_key(&self) -> Option<&EntityKey> {
        self.entities.keys().next()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.entities.values_mut()
    }

    /// Find the entity whose scene root is `root`.
    pub fn by_root(&self, root: NodeHandle) -> Option<&Entity> {
        self.entities.values().find(|e| e.root == root)
    }

    pub fn drain(&mut self) -> Vec<Entity> {
        std::mem::take(&mut self.entities).into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Scene;

    fn entity_at(scene: &mut Scene, key: &str, x: f32, z: f32) -> Entity {
        let root = scene.add_group(None, key, Transform::default());
        let model = scene.add_group(Some(root), "model", Transform::default());
        Entity::new(
            EntityKey::from(key),
            EntityKind::Player,
            key,
            WorldPoint::new(x, z),
            root,
            model,
        )
    }

    const MOTION: Motion = Motion {
        speed: 25.0,
        heading_damping: 0.1,
    };

    #[test]
    fn moves_by_speed_toward_target() {
        let mut scene = Scene::new();
        let mut e = entity_at(&mut scene, "a", 0.0, 0.0);
        e.set_target(WorldPoint::new(100.0, 0.0));
        assert!(e.step(MOTION));
        assert!((e.position.x - 25.0).abs() < 1e-4);
        assert!(e.moving);
    }

    #[test]
    fn snaps_when_within_arrive_radius() {
        let mut scene = Scene::new();
        let mut e = entity_at(&mut scene, "a", 0.0, 0.0);
        e.set_target(WorldPoint::new(2.0, 0.0));
        e.step(MOTION);
        assert_eq!(e.position, WorldPoint::new(2.0, 0.0));
        assert!(!e.moving);
    }

    #[test]
    fn lands_on_target_without_oscillating() {
        let mut scene = Scene::new();
        let mut e = entity_at(&mut scene, "a", 0.0, 0.0);
        e.set_target(WorldPoint::new(60.0, 0.0));
        for _ in 0..5 {
            e.step(MOTION);
        }
        assert_eq!(e.position, WorldPoint::new(60.0, 0.0));
        assert!(!e.moving);
    }

    #[test]
    fn heading_eases_toward_direction() {
        let mut scene = Scene::new();
        let mut e = entity_at(&mut scene, "a", 0.0, 0.0);
        e.set_target(WorldPoint::new(1000.0, 0.0));
        e.step(MOTION);
        // desired heading is +PI/2, one step covers 10% of it
        assert!((e.heading - std::f32::consts::FRAC_PI_2 * 0.1).abs() < 1e-4);
    }

    #[test]
    fn heading_turns_across_the_wrap_boundary() {
        let mut scene = Scene::new();
        let mut e = entity_at(&mut scene, "a", 0.0, 0.0);
        e.heading = 3.0;
        // atan2(-0.28, -1) is about -2.87, the short way round from 3.0 is positive
        e.set_target(WorldPoint::new(-28.0, -100.0));
        e.step(MOTION);
        assert!(e.heading > 3.0 || e.heading < -3.0);
    }

    #[test]
    fn wrap_angle_range() {
        assert!((wrap_angle(3.0 * PI).abs() - PI).abs() < 1e-4);
        assert!((wrap_angle(-0.5) + 0.5).abs() < 1e-6);
        assert!((wrap_angle(TAU + 0.25) - 0.25).abs() < 1e-5);
    }

    #[test]
    fn registry_is_ordered_and_finds_by_root() {
        let mut scene = Scene::new();
        let mut reg = EntityRegistry::new();
        let b = entity_at(&mut scene, "b", 0.0, 0.0);
        let b_root = b.root;
        reg.insert(b);
        reg.insert(entity_at(&mut scene, "a", 0.0, 0.0));
        assert_eq!(reg.first_key().unwrap().as_str(), "a");
        assert_eq!(reg.by_root(b_root).unwrap().key.as_str(), "b");
        assert_eq!(reg.drain().len(), 2);
        assert!(reg.is_empty());
    }
}
