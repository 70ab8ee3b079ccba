use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;

use geoworld_assets::TextureProvider;
use geoworld_common::{CoordinateMapper, GeoPoint, Transform, WorldPoint};
use geoworld_kernel::{
    Geometry, Material, MaterialKind, NodeHandle, NodeTag, Scene, Texture,
};
use tokio::task::{Id, JoinError, JoinSet};

use crate::budget::{StreamConfig, StreamStats};
use crate::buildings::{BuildingSpec, density_factor, generate_field};
use crate::cities::nearest_city;
use crate::grid::TileKey;

#[derive(Debug, thiserror::Error)]
pub enum TileError {
    #[error("tile {key} maps outside the valid geographic range ({geo})")]
    OutOfRange { key: TileKey, geo: GeoPoint },
    #[error("tile load task failed: {0}")]
    Join(#[from] JoinError),
}

/// A loaded tile and the scene nodes it owns.
#[derive(Debug, Clone)]
pub struct Tile {
    pub key: TileKey,
    pub geo: GeoPoint,
    pub city: Option<String>,
    pub generation: u64,
    pub density: f32,
    pub root: NodeHandle,
    pub ground: NodeHandle,
    pub buildings: NodeHandle,
    pub building_count: usize,
    pub fallback_imagery: bool,
}

/// Everything a load task needs, resolved on the tick thread.
#[derive(Debug, Clone)]
struct TilePlan {
    key: TileKey,
    generation: u64,
    geo: GeoPoint,
    city: Option<String>,
    zoom: u8,
    density: f32,
}

/// Result of a finished load task.
struct TileLoad {
    plan: TilePlan,
    texture: Arc<Texture>,
    buildings: Vec<BuildingSpec>,
}

#[derive(Debug, Clone, Copy)]
struct Failure {
    count: u32,
    retry_at: u64,
}

/// Keeps the set of active ground tiles around a moving viewpoint.
///
/// Loads run on tokio tasks; their results are applied to the scene only from
/// [`TileStreamer::drain_completed`] or [`TileStreamer::update_player_position`],
/// and only while the load's generation is still the pending one for its key.
pub struct TileStreamer {
    config: StreamConfig,
    mapper: CoordinateMapper,
    textures: Arc<TextureProvider>,
    active: BTreeMap<TileKey, Tile>,
    pending: HashMap<TileKey, u64>,
    failures: HashMap<TileKey, Failure>,
    tasks: JoinSet<Result<TileLoad, TileError>>,
    task_keys: HashMap<Id, (TileKey, u64)>,
    next_generation: u64,
    stats: StreamStats,
}

impl TileStreamer {
    pub fn new(config: StreamConfig, mapper: CoordinateMapper, textures: Arc<TextureProvider>) -> Self {
        Self {
            config,
            mapper,
            textures,
            active: BTreeMap::new(),
            pending: HashMap::new(),
            failures: HashMap::new(),
            tasks: JoinSet::new(),
            task_keys: HashMap::new(),
            next_generation: 1,
            stats: StreamStats::default(),
        }
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    pub fn stats(&self) -> StreamStats {
        StreamStats {
            active: self.active.len(),
            pending: self.pending.len(),
            ..self.stats
        }
    }

    pub fn tile(&self, key: TileKey) -> Option<&Tile> {
        self.active.get(&key)
    }

    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.active.values()
    }

    pub fn active_keys(&self) -> Vec<TileKey> {
        self.active.keys().copied().collect()
    }

    pub fn is_pending(&self, key: TileKey) -> bool {
        self.pending.contains_key(&key)
    }

    pub fn failure_count(&self, key: TileKey) -> u32 {
        self.failures.get(&key).map_or(0, |f| f.count)
    }

    /// Name of the anchor city nearest to a world position.
    pub fn nearest_city_name(&self, x: f32, z: f32) -> Option<&str> {
        let geo = self.mapper.to_geo(WorldPoint::new(x, z));
        nearest_city(&self.config.cities, geo).map(|c| c.name.as_str())
    }

    /// Update for a new viewer position and wait for every outstanding load.
    pub async fn update_player_position(&mut self, x: f32, z: f32, scene: &mut Scene) -> StreamStats {
        let started = Instant::now();
        self.request(x, z, scene);
        while let Some(joined) = self.tasks.join_next_with_id().await {
            self.handle_joined(joined, scene);
        }
        self.stats.last_update = started.elapsed();
        tracing::trace!(
            active = self.active.len(),
            elapsed = ?self.stats.last_update,
            "stream update complete"
        );
        self.stats()
    }

    /// Unload far tiles and start loads for missing ones. Does not wait.
    ///
    /// Must run inside a tokio runtime. Returns the keys whose loads were started.
    pub fn request(&mut self, x: f32, z: f32, scene: &mut Scene) -> Vec<TileKey> {
        let _span = tracing::info_span!("stream_update", x, z).entered();
        self.stats.updates += 1;
        let viewer = WorldPoint::new(x, z);
        let unload_distance = self.config.unload_distance();
        let tile_size = self.config.tile_size;

        self.unload_beyond(viewer, unload_distance, scene);

        let center = TileKey::containing(x, z, tile_size);
        let desired: Vec<TileKey> = center
            .neighborhood(self.config.neighborhood_radius)
            .filter(|k| k.center(tile_size).distance(viewer) <= unload_distance)
            .collect();

        let viewer_geo = self.mapper.to_geo(viewer);
        let city = nearest_city(&self.config.cities, viewer_geo).cloned();

        let mut started = Vec::new();
        for key in desired {
            if self.active.contains_key(&key) || self.pending.contains_key(&key) {
                continue;
            }
            if self
                .failures
                .get(&key)
                .is_some_and(|f| f.retry_at > self.stats.updates)
            {
                continue;
            }

            let generation = self.next_generation;
            self.next_generation += 1;
            self.pending.insert(key, generation);

            let centre = key.center(tile_size);
            let (geo, zoom, density, city_name) = match &city {
                Some(c) => {
                    // offset from the city in world space, re-projected around the city
                    let city_world = self.mapper.to_world(c.center);
                    let local = CoordinateMapper::new(c.center);
                    let offset = WorldPoint::new(centre.x - city_world.x, centre.z - city_world.z);
                    let geo = local.to_geo(offset);
                    let distance = geo.approx_distance_m(&c.center);
                    let density = density_factor(distance, self.config.density_falloff_m);
                    (geo, c.zoom, density, Some(c.name.clone()))
                }
                None => (
                    self.mapper.to_geo(centre),
                    self.config.default_zoom,
                    density_factor(f64::INFINITY, self.config.density_falloff_m),
                    None,
                ),
            };

            if !geo.is_valid() {
                self.pending.remove(&key);
                self.record_failure(key, TileError::OutOfRange { key, geo });
                continue;
            }

            let plan = TilePlan {
                key,
                generation,
                geo,
                city: city_name,
                zoom,
                density,
            };
            let textures = Arc::clone(&self.textures);
            let texture_size = self.config.texture_size;
            let blocks = self.config.blocks_per_tile;
            let seed = self.config.seed;
            let handle = self.tasks.spawn(async move {
                let texture = textures.get(plan.geo, plan.zoom, texture_size).await;
                let buildings = generate_field(plan.key, tile_size, blocks, plan.density, seed);
                Ok(TileLoad {
                    plan,
                    texture,
                    buildings,
                })
            });
            self.task_keys.insert(handle.id(), (key, generation));
            self.stats.requested += 1;
            tracing::debug!(%key, generation, "tile load started");
            started.push(key);
        }
        started
    }

    /// Apply every load that has already finished, without waiting.
    pub fn drain_completed(&mut self, scene: &mut Scene) -> usize {
        let mut handled = 0;
        while let Some(joined) = self.tasks.try_join_next_with_id() {
            self.handle_joined(joined, scene);
            handled += 1;
        }
        handled
    }

    /// Abort outstanding loads and dispose every active tile.
    pub fn clear(&mut self, scene: &mut Scene) {
        self.tasks.abort_all();
        self.tasks.detach_all();
        self.task_keys.clear();
        self.pending.clear();
        self.failures.clear();
        for (_, tile) in std::mem::take(&mut self.active) {
            scene.remove_subtree(tile.root);
        }
    }

    fn unload_beyond(&mut self, viewer: WorldPoint, limit: f32, scene: &mut Scene) {
        let tile_size = self.config.tile_size;
        let far: Vec<TileKey> = self
            .active
            .keys()
            .filter(|k| k.center(tile_size).distance(viewer) > limit)
            .copied()
            .collect();
        for key in far {
            if let Some(tile) = self.active.remove(&key) {
                let removed = scene.remove_subtree(tile.root);
                self.stats.unloaded += 1;
                tracing::debug!(%key, nodes = removed, "tile unloaded");
            }
        }
        // in-flight loads for far keys are forgotten; their results get discarded
        self.pending
            .retain(|k, _| k.center(tile_size).distance(viewer) <= limit);
    }

    fn handle_joined(
        &mut self,
        joined: Result<(Id, Result<TileLoad, TileError>), JoinError>,
        scene: &mut Scene,
    ) {
        let (id, outcome) = match joined {
            Ok((id, outcome)) => (id, outcome),
            Err(e) => (e.id(), Err(TileError::Join(e))),
        };
        let Some((key, generation)) = self.task_keys.remove(&id) else {
            return;
        };
        if self.pending.get(&key) != Some(&generation) {
            self.stats.discarded_stale += 1;
            tracing::debug!(%key, generation, "discarding stale tile load");
            return;
        }
        self.pending.remove(&key);

        match outcome {
            Ok(load) => {
                let tile = self.build_tile(load, scene);
                tracing::debug!(
                    key = %tile.key,
                    buildings = tile.building_count,
                    city = tile.city.as_deref().unwrap_or("-"),
                    "tile loaded"
                );
                self.failures.remove(&key);
                self.active.insert(key, tile);
                self.stats.applied += 1;
            }
            Err(e) => self.record_failure(key, e),
        }
    }

    fn record_failure(&mut self, key: TileKey, error: TileError) {
        let count = self.failure_count(key) + 1;
        let retry_at = self.stats.updates + self.config.retry_delay(count);
        self.failures.insert(key, Failure { count, retry_at });
        self.stats.failed += 1;
        tracing::warn!(%key, failures = count, retry_at, %error, "tile load failed");
    }

    fn build_tile(&self, load: TileLoad, scene: &mut Scene) -> Tile {
        let TileLoad {
            plan,
            texture,
            buildings,
        } = load;
        let size = self.config.tile_size;
        let centre = plan.key.center(size);
        let fallback_imagery = texture.is_fallback();

        let root = scene.add_group(
            None,
            format!("tile {}", plan.key),
            Transform::from_position(centre.to_vec3(0.0)),
        );
        scene.set_tag(root, NodeTag::Tile { x: plan.key.x, z: plan.key.z });

        let texture = scene.create_texture(texture);
        let ground = scene.add_mesh(
            Some(root),
            "ground",
            Geometry::Plane { width: size, depth: size },
            Material::new(MaterialKind::Standard, 0xffffff).with_texture(texture),
            Transform::default(),
        );

        let group = scene.add_group(Some(root), "buildings", Transform::default());
        for b in &buildings {
            scene.add_mesh(
                Some(group),
                "building",
                Geometry::Box {
                    width: b.width,
                    height: b.height,
                    depth: b.depth,
                },
                Material::new(MaterialKind::Standard, b.color),
                Transform::from_position_yaw(glam::Vec3::new(b.x, b.height * 0.5, b.z), b.yaw),
            );
        }

        Tile {
            key: plan.key,
            geo: plan.geo,
            city: plan.city,
            generation: plan.generation,
            density: plan.density,
            root,
            ground,
            buildings: group,
            building_count: buildings.len(),
            fallback_imagery,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geoworld_assets::{OfflineFetcher, TextureConfig};

    const MANILA: GeoPoint = GeoPoint::new(14.5995, 120.9842);

    fn offline_textures() -> Arc<TextureProvider> {
        Arc::new(TextureProvider::new(
            TextureConfig {
                fallback_size: 8,
                ..TextureConfig::default()
            },
            Arc::new(OfflineFetcher),
        ))
    }

    fn streamer(config: StreamConfig) -> TileStreamer {
        TileStreamer::new(config, CoordinateMapper::new(MANILA), offline_textures())
    }

    fn small_config() -> StreamConfig {
        StreamConfig {
            tile_size: 1000.0,
            load_distance: 3000.0,
            texture_size: 8,
            ..StreamConfig::default()
        }
    }

    #[tokio::test]
    async fn player_at_origin_gets_nine_tiles() {
        let mut scene = Scene::new();
        let mut s = streamer(small_config());
        let stats = s.update_player_position(0.0, 0.0, &mut scene).await;

        let expected: Vec<TileKey> = TileKey::new(0, 0).neighborhood(1).collect();
        let mut keys = s.active_keys();
        keys.sort();
        let mut expected_sorted = expected.clone();
        expected_sorted.sort();
        assert_eq!(keys, expected_sorted);
        assert_eq!(stats.active, 9);
        assert_eq!(stats.pending, 0);
        assert!(s.tiles().all(|t| t.fallback_imagery));
        assert_eq!(s.tile(TileKey::new(0, 0)).unwrap().city.as_deref(), Some("Manila"));
    }

    #[tokio::test]
    async fn repeated_updates_do_not_reload() {
        let mut scene = Scene::new();
        let mut s = streamer(small_config());
        s.update_player_position(0.0, 0.0, &mut scene).await;
        let before = scene.stats();
        let stats = s.update_player_position(10.0, -20.0, &mut scene).await;
        assert_eq!(stats.requested, 9);
        assert_eq!(scene.stats(), before);
    }

    #[tokio::test]
    async fn active_tiles_stay_within_unload_distance() {
        let mut scene = Scene::new();
        let mut s = streamer(small_config());
        for step in 0..12 {
            let x = step as f32 * 1500.0;
            s.update_player_position(x, 0.0, &mut scene).await;
            let viewer = WorldPoint::new(x, 0.0);
            for t in s.tiles() {
                assert!(t.key.center(1000.0).distance(viewer) <= 6000.0);
            }
        }
        assert!(s.stats().unloaded > 0);
    }

    #[tokio::test]
    async fn unloading_disposes_exactly_the_tile_resources() {
        let mut scene = Scene::new();
        let mut s = streamer(small_config());
        s.update_player_position(0.0, 0.0, &mut scene).await;
        s.update_player_position(100_000.0, 0.0, &mut scene).await;
        s.update_player_position(0.0, 0.0, &mut scene).await;
        s.update_player_position(100_000.0, 0.0, &mut scene).await;
        s.clear(&mut scene);
        assert!(scene.stats().is_empty(), "leaked: {}", scene.stats());
    }

    #[tokio::test]
    async fn stale_loads_are_discarded() {
        let mut scene = Scene::new();
        let mut s = streamer(small_config());
        let first = s.request(0.0, 0.0, &mut scene);
        assert_eq!(first.len(), 9);
        // move away before anything is applied: origin loads are now stale
        let stats = s.update_player_position(50_000.0, 0.0, &mut scene).await;
        assert_eq!(stats.discarded_stale, 9);
        assert_eq!(stats.active, 9);
        assert!(s.active_keys().iter().all(|k| k.x >= 49));
        assert!(scene.roots().len() == 9);
    }

    #[tokio::test]
    async fn drain_applies_finished_loads() {
        let mut scene = Scene::new();
        let mut s = streamer(small_config());
        s.request(0.0, 0.0, &mut scene);
        let mut applied = 0;
        for _ in 0..100 {
            applied += s.drain_completed(&mut scene);
            if applied == 9 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(applied, 9);
        assert_eq!(s.stats().active, 9);
    }

    #[tokio::test]
    async fn failed_tiles_back_off() {
        let mut scene = Scene::new();
        let mut s = TileStreamer::new(
            StreamConfig {
                cities: Vec::new(),
                max_retry_backoff: 64,
                ..small_config()
            },
            CoordinateMapper::new(GeoPoint::new(89.99, 0.0)),
            offline_textures(),
        );
        // north is -z; tiles at z = -2 sit past the pole
        let bad = TileKey::new(0, -2);
        s.update_player_position(0.0, -1000.0, &mut scene).await;
        assert!(s.tile(bad).is_none());
        assert_eq!(s.failure_count(bad), 1);
        assert!(s.tile(TileKey::new(0, 0)).is_some());

        // first failure waits one update, so the next update retries
        s.update_player_position(0.0, -1000.0, &mut scene).await;
        assert_eq!(s.failure_count(bad), 2);
        // second failure waits two updates
        s.update_player_position(0.0, -1000.0, &mut scene).await;
        assert_eq!(s.failure_count(bad), 2);
        s.update_player_position(0.0, -1000.0, &mut scene).await;
        assert_eq!(s.failure_count(bad), 3);
    }

    #[tokio::test]
    async fn tile_owns_ground_and_buildings() {
        let mut scene = Scene::new();
        let mut s = streamer(small_config());
        s.update_player_position(0.0, 0.0, &mut scene).await;
        let tile = s.tile(TileKey::new(1, 0)).unwrap().clone();
        assert_eq!(
            scene.node(tile.root).unwrap().tag,
            NodeTag::Tile { x: 1, z: 0 }
        );
        let ground = scene.node(tile.ground).unwrap();
        let material = scene.material(ground.material.unwrap()).unwrap();
        assert!(scene.texture(material.texture.unwrap()).unwrap().is_fallback());
        assert_eq!(
            scene.node(tile.buildings).unwrap().children.len(),
            tile.building_count
        );
        // east of Manila by 1 km
        assert!(tile.geo.lng > MANILA.lng);
        assert!((tile.geo.lat - MANILA.lat).abs() < 1e-3);
    }
}
