use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use geoworld_assets::{AvatarLibrary, Fetcher, OfflineFetcher, TextureProvider};
use geoworld_common::{CoordinateMapper, EntityKey, PropertyId, Transform, WorldPoint};
use geoworld_input::{Action, InputEvent, InputMapper};
use geoworld_kernel::{
    Entity, EntityKind, EntityRegistry, Geometry, Material, MaterialKind, Motion, NodeHandle,
    NodeTag, Scene,
};
use geoworld_property::{Property, PropertyError, PropertyRenderer, RenderReport, parse_properties_lenient};
use geoworld_render::{
    Camera, CameraUpdate, DebugTextRenderer, PickTarget, RenderView, Renderer, Ray, Tracked, pick,
};
use geoworld_stream::{FrameTimer, StreamStats, TileStreamer};
use glam::{Vec2, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::time::MissedTickBehavior;

use crate::avatar::{self, Identity};
use crate::callbacks::Callbacks;
use crate::config::RuntimeConfig;
use crate::inspector::{EntityInfo, RuntimeSummary};
use crate::jobs::{Job, ProgressBar};

const FRAME_WINDOW: usize = 120;

/// What a pointer click resolved to.
#[derive(Debug, Clone, PartialEq)]
pub enum ClickOutcome {
    Player(EntityKey),
    Npc(EntityKey),
    Property(PropertyId),
    Placement(WorldPoint),
}

/// The world: entities, camera, streamed tiles, properties and jobs over one scene.
///
/// All mutation happens through `&mut self` on the tick thread. Ticking and
/// streaming must run inside a tokio runtime.
pub struct WorldRuntime {
    config: RuntimeConfig,
    scene: Scene,
    mapper: CoordinateMapper,
    camera: Camera,
    input: InputMapper,
    players: EntityRegistry,
    npcs: EntityRegistry,
    selected: Option<EntityKey>,
    intent: Vec2,
    textures: Arc<TextureProvider>,
    avatars: AvatarLibrary,
    streamer: TileStreamer,
    properties: PropertyRenderer,
    jobs: BTreeMap<EntityKey, Job>,
    callbacks: Callbacks,
    ground: Option<NodeHandle>,
    streets: Option<NodeHandle>,
    placement_enabled: bool,
    running: bool,
    destroyed: bool,
    frame: u64,
    frame_timer: FrameTimer,
    rng: StdRng,
}

fn finite_or_zero(v: f32) -> f32 {
    if v.is_finite() { v } else { 0.0 }
}

impl WorldRuntime {
    /// Invalid wander settings are neutralised on the tick rather than rejected
    /// here; they are reported once at construction.
    pub fn new(config: RuntimeConfig, fetcher: Arc<dyn Fetcher>) -> Self {
        if let Err(error) = config.validate() {
            tracing::warn!(%error, "runtime built from an invalid config");
        }
        let mapper = CoordinateMapper::new(config.origin);
        let textures = Arc::new(TextureProvider::new(config.textures.clone(), Arc::clone(&fetcher)));
        let avatars = AvatarLibrary::new(&config.avatars, fetcher);
        let streamer = TileStreamer::new(config.stream.clone(), mapper, Arc::clone(&textures));
        let properties = PropertyRenderer::new(config.properties, mapper);
        let mut camera = Camera::new(config.camera);
        camera.set_viewport(config.world.viewport_width, config.world.viewport_height);

        let mut runtime = Self {
            input: InputMapper::new(config.world.viewport_width, config.world.viewport_height),
            placement_enabled: config.world.placement_enabled,
            rng: StdRng::seed_from_u64(config.stream.seed),
            config,
            scene: Scene::new(),
            mapper,
            camera,
            players: EntityRegistry::new(),
            npcs: EntityRegistry::new(),
            selected: None,
            intent: Vec2::ZERO,
            textures,
            avatars,
            streamer,
            properties,
            jobs: BTreeMap::new(),
            callbacks: Callbacks::new(),
            ground: None,
            streets: None,
            running: false,
            destroyed: false,
            frame: 0,
            frame_timer: FrameTimer::new(FRAME_WINDOW),
        };
        runtime.build_base();
        tracing::info!(origin = %runtime.config.origin, "world runtime created");
        runtime
    }

    /// Runtime whose imagery and avatar fetches always fail over to local fallbacks.
    pub fn offline(config: RuntimeConfig) -> Self {
        Self::new(config, Arc::new(OfflineFetcher))
    }

    fn build_base(&mut self) {
        let world = self.config.world;
        let texture = Arc::new(self.textures.fallback(world.ground_texture_size));
        let texture = self.scene.create_texture(texture);
        let ground = self.scene.add_mesh(
            None,
            "ground",
            Geometry::Plane {
                width: world.ground_size,
                depth: world.ground_size,
            },
            Material::new(MaterialKind::Standard, 0xffffff).with_texture(texture),
            Transform::from_position(Vec3::new(0.0, -0.5, 0.0)),
        );
        self.scene.set_tag(ground, NodeTag::Ground);

        let streets = self.scene.add_mesh(
            None,
            "streets",
            Geometry::Lines {
                extent: world.street_extent,
                spacing: world.street_spacing,
            },
            Material::new(MaterialKind::Line, 0x444444),
            Transform::from_position(Vec3::new(0.0, 0.1, 0.0)),
        );
        self.scene.set_tag(streets, NodeTag::Streets);
        self.ground = Some(ground);
        self.streets = Some(streets);
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn mapper(&self) -> &CoordinateMapper {
        &self.mapper
    }

    pub fn streamer(&self) -> &TileStreamer {
        &self.streamer
    }

    pub fn properties(&self) -> &PropertyRenderer {
        &self.properties
    }

    pub fn textures(&self) -> &Arc<TextureProvider> {
        &self.textures
    }

    pub fn callbacks_mut(&mut self) -> &mut Callbacks {
        &mut self.callbacks
    }

    pub fn player(&self, key: &EntityKey) -> Option<&Entity> {
        self.players.get(key)
    }

    pub fn npc(&self, key: &EntityKey) -> Option<&Entity> {
        self.npcs.get(key)
    }

    pub fn players(&self) -> impl Iterator<Item = &Entity> {
        self.players.iter()
    }

    pub fn npcs(&self) -> impl Iterator<Item = &Entity> {
        self.npcs.iter()
    }

    pub fn selected(&self) -> Option<&EntityKey> {
        self.selected.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn ground(&self) -> Option<NodeHandle> {
        self.ground
    }

    pub fn streets(&self) -> Option<NodeHandle> {
        self.streets
    }

    pub fn has_job(&self, key: &EntityKey) -> bool {
        self.jobs.contains_key(key)
    }

    pub fn set_placement_enabled(&mut self, enabled: bool) {
        self.placement_enabled = enabled;
    }

    // --- entities ---

    /// Add a player, loading its avatar model when a URL is given.
    /// The first player becomes the selected one. Returns false for duplicates.
    pub async fn add_player(&mut self, identity: Identity, position: WorldPoint) -> bool {
        if self.destroyed || self.players.contains(&identity.id) {
            tracing::warn!(key = %identity.id, "player not added");
            return false;
        }
        let model = match identity.avatar_url.as_deref() {
            Some(url) => match self.avatars.load(url).await {
                Ok(model) => Some(model),
                Err(e) => {
                    tracing::warn!(key = %identity.id, error = %e, "avatar unavailable, using placeholder");
                    None
                }
            },
            None => None,
        };
        let key = identity.id.clone();
        let entity = self.spawn(EntityKind::Player, identity, position, model);
        self.players.insert(entity);
        if self.selected.is_none() {
            self.selected = Some(key.clone());
        }
        tracing::debug!(%key, x = position.x, z = position.z, "player added");
        true
    }

    /// Add a wandering NPC with a placeholder figure. Returns false for duplicates.
    pub fn add_npc(&mut self, identity: Identity, position: WorldPoint) -> bool {
        if self.destroyed || self.npcs.contains(&identity.id) {
            tracing::warn!(key = %identity.id, "npc not added");
            return false;
        }
        let entity = self.spawn(EntityKind::Npc, identity, position, None);
        tracing::debug!(key = %entity.key, "npc added");
        self.npcs.insert(entity);
        true
    }

    fn spawn(
        &mut self,
        kind: EntityKind,
        identity: Identity,
        position: WorldPoint,
        model: Option<Arc<geoworld_assets::AvatarModel>>,
    ) -> Entity {
        let (label, tag, color) = match kind {
            EntityKind::Player => (
                "player",
                NodeTag::Player(identity.id.clone()),
                self.config.entities.player_color,
            ),
            EntityKind::Npc => (
                "npc",
                NodeTag::Npc(identity.id.clone()),
                self.config.entities.npc_color,
            ),
        };
        let root = self.scene.add_group(
            None,
            format!("{label} {}", identity.id),
            Transform::from_position(position.to_vec3(0.0)),
        );
        self.scene.set_tag(root, tag);
        let figure = match &model {
            Some(model) => avatar::from_model(&mut self.scene, root, model, color),
            None => avatar::placeholder(&mut self.scene, root, color),
        };
        let plate = avatar::nameplate(
            &mut self.scene,
            root,
            &identity.display_name,
            self.camera.config().nameplates,
        );
        let mut entity = Entity::new(identity.id, kind, identity.display_name, position, root, figure);
        entity.nameplate = Some(plate);
        entity
    }

    /// Remove a player and everything it owns. Selection falls to the next player.
    pub fn remove_player(&mut self, key: &EntityKey) -> bool {
        let Some(entity) = self.players.remove(key) else {
            return false;
        };
        if let Some(job) = self.jobs.remove(key) {
            job.dispose(&mut self.scene, None);
        }
        self.scene.remove_subtree(entity.root);
        if self.selected.as_ref() == Some(key) {
            self.selected = self.players.first_key().cloned();
        }
        tracing::debug!(%key, "player removed");
        true
    }

    pub fn remove_npc(&mut self, key: &EntityKey) -> bool {
        let Some(entity) = self.npcs.remove(key) else {
            return false;
        };
        self.scene.remove_subtree(entity.root);
        true
    }

    /// Set where a player walks to.
    pub fn update_player_position(&mut self, key: &EntityKey, target: WorldPoint) -> bool {
        match self.players.get_mut(key) {
            Some(e) => {
                e.set_target(target);
                true
            }
            None => false,
        }
    }

    pub fn set_npc_target(&mut self, key: &EntityKey, target: WorldPoint) -> bool {
        match self.npcs.get_mut(key) {
            Some(e) => {
                e.set_target(target);
                true
            }
            None => false,
        }
    }

    pub fn select_player(&mut self, key: &EntityKey) -> bool {
        if !self.players.contains(key) {
            return false;
        }
        self.selected = Some(key.clone());
        self.callbacks.entity_selected(key);
        true
    }

    pub fn deselect(&mut self) {
        self.selected = None;
    }

    /// Steer the selected player: the target is kept `movement_lookahead` ahead
    /// along `direction` while the intent lasts. A zero direction stops in place.
    pub fn apply_movement_intent(&mut self, direction: Vec2) -> bool {
        self.intent = direction.normalize_or_zero();
        self.steer_selected()
    }

    fn steer_selected(&mut self) -> bool {
        let lookahead = self.config.entities.movement_lookahead;
        let intent = self.intent;
        let Some(player) = self.selected.as_ref().and_then(|k| self.players.get_mut(k)) else {
            return false;
        };
        let target = if intent == Vec2::ZERO {
            player.position
        } else {
            WorldPoint::new(
                player.position.x + intent.x * lookahead,
                player.position.z + intent.y * lookahead,
            )
        };
        player.set_target(target);
        true
    }

    // --- camera and input ---

    /// Apply a partial camera change; nameplate visibility follows immediately.
    pub fn set_camera(&mut self, update: CameraUpdate) {
        let before = self.camera.config().nameplates;
        self.camera.apply(update);
        let after = self.camera.config().nameplates;
        if before != after {
            self.show_nameplates(after);
        }
    }

    fn show_nameplates(&mut self, visible: bool) {
        let plates: Vec<NodeHandle> = self
            .players
            .iter()
            .chain(self.npcs.iter())
            .filter_map(|e| e.nameplate)
            .collect();
        for plate in plates {
            self.scene.set_visible(plate, visible);
        }
    }

    pub fn set_zoom(&mut self, zoom: f32) {
        self.camera.set_zoom(zoom);
    }

    /// Returns false for a zero-sized viewport, which is ignored.
    pub fn handle_resize(&mut self, width: u32, height: u32) -> bool {
        self.camera.set_viewport(width, height)
    }

    /// Map a raw input event and act on it.
    pub fn handle_input(&mut self, event: InputEvent) -> Option<ClickOutcome> {
        let action = self.input.handle(event);
        self.dispatch(action)
    }

    pub fn dispatch(&mut self, action: Action) -> Option<ClickOutcome> {
        if self.destroyed {
            return None;
        }
        match action {
            Action::Move(direction) => {
                self.apply_movement_intent(direction);
                None
            }
            Action::Click(ndc) => self.handle_click(ndc),
            Action::Select(key) => {
                self.select_player(&key);
                None
            }
            Action::Deselect => {
                self.deselect();
                None
            }
            Action::ZoomBy(factor) => {
                let zoom = self.camera.config().zoom * factor;
                self.set_zoom(zoom);
                None
            }
            Action::Resize { width, height } => {
                self.handle_resize(width, height);
                None
            }
            Action::Noop => None,
        }
    }

    /// Resolve a click at normalized device coordinates against the current camera.
    ///
    /// The nearest player, NPC or property marker wins. With nothing hit and
    /// placement enabled, the snapped ground point is confirmed instead.
    pub fn handle_click(&mut self, ndc: Vec2) -> Option<ClickOutcome> {
        if self.destroyed {
            return None;
        }
        let ray = Ray::from_ndc(ndc, self.camera.view_projection())?;
        if let Some(hit) = pick(&self.scene, &ray) {
            return match hit.target {
                PickTarget::Player(key) => {
                    self.select_player(&key);
                    Some(ClickOutcome::Player(key))
                }
                PickTarget::Npc(key) => {
                    self.callbacks.entity_selected(&key);
                    Some(ClickOutcome::Npc(key))
                }
                PickTarget::Property(id) => {
                    if let Some(property) = self.properties.property(&id) {
                        self.callbacks.property_clicked(property);
                    }
                    Some(ClickOutcome::Property(id))
                }
            };
        }
        if !self.placement_enabled {
            return None;
        }
        let ground = ray.intersect_ground(0.0)?;
        let grid = self.config.world.placement_grid;
        let snapped = WorldPoint::new((ground.x / grid).round() * grid, (ground.z / grid).round() * grid);
        tracing::debug!(x = snapped.x, z = snapped.z, "placement confirmed");
        self.callbacks.placement_confirmed(snapped);
        Some(ClickOutcome::Placement(snapped))
    }

    // --- properties ---

    pub fn render_properties(&mut self, properties: &[Property]) -> RenderReport {
        if self.destroyed {
            return RenderReport::default();
        }
        self.properties.render(&mut self.scene, properties)
    }

    /// Parse a JSON array of records, skipping invalid ones, and render them.
    pub fn render_properties_json(&mut self, json: &str) -> Result<RenderReport, PropertyError> {
        let properties = parse_properties_lenient(json)?;
        Ok(self.render_properties(&properties))
    }

    pub fn set_property_owned(&mut self, id: &PropertyId) -> bool {
        self.properties.set_owned(&mut self.scene, id)
    }

    // --- jobs ---

    /// Start a timed job on a player. Ignored (false) for unknown players or
    /// while the player already has a job.
    pub fn start_player_job(
        &mut self,
        key: &EntityKey,
        job_key: &str,
        duration: Duration,
        on_progress: impl FnMut(u8) + Send + 'static,
        on_complete: impl FnOnce() + Send + 'static,
    ) -> bool {
        if self.jobs.contains_key(key) {
            return false;
        }
        let Some(root) = self.players.get(key).map(|e| e.root) else {
            return false;
        };
        let bar = ProgressBar::build(&mut self.scene, root);
        let job = Job::new(job_key, duration, bar, Box::new(on_progress), Box::new(on_complete));
        tracing::debug!(%key, job = job_key, animation = ?job.animation, "job started");
        self.jobs.insert(key.clone(), job);
        true
    }

    /// Cancel a job without firing completion.
    pub fn stop_player_job(&mut self, key: &EntityKey) -> bool {
        let Some(job) = self.jobs.remove(key) else {
            return false;
        };
        let model = self.players.get(key).map(|e| e.model);
        job.dispose(&mut self.scene, model);
        true
    }

    // --- streaming and imagery ---

    fn viewer(&self) -> WorldPoint {
        self.selected
            .as_ref()
            .and_then(|k| self.players.get(k))
            .map_or(WorldPoint::ORIGIN, |e| e.position)
    }

    fn tracked(&self) -> Tracked {
        self.selected
            .as_ref()
            .and_then(|k| self.players.get(k))
            .map(|e| Tracked {
                position: e.position,
                heading: e.heading,
            })
            .unwrap_or_default()
    }

    /// Stream tiles around `at` and wait for every load to land.
    pub async fn update_stream_at(&mut self, at: WorldPoint) -> StreamStats {
        if self.destroyed {
            return self.streamer.stats();
        }
        self.streamer.update_player_position(at.x, at.z, &mut self.scene).await
    }

    /// Texture the base ground with imagery of the map centre.
    /// Returns true when provider imagery (not a fallback) was applied.
    pub async fn load_ground_imagery(&mut self) -> bool {
        let Some(material) = self
            .ground
            .and_then(|g| self.scene.node(g))
            .and_then(|n| n.material)
        else {
            return false;
        };
        let world = self.config.world;
        let texture = self
            .textures
            .get(self.mapper.anchor(), world.ground_zoom, world.ground_texture_size)
            .await;
        let imagery = !texture.is_fallback();
        if self.destroyed {
            return false;
        }
        let handle = self.scene.create_texture(texture);
        self.scene.replace_texture(material, handle);
        imagery
    }

    // --- loop ---

    pub fn start(&mut self) -> bool {
        if self.destroyed {
            return false;
        }
        if !self.running {
            tracing::info!("world runtime started");
        }
        self.running = true;
        true
    }

    pub fn stop(&mut self) {
        if self.running {
            tracing::info!(frame = self.frame, "world runtime stopped");
        }
        self.running = false;
    }

    /// One frame: move entities, wander NPCs, advance jobs, stream tiles and
    /// follow with the camera. Does nothing unless started.
    pub fn tick(&mut self, dt: Duration) -> bool {
        if !self.running || self.destroyed {
            return false;
        }
        self.frame += 1;
        let _span = tracing::trace_span!("frame", frame = self.frame).entered();

        if self.intent != Vec2::ZERO {
            self.steer_selected();
        }

        let entities = self.config.entities;
        let player_motion = Motion {
            speed: entities.player_speed,
            heading_damping: entities.heading_damping,
        };
        let npc_motion = Motion {
            speed: entities.npc_speed,
            heading_damping: entities.heading_damping,
        };

        let mut moved = Vec::new();
        for e in self.players.iter_mut() {
            if e.step(player_motion) {
                self.scene.set_transform(e.root, e.transform());
                moved.push((e.key.clone(), e.position));
            }
        }
        let extent = finite_or_zero(entities.wander_extent).abs();
        let p = if entities.wander_probability.is_finite() {
            entities.wander_probability.clamp(0.0, 1.0)
        } else {
            0.0
        };
        for e in self.npcs.iter_mut() {
            if e.step(npc_motion) {
                self.scene.set_transform(e.root, e.transform());
                moved.push((e.key.clone(), e.position));
            }
            if !e.moving || self.rng.gen_bool(p) {
                let target = WorldPoint::new(
                    self.rng.gen_range(-extent..=extent),
                    self.rng.gen_range(-extent..=extent),
                );
                e.set_target(target);
            }
        }

        let mut finished = Vec::new();
        for (key, job) in self.jobs.iter_mut() {
            let model = self.players.get(key).map(|e| e.model);
            if job.advance(dt, &mut self.scene, model) {
                finished.push(key.clone());
            }
        }
        for key in finished {
            if let Some(job) = self.jobs.remove(&key) {
                let model = self.players.get(&key).map(|e| e.model);
                job.dispose(&mut self.scene, model);
                tracing::debug!(%key, "job complete");
            }
        }

        let viewer = self.viewer();
        self.streamer.request(viewer.x, viewer.z, &mut self.scene);
        self.streamer.drain_completed(&mut self.scene);

        let tracked = self.tracked();
        self.camera.follow(tracked);

        for (key, position) in &moved {
            self.callbacks.entity_moved(key, *position);
        }
        self.frame_timer.record(dt);
        true
    }

    /// Tick at a fixed rate until `frames` have run or the loop is stopped.
    pub async fn run(&mut self, frames: u64, frame_time: Duration) -> u64 {
        let frame_time = frame_time.max(Duration::from_millis(1));
        let mut interval = tokio::time::interval(frame_time);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut ran = 0;
        while ran < frames {
            interval.tick().await;
            if !self.tick(frame_time) {
                break;
            }
            ran += 1;
        }
        ran
    }

    /// Dispose every scene resource and detach all listeners.
    /// Idempotent: returns false when already destroyed.
    pub fn destroy(&mut self) -> bool {
        if self.destroyed {
            return false;
        }
        self.destroyed = true;
        self.running = false;
        self.jobs.clear();
        self.streamer.clear(&mut self.scene);
        self.properties.clear(&mut self.scene);
        self.players.drain();
        self.npcs.drain();
        self.selected = None;
        self.intent = Vec2::ZERO;
        self.ground = None;
        self.streets = None;
        let listeners = self.callbacks.detach_all();
        let disposed = self.scene.dispose_all();
        self.textures.clear_cache();
        tracing::info!(%disposed, listeners, "world runtime destroyed");
        true
    }

    // --- inspection ---

    pub fn summary(&self) -> RuntimeSummary {
        let stream = self.streamer.stats();
        RuntimeSummary {
            frame: self.frame,
            running: self.running,
            players: self.players.len(),
            npcs: self.npcs.len(),
            selected: self.selected.clone(),
            active_tiles: stream.active,
            pending_tiles: stream.pending,
            properties: self.properties.len(),
            jobs: self.jobs.len(),
            resources: self.scene.stats(),
            average_frame: self.frame_timer.average(),
        }
    }

    pub fn inspect_entity(&self, key: &EntityKey) -> Option<EntityInfo> {
        let e = self.players.get(key).or_else(|| self.npcs.get(key))?;
        Some(EntityInfo {
            key: e.key.clone(),
            display_name: e.display_name.clone(),
            position: e.position,
            target: e.target,
            heading: e.heading,
            moving: e.moving,
        })
    }

    pub fn render_debug(&self) -> String {
        DebugTextRenderer::default().render(&self.scene, &RenderView::from(&self.camera))
    }
}

impl Drop for WorldRuntime {
    fn drop(&mut self) {
        self.destroy();
    }
}
