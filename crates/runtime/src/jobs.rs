//! Timed player jobs with a floating progress bar and a simple arm animation.

use std::sync::Arc;
use std::time::Duration;

use geoworld_common::Transform;
use geoworld_kernel::{Geometry, Material, MaterialKind, NodeHandle, NodeTag, Scene, Texture};
use glam::{Quat, Vec3};

use crate::avatar::{LEFT_ARM, RIGHT_ARM, find_child};

pub const MIN_JOB_DURATION: Duration = Duration::from_millis(200);
pub const BAR_WIDTH: f32 = 60.0;
pub const BAR_HEIGHT: f32 = 8.0;
pub const BAR_ELEVATION: f32 = 100.0;

const BAR_BACKGROUND: u32 = 0x111827;
const BAR_FILL: u32 = 0x2aef7a;

pub type ProgressFn = Box<dyn FnMut(u8) + Send>;
pub type CompleteFn = Box<dyn FnOnce() + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobAnimation {
    Typing,
    Hammer,
    Serve,
    Work,
}

impl JobAnimation {
    /// Guess the animation from a job key such as `software_dev` or `street_vendor`.
    pub fn from_key(key: &str) -> Self {
        let key = key.to_ascii_lowercase();
        let any = |words: &[&str]| words.iter().any(|w| key.contains(w));
        if any(&["dev", "program", "engineer", "coder", "data"]) {
            Self::Typing
        } else if any(&["construction", "carpenter", "mason", "welder", "driver"]) {
            Self::Hammer
        } else if any(&["grocery", "vendor", "waiter", "bartend", "food"]) {
            Self::Serve
        } else {
            Self::Work
        }
    }

    /// Left and right arm rotations `t` seconds into the job.
    pub fn arm_pose(self, t: f32) -> (Quat, Quat) {
        match self {
            Self::Typing => (
                Quat::from_rotation_z((t * 8.0).sin() * 0.25 - 0.25),
                Quat::from_rotation_z((t * 8.0).cos() * 0.25 - 0.25),
            ),
            Self::Hammer => (
                Quat::from_rotation_z((t * 3.0).sin() * 0.1 - 0.1),
                Quat::from_rotation_x((t * 6.0).sin() * 0.9 - 0.7),
            ),
            Self::Serve => (
                Quat::from_rotation_z((t * 4.0).sin() * 0.6 - 0.6),
                Quat::from_rotation_z((t * 4.0).cos() * 0.4 - 0.2),
            ),
            Self::Work => (
                Quat::from_rotation_z((t * 2.0).sin() * 0.2 - 0.1),
                Quat::from_rotation_z((t * 2.0).cos() * 0.2 - 0.1),
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressBar {
    pub root: NodeHandle,
    pub fill: NodeHandle,
    pub label: NodeHandle,
}

impl ProgressBar {
    pub fn build(scene: &mut Scene, parent: NodeHandle) -> Self {
        let root = scene.add_group(
            Some(parent),
            "progress",
            Transform::from_position(Vec3::new(0.0, BAR_ELEVATION, 0.0)),
        );
        scene.set_tag(root, NodeTag::ProgressBar);
        scene.add_mesh(
            Some(root),
            "border",
            Geometry::Sprite {
                width: BAR_WIDTH + 2.0,
                height: BAR_HEIGHT + 2.0,
            },
            Material::new(MaterialKind::Basic, 0xffffff).with_opacity(0.6),
            Transform::from_position(Vec3::new(0.0, 0.0, -0.02)),
        );
        scene.add_mesh(
            Some(root),
            "background",
            Geometry::Sprite {
                width: BAR_WIDTH,
                height: BAR_HEIGHT,
            },
            Material::new(MaterialKind::Basic, BAR_BACKGROUND).with_opacity(0.85),
            Transform::from_position(Vec3::new(0.0, 0.0, -0.01)),
        );
        let fill = scene.add_mesh(
            Some(root),
            "fill",
            Geometry::Sprite {
                width: BAR_WIDTH,
                height: BAR_HEIGHT,
            },
            Material::new(MaterialKind::Basic, BAR_FILL),
            fill_transform(0.0),
        );
        let text = scene.create_texture(Arc::new(Texture::label("0%", 128, 64)));
        let label = scene.add_mesh(
            Some(root),
            "label",
            Geometry::Sprite {
                width: 40.0,
                height: 20.0,
            },
            Material::new(MaterialKind::Sprite, 0xffffff).with_texture(text),
            Transform::from_position(Vec3::new(0.0, 14.0, 0.0)),
        );
        Self { root, fill, label }
    }

    fn show(&self, scene: &mut Scene, fraction: f32, percent: u8) {
        scene.set_transform(self.fill, fill_transform(fraction));
        if let Some(material) = scene.node(self.label).and_then(|n| n.material) {
            let text = scene.create_texture(Arc::new(Texture::label(format!("{percent}%"), 128, 64)));
            scene.replace_texture(material, text);
        }
    }
}

/// Fill scaled along x with its left edge pinned.
fn fill_transform(fraction: f32) -> Transform {
    let x = -BAR_WIDTH * 0.5 + fraction * BAR_WIDTH * 0.5;
    Transform::from_position(Vec3::new(x, 0.0, 0.0)).with_scale(Vec3::new(fraction.max(1e-3), 1.0, 1.0))
}

/// A running job. Time advances only through [`Job::advance`].
pub struct Job {
    pub key: String,
    pub animation: JobAnimation,
    duration: Duration,
    elapsed: Duration,
    last_percent: Option<u8>,
    bar: ProgressBar,
    on_progress: ProgressFn,
    on_complete: Option<CompleteFn>,
}

impl Job {
    pub fn new(
        key: impl Into<String>,
        duration: Duration,
        bar: ProgressBar,
        on_progress: ProgressFn,
        on_complete: CompleteFn,
    ) -> Self {
        let key = key.into();
        Self {
            animation: JobAnimation::from_key(&key),
            key,
            duration: duration.max(MIN_JOB_DURATION),
            elapsed: Duration::ZERO,
            last_percent: None,
            bar,
            on_progress,
            on_complete: Some(on_complete),
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn fraction(&self) -> f32 {
        (self.elapsed.as_secs_f32() / self.duration.as_secs_f32()).min(1.0)
    }

    pub fn percent(&self) -> u8 {
        (self.fraction() * 100.0).floor() as u8
    }

    pub fn bar(&self) -> ProgressBar {
        self.bar
    }

    /// Advance by `dt`, report progress and animate `model`'s arms.
    /// Returns true once the job has completed; completion fires exactly once.
    pub fn advance(&mut self, dt: Duration, scene: &mut Scene, model: Option<NodeHandle>) -> bool {
        self.elapsed += dt;
        let fraction = self.fraction();
        let percent = self.percent();
        (self.on_progress)(percent);
        if self.last_percent != Some(percent) {
            self.bar.show(scene, fraction, percent);
            self.last_percent = Some(percent);
        }
        if let Some(model) = model {
            let (left, right) = self.animation.arm_pose(self.elapsed.as_secs_f32());
            set_arm(scene, model, LEFT_ARM, left);
            set_arm(scene, model, RIGHT_ARM, right);
        }
        if fraction >= 1.0 {
            if let Some(done) = self.on_complete.take() {
                done();
            }
            return true;
        }
        false
    }

    /// Remove the bar and rest the arms. Completion is not fired.
    pub fn dispose(self, scene: &mut Scene, model: Option<NodeHandle>) {
        scene.remove_subtree(self.bar.root);
        if let Some(model) = model {
            set_arm(scene, model, LEFT_ARM, Quat::IDENTITY);
            set_arm(scene, model, RIGHT_ARM, Quat::IDENTITY);
        }
    }
}

fn set_arm(scene: &mut Scene, model: NodeHandle, name: &str, rotation: Quat) {
    let Some(arm) = find_child(scene, model, name) else {
        return;
    };
    if let Some(node) = scene.node_mut(arm) {
        node.transform.rotation = rotation;
    }
}

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job")
            .field("key", &self.key)
            .field("animation", &self.animation)
            .field("duration", &self.duration)
            .field("elapsed", &self.elapsed)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::avatar::placeholder;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn animation_from_key() {
        assert_eq!(JobAnimation::from_key("Software_Dev"), JobAnimation::Typing);
        assert_eq!(JobAnimation::from_key("jeepney_driver"), JobAnimation::Hammer);
        assert_eq!(JobAnimation::from_key("street_vendor"), JobAnimation::Serve);
        assert_eq!(JobAnimation::from_key("farmer"), JobAnimation::Work);
    }

    fn job(scene: &mut Scene, parent: NodeHandle, duration_ms: u64) -> (Job, Arc<Mutex<Vec<u8>>>, Arc<AtomicUsize>) {
        let progress = Arc::new(Mutex::new(Vec::new()));
        let done = Arc::new(AtomicUsize::new(0));
        let p = Arc::clone(&progress);
        let d = Arc::clone(&done);
        let bar = ProgressBar::build(scene, parent);
        let job = Job::new(
            "coder",
            Duration::from_millis(duration_ms),
            bar,
            Box::new(move |pct| p.lock().unwrap().push(pct)),
            Box::new(move || {
                d.fetch_add(1, Ordering::SeqCst);
            }),
        );
        (job, progress, done)
    }

    #[test]
    fn reports_percent_and_completes_once() {
        let mut scene = Scene::new();
        let root = scene.add_group(None, "player", Transform::default());
        let (mut job, progress, done) = job(&mut scene, root, 1000);
        assert!(!job.advance(Duration::from_millis(250), &mut scene, None));
        assert!(!job.advance(Duration::from_millis(500), &mut scene, None));
        assert!(job.advance(Duration::from_millis(500), &mut scene, None));
        assert!(job.advance(Duration::from_millis(10), &mut scene, None));
        assert_eq!(*progress.lock().unwrap(), vec![25, 75, 100, 100]);
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn short_durations_are_raised_to_the_minimum() {
        let mut scene = Scene::new();
        let root = scene.add_group(None, "player", Transform::default());
        let (mut job, _, done) = job(&mut scene, root, 10);
        assert_eq!(job.duration(), MIN_JOB_DURATION);
        assert!(!job.advance(Duration::from_millis(100), &mut scene, None));
        assert_eq!(done.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn label_texture_is_replaced_not_leaked() {
        let mut scene = Scene::new();
        let root = scene.add_group(None, "player", Transform::default());
        let (mut job, _, _) = job(&mut scene, root, 1000);
        let before = scene.stats();
        for _ in 0..5 {
            job.advance(Duration::from_millis(100), &mut scene, None);
        }
        assert_eq!(scene.stats(), before);
    }

    #[test]
    fn dispose_removes_bar_and_rests_arms() {
        let mut scene = Scene::new();
        let root = scene.add_group(None, "player", Transform::default());
        let model = placeholder(&mut scene, root, 0xffffff);
        let (mut job, _, _) = job(&mut scene, root, 1000);
        let bar = job.bar().root;
        job.advance(Duration::from_millis(300), &mut scene, Some(model));
        let arm = find_child(&scene, model, LEFT_ARM).unwrap();
        assert_ne!(scene.node(arm).unwrap().transform.rotation, Quat::IDENTITY);

        job.dispose(&mut scene, Some(model));
        assert!(!scene.contains(bar));
        assert_eq!(scene.node(arm).unwrap().transform.rotation, Quat::IDENTITY);
    }
}
