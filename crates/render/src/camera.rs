use glam::{Mat4, Vec3};
use geoworld_common::WorldPoint;
use serde::{Deserialize, Serialize};

pub const MIN_ZOOM: f32 = 0.3;
pub const MAX_ZOOM: f32 = 3.0;
pub const MIN_FOV: f32 = 20.0;
pub const MAX_FOV: f32 = 100.0;
pub const DEFAULT_FOV: f32 = 75.0;

/// Camera behaviour. Each variant carries only the parameters its pose needs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CameraMode {
    FirstPerson { head_height: f32 },
    TopDown { height: f32 },
    Isometric { height: f32, distance: f32, angle_deg: f32 },
    ThirdPerson { height: f32, distance: f32, look_height: f32 },
    /// Fixed pose, never driven by entities.
    Freecam { position: Vec3, look_at: Vec3 },
}

impl CameraMode {
    pub fn first_person() -> Self {
        Self::FirstPerson { head_height: 60.0 }
    }

    pub fn top_down() -> Self {
        Self::TopDown { height: 600.0 }
    }

    pub fn isometric() -> Self {
        Self::Isometric {
            height: 600.0,
            distance: 400.0,
            angle_deg: 45.0,
        }
    }

    pub fn third_person() -> Self {
        Self::ThirdPerson {
            height: 150.0,
            distance: 250.0,
            look_height: 60.0,
        }
    }

    /// Default parameters for a mode given by name (`first_person`, `topdown`, ...).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().replace(['-', '_', ' '], "").as_str() {
            "firstperson" => Some(Self::first_person()),
            "topdown" => Some(Self::top_down()),
            "isometric" => Some(Self::isometric()),
            "thirdperson" => Some(Self::third_person()),
            "freecam" => Some(Self::Freecam {
                position: Vec3::new(0.0, 800.0, 800.0),
                look_at: Vec3::ZERO,
            }),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::FirstPerson { .. } => "first_person",
            Self::TopDown { .. } => "top_down",
            Self::Isometric { .. } => "isometric",
            Self::ThirdPerson { .. } => "third_person",
            Self::Freecam { .. } => "freecam",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub mode: CameraMode,
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub zoom: f32,
    pub shadows: bool,
    pub fog: bool,
    pub nameplates: bool,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            mode: CameraMode::isometric(),
            fov: DEFAULT_FOV,
            zoom: 1.2,
            shadows: true,
            fog: true,
            nameplates: true,
        }
    }
}

/// Partial camera change; `None` keeps the current value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraUpdate {
    pub mode: Option<CameraMode>,
    pub fov: Option<f32>,
    pub zoom: Option<f32>,
    pub shadows: Option<bool>,
    pub fog: Option<bool>,
    pub nameplates: Option<bool>,
}

/// What the camera follows.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Tracked {
    pub position: WorldPoint,
    pub heading: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub look_at: Vec3,
}

/// Pose for `config` following `tracked`. Pure; recomputed every tick.
pub fn compute_pose(config: &CameraConfig, tracked: Tracked) -> Pose {
    let (x, z) = (tracked.position.x, tracked.position.z);
    let zoom = config.zoom;
    match config.mode {
        CameraMode::TopDown { height } => Pose {
            position: Vec3::new(x, height * zoom, z),
            look_at: Vec3::new(x, 0.0, z),
        },
        CameraMode::Isometric {
            height,
            distance,
            angle_deg,
        } => {
            let d = distance / zoom;
            let a = angle_deg.to_radians();
            Pose {
                position: Vec3::new(x + d * a.cos(), height * zoom / 1.5, z + d * a.sin()),
                look_at: Vec3::new(x, 40.0, z),
            }
        }
        CameraMode::ThirdPerson {
            height,
            distance,
            look_height,
        } => Pose {
            position: Vec3::new(x, height * zoom, z + distance / zoom),
            look_at: Vec3::new(x, look_height, z),
        },
        CameraMode::FirstPerson { head_height } => {
            let h = tracked.heading;
            Pose {
                position: Vec3::new(x, head_height, z),
                look_at: Vec3::new(x + h.sin() * 10.0, head_height - 2.0, z + h.cos() * 10.0),
            }
        }
        CameraMode::Freecam { position, look_at } => Pose { position, look_at },
    }
}

fn clamp_fov(fov: f32) -> f32 {
    if fov.is_finite() {
        fov.clamp(MIN_FOV, MAX_FOV)
    } else {
        DEFAULT_FOV
    }
}

/// Camera state: configuration, projection parameters and the current pose.
#[derive(Debug, Clone)]
pub struct Camera {
    config: CameraConfig,
    /// Field of view before zoom is applied.
    base_fov: f32,
    aspect: f32,
    pub near: f32,
    pub far: f32,
    pose: Pose,
}

impl Camera {
    /// `config.fov` is taken as the unzoomed field of view; the effective one
    /// is derived from `config.zoom`.
    pub fn new(config: CameraConfig) -> Self {
        let mut camera = Self {
            config,
            base_fov: clamp_fov(config.fov),
            aspect: 16.0 / 9.0,
            near: 1.0,
            far: 20_000.0,
            pose: Pose {
                position: Vec3::ZERO,
                look_at: Vec3::ZERO,
            },
        };
        camera.set_zoom(config.zoom);
        camera.pose = compute_pose(&camera.config, Tracked::default());
        camera
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    /// Apply a partial update. Takes effect on the next [`Camera::follow`].
    pub fn apply(&mut self, update: CameraUpdate) {
        if let Some(mode) = update.mode {
            self.config.mode = mode;
        }
        if let Some(fov) = update.fov {
            self.base_fov = clamp_fov(fov);
        }
        match update.zoom {
            Some(zoom) => self.set_zoom(zoom),
            None => self.set_zoom(self.config.zoom),
        }
        if let Some(shadows) = update.shadows {
            self.config.shadows = shadows;
        }
        if let Some(fog) = update.fog {
            self.config.fog = fog;
        }
        if let Some(nameplates) = update.nameplates {
            self.config.nameplates = nameplates;
        }
    }

    /// Clamp zoom to `[MIN_ZOOM, MAX_ZOOM]` and narrow the field of view to match.
    pub fn set_zoom(&mut self, zoom: f32) {
        let zoom = if zoom.is_finite() { zoom } else { 1.0 };
        self.config.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        self.config.fov = (self.base_fov / self.config.zoom).clamp(MIN_FOV, MAX_FOV);
    }

    /// Returns false (and changes nothing) for a zero-sized viewport.
    pub fn set_viewport(&mut self, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 {
            return false;
        }
        self.aspect = width as f32 / height as f32;
        true
    }

    /// Recompute the pose for the tracked target.
    pub fn follow(&mut self, tracked: Tracked) -> Pose {
        self.pose = compute_pose(&self.config, tracked);
        self.pose
    }

    pub fn view_matrix(&self) -> Mat4 {
        let dir = self.pose.look_at - self.pose.position;
        // looking straight down: screen-up is north (-z)
        let up = if dir.normalize_or_zero().abs().y > 0.999 {
            Vec3::NEG_Z
        } else {
            Vec3::Y
        };
        Mat4::look_at_rh(self.pose.position, self.pose.look_at, up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.config.fov.to_radians(), self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(CameraConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-3
    }

    fn tracked(x: f32, z: f32) -> Tracked {
        Tracked {
            position: WorldPoint::new(x, z),
            heading: 0.0,
        }
    }

    #[test]
    fn top_down_looks_straight_down() {
        let config = CameraConfig {
            mode: CameraMode::TopDown { height: 600.0 },
            zoom: 1.0,
            ..CameraConfig::default()
        };
        let pose = compute_pose(&config, tracked(100.0, 50.0));
        assert!(approx(pose.position, Vec3::new(100.0, 600.0, 50.0)));
        assert!(approx(pose.look_at, Vec3::new(100.0, 0.0, 50.0)));
    }

    #[test]
    fn isometric_orbits_at_angle() {
        let config = CameraConfig {
            mode: CameraMode::isometric(),
            zoom: 2.0,
            ..CameraConfig::default()
        };
        let pose = compute_pose(&config, tracked(0.0, 0.0));
        let d = 200.0 * std::f32::consts::FRAC_1_SQRT_2;
        assert!(approx(pose.position, Vec3::new(d, 800.0, d)));
        assert!(approx(pose.look_at, Vec3::new(0.0, 40.0, 0.0)));
    }

    #[test]
    fn third_person_sits_behind() {
        let config = CameraConfig {
            mode: CameraMode::third_person(),
            zoom: 1.0,
            ..CameraConfig::default()
        };
        let pose = compute_pose(&config, tracked(10.0, 20.0));
        assert!(approx(pose.position, Vec3::new(10.0, 150.0, 270.0)));
        assert!(approx(pose.look_at, Vec3::new(10.0, 60.0, 20.0)));
    }

    #[test]
    fn first_person_follows_heading() {
        let config = CameraConfig {
            mode: CameraMode::first_person(),
            ..CameraConfig::default()
        };
        let pose = compute_pose(
            &config,
            Tracked {
                position: WorldPoint::new(0.0, 0.0),
                heading: std::f32::consts::FRAC_PI_2,
            },
        );
        assert!(approx(pose.position, Vec3::new(0.0, 60.0, 0.0)));
        assert!(approx(pose.look_at, Vec3::new(10.0, 58.0, 0.0)));
    }

    #[test]
    fn freecam_ignores_tracked_entity() {
        let fixed = CameraMode::Freecam {
            position: Vec3::new(1.0, 2.0, 3.0),
            look_at: Vec3::ZERO,
        };
        let mut cam = Camera::new(CameraConfig {
            mode: fixed,
            ..CameraConfig::default()
        });
        let pose = cam.follow(tracked(500.0, 500.0));
        assert_eq!(pose.position, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn update_keeps_unset_fields() {
        let mut cam = Camera::default();
        cam.apply(CameraUpdate {
            fog: Some(false),
            ..CameraUpdate::default()
        });
        let c = cam.config();
        assert!(!c.fog);
        assert!(c.shadows && c.nameplates);
        assert_eq!(c.mode, CameraMode::isometric());
        assert!((c.fov - 75.0 / 1.2).abs() < 1e-4);
    }

    #[test]
    fn initial_fov_follows_initial_zoom() {
        let cam = Camera::default();
        let mut zoomed = Camera::default();
        zoomed.set_zoom(1.2);
        assert_eq!(cam.config().zoom, 1.2);
        assert!((cam.config().fov - 62.5).abs() < 1e-4);
        assert_eq!(cam.config().fov, zoomed.config().fov);

        let wide = Camera::new(CameraConfig {
            fov: 500.0,
            zoom: 1.0,
            ..CameraConfig::default()
        });
        assert_eq!(wide.config().fov, MAX_FOV);
        let broken = Camera::new(CameraConfig {
            fov: f32::NAN,
            zoom: 1.0,
            ..CameraConfig::default()
        });
        assert_eq!(broken.config().fov, DEFAULT_FOV);
    }

    #[test]
    fn mode_switch_applies_on_next_follow() {
        let mut cam = Camera::default();
        let before = cam.follow(tracked(0.0, 0.0));
        cam.apply(CameraUpdate {
            mode: Some(CameraMode::top_down()),
            ..CameraUpdate::default()
        });
        assert_eq!(cam.pose(), before);
        let after = cam.follow(tracked(0.0, 0.0));
        assert!(approx(after.look_at, Vec3::ZERO));
    }

    #[test]
    fn zoom_is_clamped_and_narrows_fov() {
        let mut cam = Camera::default();
        cam.set_zoom(10.0);
        assert_eq!(cam.config().zoom, MAX_ZOOM);
        assert!((cam.config().fov - 25.0).abs() < 1e-4);
        cam.set_zoom(0.01);
        assert_eq!(cam.config().zoom, MIN_ZOOM);
        assert_eq!(cam.config().fov, MAX_FOV);
    }

    #[test]
    fn zero_viewport_is_ignored() {
        let mut cam = Camera::default();
        assert!(!cam.set_viewport(0, 600));
        assert!(cam.set_viewport(800, 400));
        assert_eq!(cam.aspect(), 2.0);
    }

    #[test]
    fn top_down_view_matrix_is_finite() {
        let mut cam = Camera::new(CameraConfig {
            mode: CameraMode::top_down(),
            ..CameraConfig::default()
        });
        cam.follow(tracked(0.0, 0.0));
        assert!(cam.view_projection().is_finite());
    }

    #[test]
    fn modes_parse_from_names_and_serde() {
        assert_eq!(CameraMode::from_name("topdown"), Some(CameraMode::top_down()));
        assert_eq!(CameraMode::from_name("Third-Person"), Some(CameraMode::third_person()));
        assert!(CameraMode::from_name("orbit").is_none());

        let json = r#"{"mode":"top_down","height":300.0}"#;
        let mode: CameraMode = serde_json::from_str(json).unwrap();
        assert_eq!(mode, CameraMode::TopDown { height: 300.0 });
        let update: CameraUpdate = serde_json::from_str(r#"{"zoom": 2.0}"#).unwrap();
        assert_eq!(update.zoom, Some(2.0));
        assert!(update.mode.is_none());
    }
}
