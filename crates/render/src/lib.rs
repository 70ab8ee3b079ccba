//! Rendering adapter: camera state machine, picking and a renderer-agnostic interface.
//!
//! # Invariants
//! - Renderers read the scene; they never mutate it.
//! - Every camera mode except freecam is a pure function of configuration and tracked entity.
//! - Picking resolves at most one target: the nearest hit.
//!
//! # Workaround
//! Ships a debug text renderer instead of a GPU backend. The [`Renderer`] trait is
//! the seam; a GPU implementation can be swapped in without changing consumers.

mod camera;
mod picking;
mod renderer;

pub use camera::{
    Camera, CameraConfig, CameraMode, CameraUpdate, DEFAULT_FOV, MAX_FOV, MAX_ZOOM, MIN_FOV, MIN_ZOOM, Pose,
    Tracked, compute_pose,
};
pub use picking::{PickHit, PickTarget, Ray, owner_of, pick};
pub use renderer::{DebugTextRenderer, RenderView, Renderer};

pub fn crate_info() -> &'static str {
    "geoworld-render v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("render"));
    }
}
