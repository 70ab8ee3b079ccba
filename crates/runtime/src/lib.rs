//! World runtime: ties entities, camera, tile streaming, properties and jobs to one scene.
//!
//! # Invariants
//! - The scene, registries and tile set are mutated only through `&mut WorldRuntime` on the tick thread.
//! - At most one player is selected; removing it selects the next player, if any.
//! - `destroy` is idempotent and leaves zero live scene resources and no attached listeners.

pub mod avatar;
pub mod callbacks;
pub mod config;
pub mod inspector;
pub mod jobs;
mod runtime;

pub use avatar::Identity;
pub use callbacks::Callbacks;
pub use config::{ConfigError, DEFAULT_ORIGIN, EntityConfig, RuntimeConfig, WorldConfig};
pub use inspector::{EntityInfo, RuntimeSummary};
pub use jobs::{JobAnimation, MIN_JOB_DURATION};
pub use runtime::{ClickOutcome, WorldRuntime};

pub fn crate_info() -> &'static str {
    "geoworld-runtime v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("runtime"));
    }
}
