//! Runtime configuration, loadable from YAML or JSON.

use std::path::{Path, PathBuf};

use geoworld_assets::{AvatarConfig, TextureConfig};
use geoworld_common::GeoPoint;
use geoworld_property::PropertyRendererConfig;
use geoworld_render::CameraConfig;
use geoworld_stream::StreamConfig;
use serde::{Deserialize, Serialize};

/// Default world anchor (Manila).
pub const DEFAULT_ORIGIN: GeoPoint = GeoPoint::new(14.5995, 120.9842);

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported config extension '{0}' (expected yaml, yml or json)")]
    UnsupportedFormat(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Movement and wandering parameters for players and NPCs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityConfig {
    /// World units per tick.
    pub player_speed: f32,
    pub npc_speed: f32,
    pub heading_damping: f32,
    /// NPC wander targets are drawn from `[-extent, extent]` on both axes.
    pub wander_extent: f32,
    /// Chance per tick that a moving NPC picks a new target.
    pub wander_probability: f64,
    /// How far ahead of the player a movement intent places the target.
    pub movement_lookahead: f32,
    pub player_color: u32,
    pub npc_color: u32,
}

impl Default for EntityConfig {
    fn default() -> Self {
        Self {
            player_speed: 25.0,
            npc_speed: 4.0,
            heading_damping: 0.1,
            wander_extent: 500.0,
            wander_probability: 0.001,
            movement_lookahead: 100.0,
            player_color: 0x00a8ff,
            npc_color: 0xff8844,
        }
    }
}

/// Base ground, street grid, placement and viewport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub ground_size: f32,
    pub ground_zoom: u8,
    pub ground_texture_size: u32,
    pub street_extent: f32,
    pub street_spacing: f32,
    pub placement_enabled: bool,
    /// Placement positions snap to multiples of this.
    pub placement_grid: f32,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            ground_size: 6000.0,
            ground_zoom: 13,
            ground_texture_size: 512,
            street_extent: 6000.0,
            street_spacing: 200.0,
            placement_enabled: false,
            placement_grid: 10.0,
            viewport_width: 1280,
            viewport_height: 720,
        }
    }
}

/// Everything a [`crate::WorldRuntime`] is built from. Every field is optional in files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub origin: GeoPoint,
    pub world: WorldConfig,
    pub entities: EntityConfig,
    pub camera: CameraConfig,
    pub stream: StreamConfig,
    pub textures: TextureConfig,
    pub avatars: AvatarConfig,
    pub properties: PropertyRendererConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            origin: DEFAULT_ORIGIN,
            world: WorldConfig::default(),
            entities: EntityConfig::default(),
            camera: CameraConfig::default(),
            stream: StreamConfig::default(),
            textures: TextureConfig::default(),
            avatars: AvatarConfig::default(),
            properties: PropertyRendererConfig::default(),
        }
    }
}

impl RuntimeConfig {
    /// Load from a `.yaml`/`.yml` or `.json` file and validate.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let config = match ext.as_str() {
            "yaml" | "yml" => Self::from_yaml_str(&text)?,
            "json" => Self::from_json_str(&text)?,
            other => return Err(ConfigError::UnsupportedFormat(other.to_string())),
        };
        tracing::info!(path = %path.display(), "loaded runtime config");
        Ok(config)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));
        if !self.origin.is_valid() {
            return invalid("origin is outside the valid latitude/longitude range");
        }
        if !(self.stream.tile_size > 0.0) {
            return invalid("stream.tile_size must be positive");
        }
        if !(self.stream.load_distance > 0.0) {
            return invalid("stream.load_distance must be positive");
        }
        if self.stream.neighborhood_radius < 0 {
            return invalid("stream.neighborhood_radius must not be negative");
        }
        if !(self.entities.wander_extent.is_finite() && self.entities.wander_extent >= 0.0) {
            return invalid("entities.wander_extent must be finite and not negative");
        }
        if !(0.0..=1.0).contains(&self.entities.wander_probability) {
            return invalid("entities.wander_probability must be within [0, 1]");
        }
        if !(self.entities.player_speed >= 0.0 && self.entities.npc_speed >= 0.0) {
            return invalid("entity speeds must not be negative");
        }
        if !(self.world.placement_grid > 0.0) {
            return invalid("world.placement_grid must be positive");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geoworld_render::CameraMode;
    use std::io::Write;

    #[test]
    fn empty_yaml_gives_defaults() {
        let config = RuntimeConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config, RuntimeConfig::default());
    }

    #[test]
    fn partial_yaml_overrides_only_named_fields() {
        let yaml = "
origin: { lat: 10.3157, lng: 123.8854 }
entities:
  player_speed: 40
camera:
  mode: { mode: top_down, height: 800 }
stream:
  tile_size: 500
";
        let config = RuntimeConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.origin, GeoPoint::new(10.3157, 123.8854));
        assert_eq!(config.entities.player_speed, 40.0);
        assert_eq!(config.entities.npc_speed, 4.0);
        assert_eq!(config.camera.mode, CameraMode::TopDown { height: 800.0 });
        assert_eq!(config.stream.tile_size, 500.0);
        assert_eq!(config.stream.load_distance, 3000.0);
    }

    #[test]
    fn loads_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let json = dir.path().join("world.json");
        std::fs::File::create(&json)
            .unwrap()
            .write_all(br#"{"world":{"placement_enabled":true}}"#)
            .unwrap();
        assert!(RuntimeConfig::load(&json).unwrap().world.placement_enabled);

        let yaml = dir.path().join("world.yml");
        std::fs::write(&yaml, "entities: { wander_extent: 50 }\n").unwrap();
        assert_eq!(RuntimeConfig::load(&yaml).unwrap().entities.wander_extent, 50.0);

        let toml = dir.path().join("world.toml");
        std::fs::write(&toml, "").unwrap();
        assert!(matches!(
            RuntimeConfig::load(&toml),
            Err(ConfigError::UnsupportedFormat(ext)) if ext == "toml"
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = RuntimeConfig::load(dir.path().join("nope.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(matches!(
            RuntimeConfig::from_yaml_str("stream: { tile_size: 0 }"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            RuntimeConfig::from_json_str(r#"{"entities":{"wander_probability":2}}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            RuntimeConfig::from_yaml_str("origin: { lat: 95, lng: 0 }"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            RuntimeConfig::from_yaml_str("entities: { wander_extent: -5 }"),
            Err(ConfigError::Invalid(_))
        ));
        let mut config = RuntimeConfig::default();
        config.entities.wander_extent = f32::INFINITY;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn yaml_round_trip() {
        let config = RuntimeConfig::default();
        let text = config.to_yaml().unwrap();
        assert_eq!(RuntimeConfig::from_yaml_str(&text).unwrap(), config);
    }
}
