//! Imagery provider configuration and URL building.

use geoworld_common::GeoPoint;
use reqwest::Url;
use serde::{Deserialize, Serialize};

/// Largest square size the static-map APIs serve.
pub const MAX_STATIC_SIZE: u32 = 640;
pub const MAX_ZOOM: u8 = 21;

const GOOGLE_STATIC_BASE: &str = "https://maps.googleapis.com/maps/api/staticmap";
const MAPBOX_STATIC_BASE: &str = "https://api.mapbox.com/styles/v1";
const MAPBOX_DEFAULT_STYLE: &str = "mapbox/satellite-v9";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    GoogleStatic,
    MapboxStatic,
    /// `base_url` with `{lat}`, `{lng}`, `{zoom}`, `{size}` and `{key}` placeholders.
    Template,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageryProvider {
    pub name: String,
    pub kind: ProviderKind,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Environment variable consulted when `api_key` is unset.
    #[serde(default)]
    pub api_key_env: Option<String>,
    /// Google `maptype` or Mapbox style id.
    #[serde(default)]
    pub style: Option<String>,
}

impl ImageryProvider {
    pub fn google_static(api_key: impl Into<String>) -> Self {
        Self {
            name: "google".into(),
            kind: ProviderKind::GoogleStatic,
            base_url: None,
            api_key: Some(api_key.into()),
            api_key_env: None,
            style: None,
        }
    }

    pub fn mapbox_static(api_key: impl Into<String>) -> Self {
        Self {
            name: "mapbox".into(),
            kind: ProviderKind::MapboxStatic,
            base_url: None,
            api_key: Some(api_key.into()),
            api_key_env: None,
            style: None,
        }
    }

    /// The configured key, else the one named by `api_key_env`. Blank keys count as missing.
    pub fn resolve_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| {
                self.api_key_env
                    .as_deref()
                    .and_then(|var| std::env::var(var).ok())
            })
            .filter(|k| !k.trim().is_empty())
    }

    /// Build the request URL for a square image centred on `geo`.
    /// Zoom and size are clamped to what the static-map APIs accept.
    pub fn build_url(&self, key: &str, geo: GeoPoint, zoom: u8, size: u32) -> Option<String> {
        let zoom = zoom.min(MAX_ZOOM);
        let size = size.clamp(1, MAX_STATIC_SIZE);
        match self.kind {
            ProviderKind::GoogleStatic => {
                let base = self.base_url.as_deref().unwrap_or(GOOGLE_STATIC_BASE);
                let maptype = self.style.as_deref().unwrap_or("satellite");
                let url = Url::parse_with_params(
                    base,
                    &[
                        ("center", format!("{},{}", geo.lat, geo.lng)),
                        ("zoom", zoom.to_string()),
                        ("size", format!("{size}x{size}")),
                        ("maptype", maptype.to_string()),
                        ("key", key.to_string()),
                    ],
                )
                .ok()?;
                Some(url.to_string())
            }
            ProviderKind::MapboxStatic => {
                let base = self.base_url.as_deref().unwrap_or(MAPBOX_STATIC_BASE);
                let style = self.style.as_deref().unwrap_or(MAPBOX_DEFAULT_STYLE);
                let raw = format!(
                    "{}/{style}/static/{},{},{zoom}/{size}x{size}",
                    base.trim_end_matches('/'),
                    geo.lng,
                    geo.lat
                );
                let url = Url::parse_with_params(&raw, &[("access_token", key)]).ok()?;
                Some(url.to_string())
            }
            ProviderKind::Template => {
                let template = self.base_url.as_deref()?;
                let filled = template
                    .replace("{lat}", &geo.lat.to_string())
                    .replace("{lng}", &geo.lng.to_string())
                    .replace("{zoom}", &zoom.to_string())
                    .replace("{size}", &size.to_string())
                    .replace("{key}", key);
                Url::parse(&filled).ok().map(|u| u.to_string())
            }
        }
    }
}

/// First provider in configuration order that has a usable key.
pub fn select_provider(providers: &[ImageryProvider]) -> Option<(&ImageryProvider, String)> {
    providers
        .iter()
        .find_map(|p| p.resolve_key().map(|key| (p, key)))
}
