//! Remote assets: geo-anchored imagery textures and avatar models.
//!
//! # Invariants
//! - [`TextureProvider::get`] always returns a usable texture; failures degrade to
//!   a procedural fallback which is never cached.
//! - Cache keys quantize coordinates, so nearby requests share one fetch.
//! - API keys never appear unmasked in logs.

pub mod avatar;
pub mod cache;
pub mod fallback;
pub mod fetch;
pub mod provider;
pub mod stylize;
pub mod textures;

pub use avatar::{AvatarConfig, AvatarError, AvatarLibrary, AvatarModel};
pub use cache::{CacheStats, TextureCache, TextureKey};
pub use fallback::fallback_texture;
pub use fetch::{FetchError, Fetcher, HttpFetcher, OfflineFetcher, redact_secrets};
pub use provider::{ImageryProvider, ProviderKind, select_provider};
pub use stylize::{StylizeParams, stylize};
pub use textures::{TextureConfig, TextureError, TextureProvider};

pub fn crate_info() -> &'static str {
    "geoworld-assets v0.1.0"
}

#[cfg(test)]
mod tests {
    #[test]
    fn crate_info_names_the_crate() {
        assert!(super::crate_info().starts_with("geoworld-assets"));
    }
}
