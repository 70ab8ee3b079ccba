//! Geo-anchored imagery textures with a bounded cache and a procedural fallback.

use std::sync::Arc;

use geoworld_common::GeoPoint;
use geoworld_kernel::{Texture, TextureOrigin};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::cache::{CacheStats, TextureCache, TextureKey};
use crate::fallback::fallback_texture;
use crate::fetch::{FetchError, Fetcher};
use crate::provider::{ImageryProvider, select_provider};
use crate::stylize::{StylizeParams, stylize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureConfig {
    /// Tried in order; the first with a usable key is used.
    pub providers: Vec<ImageryProvider>,
    pub cache_capacity: usize,
    /// Decimals kept when quantizing coordinates into cache keys.
    pub precision: u32,
    pub stylize: StylizeParams,
    /// Largest side of a generated fallback texture.
    pub fallback_size: u32,
}

impl Default for TextureConfig {
    fn default() -> Self {
        Self {
            providers: Vec::new(),
            cache_capacity: 256,
            precision: 4,
            stylize: StylizeParams::default(),
            fallback_size: 512,
        }
    }
}

/// Why imagery could not be produced. Never surfaced to callers of
/// [`TextureProvider::get`]; logged before falling back.
#[derive(Debug, thiserror::Error)]
pub enum TextureError {
    #[error("no imagery provider has an API key")]
    NoProvider,
    #[error("provider '{0}' produced an invalid URL")]
    InvalidUrl(String),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("image decode failed: {0}")]
    Decode(#[from] image::ImageError),
}

pub struct TextureProvider {
    config: TextureConfig,
    fetcher: Arc<dyn Fetcher>,
    cache: Mutex<TextureCache>,
}

impl TextureProvider {
    pub fn new(config: TextureConfig, fetcher: Arc<dyn Fetcher>) -> Self {
        let cache = Mutex::new(TextureCache::new(config.cache_capacity));
        Self {
            config,
            fetcher,
            cache,
        }
    }

    pub fn config(&self) -> &TextureConfig {
        &self.config
    }

    /// Stylized imagery for a `size`x`size` area centred on `geo`.
    ///
    /// Never fails: any provider, network or decode problem yields a fallback
    /// texture instead. Only imagery results are cached.
    pub async fn get(&self, geo: GeoPoint, zoom: u8, size: u32) -> Arc<Texture> {
        let key = TextureKey::quantize(geo, zoom, size, self.config.precision);
        let cached = self.cache.lock().get(&key);
        if let Some(hit) = cached {
            return hit;
        }

        match self.fetch_stylized(geo, zoom, size).await {
            Ok(texture) => {
                let texture = Arc::new(texture);
                self.cache.lock().insert(key, Arc::clone(&texture));
                texture
            }
            Err(e) => {
                tracing::warn!(%geo, zoom, error = %e, "imagery unavailable, using fallback");
                Arc::new(self.fallback(size))
            }
        }
    }

    /// A fresh fallback texture, capped at the configured fallback size.
    pub fn fallback(&self, size: u32) -> Texture {
        fallback_texture(size.min(self.config.fallback_size), &mut rand::thread_rng())
    }

    async fn fetch_stylized(&self, geo: GeoPoint, zoom: u8, size: u32) -> Result<Texture, TextureError> {
        let (provider, key) =
            select_provider(&self.config.providers).ok_or(TextureError::NoProvider)?;
        let url = provider
            .build_url(&key, geo, zoom, size)
            .ok_or_else(|| TextureError::InvalidUrl(provider.name.clone()))?;
        let bytes = self.fetcher.fetch(&url).await?;
        let decoded = image::load_from_memory(&bytes)?;
        let styled = stylize(&decoded, size, self.config.stylize);
        let (width, height) = styled.dimensions();
        Ok(Texture {
            width,
            height,
            rgba: styled.into_raw(),
            origin: TextureOrigin::Imagery {
                provider: provider.name.clone(),
            },
        })
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.lock().stats()
    }

    pub fn clear_cache(&self) {
        self.cache.lock().clear();
        tracing::debug!("texture cache cleared");
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures::future::BoxFuture;
    use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};

    /// Serves a fixed body and counts requests.
    pub(crate) struct StubFetcher {
        pub body: Option<Vec<u8>>,
        pub calls: AtomicUsize,
    }

    impl StubFetcher {
        pub fn serving(body: Vec<u8>) -> Arc<Self> {
            Arc::new(Self {
                body: Some(body),
                calls: AtomicUsize::new(0),
            })
        }

        pub fn failing() -> Arc<Self> {
            Arc::new(Self {
                body: None,
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl Fetcher for StubFetcher {
        fn fetch<'a>(&'a self, _url: &'a str) -> BoxFuture<'a, Result<Vec<u8>, FetchError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let result = self
                .body
                .clone()
                .ok_or_else(|| FetchError::Unavailable("stub".into()));
            Box::pin(async move { result })
        }
    }

    pub(crate) fn png_bytes() -> Vec<u8> {
        let img = RgbaImage::from_pixel(32, 32, Rgba([200, 10, 90, 255]));
        let mut buf = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    fn keyed_config() -> TextureConfig {
        TextureConfig {
            providers: vec![ImageryProvider::google_static("test-key")],
            ..TextureConfig::default()
        }
    }

    const CEBU: GeoPoint = GeoPoint::new(10.3157, 123.8854);

    #[tokio::test]
    async fn imagery_is_stylized_and_cached() {
        let fetcher = StubFetcher::serving(png_bytes());
        let provider = TextureProvider::new(keyed_config(), fetcher.clone());

        let first = provider.get(CEBU, 15, 128).await;
        assert_eq!((first.width, first.height), (128, 128));
        assert_eq!(
            first.origin,
            TextureOrigin::Imagery {
                provider: "google".into()
            }
        );
        // 200 -> 204, 10 -> 0, 90 -> 102 with six levels
        assert_eq!(first.pixel(5, 5), Some([204, 0, 102, 255]));

        let nearby = GeoPoint::new(CEBU.lat + 0.00001, CEBU.lng);
        let second = provider.get(nearby, 15, 128).await;
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(provider.cache_stats().entries, 1);
    }

    #[tokio::test]
    async fn fetch_failure_yields_uncached_fallback() {
        let fetcher = StubFetcher::failing();
        let provider = TextureProvider::new(keyed_config(), fetcher.clone());

        let tex = provider.get(CEBU, 15, 64).await;
        assert!(tex.is_fallback());
        assert_eq!((tex.width, tex.height), (64, 64));
        assert_eq!(provider.cache_stats().entries, 0);

        provider.get(CEBU, 15, 64).await;
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn missing_key_skips_the_network() {
        let fetcher = StubFetcher::serving(png_bytes());
        let provider = TextureProvider::new(TextureConfig::default(), fetcher.clone());
        let tex = provider.get(CEBU, 15, 32).await;
        assert!(tex.is_fallback());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn undecodable_body_falls_back() {
        let fetcher = StubFetcher::serving(b"not an image".to_vec());
        let provider = TextureProvider::new(keyed_config(), fetcher);
        assert!(provider.get(CEBU, 15, 32).await.is_fallback());
    }

    #[tokio::test]
    async fn clear_cache_forces_refetch() {
        let fetcher = StubFetcher::serving(png_bytes());
        let provider = TextureProvider::new(keyed_config(), fetcher.clone());
        provider.get(CEBU, 15, 32).await;
        provider.clear_cache();
        provider.get(CEBU, 15, 32).await;
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn fallback_respects_size_cap() {
        let provider = TextureProvider::new(
            TextureConfig {
                fallback_size: 16,
                ..TextureConfig::default()
            },
            StubFetcher::failing(),
        );
        assert_eq!(provider.fallback(512).width, 16);
    }

    #[test]
    fn config_round_trips_through_json() {
        let json = r#"{"cache_capacity": 8, "stylize": {"levels": 4}}"#;
        let cfg: TextureConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.cache_capacity, 8);
        assert_eq!(cfg.stylize.levels, 4);
        assert_eq!(cfg.stylize.canvas, 64);
        assert_eq!(cfg.precision, 4);
    }
}
