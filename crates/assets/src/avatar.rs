use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use lru::LruCache;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::fetch::{FetchError, Fetcher};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AvatarConfig {
    pub cache_capacity: usize,
    pub timeout_secs: u64,
}

impl Default for AvatarConfig {
    fn default() -> Self {
        Self {
            cache_capacity: 32,
            timeout_secs: 15,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AvatarError {
    #[error("avatar URL is empty")]
    MissingUrl,
    #[error("avatar fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("avatar is not valid glTF: {0}")]
    Parse(#[from] gltf::Error),
    #[error("avatar load timed out after {0:?}")]
    Timeout(Duration),
}

/// Parsed summary of a glTF avatar; the scene builds its own proxy nodes from it.
#[derive(Debug, Clone, PartialEq)]
pub struct AvatarModel {
    pub url: String,
    pub mesh_count: usize,
    pub node_names: Vec<String>,
    pub animation_count: usize,
}

impl AvatarModel {
    pub fn parse(url: &str, bytes: &[u8]) -> Result<Self, gltf::Error> {
        let document = gltf::Gltf::from_slice(bytes)?;
        Ok(Self {
            url: url.to_string(),
            mesh_count: document.meshes().count(),
            node_names: document
                .nodes()
                .filter_map(|n| n.name().map(str::to_string))
                .collect(),
            animation_count: document.animations().count(),
        })
    }
}

/// Loads avatar models by URL, sharing parsed results through an LRU.
pub struct AvatarLibrary {
    fetcher: Arc<dyn Fetcher>,
    cache: Mutex<LruCache<String, Arc<AvatarModel>>>,
    timeout: Duration,
}

impl AvatarLibrary {
    pub fn new(config: &AvatarConfig, fetcher: Arc<dyn Fetcher>) -> Self {
        let cap = NonZeroUsize::new(config.cache_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            fetcher,
            cache: Mutex::new(LruCache::new(cap)),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    pub async fn load(&self, url: &str) -> Result<Arc<AvatarModel>, AvatarError> {
        if url.trim().is_empty() {
            return Err(AvatarError::MissingUrl);
        }
        let key = url.to_string();
        let cached = self.cache.lock().get(&key).cloned();
        if let Some(model) = cached {
            return Ok(model);
        }

        let bytes = tokio::time::timeout(self.timeout, self.fetcher.fetch(url))
            .await
            .map_err(|_| AvatarError::Timeout(self.timeout))??;
        let model = Arc::new(AvatarModel::parse(url, &bytes)?);
        tracing::debug!(url, meshes = model.mesh_count, "avatar loaded");
        self.cache.lock().put(key, Arc::clone(&model));
        Ok(model)
    }

    pub fn cached(&self) -> usize {
        self.cache.lock().len()
    }
}
