use std::num::NonZeroUsize;
use std::sync::Arc;

use geoworld_common::GeoPoint;
use geoworld_kernel::Texture;
use lru::LruCache;

/// Cache key: coordinates quantized to a fixed number of decimals, plus zoom and size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureKey {
    pub lat_q: i64,
    pub lng_q: i64,
    pub zoom: u8,
    pub size: u32,
}

impl TextureKey {
    /// Round `geo` to `precision` decimals. Points closer than half a unit in the
    /// last decimal share a key.
    pub fn quantize(geo: GeoPoint, zoom: u8, size: u32, precision: u32) -> Self {
        let factor = 10f64.powi(precision.min(9) as i32);
        Self {
            lat_q: (geo.lat * factor).round() as i64,
            lng_q: (geo.lng * factor).round() as i64,
            zoom,
            size,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Bounded LRU of successfully stylized textures.
#[derive(Debug)]
pub struct TextureCache {
    entries: LruCache<TextureKey, Arc<Texture>>,
    hits: u64,
    misses: u64,
}

impl TextureCache {
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(cap),
            hits: 0,
            misses: 0,
        }
    }

    pub fn get(&mut self, key: &TextureKey) -> Option<Arc<Texture>> {
        match self.entries.get(key) {
            Some(tex) => {
                self.hits += 1;
                Some(Arc::clone(tex))
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn insert(&mut self, key: TextureKey, texture: Arc<Texture>) {
        self.entries.put(key, texture);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            entries: self.entries.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tex() -> Arc<Texture> {
        Arc::new(Texture::solid(1, 1, 0))
    }

    #[test]
    fn nearby_points_share_a_key() {
        let a = TextureKey::quantize(GeoPoint::new(14.59951, 120.98421), 15, 512, 4);
        let b = TextureKey::quantize(GeoPoint::new(14.59949, 120.98419), 15, 512, 4);
        let c = TextureKey::quantize(GeoPoint::new(14.5997, 120.9842), 15, 512, 4);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, TextureKey { zoom: 16, ..a });
    }

    #[test]
    fn evicts_least_recently_used() {
        let mut cache = TextureCache::new(2);
        let k = |i| TextureKey { lat_q: i, lng_q: 0, zoom: 1, size: 1 };
        cache.insert(k(1), tex());
        cache.insert(k(2), tex());
        assert!(cache.get(&k(1)).is_some());
        cache.insert(k(3), tex());
        assert!(cache.get(&k(2)).is_none());
        assert!(cache.get(&k(1)).is_some());
        assert_eq!(cache.len(), 2);
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses), (2, 1));
    }

    #[test]
    fn zero_capacity_is_promoted_to_one() {
        assert_eq!(TextureCache::new(0).capacity(), 1);
    }
}
