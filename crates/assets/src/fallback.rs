use geoworld_kernel::{Texture, TextureOrigin};
use rand::Rng;

/// Base green of the procedural ground texture.
pub const FALLBACK_BASE: [u8; 3] = [0x2a, 0x8c, 0x4a];
/// Upper bound (exclusive) of the per-pixel noise added to red and green. Blue gets half.
pub const FALLBACK_NOISE: f32 = 30.0;

/// Noisy green square used whenever imagery cannot be produced.
pub fn fallback_texture<R: Rng + ?Sized>(size: u32, rng: &mut R) -> Texture {
    let size = size.max(1);
    let count = (size as usize) * (size as usize);
    let mut rgba = Vec::with_capacity(count * 4);
    for _ in 0..count {
        let noise: f32 = rng.gen_range(0.0..FALLBACK_NOISE);
        let [r, g, b] = FALLBACK_BASE;
        rgba.extend_from_slice(&[
            r.saturating_add(noise as u8),
            g.saturating_add(noise as u8),
            b.saturating_add((noise * 0.5) as u8),
            255,
        ]);
    }
    Texture {
        width: size,
        height: size,
        rgba,
        origin: TextureOrigin::Fallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn pixels_stay_within_noise_band() {
        let mut rng = StdRng::seed_from_u64(7);
        let tex = fallback_texture(16, &mut rng);
        assert!(tex.is_fallback());
        assert_eq!(tex.rgba.len(), 16 * 16 * 4);
        for px in tex.rgba.chunks_exact(4) {
            assert!((0x2a..0x2a + 30).contains(&px[0]));
            assert!((0x8c..0x8c + 30).contains(&px[1]));
            assert!((0x4a..0x4a + 15).contains(&px[2]));
            assert_eq!(px[3], 255);
        }
    }

    #[test]
    fn zero_size_still_yields_a_texture() {
        let tex = fallback_texture(0, &mut StdRng::seed_from_u64(1));
        assert_eq!((tex.width, tex.height), (1, 1));
    }
}
