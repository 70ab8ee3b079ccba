use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbaImage};
use serde::{Deserialize, Serialize};

/// Pixel-art stylization: downsample onto a small canvas, posterize, upscale with nearest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StylizeParams {
    /// Side of the intermediate canvas in pixels.
    pub canvas: u32,
    /// Quantization levels per colour channel.
    pub levels: u8,
}

impl Default for StylizeParams {
    fn default() -> Self {
        Self {
            canvas: 64,
            levels: 6,
        }
    }
}

/// Snap a channel value to the nearest of `levels` evenly spaced steps in `0..=255`.
/// Fewer than two levels leaves the value untouched.
pub fn quantize_channel(value: u8, levels: u8) -> u8 {
    if levels < 2 {
        return value;
    }
    let step = 255.0 / f32::from(levels - 1);
    ((f32::from(value) / step).round() * step).round().min(255.0) as u8
}

/// Stylize `image` into a `size`x`size` RGBA image. Alpha is preserved.
pub fn stylize(image: &DynamicImage, size: u32, params: StylizeParams) -> RgbaImage {
    let size = size.max(1);
    let canvas = params.canvas.clamp(1, size);
    let rgba = image.to_rgba8();
    let mut small = imageops::resize(&rgba, canvas, canvas, FilterType::Triangle);
    for pixel in small.pixels_mut() {
        for channel in &mut pixel.0[..3] {
            *channel = quantize_channel(*channel, params.levels);
        }
    }
    imageops::resize(&small, size, size, FilterType::Nearest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn six_levels_snap_to_multiples_of_51() {
        assert_eq!(quantize_channel(0, 6), 0);
        assert_eq!(quantize_channel(30, 6), 51);
        assert_eq!(quantize_channel(130, 6), 153);
        assert_eq!(quantize_channel(255, 6), 255);
        assert_eq!(quantize_channel(77, 1), 77);
    }

    #[test]
    fn output_is_square_and_posterized() {
        let src = RgbaImage::from_fn(100, 80, |x, y| Rgba([(x * 2) as u8, (y * 3) as u8, 90, 255]));
        let out = stylize(&DynamicImage::ImageRgba8(src), 128, StylizeParams::default());
        assert_eq!(out.dimensions(), (128, 128));
        for p in out.pixels() {
            for c in &p.0[..3] {
                assert_eq!(c % 51, 0, "channel {c} not on a quantization step");
            }
            assert_eq!(p.0[3], 255);
        }
    }

    #[test]
    fn upscale_produces_blocks() {
        let src = RgbaImage::from_fn(64, 64, |x, _| {
            if x < 32 { Rgba([0, 0, 0, 255]) } else { Rgba([255, 255, 255, 255]) }
        });
        let out = stylize(
            &DynamicImage::ImageRgba8(src),
            256,
            StylizeParams { canvas: 4, levels: 2 },
        );
        // each canvas pixel covers a 64x64 block
        assert_eq!(out.get_pixel(0, 0), out.get_pixel(63, 63));
        assert_eq!(out.get_pixel(255, 0), out.get_pixel(192, 63));
    }
}
