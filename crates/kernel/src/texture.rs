/// Where a texture's pixels came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextureOrigin {
    /// Fetched from an imagery provider and stylized.
    Imagery { provider: String },
    /// Procedural stand-in used when imagery is unavailable.
    Fallback,
    /// Text label (nameplates, marker billboards). Pixels are rasterized by the backend.
    Label { text: String },
    /// Single flat colour.
    Solid,
}

/// CPU-side RGBA8 texture.
#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
    pub origin: TextureOrigin,
}

impl Texture {
    /// Wrap raw RGBA8 pixels. Returns `None` when the buffer length does not match.
    pub fn from_rgba(width: u32, height: u32, rgba: Vec<u8>, origin: TextureOrigin) -> Option<Self> {
        if rgba.len() != (width as usize) * (height as usize) * 4 {
            return None;
        }
        Some(Self {
            width,
            height,
            rgba,
            origin,
        })
    }

    pub fn solid(width: u32, height: u32, color: u32) -> Self {
        let [_, r, g, b] = color.to_be_bytes();
        let rgba = [r, g, b, 255].repeat((width * height) as usize);
        Self {
            width,
            height,
            rgba,
            origin: TextureOrigin::Solid,
        }
    }

    pub fn label(text: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            rgba: Vec::new(),
            origin: TextureOrigin::Label { text: text.into() },
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y * self.width + x) * 4) as usize;
        self.rgba.get(i..i + 4).map(|p| [p[0], p[1], p[2], p[3]])
    }

    pub fn is_fallback(&self) -> bool {
        self.origin == TextureOrigin::Fallback
    }
}
