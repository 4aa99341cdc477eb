//! Texture assets
//!
//! A texture is either decoded into RGBA8 pixels or, in sandboxed host
//! runtimes where decoding is not allowed, a pure reference to an absolute
//! image URL that the host resolves itself.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{LoadError, LoadResult};

/// How plain texture loads obtain their image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextureStrategy {
    /// Fetch and decode the image, recording its pixel dimensions
    Decode,
    /// Reference the image by absolute URL without fetching or decoding it
    Reference,
}

impl std::str::FromStr for TextureStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "decode" => Ok(Self::Decode),
            "reference" => Ok(Self::Reference),
            other => Err(format!("unknown texture strategy `{other}`")),
        }
    }
}

/// Texture filtering mode (Nearest for sharp, Linear for smooth)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    Nearest,
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFormat {
    Rgba8,
    /// Opaque color, no alpha channel
    Rgb8,
}

/// Image data behind a texture
#[derive(Debug, Clone)]
pub enum TextureImage {
    /// Decoded RGBA8 pixels, shared between copies of the texture
    Decoded {
        width: u32,
        height: u32,
        rgba: Arc<[u8]>,
    },
    /// Undecoded image known only by its absolute URL
    Reference { url: String },
}

/// A loaded texture with its sampling configuration
#[derive(Debug, Clone)]
pub struct Texture {
    /// URL the texture was requested with
    pub source: String,
    pub image: TextureImage,
    pub min_filter: FilterMode,
    pub mag_filter: FilterMode,
    pub format: TextureFormat,
}

impl Texture {
    /// Decodes an encoded image (PNG, JPEG) into an RGBA8 texture
    pub fn decode(url: &str, bytes: &[u8]) -> LoadResult<Self> {
        let rgba = image::load_from_memory(bytes)
            .map_err(|e| LoadError::backend(url, e))?
            .to_rgba8();
        let (width, height) = rgba.dimensions();

        Ok(Self {
            source: url.to_owned(),
            image: TextureImage::Decoded {
                width,
                height,
                rgba: Arc::from(rgba.into_raw()),
            },
            min_filter: FilterMode::Linear,
            mag_filter: FilterMode::Linear,
            format: TextureFormat::Rgba8,
        })
    }

    /// Texture that only references `absolute_url`
    pub fn reference(url: &str, absolute_url: String) -> Self {
        Self {
            source: url.to_owned(),
            image: TextureImage::Reference { url: absolute_url },
            min_filter: FilterMode::Linear,
            mag_filter: FilterMode::Linear,
            format: TextureFormat::Rgba8,
        }
    }

    pub fn is_decoded(&self) -> bool {
        matches!(self.image, TextureImage::Decoded { .. })
    }

    /// Pixel dimensions, known only after decoding
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        match self.image {
            TextureImage::Decoded { width, height, .. } => Some((width, height)),
            TextureImage::Reference { .. } => None,
        }
    }

    /// Width over height
    pub fn aspect_ratio(&self) -> Option<f32> {
        match self.dimensions()? {
            (_, 0) => None,
            (width, height) => Some(width as f32 / height as f32),
        }
    }
}
