//! Motion textures backed by a media element
//!
//! Video textures are never cached: every load creates its own element so that
//! playback state is never shared between consumers.

use super::texture::{FilterMode, TextureFormat};

/// Description of the hidden media element feeding a motion texture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaElement {
    pub src: String,
    pub autoplay: bool,
    pub looping: bool,
    pub hidden: bool,
}

impl MediaElement {
    /// Hidden element that starts playing immediately and loops forever
    pub fn looping(src: &str) -> Self {
        Self {
            src: src.to_owned(),
            autoplay: true,
            looping: true,
            hidden: true,
        }
    }
}

/// Texture whose contents follow a continuously playing media element
#[derive(Debug, Clone, PartialEq)]
pub struct MotionTexture {
    pub media: MediaElement,
    pub min_filter: FilterMode,
    pub mag_filter: FilterMode,
    pub format: TextureFormat,
}

impl MotionTexture {
    pub fn new(media: MediaElement) -> Self {
        Self {
            media,
            min_filter: FilterMode::Nearest,
            mag_filter: FilterMode::Linear,
            format: TextureFormat::Rgb8,
        }
    }
}
