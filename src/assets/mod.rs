//! # Asset Loading
//!
//! Asynchronous, deduplicating loaders for models, textures, posters and
//! motion textures, backed by an explicit [`AssetCache`].
//!
//! ## Architecture Overview
//!
//! - **Cache** ([`cache`]) - One keyed store per asset kind, plus in-flight
//!   request coalescing
//! - **Sources** ([`source`]) - Where bytes come from (files, memory)
//! - **Models** ([`model`]) - Format table mapping file types to backends
//! - **Textures** ([`texture`]) - Decode or reference-by-URL strategies
//! - **Posters** ([`poster`]) - Texture on an aspect-preserving plane
//! - **Video** ([`video`]) - Uncached motion textures
//! - **Loader** ([`loader`]) - The per-kind load operations tying it together
//!
//! Every load returns a `'static` boxed future resolving to a [`Handle`] or a
//! [`LoadError`](crate::LoadError). Loads never block on each other; callers
//! join them explicitly.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

pub mod cache;
pub mod loader;
pub mod model;
pub mod poster;
pub mod source;
pub mod texture;
pub mod video;

pub use cache::{AssetCache, AssetStore};
pub use loader::Loader;
pub use model::{GltfBackend, ModelBackend, ModelFormat, ModelRegistry, NodeSelection, ObjBackend};
pub use source::{AssetSource, FileSource, MemorySource};
pub use texture::{FilterMode, Texture, TextureFormat, TextureImage, TextureStrategy};
pub use video::{MediaElement, MotionTexture};

/// Shared, mutable reference to a loaded asset
///
/// Identity is pointer identity: two handles refer to the same instance iff
/// `Arc::ptr_eq` holds.
pub type Handle<T> = Arc<RwLock<T>>;

/// Wraps a loaded value in a fresh handle
pub fn new_handle<T>(value: T) -> Handle<T> {
    Arc::new(RwLock::new(value))
}

/// Independent copy of the value behind `handle`
pub fn copy_handle<T: Clone>(handle: &Handle<T>) -> Handle<T> {
    new_handle(handle.read().clone())
}

/// The independently cached asset kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AssetKind {
    Model,
    Texture,
    Poster,
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AssetKind::Model => "model",
            AssetKind::Texture => "texture",
            AssetKind::Poster => "poster",
        })
    }
}
