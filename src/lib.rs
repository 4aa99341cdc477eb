//! Diorama
//!
//! Asynchronous, caching asset loading and scene composition for diorama
//! scenes: independent content modules, each with its own asset manifest,
//! placed side by side and driven by one update loop.

pub mod assets;
pub mod compose;
pub mod config;
pub mod error;
pub mod location;
pub mod manifest;
pub mod prelude;
pub mod scene;
pub mod view_settings;

use std::path::PathBuf;
use std::sync::Arc;

// Re-export main types for convenience
pub use assets::{AssetCache, Handle, Loader};
pub use compose::{DioramaModule, Placement, Stage};
pub use config::{Environment, LoaderConfig};
pub use error::{LoadError, LoadResult};
pub use manifest::{Manifest, Payload};

/// Creates a loader reading files under `root`, configured from the process
/// environment, with a fresh cache
pub fn desktop_loader(root: impl Into<PathBuf>) -> Loader {
    let source: Arc<dyn assets::AssetSource> = Arc::new(assets::FileSource::new(root));
    Loader::new(LoaderConfig::from_env(), source, Arc::new(AssetCache::new()))
}
