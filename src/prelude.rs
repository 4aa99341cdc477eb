//! # Diorama Prelude
//!
//! Commonly used types in one import:
//!
//! ```rust
//! use diorama::prelude::*;
//! ```
//!
//! A module only needs its manifest and a `start` implementation:
//!
//! ```no_run
//! use diorama::prelude::*;
//!
//! struct Gallery;
//!
//! impl DioramaModule for Gallery {
//!     fn name(&self) -> &str { "gallery" }
//!
//!     fn manifest(&self) -> Manifest {
//!         Manifest::new()
//!             .with_model("bench", "models/bench.glb")
//!             .with_poster("title", "posters/title.png", None)
//!     }
//!
//!     fn start(&mut self, payload: Payload, root: &mut Node) {
//!         if let Some(bench) = payload.model("bench") {
//!             root.add_child(bench.read().clone());
//!         }
//!     }
//! }
//!
//! let mut stage = Stage::new(diorama::desktop_loader("assets"));
//! stage.add_module(Box::new(Gallery), Placement::at(0.0, 0.0, -3.0));
//! stage.start_blocking();
//! stage.update(1.0 / 60.0);
//! ```

// Loading
pub use crate::assets::{
    copy_handle, AssetCache, AssetKind, AssetSource, FileSource, Handle, Loader, MemorySource,
    ModelFormat, MotionTexture, Texture, TextureStrategy,
};
pub use crate::config::{Environment, LoaderConfig};
pub use crate::error::{LoadError, LoadResult};

// Manifests and composition
pub use crate::compose::{DioramaModule, Placement, Stage};
pub use crate::manifest::{classify, resolve, Manifest, Payload, SingletonTable};

// Scene
pub use crate::scene::{GeometryData, Material, Mesh, Node};

// Persisted camera state
pub use crate::view_settings::{FileStore, MemoryStore, SettingsStore, ViewSettings};

// Re-export common external dependencies
pub use cgmath::{Deg, Matrix4, Vector3};
