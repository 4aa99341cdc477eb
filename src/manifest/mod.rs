//! # Manifests and Payloads
//!
//! A content module declares the assets it needs as a [`Manifest`]: logical
//! names mapped to URLs, split by kind. The [`resolve`] step turns it into a
//! [`Payload`] with the same names mapped to loaded handles.
//!
//! ```no_run
//! use diorama::manifest::Manifest;
//!
//! let manifest = Manifest::from_json(r#"{
//!     "models": { "chair": "models/chair.glb" },
//!     "textures": { "floor": "textures/oak.png" },
//!     "posters": {
//!         "title": "posters/title.png",
//!         "banner": { "url": "posters/banner.png", "aspectRatio": 4.0 }
//!     }
//! }"#).unwrap();
//! ```

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::assets::texture::Texture;
use crate::assets::Handle;
use crate::scene::Node;

pub mod classify;
pub mod resolve;

pub use classify::{classify, SingletonTable};
pub use resolve::resolve;

/// A poster request: a bare URL or a URL with a known aspect ratio
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PosterRequest {
    Url(String),
    Detailed {
        url: String,
        #[serde(default, rename = "aspectRatio", skip_serializing_if = "Option::is_none")]
        aspect_ratio: Option<f32>,
    },
}

impl PosterRequest {
    pub fn url(&self) -> &str {
        match self {
            PosterRequest::Url(url) | PosterRequest::Detailed { url, .. } => url,
        }
    }

    pub fn aspect_ratio(&self) -> Option<f32> {
        match self {
            PosterRequest::Url(_) => None,
            PosterRequest::Detailed { aspect_ratio, .. } => *aspect_ratio,
        }
    }
}

/// Named asset requests of one content module
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Manifest {
    pub models: BTreeMap<String, String>,
    pub textures: BTreeMap<String, String>,
    pub posters: BTreeMap<String, PosterRequest>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn with_model(mut self, name: &str, url: &str) -> Self {
        self.models.insert(name.to_owned(), url.to_owned());
        self
    }

    pub fn with_texture(mut self, name: &str, url: &str) -> Self {
        self.textures.insert(name.to_owned(), url.to_owned());
        self
    }

    pub fn with_poster(mut self, name: &str, url: &str, aspect_ratio: Option<f32>) -> Self {
        let request = match aspect_ratio {
            Some(_) => PosterRequest::Detailed {
                url: url.to_owned(),
                aspect_ratio,
            },
            None => PosterRequest::Url(url.to_owned()),
        };
        self.posters.insert(name.to_owned(), request);
        self
    }

    /// Every distinct URL referenced, across all kinds
    pub fn urls(&self) -> BTreeSet<&str> {
        self.models
            .values()
            .chain(self.textures.values())
            .map(String::as_str)
            .chain(self.posters.values().map(PosterRequest::url))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty() && self.textures.is_empty() && self.posters.is_empty()
    }
}

/// Resolved assets, keyed by the manifest's logical names
///
/// `None` marks an asset whose load failed.
#[derive(Debug, Clone, Default)]
pub struct Payload {
    pub models: BTreeMap<String, Option<Handle<Node>>>,
    pub textures: BTreeMap<String, Option<Handle<Texture>>>,
    pub posters: BTreeMap<String, Option<Handle<Node>>>,
}

impl Payload {
    pub fn model(&self, name: &str) -> Option<&Handle<Node>> {
        self.models.get(name)?.as_ref()
    }

    pub fn texture(&self, name: &str) -> Option<&Handle<Texture>> {
        self.textures.get(name)?.as_ref()
    }

    pub fn poster(&self, name: &str) -> Option<&Handle<Node>> {
        self.posters.get(name)?.as_ref()
    }

    /// Names whose asset failed to load
    pub fn missing(&self) -> Vec<&str> {
        let models = self.models.iter().filter(|(_, h)| h.is_none()).map(|(n, _)| n.as_str());
        let textures = self.textures.iter().filter(|(_, h)| h.is_none()).map(|(n, _)| n.as_str());
        let posters = self.posters.iter().filter(|(_, h)| h.is_none()).map(|(n, _)| n.as_str());
        models.chain(textures).chain(posters).collect()
    }

    pub fn len(&self) -> usize {
        self.models.len() + self.textures.len() + self.posters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
