//! Runtime environment and loader configuration
//!
//! The environment decides the default texture strategy: inside the host
//! runtime images may not be decoded, so plain textures are referenced by URL;
//! in a desktop preview they are decoded.

use serde::{Deserialize, Serialize};

use crate::assets::TextureStrategy;

/// Set to `1` or `true` when running inside the host runtime
pub const HOST_RUNTIME_VAR: &str = "DIORAMA_HOST_RUNTIME";
/// Base document URL that relative asset URLs resolve against
pub const LOCATION_VAR: &str = "DIORAMA_LOCATION";
/// Overrides the texture strategy (`decode` or `reference`)
pub const TEXTURE_STRATEGY_VAR: &str = "DIORAMA_TEXTURE_STRATEGY";

/// Where the scene is running
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    pub in_host_runtime: bool,
    /// Absolute URL of the current document
    pub location: String,
}

impl Environment {
    pub fn desktop(location: impl Into<String>) -> Self {
        Self {
            in_host_runtime: false,
            location: location.into(),
        }
    }

    pub fn host(location: impl Into<String>) -> Self {
        Self {
            in_host_runtime: true,
            location: location.into(),
        }
    }

    /// Detects the environment from process environment variables
    pub fn detect() -> Self {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let in_host_runtime = lookup(HOST_RUNTIME_VAR)
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        let location = lookup(LOCATION_VAR).unwrap_or_else(default_location);

        Self {
            in_host_runtime,
            location,
        }
    }

    pub fn default_texture_strategy(&self) -> TextureStrategy {
        if self.in_host_runtime {
            TextureStrategy::Reference
        } else {
            TextureStrategy::Decode
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::desktop(default_location())
    }
}

/// `file://` URL of the working directory
fn default_location() -> String {
    match std::env::current_dir() {
        Ok(dir) => format!("file://{}/", dir.display().to_string().trim_end_matches('/')),
        Err(_) => String::from("file:///"),
    }
}

/// Settings a [`Loader`](crate::Loader) is built from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoaderConfig {
    pub environment: Environment,
    /// Explicit strategy; falls back to the environment default
    pub texture_strategy: Option<TextureStrategy>,
}

impl LoaderConfig {
    pub fn new(environment: Environment) -> Self {
        Self {
            environment,
            texture_strategy: None,
        }
    }

    pub fn with_texture_strategy(mut self, strategy: TextureStrategy) -> Self {
        self.texture_strategy = Some(strategy);
        self
    }

    pub fn from_env() -> Self {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let texture_strategy = lookup(TEXTURE_STRATEGY_VAR).and_then(|v| match v.parse() {
            Ok(strategy) => Some(strategy),
            Err(e) => {
                log::warn!("ignoring {TEXTURE_STRATEGY_VAR}: {e}");
                None
            }
        });

        Self {
            environment: Environment::from_vars(lookup),
            texture_strategy,
        }
    }

    pub fn texture_strategy(&self) -> TextureStrategy {
        self.texture_strategy
            .unwrap_or_else(|| self.environment.default_texture_strategy())
    }
}
