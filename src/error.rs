//! Error types for asset loading
//!
//! Every failure is local to the load that produced it. The manifest resolver
//! turns these into absent payload entries instead of propagating them.

use thiserror::Error;

use crate::assets::model::ModelFormat;

/// Failure of a single asset load
///
/// `Clone` so that one in-flight load can be shared between every caller
/// waiting on the same URL.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LoadError {
    /// The URL's extension does not map to any known model format
    #[error("no loader available for `{url}`")]
    UnsupportedFormat { url: String },

    /// The format is known but no backend is registered for it
    #[error("no {format} backend available to load `{url}`")]
    BackendUnavailable { format: ModelFormat, url: String },

    /// The backend ran and reported a decode or structure error
    #[error("failed to load `{url}`: {reason}")]
    Backend { url: String, reason: String },

    /// The asset source could not provide the bytes
    #[error("failed to fetch `{url}`: {reason}")]
    Fetch { url: String, reason: String },
}

impl LoadError {
    pub fn backend(url: &str, reason: impl ToString) -> Self {
        Self::Backend {
            url: url.to_owned(),
            reason: reason.to_string(),
        }
    }

    pub fn fetch(url: &str, reason: impl ToString) -> Self {
        Self::Fetch {
            url: url.to_owned(),
            reason: reason.to_string(),
        }
    }

    /// True for the "no loader available" family of errors
    pub fn is_unsupported(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedFormat { .. } | Self::BackendUnavailable { .. }
        )
    }

    /// URL of the asset that failed
    pub fn url(&self) -> &str {
        match self {
            Self::UnsupportedFormat { url }
            | Self::BackendUnavailable { url, .. }
            | Self::Backend { url, .. }
            | Self::Fetch { url, .. } => url,
        }
    }
}

pub type LoadResult<T> = Result<T, LoadError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_family() {
        let unknown = LoadError::UnsupportedFormat {
            url: "a.fbx".into(),
        };
        let missing = LoadError::BackendUnavailable {
            format: ModelFormat::Collada,
            url: "a.dae".into(),
        };
        let failed = LoadError::backend("a.obj", "bad face");

        assert!(unknown.is_unsupported());
        assert!(missing.is_unsupported());
        assert!(!failed.is_unsupported());
        assert_eq!(failed.url(), "a.obj");
        assert_eq!(missing.to_string(), "no COLLADA backend available to load `a.dae`");
    }
}
