//! Byte sources for asset loaders
//!
//! Loaders never touch the filesystem or network directly; they ask an
//! [`AssetSource`] for the bytes behind a URL.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use futures::future::{self, BoxFuture, FutureExt};
use parking_lot::Mutex;

use crate::error::{LoadError, LoadResult};
use crate::location;

/// Provides the raw bytes behind an asset URL
pub trait AssetSource: Send + Sync {
    /// Fetch the full contents of `url`
    ///
    /// The returned future must settle: either with the bytes or with
    /// [`LoadError::Fetch`].
    fn fetch(&self, url: &str) -> BoxFuture<'static, LoadResult<Vec<u8>>>;
}

/// Reads assets from the local filesystem
///
/// Relative URLs resolve against `root`; `file://` URLs are read as absolute
/// paths. Any other scheme is rejected.
#[derive(Debug, Clone)]
pub struct FileSource {
    root: PathBuf,
}

impl FileSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path for `url`, or `None` for non-file schemes
    pub fn path_for(&self, url: &str) -> Option<PathBuf> {
        let url = url.split(['?', '#']).next().unwrap_or_default();

        if let Some(path) = url.strip_prefix("file://") {
            return Some(PathBuf::from(path));
        }
        if location::has_scheme(url) {
            return None;
        }

        let path = Path::new(url);
        if path.is_absolute() {
            Some(path.to_path_buf())
        } else {
            Some(self.root.join(path))
        }
    }
}

impl AssetSource for FileSource {
    fn fetch(&self, url: &str) -> BoxFuture<'static, LoadResult<Vec<u8>>> {
        let owned = url.to_owned();
        match self.path_for(url) {
            Some(path) => async move {
                std::fs::read(&path).map_err(|e| LoadError::fetch(&owned, e))
            }
            .boxed(),
            None => future::ready(Err(LoadError::fetch(&owned, "unsupported URL scheme"))).boxed(),
        }
    }
}

/// In-memory source keyed by exact URL
///
/// Counts every fetch per URL, which makes it useful for previews built from
/// embedded assets and for checking that loads are deduplicated.
#[derive(Debug, Default)]
pub struct MemorySource {
    entries: Mutex<HashMap<String, Vec<u8>>>,
    fetches: Mutex<HashMap<String, usize>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, url: &str, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(url, bytes);
        self
    }

    pub fn insert(&self, url: &str, bytes: impl Into<Vec<u8>>) {
        self.entries.lock().insert(url.to_owned(), bytes.into());
    }

    /// Number of times `url` was fetched, successful or not
    pub fn fetch_count(&self, url: &str) -> usize {
        self.fetches.lock().get(url).copied().unwrap_or(0)
    }

    pub fn total_fetches(&self) -> usize {
        self.fetches.lock().values().sum()
    }
}

impl AssetSource for MemorySource {
    fn fetch(&self, url: &str) -> BoxFuture<'static, LoadResult<Vec<u8>>> {
        *self.fetches.lock().entry(url.to_owned()).or_insert(0) += 1;

        let result = self
            .entries
            .lock()
            .get(url)
            .cloned()
            .ok_or_else(|| LoadError::fetch(url, "not found"));
        future::ready(result).boxed()
    }
}
