//! Per-kind asset stores keyed by source URL
//!
//! A URL only becomes a key in a store once its load has completed
//! successfully. While a load is running, the URL sits in the store's pending
//! table and every further request for it joins the same shared future. The
//! table only holds weak references: once every caller has dropped a load,
//! the next request starts a fresh one.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::{self, BoxFuture, FutureExt, Shared, WeakShared};
use log::debug;
use parking_lot::Mutex;

use crate::assets::texture::Texture;
use crate::assets::{new_handle, AssetKind, Handle};
use crate::error::LoadResult;
use crate::scene::Node;

type LoadFuture<T> = BoxFuture<'static, LoadResult<Handle<T>>>;
type Pending<T> = Shared<LoadFuture<T>>;

struct StoreState<T> {
    ready: HashMap<String, Handle<T>>,
    pending: HashMap<String, WeakShared<LoadFuture<T>>>,
}

/// Completed and in-flight loads for one asset kind
pub struct AssetStore<T> {
    kind: AssetKind,
    state: Arc<Mutex<StoreState<T>>>,
}

impl<T> Clone for AssetStore<T> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            state: Arc::clone(&self.state),
        }
    }
}

impl<T: Send + Sync + 'static> AssetStore<T> {
    pub fn new(kind: AssetKind) -> Self {
        Self {
            kind,
            state: Arc::new(Mutex::new(StoreState {
                ready: HashMap::new(),
                pending: HashMap::new(),
            })),
        }
    }

    pub fn kind(&self) -> AssetKind {
        self.kind
    }

    pub fn get(&self, url: &str) -> Option<Handle<T>> {
        self.state.lock().ready.get(url).cloned()
    }

    /// Stores a completed asset, replacing any previous entry
    pub fn put(&self, url: &str, handle: Handle<T>) {
        self.state.lock().ready.insert(url.to_owned(), handle);
    }

    pub fn contains(&self, url: &str) -> bool {
        self.state.lock().ready.contains_key(url)
    }

    /// True while a load for `url` runs and someone still awaits it
    pub fn is_pending(&self, url: &str) -> bool {
        self.state
            .lock()
            .pending
            .get(url)
            .is_some_and(|weak| weak.upgrade().is_some())
    }

    pub fn len(&self) -> usize {
        self.state.lock().ready.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolves `url` from the store, an in-flight load, or a new load
    ///
    /// `load` is only invoked when neither a completed entry nor a pending
    /// load exists. On success the value is wrapped in a handle and stored;
    /// on failure nothing is stored and the next request retries.
    pub fn get_or_load<F>(&self, url: &str, load: F) -> LoadFuture<T>
    where
        F: FnOnce() -> BoxFuture<'static, LoadResult<T>>,
    {
        self.get_or_load_where(url, |_| true, load)
    }

    /// [`get_or_load`](Self::get_or_load) where a completed entry only counts
    /// as a hit if `is_current` accepts it
    ///
    /// A rejected entry is reloaded and replaced once the new load succeeds.
    /// Requests arriving meanwhile join that load.
    pub fn get_or_load_where<P, F>(&self, url: &str, is_current: P, load: F) -> LoadFuture<T>
    where
        P: Fn(&T) -> bool,
        F: FnOnce() -> BoxFuture<'static, LoadResult<T>>,
    {
        if let Some(hit) = self.lookup(url, &is_current) {
            return hit;
        }

        let store = self.clone();
        let key = url.to_owned();
        let task: Pending<T> = load()
            .map(move |result: LoadResult<T>| -> LoadResult<Handle<T>> {
                let mut state = store.state.lock();
                state.pending.remove(&key);
                let handle = new_handle(result?);
                state.ready.insert(key, Arc::clone(&handle));
                Ok(handle)
            })
            .boxed()
            .shared();

        // Another caller may have started the same load while `load` ran
        let mut state = self.state.lock();
        if let Some(running) = state.pending.get(url).and_then(WeakShared::upgrade) {
            return running.boxed();
        }
        if let Some(weak) = task.downgrade() {
            state.pending.insert(url.to_owned(), weak);
        }
        drop(state);

        task.boxed()
    }

    fn lookup(&self, url: &str, is_current: &dyn Fn(&T) -> bool) -> Option<LoadFuture<T>> {
        let mut state = self.state.lock();
        if let Some(handle) = state.ready.get(url) {
            if is_current(&*handle.read()) {
                debug!("{} cache hit for `{}`", self.kind, url);
                let hit: LoadResult<Handle<T>> = Ok(Arc::clone(handle));
                return Some(future::ready(hit).boxed());
            }
        }
        match state.pending.get(url).map(WeakShared::upgrade) {
            Some(Some(running)) => {
                debug!("joining in-flight {} load for `{}`", self.kind, url);
                Some(running.boxed())
            }
            Some(None) => {
                debug!("discarding abandoned {} load for `{}`", self.kind, url);
                state.pending.remove(url);
                None
            }
            None => None,
        }
    }
}

/// Process-wide asset cache, one store per kind
///
/// Create one per scene host and share it through an `Arc`; there is no
/// eviction, entries live as long as the cache.
pub struct AssetCache {
    models: AssetStore<Node>,
    textures: AssetStore<Texture>,
    posters: AssetStore<Node>,
}

impl AssetCache {
    pub fn new() -> Self {
        Self {
            models: AssetStore::new(AssetKind::Model),
            textures: AssetStore::new(AssetKind::Texture),
            posters: AssetStore::new(AssetKind::Poster),
        }
    }

    pub fn models(&self) -> &AssetStore<Node> {
        &self.models
    }

    pub fn textures(&self) -> &AssetStore<Texture> {
        &self.textures
    }

    pub fn posters(&self) -> &AssetStore<Node> {
        &self.posters
    }

    pub fn model(&self, url: &str) -> Option<Handle<Node>> {
        self.models.get(url)
    }

    pub fn texture(&self, url: &str) -> Option<Handle<Texture>> {
        self.textures.get(url)
    }

    pub fn poster(&self, url: &str) -> Option<Handle<Node>> {
        self.posters.get(url)
    }

    pub fn put_model(&self, url: &str, handle: Handle<Node>) {
        self.models.put(url, handle);
    }

    pub fn put_texture(&self, url: &str, handle: Handle<Texture>) {
        self.textures.put(url, handle);
    }

    pub fn put_poster(&self, url: &str, handle: Handle<Node>) {
        self.posters.put(url, handle);
    }

    pub fn contains(&self, kind: AssetKind, url: &str) -> bool {
        match kind {
            AssetKind::Model => self.models.contains(url),
            AssetKind::Texture => self.textures.contains(url),
            AssetKind::Poster => self.posters.contains(url),
        }
    }

    pub fn len(&self, kind: AssetKind) -> usize {
        match kind {
            AssetKind::Model => self.models.len(),
            AssetKind::Texture => self.textures.len(),
            AssetKind::Poster => self.posters.len(),
        }
    }
}

impl Default for AssetCache {
    fn default() -> Self {
        Self::new()
    }
}
