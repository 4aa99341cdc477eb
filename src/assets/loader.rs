//! The per-kind load operations
//!
//! [`Loader`] is a cheap handle (clone it freely) over the shared cache, the
//! byte source, the model format table and the texture strategy chosen for the
//! environment.

use std::sync::Arc;

use futures::future::{self, BoxFuture, FutureExt};
use log::{debug, info};

use crate::assets::cache::AssetCache;
use crate::assets::model::{ModelFormat, ModelRegistry};
use crate::assets::poster::build_poster;
use crate::assets::source::AssetSource;
use crate::assets::texture::{Texture, TextureStrategy};
use crate::assets::video::{MediaElement, MotionTexture};
use crate::assets::{new_handle, Handle};
use crate::config::{Environment, LoaderConfig};
use crate::error::{LoadError, LoadResult};
use crate::location;
use crate::scene::Node;

struct LoaderInner {
    cache: Arc<AssetCache>,
    source: Arc<dyn AssetSource>,
    registry: ModelRegistry,
    strategy: TextureStrategy,
    environment: Environment,
}

/// Asynchronous, caching asset loader
#[derive(Clone)]
pub struct Loader {
    inner: Arc<LoaderInner>,
}

impl Loader {
    /// Loader with the default model formats
    pub fn new(
        config: LoaderConfig,
        source: Arc<dyn AssetSource>,
        cache: Arc<AssetCache>,
    ) -> Self {
        Self::with_registry(config, source, cache, ModelRegistry::default())
    }

    pub fn with_registry(
        config: LoaderConfig,
        source: Arc<dyn AssetSource>,
        cache: Arc<AssetCache>,
        registry: ModelRegistry,
    ) -> Self {
        let strategy = config.texture_strategy();
        debug!(
            "loader created (host runtime: {}, texture strategy: {:?})",
            config.environment.in_host_runtime, strategy
        );

        Self {
            inner: Arc::new(LoaderInner {
                cache,
                source,
                registry,
                strategy,
                environment: config.environment,
            }),
        }
    }

    pub fn cache(&self) -> &Arc<AssetCache> {
        &self.inner.cache
    }

    pub fn environment(&self) -> &Environment {
        &self.inner.environment
    }

    pub fn texture_strategy(&self) -> TextureStrategy {
        self.inner.strategy
    }

    /// Loads the model at `url`, dispatching on its file extension
    ///
    /// Resolves to the content node selected from the loaded document. Fails
    /// with [`LoadError::UnsupportedFormat`] for unknown extensions and
    /// [`LoadError::BackendUnavailable`] for formats without a backend.
    pub fn load_model(&self, url: &str) -> BoxFuture<'static, LoadResult<Handle<Node>>> {
        let inner = Arc::clone(&self.inner);
        let owned = url.to_owned();
        self.inner
            .cache
            .models()
            .get_or_load(url, move || async move { inner.fetch_model(&owned).await }.boxed())
    }

    /// Loads a texture using the configured strategy
    pub fn load_texture(&self, url: &str) -> BoxFuture<'static, LoadResult<Handle<Texture>>> {
        self.load_texture_with(url, self.inner.strategy)
    }

    /// Loads and decodes a texture regardless of the configured strategy
    pub fn load_texture_forced(
        &self,
        url: &str,
    ) -> BoxFuture<'static, LoadResult<Handle<Texture>>> {
        self.load_texture_with(url, TextureStrategy::Decode)
    }

    /// Loads a texture with an explicit strategy
    ///
    /// A decode request for a URL cached as a reference-only texture decodes
    /// it and replaces the cache entry. Concurrent upgrades share one decode.
    pub fn load_texture_with(
        &self,
        url: &str,
        strategy: TextureStrategy,
    ) -> BoxFuture<'static, LoadResult<Handle<Texture>>> {
        let inner = Arc::clone(&self.inner);
        let owned = url.to_owned();

        async move {
            let handle = request_texture(&inner, &owned, strategy).await?;

            // Joined a reference load that was already running
            let decoded = handle.read().is_decoded();
            if strategy == TextureStrategy::Decode && !decoded {
                return request_texture(&inner, &owned, strategy).await;
            }
            Ok(handle)
        }
        .boxed()
    }

    /// Loads a poster: the texture at `url` on an aspect-preserving plane
    ///
    /// Without a usable `aspect_hint` the texture is decoded to measure it.
    pub fn load_poster(
        &self,
        url: &str,
        aspect_hint: Option<f32>,
    ) -> BoxFuture<'static, LoadResult<Handle<Node>>> {
        let hint = aspect_hint.filter(|ratio| ratio.is_finite() && *ratio > 0.0);
        let loader = self.clone();
        let owned = url.to_owned();
        self.inner.cache.posters().get_or_load(url, move || {
            async move { loader.compose_poster(&owned, hint).await }.boxed()
        })
    }

    /// Creates a looping motion texture for `url`; never cached
    pub fn load_video(&self, url: &str) -> BoxFuture<'static, LoadResult<Handle<MotionTexture>>> {
        debug!("creating motion texture for `{url}`");
        let texture = new_handle(MotionTexture::new(MediaElement::looping(url)));
        future::ready(Ok::<_, LoadError>(texture)).boxed()
    }

    async fn compose_poster(&self, url: &str, hint: Option<f32>) -> LoadResult<Node> {
        let (texture, aspect_ratio) = match hint {
            Some(ratio) => (self.load_texture(url).await?, ratio),
            None => {
                let texture = self.load_texture_forced(url).await?;
                let measured = texture.read().aspect_ratio();
                let ratio =
                    measured.ok_or_else(|| LoadError::backend(url, "image has no area"))?;
                (texture, ratio)
            }
        };

        info!("composed poster `{url}` (aspect ratio {aspect_ratio:.3})");
        Ok(build_poster(url, texture, aspect_ratio))
    }
}

/// Texture load through the cache; a reference entry does not satisfy a
/// decode request
fn request_texture(
    inner: &Arc<LoaderInner>,
    url: &str,
    strategy: TextureStrategy,
) -> BoxFuture<'static, LoadResult<Handle<Texture>>> {
    let load_inner = Arc::clone(inner);
    let key = url.to_owned();
    inner.cache.textures().get_or_load_where(
        url,
        move |texture: &Texture| strategy == TextureStrategy::Reference || texture.is_decoded(),
        move || async move { load_inner.fetch_texture(&key, strategy).await }.boxed(),
    )
}

impl LoaderInner {
    async fn fetch_model(&self, url: &str) -> LoadResult<Node> {
        let format = ModelFormat::from_url(url).ok_or_else(|| LoadError::UnsupportedFormat {
            url: url.to_owned(),
        })?;
        let entry = self
            .registry
            .get(format)
            .ok_or_else(|| LoadError::BackendUnavailable {
                format,
                url: url.to_owned(),
            })?;

        debug!("loading {format} model `{url}`");
        let bytes = self.source.fetch(url).await?;
        let root = entry
            .backend
            .parse(url, bytes, Arc::clone(&self.source))
            .await?;
        let node = entry.selection.select(root, url)?;

        info!("loaded model `{url}` ({} triangles)", node.triangle_count());
        Ok(node)
    }

    async fn fetch_texture(&self, url: &str, strategy: TextureStrategy) -> LoadResult<Texture> {
        match strategy {
            TextureStrategy::Decode => {
                let bytes = self.source.fetch(url).await?;
                let texture = Texture::decode(url, &bytes)?;
                if let Some((width, height)) = texture.dimensions() {
                    info!("decoded texture `{url}` ({width}x{height})");
                }
                Ok(texture)
            }
            TextureStrategy::Reference => {
                let absolute = location::resolve(&self.environment.location, url);
                debug!("referencing texture `{url}` as `{absolute}`");
                Ok(Texture::reference(url, absolute))
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::assets::model::tests::{tri_bin, QUAD_OBJ, TRI_DAE, TRI_GLTF};
    use crate::assets::model::{NodeSelection, ObjBackend};
    use crate::assets::source::tests::SlowSource;
    use crate::assets::source::MemorySource;
    use crate::assets::texture::tests::png;
    use crate::assets::{poster::poster_size, AssetKind, TextureImage};

    pub(crate) fn loader_over(source: Arc<dyn AssetSource>, environment: Environment) -> Loader {
        Loader::new(LoaderConfig::new(environment), source, Arc::new(AssetCache::new()))
    }

    pub(crate) fn loader_with(source: &Arc<MemorySource>, environment: Environment) -> Loader {
        loader_over(source.clone(), environment)
    }

    pub(crate) fn desktop() -> Environment {
        Environment::desktop("https://example.com/world/")
    }

    #[test]
    fn test_texture_cache_idempotence() {
        let source = Arc::new(MemorySource::new().with("wall.png", png(4, 4)));
        let loader = loader_with(&source, desktop());

        let first = pollster::block_on(loader.load_texture("wall.png")).unwrap();
        let second = pollster::block_on(loader.load_texture("wall.png")).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(source.fetch_count("wall.png"), 1);
    }

    #[test]
    fn test_concurrent_texture_loads_coalesce() {
        let source = Arc::new(MemorySource::new().with("wall.png", png(4, 4)));
        let loader = loader_with(&source, desktop());

        let (a, b) = pollster::block_on(async {
            futures::join!(loader.load_texture("wall.png"), loader.load_texture("wall.png"))
        });

        assert!(Arc::ptr_eq(&a.unwrap(), &b.unwrap()));
        assert_eq!(source.fetch_count("wall.png"), 1);
    }

    #[test]
    fn test_unsupported_model_formats_are_rejected() {
        let source = Arc::new(MemorySource::new().with("chair.fbx", b"bytes".to_vec()));
        let loader = loader_with(&source, desktop());

        for url in ["chair.fbx", "chair", "chair.png"] {
            let err = pollster::block_on(loader.load_model(url)).unwrap_err();
            assert!(matches!(err, LoadError::UnsupportedFormat { .. }), "{url}: {err}");
            assert!(!loader.cache().contains(AssetKind::Model, url));
        }
        assert_eq!(source.total_fetches(), 0);
    }

    #[test]
    fn test_missing_backend_fails_explicitly() {
        let source: Arc<dyn AssetSource> =
            Arc::new(MemorySource::new().with("house.dae", b"<COLLADA/>".to_vec()));
        let mut registry = ModelRegistry::empty();
        registry.register(ModelFormat::Obj, Arc::new(ObjBackend), NodeSelection::FirstChild);
        let loader = Loader::with_registry(
            LoaderConfig::new(desktop()),
            source,
            Arc::new(AssetCache::new()),
            registry,
        );

        let err = pollster::block_on(loader.load_model("house.dae")).unwrap_err();
        assert_eq!(
            err,
            LoadError::BackendUnavailable {
                format: ModelFormat::Collada,
                url: "house.dae".into()
            }
        );
        assert_eq!(loader.cache().len(AssetKind::Model), 0);
    }

    #[test]
    fn test_obj_model_is_cached_as_content_node() {
        let source = Arc::new(MemorySource::new().with("quad.obj", QUAD_OBJ));
        let loader = loader_with(&source, desktop());

        let model = pollster::block_on(loader.load_model("quad.obj")).unwrap();
        assert_eq!(model.read().name, "quad.obj");

        let cached = loader.cache().model("quad.obj").unwrap();
        assert!(Arc::ptr_eq(&model, &cached));
    }

    #[test]
    fn test_broken_model_is_not_cached() {
        let source = Arc::new(MemorySource::new().with("bad.glb", b"glTF\x02nope".to_vec()));
        let loader = loader_with(&source, desktop());

        let err = pollster::block_on(loader.load_model("bad.glb")).unwrap_err();
        assert!(matches!(err, LoadError::Backend { .. }));
        assert!(!loader.cache().contains(AssetKind::Model, "bad.glb"));
    }

    #[test]
    fn test_host_runtime_references_without_fetching() {
        let source = Arc::new(MemorySource::new().with("img/sky.png", png(2, 2)));
        let env = Environment::host("https://example.com/world/index.html");
        let loader = loader_with(&source, env);

        let texture = pollster::block_on(loader.load_texture("img/sky.png")).unwrap();
        match &texture.read().image {
            TextureImage::Reference { url } => {
                assert_eq!(url, "https://example.com/world/img/sky.png")
            }
            TextureImage::Decoded { .. } => panic!("host runtime must not decode"),
        }
        assert_eq!(source.total_fetches(), 0);
    }

    #[test]
    fn test_forced_load_upgrades_reference_texture() {
        let source = Arc::new(MemorySource::new().with("sky.png", png(8, 2)));
        let loader = loader_with(&source, Environment::host("https://example.com/"));

        let reference = pollster::block_on(loader.load_texture("sky.png")).unwrap();
        let forced = pollster::block_on(loader.load_texture_forced("sky.png")).unwrap();

        assert!(!reference.read().is_decoded());
        assert_eq!(forced.read().dimensions(), Some((8, 2)));
        assert!(Arc::ptr_eq(&forced, &loader.cache().texture("sky.png").unwrap()));

        // Once decoded, plain loads reuse the decoded texture
        let again = pollster::block_on(loader.load_texture("sky.png")).unwrap();
        assert!(Arc::ptr_eq(&forced, &again));
        assert_eq!(source.fetch_count("sky.png"), 1);
    }

    #[test]
    fn test_concurrent_forced_upgrades_share_one_decode() {
        let source = Arc::new(SlowSource::new(MemorySource::new().with("sky.png", png(8, 2))));
        let loader = loader_over(source.clone(), Environment::host("https://example.com/"));

        let reference = pollster::block_on(loader.load_texture("sky.png")).unwrap();
        assert!(!reference.read().is_decoded());

        let (a, b) = pollster::block_on(async {
            futures::join!(
                loader.load_texture_forced("sky.png"),
                loader.load_texture_forced("sky.png")
            )
        });
        let (a, b) = (a.unwrap(), b.unwrap());

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.read().dimensions(), Some((8, 2)));
        assert_eq!(source.memory().fetch_count("sky.png"), 1);
    }

    #[test]
    fn test_forced_load_beside_plain_load_decodes() {
        let source = Arc::new(SlowSource::new(MemorySource::new().with("sky.png", png(8, 2))));
        let loader = loader_over(source.clone(), Environment::host("https://example.com/"));

        let (plain, forced) = pollster::block_on(async {
            futures::join!(
                loader.load_texture("sky.png"),
                loader.load_texture_forced("sky.png")
            )
        });

        assert!(!plain.unwrap().read().is_decoded());
        assert!(forced.unwrap().read().is_decoded());
        assert_eq!(source.memory().fetch_count("sky.png"), 1);
    }

    #[test]
    fn test_abandoned_model_load_can_be_retried() {
        let source = Arc::new(SlowSource::stalling(MemorySource::new().with("quad.obj", QUAD_OBJ)));
        let loader = loader_over(source.clone(), desktop());

        pollster::block_on(async {
            let mut stalled = loader.load_model("quad.obj");
            assert!(futures::poll!(&mut stalled).is_pending());
        });
        assert!(!loader.cache().contains(AssetKind::Model, "quad.obj"));

        let model = pollster::block_on(loader.load_model("quad.obj")).unwrap();
        assert_eq!(model.read().name, "quad.obj");
        assert_eq!(source.memory().fetch_count("quad.obj"), 2);
    }

    #[test]
    fn test_gltf_with_sibling_buffer() {
        let source = Arc::new(
            MemorySource::new()
                .with("models/tri.gltf", TRI_GLTF)
                .with("models/tri.bin", tri_bin()),
        );
        let loader = loader_with(&source, desktop());

        let model = pollster::block_on(loader.load_model("models/tri.gltf")).unwrap();
        assert_eq!(model.read().name, "tri");
        assert_eq!(model.read().triangle_count(), 1);
        assert_eq!(source.fetch_count("models/tri.bin"), 1);
    }

    #[test]
    fn test_collada_model_is_cached_as_group() {
        let source = Arc::new(MemorySource::new().with("old/tri.dae", TRI_DAE));
        let loader = loader_with(&source, desktop());

        let model = pollster::block_on(loader.load_model("old/tri.dae")).unwrap();
        assert_eq!(model.read().name, "tri.dae");
        assert_eq!(model.read().triangle_count(), 1);
        assert!(Arc::ptr_eq(&model, &loader.cache().model("old/tri.dae").unwrap()));
    }

    #[test]
    fn test_poster_aspect_ratio_from_pixels() {
        let source = Arc::new(
            MemorySource::new()
                .with("wide.png", png(200, 100))
                .with("tall.png", png(100, 200)),
        );
        let loader = loader_with(&source, desktop());

        let wide = pollster::block_on(loader.load_poster("wide.png", None)).unwrap();
        let tall = pollster::block_on(loader.load_poster("tall.png", None)).unwrap();

        assert_eq!(poster_size(&wide.read()), Some((1.0, 0.5)));
        assert_eq!(poster_size(&tall.read()), Some((0.5, 1.0)));
        assert!(loader.cache().contains(AssetKind::Poster, "wide.png"));
    }

    #[test]
    fn test_poster_measures_even_in_host_runtime() {
        let source = Arc::new(MemorySource::new().with("wide.png", png(200, 100)));
        let loader = loader_with(&source, Environment::host("https://example.com/"));

        let poster = pollster::block_on(loader.load_poster("wide.png", None)).unwrap();
        assert_eq!(poster_size(&poster.read()), Some((1.0, 0.5)));
    }

    #[test]
    fn test_poster_hint_skips_decoding() {
        let source = Arc::new(MemorySource::new());
        let loader = loader_with(&source, Environment::host("https://example.com/"));

        let poster = pollster::block_on(loader.load_poster("banner.png", Some(4.0))).unwrap();
        assert_eq!(poster_size(&poster.read()), Some((1.0, 0.25)));
        assert_eq!(source.total_fetches(), 0);

        // Invalid hints fall back to measuring, which fails without the image
        let invalid = loader.load_poster("other.png", Some(f32::NAN));
        let err = pollster::block_on(invalid).unwrap_err();
        assert!(matches!(err, LoadError::Fetch { .. }));
    }

    #[test]
    fn test_video_is_never_cached() {
        let source = Arc::new(MemorySource::new());
        let loader = loader_with(&source, desktop());

        let a = pollster::block_on(loader.load_video("clip.mp4")).unwrap();
        let b = pollster::block_on(loader.load_video("clip.mp4")).unwrap();

        assert!(!Arc::ptr_eq(&a, &b));
        let video = a.read();
        assert!(video.media.autoplay && video.media.looping && video.media.hidden);
        assert_eq!(video.format, crate::assets::TextureFormat::Rgb8);
        assert_eq!(source.total_fetches(), 0);
    }
}
