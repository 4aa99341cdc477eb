//! Manifest resolution: one load per distinct URL, then shared or copied
//! handles per logical name

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use futures::future::join_all;
use log::{info, warn};

use crate::assets::{copy_handle, AssetKind, Handle, Loader};
use crate::error::LoadResult;
use crate::manifest::{Manifest, Payload, SingletonTable};

/// Loads everything `manifest` names and builds its payload
///
/// Never fails: an asset that cannot be loaded is logged and left as `None`.
/// Singleton URLs hand out the cached instance; every other URL hands out a
/// fresh copy per name.
pub async fn resolve(
    loader: &Loader,
    manifest: &Manifest,
    singletons: &SingletonTable,
) -> Payload {
    let model_urls: BTreeSet<&str> = manifest.models.values().map(String::as_str).collect();
    let texture_urls: BTreeSet<&str> = manifest.textures.values().map(String::as_str).collect();

    // First usable hint per URL, in name order
    let mut poster_hints: BTreeMap<&str, Option<f32>> = BTreeMap::new();
    for request in manifest.posters.values() {
        let hint = poster_hints.entry(request.url()).or_insert(None);
        if hint.is_none() {
            *hint = request
                .aspect_ratio()
                .filter(|ratio| ratio.is_finite() && *ratio > 0.0);
        }
    }

    let (models, textures, posters) = futures::join!(
        join_all(model_urls.iter().map(|url| loader.load_model(url))),
        join_all(texture_urls.iter().map(|url| loader.load_texture(url))),
        join_all(
            poster_hints
                .iter()
                .map(|(url, hint)| loader.load_poster(url, *hint))
        ),
    );

    let models = settle(AssetKind::Model, model_urls.iter().copied().zip(models));
    let textures = settle(AssetKind::Texture, texture_urls.iter().copied().zip(textures));
    let posters = settle(AssetKind::Poster, poster_hints.keys().copied().zip(posters));

    let payload = Payload {
        models: hand_out(
            manifest.models.iter().map(|(name, url)| (name, url.as_str())),
            &models,
            singletons,
        ),
        textures: hand_out(
            manifest.textures.iter().map(|(name, url)| (name, url.as_str())),
            &textures,
            singletons,
        ),
        posters: hand_out(
            manifest.posters.iter().map(|(name, request)| (name, request.url())),
            &posters,
            singletons,
        ),
    };

    info!(
        "resolved {} assets ({} missing)",
        payload.len(),
        payload.missing().len()
    );
    payload
}

fn settle<'a, T>(
    kind: AssetKind,
    results: impl Iterator<Item = (&'a str, LoadResult<Handle<T>>)>,
) -> HashMap<&'a str, Handle<T>> {
    results
        .filter_map(|(url, result)| match result {
            Ok(handle) => Some((url, handle)),
            Err(e) => {
                warn!("failed to load {kind} `{url}`: {e}");
                None
            }
        })
        .collect()
}

fn hand_out<'a, T: Clone>(
    entries: impl Iterator<Item = (&'a String, &'a str)>,
    loaded: &HashMap<&str, Handle<T>>,
    singletons: &SingletonTable,
) -> BTreeMap<String, Option<Handle<T>>> {
    entries
        .map(|(name, url)| {
            let handle = loaded.get(url).map(|handle| {
                if singletons.is_singleton(url) {
                    Arc::clone(handle)
                } else {
                    copy_handle(handle)
                }
            });
            (name.clone(), handle)
        })
        .collect()
}
