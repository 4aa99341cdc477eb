//! # Manifest Preview
//!
//! Resolves a manifest file the way a stage would and prints what loaded.
//!
//! ```text
//! cargo run --example preview -- path/to/manifest.json
//! ```
//!
//! Asset URLs are resolved relative to the manifest's directory. Set
//! `RUST_LOG=debug` to watch cache hits and dispatch.

use std::path::PathBuf;

use anyhow::{Context, Result};
use diorama::prelude::*;

struct PreviewModule {
    manifest: Manifest,
}

impl DioramaModule for PreviewModule {
    fn name(&self) -> &str {
        "preview"
    }

    fn manifest(&self) -> Manifest {
        self.manifest.clone()
    }

    fn start(&mut self, payload: Payload, root: &mut Node) {
        for (name, model) in &payload.models {
            match model {
                Some(model) => {
                    let model = model.read();
                    println!("model   {name}: {} triangles", model.triangle_count());
                    root.add_child(model.clone());
                }
                None => println!("model   {name}: failed"),
            }
        }
        for (name, texture) in &payload.textures {
            match texture.as_ref().map(|t| t.read().dimensions()) {
                Some(Some((w, h))) => println!("texture {name}: {w}x{h}"),
                Some(None) => println!("texture {name}: referenced"),
                None => println!("texture {name}: failed"),
            }
        }
        for (name, poster) in &payload.posters {
            match poster {
                Some(poster) => {
                    let poster = poster.read();
                    println!("poster  {name}: {}", poster.name);
                    root.add_child(poster.clone());
                }
                None => println!("poster  {name}: failed"),
            }
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .context("usage: preview <manifest.json>")?;
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("reading {}", path.display()))?;
    let manifest = Manifest::from_json(&json).context("parsing manifest")?;

    let root = path
        .parent()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    let store = FileStore::new(root.join(".diorama"));
    let view = ViewSettings::load(&store)?.unwrap_or_default();

    let mut stage = Stage::new(diorama::desktop_loader(&root));
    stage.add_module(Box::new(PreviewModule { manifest }), Placement::default());
    stage.start_blocking();

    for node in stage.roots() {
        println!(
            "`{}`: {} children, {} triangles",
            node.name,
            node.children.len(),
            node.triangle_count()
        );
    }

    view.save(&store)?;
    println!("view focus {:?}, size {}", view.focus, view.view_size);
    Ok(())
}
