//! # Scene Composition
//!
//! A [`Stage`] places independent content modules into one scene. Each module
//! declares a [`Manifest`], receives its resolved [`Payload`] together with its
//! own root node, and is then driven by the stage's update loop.
//!
//! Starting a stage classifies every module's manifest before any asset is
//! resolved, so an asset shared between modules is copied for each of them
//! while an asset only one module uses is handed out directly from the cache.

use cgmath::{Deg, Matrix4, Vector3};
use futures::future::join_all;
use log::{info, warn};

use crate::assets::Loader;
use crate::manifest::{classify, resolve, Manifest, Payload};
use crate::scene::Node;

/// A self-contained piece of diorama content
///
/// Implementors describe the assets they need and build their part of the
/// scene under the root node the stage gives them.
pub trait DioramaModule: Send {
    /// Name used for the module's root node and in logs
    fn name(&self) -> &str;

    /// Assets this module needs, by logical name
    fn manifest(&self) -> Manifest;

    /// Called once with the resolved assets
    ///
    /// # Arguments
    /// * `payload` - Handles for every manifest entry, `None` where loading failed
    /// * `root` - The module's root node, already placed in the scene
    fn start(&mut self, payload: Payload, root: &mut Node);

    /// Called every frame after the module has started
    ///
    /// # Arguments
    /// * `delta_time` - Time elapsed since last update in seconds
    /// * `root` - The module's root node
    fn update(&mut self, _delta_time: f32, _root: &mut Node) {
        // Default: static content
    }
}

/// Where a module sits in the scene
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub position: Vector3<f32>,
    pub rotation_y: Deg<f32>,
    pub scale: f32,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            position: Vector3::new(0.0, 0.0, 0.0),
            rotation_y: Deg(0.0),
            scale: 1.0,
        }
    }
}

impl Placement {
    pub fn at(x: f32, y: f32, z: f32) -> Self {
        Self {
            position: Vector3::new(x, y, z),
            ..Self::default()
        }
    }

    pub fn with_rotation_y(mut self, degrees: f32) -> Self {
        self.rotation_y = Deg(degrees);
        self
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    /// Translation × rotation × scale
    pub fn transform(&self) -> Matrix4<f32> {
        Matrix4::from_translation(self.position)
            * Matrix4::from_angle_y(self.rotation_y)
            * Matrix4::from_scale(self.scale)
    }

    fn root_node(&self, name: &str) -> Node {
        let mut root = Node::new(name);
        root.set_transform_trs(self.position, self.rotation_y, self.scale);
        root
    }
}

struct Slot {
    module: Box<dyn DioramaModule>,
    root: Node,
    started: bool,
}

/// Composes modules into one scene and drives them
pub struct Stage {
    loader: Loader,
    slots: Vec<Slot>,
    started: bool,
}

impl Stage {
    pub fn new(loader: Loader) -> Self {
        Self {
            loader,
            slots: Vec::new(),
            started: false,
        }
    }

    pub fn loader(&self) -> &Loader {
        &self.loader
    }

    /// Adds a module at `placement`
    ///
    /// Modules added after [`start`](Self::start) are kept but never started.
    pub fn add_module(
        &mut self,
        module: Box<dyn DioramaModule>,
        placement: Placement,
    ) -> &mut Self {
        if self.started {
            warn!(
                "module `{}` added after the stage started; it will not run",
                module.name()
            );
        }
        let root = placement.root_node(module.name());
        self.slots.push(Slot {
            module,
            root,
            started: false,
        });
        self
    }

    /// Resolves every module's assets and starts the modules
    ///
    /// All manifests are classified before the first load is issued, then
    /// all modules resolve concurrently. Once it has completed, further calls
    /// do nothing. A start that was dropped before completing can be retried.
    pub async fn start(&mut self) {
        if self.started {
            warn!("stage already started");
            return;
        }

        let manifests: Vec<Manifest> = self
            .slots
            .iter()
            .map(|slot| slot.module.manifest())
            .collect();
        let singletons = classify(&manifests);

        let loader = &self.loader;
        let payloads = join_all(
            manifests
                .iter()
                .map(|manifest| resolve(loader, manifest, &singletons)),
        )
        .await;

        for (slot, payload) in self.slots.iter_mut().zip(payloads) {
            let missing = payload.missing().len();
            if missing > 0 {
                warn!("module `{}` starts with {missing} missing assets", slot.module.name());
            }
            slot.module.start(payload, &mut slot.root);
            slot.started = true;
        }
        self.started = true;

        info!("stage started with {} modules", self.slots.len());
    }

    /// [`start`](Self::start) on the current thread
    pub fn start_blocking(&mut self) {
        pollster::block_on(self.start());
    }

    /// Advances every started module by `delta_time` seconds
    pub fn update(&mut self, delta_time: f32) {
        for slot in self.slots.iter_mut().filter(|slot| slot.started) {
            slot.module.update(delta_time, &mut slot.root);
        }
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Root nodes of all modules, in insertion order
    pub fn roots(&self) -> impl Iterator<Item = &Node> {
        self.slots.iter().map(|slot| &slot.root)
    }

    pub fn root(&self, name: &str) -> Option<&Node> {
        self.slots
            .iter()
            .find(|slot| slot.module.name() == name)
            .map(|slot| &slot.root)
    }
}
