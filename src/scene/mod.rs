//! # Scene Nodes
//!
//! The engine-native objects produced by the loaders: a small scene graph of
//! named nodes carrying meshes, materials and local transforms.
//!
//! - [`Node`] - Named node with transform, meshes, material and children
//! - [`Mesh`] - Indexed triangle mesh
//! - [`Material`] - Base color, optional texture, sidedness
//! - [`geometry`] - Procedural plane generation for posters

pub mod geometry;
pub mod node;

pub use geometry::{fit_unit_box, generate_plane, GeometryData};
pub use node::{Material, Mesh, Node};
