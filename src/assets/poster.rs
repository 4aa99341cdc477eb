//! Posters: a texture on a flat, aspect-preserving rectangle

use crate::assets::texture::Texture;
use crate::assets::Handle;
use crate::scene::{fit_unit_box, generate_plane, Material, Mesh, Node};

/// Builds the poster node for `texture`
///
/// The plane fits inside the unit box with its longer side equal to 1 and is
/// visible from both sides.
pub fn build_poster(url: &str, texture: Handle<Texture>, aspect_ratio: f32) -> Node {
    let (width, height) = fit_unit_box(aspect_ratio);

    let mut material = Material::textured(texture);
    material.double_sided = true;

    Node::new(format!("poster:{url}"))
        .with_mesh(Mesh::from(generate_plane(width, height, 1, 1)))
        .with_material(material)
}

/// Width and height of a poster node's plane
pub fn poster_size(node: &Node) -> Option<(f32, f32)> {
    let mesh = node.meshes.first()?;
    let (mut min_x, mut max_x) = (f32::INFINITY, f32::NEG_INFINITY);
    let (mut min_y, mut max_y) = (f32::INFINITY, f32::NEG_INFINITY);
    for p in &mesh.positions {
        min_x = min_x.min(p[0]);
        max_x = max_x.max(p[0]);
        min_y = min_y.min(p[1]);
        max_y = max_y.max(p[1]);
    }
    if mesh.positions.is_empty() {
        return None;
    }
    Some((max_x - min_x, max_y - min_y))
}
