//! # Procedural Geometry
//!
//! Flat geometry generated for composed assets such as posters. Planes lie in
//! the XY plane facing +Z, centered at the origin.

/// Generated geometry data ready to become a [`Mesh`](super::Mesh)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeometryData {
    /// Vertex positions (x, y, z)
    pub vertices: Vec<[f32; 3]>,
    /// Texture coordinates (u, v)
    pub tex_coords: Vec<[f32; 2]>,
    /// Normal vectors (x, y, z)
    pub normals: Vec<[f32; 3]>,
    /// Triangle indices (counter-clockwise winding)
    pub indices: Vec<u32>,
}

impl GeometryData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Axis-aligned extent as (width, height, depth)
    pub fn extent(&self) -> [f32; 3] {
        let mut min = [f32::INFINITY; 3];
        let mut max = [f32::NEG_INFINITY; 3];
        for v in &self.vertices {
            for axis in 0..3 {
                min[axis] = min[axis].min(v[axis]);
                max[axis] = max[axis].max(v[axis]);
            }
        }
        if self.vertices.is_empty() {
            return [0.0; 3];
        }
        [max[0] - min[0], max[1] - min[1], max[2] - min[2]]
    }
}

/// Generate a plane in the XY plane
///
/// # Arguments
/// * `width` - Width of the plane (X direction)
/// * `height` - Height of the plane (Y direction)
/// * `width_segments` - Number of subdivisions along width
/// * `height_segments` - Number of subdivisions along height
pub fn generate_plane(
    width: f32,
    height: f32,
    width_segments: u32,
    height_segments: u32,
) -> GeometryData {
    let mut data = GeometryData::new();

    let w_segs = width_segments.max(1);
    let h_segs = height_segments.max(1);

    for y in 0..=h_segs {
        let v = y as f32 / h_segs as f32;
        let pos_y = (v - 0.5) * height;

        for x in 0..=w_segs {
            let u = x as f32 / w_segs as f32;
            let pos_x = (u - 0.5) * width;

            data.vertices.push([pos_x, pos_y, 0.0]);
            data.normals.push([0.0, 0.0, 1.0]);
            data.tex_coords.push([u, v]);
        }
    }

    for y in 0..h_segs {
        for x in 0..w_segs {
            let i = y * (w_segs + 1) + x;
            let next_row = i + w_segs + 1;

            data.indices.push(i);
            data.indices.push(i + 1);
            data.indices.push(next_row);

            data.indices.push(next_row);
            data.indices.push(i + 1);
            data.indices.push(next_row + 1);
        }
    }

    data
}

/// Fits an aspect ratio (width / height) inside the unit box
///
/// The longer side becomes 1. Returns `(width, height)`.
pub fn fit_unit_box(aspect_ratio: f32) -> (f32, f32) {
    if aspect_ratio >= 1.0 {
        (1.0, 1.0 / aspect_ratio)
    } else {
        (aspect_ratio, 1.0)
    }
}
