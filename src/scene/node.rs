use cgmath::{Deg, Matrix4, SquareMatrix, Vector3};

use crate::assets::texture::Texture;
use crate::assets::Handle;

use super::geometry::GeometryData;

/// Indexed triangle mesh
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub tex_coords: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
}

impl Mesh {
    /// Builds a mesh from flat position/normal arrays, as OBJ loaders produce them
    ///
    /// Normals are recomputed from faces when missing or mismatched.
    pub fn from_flat(
        positions: &[f32],
        normals: &[f32],
        tex_coords: &[f32],
        indices: Vec<u32>,
    ) -> Self {
        let normals = if !normals.is_empty() && normals.len() == positions.len() {
            normals.to_vec()
        } else {
            Self::calculate_face_normals(positions, &indices)
        };

        Self {
            positions: positions.chunks_exact(3).map(|p| [p[0], p[1], p[2]]).collect(),
            normals: normals.chunks_exact(3).map(|n| [n[0], n[1], n[2]]).collect(),
            tex_coords: tex_coords.chunks_exact(2).map(|t| [t[0], t[1]]).collect(),
            indices,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Averages face normals onto each vertex
    pub fn calculate_face_normals(positions: &[f32], indices: &[u32]) -> Vec<f32> {
        let vertex_count = positions.len() / 3;
        let mut normals = vec![0.0; vertex_count * 3];
        let mut counts = vec![0u32; vertex_count];

        let vertex = |i: usize| [positions[i * 3], positions[i * 3 + 1], positions[i * 3 + 2]];

        for triangle in indices.chunks_exact(3) {
            let corners = [
                triangle[0] as usize,
                triangle[1] as usize,
                triangle[2] as usize,
            ];
            if corners.iter().any(|&i| i >= vertex_count) {
                continue;
            }

            let v0 = vertex(corners[0]);
            let v1 = vertex(corners[1]);
            let v2 = vertex(corners[2]);

            let edge1 = [v1[0] - v0[0], v1[1] - v0[1], v1[2] - v0[2]];
            let edge2 = [v2[0] - v0[0], v2[1] - v0[1], v2[2] - v0[2]];

            let face_normal = [
                edge1[1] * edge2[2] - edge1[2] * edge2[1],
                edge1[2] * edge2[0] - edge1[0] * edge2[2],
                edge1[0] * edge2[1] - edge1[1] * edge2[0],
            ];

            for &idx in &corners {
                normals[idx * 3] += face_normal[0];
                normals[idx * 3 + 1] += face_normal[1];
                normals[idx * 3 + 2] += face_normal[2];
                counts[idx] += 1;
            }
        }

        for i in 0..vertex_count {
            if counts[i] == 0 {
                continue;
            }
            let n = &mut normals[i * 3..i * 3 + 3];
            let length = (n[0].powi(2) + n[1].powi(2) + n[2].powi(2)).sqrt();
            if length > 0.0 {
                n.iter_mut().for_each(|c| *c /= length);
            }
        }

        normals
    }
}

impl From<GeometryData> for Mesh {
    fn from(data: GeometryData) -> Self {
        Self {
            positions: data.vertices,
            normals: data.normals,
            tex_coords: data.tex_coords,
            indices: data.indices,
        }
    }
}

/// Surface description attached to a node
///
/// Textures are shared between copies of a material; everything else is
/// copied.
#[derive(Debug, Clone)]
pub struct Material {
    pub base_color: [f32; 4],
    pub texture: Option<Handle<Texture>>,
    pub double_sided: bool,
}

impl Material {
    pub fn new(base_color: [f32; 4]) -> Self {
        Self {
            base_color,
            texture: None,
            double_sided: false,
        }
    }

    /// Unlit white material showing `texture`
    pub fn textured(texture: Handle<Texture>) -> Self {
        Self {
            base_color: [1.0, 1.0, 1.0, 1.0],
            texture: Some(texture),
            double_sided: false,
        }
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::new([0.8, 0.8, 0.8, 1.0])
    }
}

/// A node in the loaded scene graph
///
/// This is the engine-native object handed out by the loader: models are the
/// node extracted from a loaded document, posters are a single textured plane.
#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub transform: Matrix4<f32>,
    pub meshes: Vec<Mesh>,
    pub material: Option<Material>,
    pub children: Vec<Node>,
}

impl Node {
    /// Create an empty node with identity transformation
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: Matrix4::identity(),
            meshes: Vec::new(),
            material: None,
            children: Vec::new(),
        }
    }

    pub fn with_mesh(mut self, mesh: Mesh) -> Self {
        self.meshes.push(mesh);
        self
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.material = Some(material);
        self
    }

    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    pub fn add_child(&mut self, child: Node) {
        self.children.push(child);
    }

    pub fn first_child(&self) -> Option<&Node> {
        self.children.first()
    }

    /// Detaches the first child, consuming the node
    pub fn into_first_child(self) -> Option<Node> {
        self.children.into_iter().next()
    }

    /// Depth-first search by name
    pub fn find(&self, name: &str) -> Option<&Node> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(name))
    }

    /// Set translation
    pub fn set_translation(&mut self, translation: Vector3<f32>) {
        self.transform = Matrix4::from_translation(translation);
    }

    /// Apply translation (multiplies with existing transform)
    pub fn translate(&mut self, translation: Vector3<f32>) {
        self.transform = self.transform * Matrix4::from_translation(translation);
    }

    /// Apply rotation around Y axis
    pub fn rotate_y(&mut self, angle: Deg<f32>) {
        self.transform = self.transform * Matrix4::from_angle_y(angle);
    }

    /// Create a complete transform from translation, rotation, and scale
    pub fn set_transform_trs(
        &mut self,
        translation: Vector3<f32>,
        rotation_y: Deg<f32>,
        scale: f32,
    ) {
        let t = Matrix4::from_translation(translation);
        let r = Matrix4::from_angle_y(rotation_y);
        let s = Matrix4::from_scale(scale);
        self.transform = t * r * s;
    }

    /// World-space translation component of the local transform
    pub fn translation(&self) -> Vector3<f32> {
        self.transform.w.truncate()
    }

    /// Total triangle count of this node and its descendants
    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(Mesh::triangle_count).sum::<usize>()
            + self.children.iter().map(Node::triangle_count).sum::<usize>()
    }
}
