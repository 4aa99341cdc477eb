//! Model formats and their backends
//!
//! Formats are dispatched through a [`ModelRegistry`]: a table from
//! [`ModelFormat`] to a parsing backend plus the rule for picking the cacheable
//! node out of the document the backend produced. Adding a format is one
//! `register` call.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use base64::Engine;
use cgmath::Matrix4;
use futures::future::{self, BoxFuture, FutureExt};
use log::debug;

use crate::assets::source::AssetSource;
use crate::error::{LoadError, LoadResult};
use crate::location;
use crate::scene::{Material, Mesh, Node};

/// Model file formats recognized by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelFormat {
    Gltf,
    Glb,
    Obj,
    Collada,
}

impl ModelFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "gltf" => Some(Self::Gltf),
            "glb" => Some(Self::Glb),
            "obj" => Some(Self::Obj),
            "dae" => Some(Self::Collada),
            _ => None,
        }
    }

    /// Format of the file a URL points at, ignoring query and fragment
    pub fn from_url(url: &str) -> Option<Self> {
        let path = url.split(['?', '#']).next().unwrap_or_default();
        let file = path.rsplit('/').next().unwrap_or(path);
        let (_, ext) = file.rsplit_once('.')?;
        Self::from_extension(ext)
    }
}

impl fmt::Display for ModelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ModelFormat::Gltf => "glTF",
            ModelFormat::Glb => "GLB",
            ModelFormat::Obj => "OBJ",
            ModelFormat::Collada => "COLLADA",
        })
    }
}

/// Which node of a loaded document becomes the cached model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeSelection {
    FirstChild,
    /// For backends that wrap the content in an extra node
    FirstGrandchild,
}

impl NodeSelection {
    pub fn select(self, root: Node, url: &str) -> LoadResult<Node> {
        let missing = || LoadError::backend(url, "loaded document has no content node");
        let child = root.into_first_child().ok_or_else(missing)?;
        match self {
            NodeSelection::FirstChild => Ok(child),
            NodeSelection::FirstGrandchild => child.into_first_child().ok_or_else(missing),
        }
    }
}

/// Parses a fetched model document into a node tree
///
/// Files the document references (buffers, for instance) are fetched through
/// `source`, resolved relative to `url`. Backends must report every failure
/// through the returned `Result`.
pub trait ModelBackend: Send + Sync {
    fn parse(
        &self,
        url: &str,
        bytes: Vec<u8>,
        source: Arc<dyn AssetSource>,
    ) -> BoxFuture<'static, LoadResult<Node>>;
}

#[derive(Clone)]
pub struct RegisteredBackend {
    pub backend: Arc<dyn ModelBackend>,
    pub selection: NodeSelection,
}

/// Format → backend table
#[derive(Clone)]
pub struct ModelRegistry {
    backends: HashMap<ModelFormat, RegisteredBackend>,
}

impl ModelRegistry {
    /// Registry with no backends; every model load fails as unavailable
    pub fn empty() -> Self {
        Self {
            backends: HashMap::new(),
        }
    }

    pub fn register(
        &mut self,
        format: ModelFormat,
        backend: Arc<dyn ModelBackend>,
        selection: NodeSelection,
    ) -> &mut Self {
        self.backends
            .insert(format, RegisteredBackend { backend, selection });
        self
    }

    pub fn get(&self, format: ModelFormat) -> Option<&RegisteredBackend> {
        self.backends.get(&format)
    }

    pub fn supports(&self, format: ModelFormat) -> bool {
        self.backends.contains_key(&format)
    }
}

impl Default for ModelRegistry {
    /// glTF, GLB, OBJ and COLLADA
    fn default() -> Self {
        let gltf: Arc<dyn ModelBackend> = Arc::new(GltfBackend);
        let mut registry = Self::empty();
        registry
            .register(ModelFormat::Gltf, Arc::clone(&gltf), NodeSelection::FirstChild)
            .register(ModelFormat::Glb, gltf, NodeSelection::FirstChild)
            .register(ModelFormat::Obj, Arc::new(ObjBackend), NodeSelection::FirstChild)
            .register(
                ModelFormat::Collada,
                Arc::new(ColladaBackend),
                NodeSelection::FirstGrandchild,
            );
        registry
    }
}

/// glTF 2.0 backend for both `.gltf` and `.glb`
///
/// The document root holds the default scene's top-level nodes as children.
/// Buffers come from the GLB blob, `data:` URIs, or files next to the model.
/// Images are left to the texture loader.
#[derive(Debug, Default, Clone, Copy)]
pub struct GltfBackend;

enum BufferSource {
    Blob,
    Uri(String),
}

impl ModelBackend for GltfBackend {
    fn parse(
        &self,
        url: &str,
        bytes: Vec<u8>,
        source: Arc<dyn AssetSource>,
    ) -> BoxFuture<'static, LoadResult<Node>> {
        let url = url.to_owned();
        async move {
            let gltf::Gltf { document, blob } =
                gltf::Gltf::from_slice(&bytes).map_err(|e| LoadError::backend(&url, e))?;

            let sources: Vec<(BufferSource, usize)> = document
                .buffers()
                .map(|buffer| {
                    let origin = match buffer.source() {
                        gltf::buffer::Source::Bin => BufferSource::Blob,
                        gltf::buffer::Source::Uri(uri) => BufferSource::Uri(uri.to_owned()),
                    };
                    (origin, buffer.length())
                })
                .collect();

            let mut buffers = Vec::with_capacity(sources.len());
            for (origin, length) in sources {
                let mut data = match origin {
                    BufferSource::Blob => blob
                        .clone()
                        .ok_or_else(|| LoadError::backend(&url, "missing GLB binary chunk"))?,
                    BufferSource::Uri(uri) => fetch_buffer(&url, &uri, source.as_ref()).await?,
                };
                if data.len() < length {
                    return Err(LoadError::backend(&url, "buffer shorter than declared"));
                }
                while data.len() % 4 != 0 {
                    data.push(0);
                }
                buffers.push(gltf::buffer::Data(data));
            }

            let scene = document
                .default_scene()
                .or_else(|| document.scenes().next())
                .ok_or_else(|| LoadError::backend(&url, "document has no scene"))?;

            let mut root = Node::new(scene.name().unwrap_or("scene"));
            for node in scene.nodes() {
                root.add_child(convert_gltf_node(&node, &buffers));
            }
            Ok(root)
        }
        .boxed()
    }
}

async fn fetch_buffer(model_url: &str, uri: &str, source: &dyn AssetSource) -> LoadResult<Vec<u8>> {
    if let Some(data) = uri.strip_prefix("data:") {
        let (_, encoded) = data
            .split_once(";base64,")
            .ok_or_else(|| LoadError::backend(model_url, "unsupported data URI"))?;
        return base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| LoadError::backend(model_url, e));
    }

    let buffer_url = location::resolve(model_url, uri);
    debug!("fetching glTF buffer `{buffer_url}`");
    source.fetch(&buffer_url).await
}

fn convert_gltf_node(node: &gltf::Node, buffers: &[gltf::buffer::Data]) -> Node {
    let mut out = Node::new(node.name().unwrap_or_default());
    out.transform = Matrix4::from(node.transform().matrix());

    if let Some(mesh) = node.mesh() {
        for primitive in mesh.primitives() {
            let reader = primitive
                .reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));

            let positions: Vec<f32> = reader
                .read_positions()
                .map(|p| p.flatten().collect())
                .unwrap_or_default();
            let normals: Vec<f32> = reader
                .read_normals()
                .map(|n| n.flatten().collect())
                .unwrap_or_default();
            let tex_coords: Vec<f32> = reader
                .read_tex_coords(0)
                .map(|t| t.into_f32().flatten().collect())
                .unwrap_or_default();
            let indices: Vec<u32> = reader
                .read_indices()
                .map(|i| i.into_u32().collect())
                .unwrap_or_else(|| (0..(positions.len() / 3) as u32).collect());

            out.meshes
                .push(Mesh::from_flat(&positions, &normals, &tex_coords, indices));

            if out.material.is_none() {
                let color = primitive.material().pbr_metallic_roughness().base_color_factor();
                out.material = Some(Material::new(color));
            }
        }
    }

    for child in node.children() {
        out.add_child(convert_gltf_node(&child, buffers));
    }
    out
}

/// Wavefront OBJ backend
///
/// The document root holds one group node for the file whose children are the
/// file's objects. Material libraries are not fetched.
#[derive(Debug, Default, Clone, Copy)]
pub struct ObjBackend;

impl ModelBackend for ObjBackend {
    fn parse(
        &self,
        url: &str,
        bytes: Vec<u8>,
        _source: Arc<dyn AssetSource>,
    ) -> BoxFuture<'static, LoadResult<Node>> {
        future::ready(parse_obj(url, &bytes)).boxed()
    }
}

fn parse_obj(url: &str, bytes: &[u8]) -> LoadResult<Node> {
    let mut reader = bytes;
    let (models, _materials) = tobj::load_obj_buf(
        &mut reader,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
        |_| Err(tobj::LoadError::OpenFileFailed),
    )
    .map_err(|e| LoadError::backend(url, e))?;

    let mut group = Node::new(file_name(url));
    for model in models {
        let mesh = model.mesh;
        group.add_child(Node::new(model.name).with_mesh(Mesh::from_flat(
            &mesh.positions,
            &mesh.normals,
            &mesh.texcoords,
            mesh.indices,
        )));
    }

    Ok(Node::new("obj").with_child(group))
}

/// COLLADA (`.dae`) backend
///
/// Like other COLLADA loaders it wraps the content: the document root holds a
/// `visual_scene` node whose only child is the file's group of objects, so the
/// cached model is the first grandchild.
#[derive(Debug, Default, Clone, Copy)]
pub struct ColladaBackend;

impl ModelBackend for ColladaBackend {
    fn parse(
        &self,
        url: &str,
        bytes: Vec<u8>,
        _source: Arc<dyn AssetSource>,
    ) -> BoxFuture<'static, LoadResult<Node>> {
        future::ready(parse_collada(url, &bytes)).boxed()
    }
}

fn parse_collada(url: &str, bytes: &[u8]) -> LoadResult<Node> {
    let text = std::str::from_utf8(bytes).map_err(|e| LoadError::backend(url, e))?;
    let document = collada::document::ColladaDocument::from_str(text)
        .map_err(|e| LoadError::backend(url, e))?;
    let objects = document
        .get_obj_set()
        .ok_or_else(|| LoadError::backend(url, "document has no geometry library"))?
        .objects;

    let mut group = Node::new(file_name(url));
    for object in &objects {
        let mesh = collada_mesh(url, object)?;
        group.add_child(Node::new(object.name.clone()).with_mesh(mesh));
    }

    Ok(Node::new("collada").with_child(Node::new("visual_scene").with_child(group)))
}

/// Flattens an object's triangles into one mesh, one vertex per corner
fn collada_mesh(url: &str, object: &collada::Object) -> LoadResult<Mesh> {
    let mut corners: Vec<(usize, Option<usize>, Option<usize>)> = Vec::new();
    for geometry in &object.geometry {
        for primitive in &geometry.mesh {
            match primitive {
                collada::PrimitiveElement::Polylist(polylist) => {
                    for shape in &polylist.shapes {
                        if let collada::Shape::Triangle(a, b, c) = shape {
                            corners.extend([*a, *b, *c]);
                        }
                    }
                }
                collada::PrimitiveElement::Triangles(triangles) => {
                    for (i, &(a, b, c)) in triangles.vertices.iter().enumerate() {
                        let tex = triangles.tex_vertices.as_ref().and_then(|t| t.get(i));
                        let normal = triangles.normals.as_ref().and_then(|n| n.get(i));
                        corners.push((a, tex.map(|t| t.0), normal.map(|n| n.0)));
                        corners.push((b, tex.map(|t| t.1), normal.map(|n| n.1)));
                        corners.push((c, tex.map(|t| t.2), normal.map(|n| n.2)));
                    }
                }
            }
        }
    }

    let out_of_range = || LoadError::backend(url, "index out of range");
    let mut positions = Vec::with_capacity(corners.len() * 3);
    let mut normals = Vec::with_capacity(corners.len() * 3);
    let mut tex_coords = Vec::with_capacity(corners.len() * 2);
    for &(vertex, tex, normal) in &corners {
        let v = object.vertices.get(vertex).ok_or_else(out_of_range)?;
        positions.extend([v.x as f32, v.y as f32, v.z as f32]);
        if let Some(n) = normal.and_then(|i| object.normals.get(i)) {
            normals.extend([n.x as f32, n.y as f32, n.z as f32]);
        }
        if let Some(t) = tex.and_then(|i| object.tex_vertices.get(i)) {
            tex_coords.extend([t.x as f32, t.y as f32]);
        }
    }

    // Partial attributes cannot be matched to their corners
    if normals.len() != positions.len() {
        normals.clear();
    }
    if tex_coords.len() / 2 != positions.len() / 3 {
        tex_coords.clear();
    }

    let indices = (0..corners.len() as u32).collect();
    Ok(Mesh::from_flat(&positions, &normals, &tex_coords, indices))
}

/// Last path segment of `url`, without query or fragment
fn file_name(url: &str) -> &str {
    url.split(['?', '#'])
        .next()
        .and_then(|path| path.rsplit('/').next())
        .unwrap_or(url)
}

#[cfg(test)]
pub(crate) mod tests {
    use base64::Engine;

    use super::*;
    use crate::assets::source::MemorySource;

    pub(crate) const QUAD_OBJ: &str = "\
o quad
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
f 1 2 3 4
";

    /// One triangle whose positions live in a sibling `tri.bin`
    pub(crate) const TRI_GLTF: &str = r#"{
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [{ "name": "tri", "mesh": 0 }],
        "meshes": [{ "primitives": [{ "attributes": { "POSITION": 0 } }] }],
        "buffers": [{ "uri": "tri.bin", "byteLength": 36 }],
        "bufferViews": [{ "buffer": 0, "byteLength": 36 }],
        "accessors": [{
            "bufferView": 0,
            "componentType": 5126,
            "count": 3,
            "type": "VEC3",
            "min": [0.0, 0.0, 0.0],
            "max": [1.0, 1.0, 0.0]
        }]
    }"#;

    pub(crate) const TRI_DAE: &str = r##"<?xml version="1.0" encoding="utf-8"?>
<COLLADA xmlns="http://www.collada.org/2005/11/COLLADASchema" version="1.4.1">
  <asset><up_axis>Y_UP</up_axis></asset>
  <library_geometries>
    <geometry id="tri-mesh" name="tri">
      <mesh>
        <source id="tri-positions">
          <float_array id="tri-positions-array" count="9">0 0 0 1 0 0 0 1 0</float_array>
          <technique_common>
            <accessor source="#tri-positions-array" count="3" stride="3">
              <param name="X" type="float"/>
              <param name="Y" type="float"/>
              <param name="Z" type="float"/>
            </accessor>
          </technique_common>
        </source>
        <source id="tri-normals">
          <float_array id="tri-normals-array" count="3">0 0 1</float_array>
          <technique_common>
            <accessor source="#tri-normals-array" count="1" stride="3">
              <param name="X" type="float"/>
              <param name="Y" type="float"/>
              <param name="Z" type="float"/>
            </accessor>
          </technique_common>
        </source>
        <vertices id="tri-vertices">
          <input semantic="POSITION" source="#tri-positions"/>
        </vertices>
        <triangles count="1">
          <input semantic="VERTEX" source="#tri-vertices" offset="0"/>
          <input semantic="NORMAL" source="#tri-normals" offset="1"/>
          <p>0 0 1 0 2 0</p>
        </triangles>
      </mesh>
    </geometry>
  </library_geometries>
</COLLADA>
"##;

    pub(crate) fn tri_bin() -> Vec<u8> {
        [0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]
            .iter()
            .flat_map(|f| f.to_le_bytes())
            .collect()
    }

    fn no_files() -> Arc<MemorySource> {
        Arc::new(MemorySource::new())
    }

    fn parse(
        backend: &dyn ModelBackend,
        url: &str,
        bytes: &[u8],
        source: Arc<MemorySource>,
    ) -> LoadResult<Node> {
        pollster::block_on(backend.parse(url, bytes.to_vec(), source))
    }

    #[test]
    fn test_format_from_url() {
        assert_eq!(ModelFormat::from_url("a/b/chair.GLB"), Some(ModelFormat::Glb));
        assert_eq!(ModelFormat::from_url("scene.gltf?v=2#x"), Some(ModelFormat::Gltf));
        assert_eq!(ModelFormat::from_url("old/house.dae"), Some(ModelFormat::Collada));
        assert_eq!(ModelFormat::from_url("mesh.fbx"), None);
        assert_eq!(ModelFormat::from_url("https://host.dir/model"), None);
    }

    #[test]
    fn test_default_registry_covers_every_format() {
        let registry = ModelRegistry::default();
        for format in [
            ModelFormat::Gltf,
            ModelFormat::Glb,
            ModelFormat::Obj,
            ModelFormat::Collada,
        ] {
            assert!(registry.supports(format), "{format}");
        }
        let collada = registry.get(ModelFormat::Collada).unwrap();
        assert_eq!(collada.selection, NodeSelection::FirstGrandchild);
        assert_eq!(
            registry.get(ModelFormat::Obj).unwrap().selection,
            NodeSelection::FirstChild
        );
    }

    #[test]
    fn test_selection_rules() {
        let doc = || {
            Node::new("root").with_child(Node::new("wrapper").with_child(Node::new("content")))
        };

        assert_eq!(NodeSelection::FirstChild.select(doc(), "x").unwrap().name, "wrapper");
        assert_eq!(NodeSelection::FirstGrandchild.select(doc(), "x").unwrap().name, "content");

        let empty = NodeSelection::FirstChild.select(Node::new("root"), "x");
        assert!(matches!(empty, Err(LoadError::Backend { .. })));
    }

    #[test]
    fn test_obj_backend_triangulates() {
        let root = parse(&ObjBackend, "models/quad.obj", QUAD_OBJ.as_bytes(), no_files()).unwrap();
        let group = NodeSelection::FirstChild.select(root, "models/quad.obj").unwrap();

        assert_eq!(group.name, "quad.obj");
        assert_eq!(group.children.len(), 1);
        assert_eq!(group.children[0].name, "quad");
        assert_eq!(group.triangle_count(), 2);
        // No normals in the file, so they are computed from faces
        assert_eq!(group.children[0].meshes[0].normals[0], [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_gltf_backend_roots_scene_nodes() {
        let doc = r#"{
            "asset": { "version": "2.0" },
            "scene": 0,
            "scenes": [{ "nodes": [0, 1] }],
            "nodes": [
                { "name": "statue", "translation": [1.0, 0.0, 0.0], "children": [2] },
                { "name": "plinth" },
                { "name": "head" }
            ]
        }"#;

        let root = parse(&GltfBackend, "statue.gltf", doc.as_bytes(), no_files()).unwrap();
        assert_eq!(root.children.len(), 2);

        let statue = NodeSelection::FirstChild.select(root, "statue.gltf").unwrap();
        assert_eq!(statue.name, "statue");
        assert_eq!(statue.translation(), cgmath::Vector3::new(1.0, 0.0, 0.0));
        assert!(statue.find("head").is_some());
    }

    #[test]
    fn test_gltf_buffer_next_to_model() {
        let source = Arc::new(MemorySource::new().with("models/tri.bin", tri_bin()));
        let root = parse(&GltfBackend, "models/tri.gltf", TRI_GLTF.as_bytes(), source.clone());

        let tri = NodeSelection::FirstChild.select(root.unwrap(), "models/tri.gltf").unwrap();
        assert_eq!(tri.name, "tri");
        assert_eq!(tri.triangle_count(), 1);
        assert_eq!(tri.meshes[0].positions[1], [1.0, 0.0, 0.0]);
        assert_eq!(source.fetch_count("models/tri.bin"), 1);
    }

    #[test]
    fn test_gltf_embedded_buffer() {
        let uri = format!(
            "data:application/octet-stream;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(tri_bin())
        );
        let doc = TRI_GLTF.replace("tri.bin", &uri);
        let source = Arc::new(MemorySource::new());

        let root = parse(&GltfBackend, "tri.gltf", doc.as_bytes(), source.clone()).unwrap();
        assert_eq!(root.triangle_count(), 1);
        assert_eq!(source.total_fetches(), 0);
    }

    #[test]
    fn test_gltf_missing_buffer_fails() {
        let err = parse(&GltfBackend, "models/tri.gltf", TRI_GLTF.as_bytes(), no_files());
        assert!(matches!(err, Err(LoadError::Fetch { ref url, .. }) if url == "models/tri.bin"));
    }

    #[test]
    fn test_gltf_backend_reports_errors() {
        let err = parse(&GltfBackend, "broken.glb", b"glTF\x02garbage", no_files()).unwrap_err();
        assert!(matches!(err, LoadError::Backend { .. }));
    }

    #[test]
    fn test_collada_backend_wraps_content() {
        let root = parse(&ColladaBackend, "old/tri.dae", TRI_DAE.as_bytes(), no_files()).unwrap();
        assert_eq!(root.children[0].name, "visual_scene");

        let group = NodeSelection::FirstGrandchild.select(root, "old/tri.dae").unwrap();
        assert_eq!(group.name, "tri.dae");
        assert_eq!(group.children[0].name, "tri");
        assert_eq!(group.triangle_count(), 1);
        assert_eq!(group.children[0].meshes[0].normals[0], [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_collada_backend_rejects_non_xml() {
        let err = parse(&ColladaBackend, "bad.dae", b"\xff\xfe", no_files()).unwrap_err();
        assert!(matches!(err, LoadError::Backend { .. }));
    }
}
