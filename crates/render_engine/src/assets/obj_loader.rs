//! OBJ model decoding
//!
//! Turns an OBJ file (plus its MTL library) into flat per-mesh vertex and
//! index lists with texture references. Tangents and bitangents are derived
//! from positions and texture coordinates since OBJ does not store them.

use std::path::{Path, PathBuf};

use crate::assets::AssetError;
use crate::foundation::math::{Vec2, Vec3};
use crate::render::mesh::{TextureKind, Vertex};

/// Texture file referenced by a mesh material
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureRef {
    /// Semantic slot the texture feeds
    pub kind: TextureKind,
    /// Path resolved against the model's directory
    pub path: PathBuf,
}

/// Decoded geometry of one mesh
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    /// Object or group name from the file
    pub name: String,
    /// Interleaved vertex records
    pub vertices: Vec<Vertex>,
    /// Triangle list indices into `vertices`
    pub indices: Vec<u32>,
    /// Material textures in diffuse, specular, normal, height order
    pub textures: Vec<TextureRef>,
}

/// Decoded model: meshes in file order
#[derive(Debug, Clone, Default)]
pub struct ModelData {
    /// Meshes in the order the file declares them
    pub meshes: Vec<MeshData>,
}

/// OBJ loader built on `tobj`
pub struct ObjLoader;

impl ObjLoader {
    /// Load an OBJ file, triangulated with a single index stream
    ///
    /// A missing or broken material library is logged and the meshes are
    /// returned without textures.
    pub fn load_obj<P: AsRef<Path>>(path: P) -> Result<ModelData, AssetError> {
        let path = path.as_ref();
        log::debug!("Loading OBJ model from: {:?}", path);

        let (models, materials) = tobj::load_obj(path, &tobj::GPU_LOAD_OPTIONS)
            .map_err(|e| AssetError::LoadFailed(format!("{}: {e}", path.display())))?;
        let materials = materials.unwrap_or_else(|e| {
            log::warn!("Material library for {:?} not loaded: {e}", path);
            Vec::new()
        });
        let directory = path.parent().unwrap_or_else(|| Path::new(""));

        let meshes: Vec<MeshData> = models
            .into_iter()
            .map(|model| {
                let textures = model
                    .mesh
                    .material_id
                    .and_then(|id| materials.get(id))
                    .map(|material| material_textures(material, directory))
                    .unwrap_or_default();
                let (vertices, indices) = build_vertices(&model.mesh);
                MeshData {
                    name: model.name,
                    vertices,
                    indices,
                    textures,
                }
            })
            .collect();

        log::info!(
            "Loaded {} mesh(es) with {} vertices from {:?}",
            meshes.len(),
            meshes.iter().map(|m| m.vertices.len()).sum::<usize>(),
            path
        );
        Ok(ModelData { meshes })
    }
}

fn material_textures(material: &tobj::Material, directory: &Path) -> Vec<TextureRef> {
    [
        (TextureKind::Diffuse, &material.diffuse_texture),
        (TextureKind::Specular, &material.specular_texture),
        (TextureKind::Normal, &material.normal_texture),
        (TextureKind::Height, &material.ambient_texture),
    ]
    .into_iter()
    .filter_map(|(kind, file)| {
        file.as_ref().filter(|f| !f.is_empty()).map(|file| TextureRef {
            kind,
            path: directory.join(file),
        })
    })
    .collect()
}

fn build_vertices(mesh: &tobj::Mesh) -> (Vec<Vertex>, Vec<u32>) {
    let count = mesh.positions.len() / 3;
    let mut vertices: Vec<Vertex> = (0..count)
        .map(|i| {
            let mut vertex = Vertex {
                position: [mesh.positions[3 * i], mesh.positions[3 * i + 1], mesh.positions[3 * i + 2]],
                ..Vertex::default()
            };
            if let Some(n) = mesh.normals.get(3 * i..3 * i + 3) {
                vertex.normal = [n[0], n[1], n[2]];
            }
            if let Some(t) = mesh.texcoords.get(2 * i..2 * i + 2) {
                vertex.tex_coords = [t[0], t[1]];
            }
            vertex
        })
        .collect();

    let indices = complete_triangles(&mesh.indices, count);
    if !mesh.texcoords.is_empty() {
        compute_tangents(&mut vertices, &indices);
    }
    (vertices, indices)
}

/// Keep whole triangles whose three indices address existing vertices
fn complete_triangles(indices: &[u32], vertex_count: usize) -> Vec<u32> {
    let kept: Vec<u32> = indices
        .chunks_exact(3)
        .filter(|triangle| triangle.iter().all(|&i| (i as usize) < vertex_count))
        .flatten()
        .copied()
        .collect();
    if kept.len() != indices.len() {
        log::warn!(
            "Dropped {} index(es) outside {} vertices or in a partial triangle",
            indices.len() - kept.len(),
            vertex_count
        );
    }
    kept
}

/// Accumulate per-triangle tangent frames and normalise them per vertex
pub fn compute_tangents(vertices: &mut [Vertex], indices: &[u32]) {
    let mut tangents = vec![Vec3::zeros(); vertices.len()];
    let mut bitangents = vec![Vec3::zeros(); vertices.len()];

    for triangle in indices.chunks_exact(3) {
        let [a, b, c] = [triangle[0] as usize, triangle[1] as usize, triangle[2] as usize];
        if a.max(b).max(c) >= vertices.len() {
            continue;
        }
        let p = |i: usize| Vec3::from(vertices[i].position);
        let uv = |i: usize| Vec2::from(vertices[i].tex_coords);

        let edge1 = p(b) - p(a);
        let edge2 = p(c) - p(a);
        let duv1 = uv(b) - uv(a);
        let duv2 = uv(c) - uv(a);
        let det = duv1.x * duv2.y - duv2.x * duv1.y;
        if det.abs() < f32::EPSILON {
            continue;
        }
        let f = 1.0 / det;
        let tangent = (edge1 * duv2.y - edge2 * duv1.y) * f;
        let bitangent = (edge2 * duv1.x - edge1 * duv2.x) * f;
        for i in [a, b, c] {
            tangents[i] += tangent;
            bitangents[i] += bitangent;
        }
    }

    for (vertex, (t, b)) in vertices.iter_mut().zip(tangents.iter().zip(&bitangents)) {
        vertex.tangent = t.try_normalize(f32::EPSILON).unwrap_or_else(Vec3::zeros).into();
        vertex.bitangent = b.try_normalize(f32::EPSILON).unwrap_or_else(Vec3::zeros).into();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const QUAD_OBJ: &str = "mtllib quad.mtl
o panel
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
vn 0 0 1
usemtl panel
f 1/1/1 2/2/1 3/3/1 4/4/1
";

    const QUAD_MTL: &str = "newmtl panel
Kd 1 1 1
map_Kd diffuse.png
map_Ks specular.png
map_Bump normal.png
";

    fn write_quad() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("render_engine_obj_{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("temp dir");
        std::fs::write(dir.join("quad.obj"), QUAD_OBJ).expect("write obj");
        std::fs::write(dir.join("quad.mtl"), QUAD_MTL).expect("write mtl");
        dir
    }

    #[test]
    fn test_load_quad_with_material() {
        let dir = write_quad();
        let model = ObjLoader::load_obj(dir.join("quad.obj")).expect("load quad");
        assert_eq!(model.meshes.len(), 1);

        let mesh = &model.meshes[0];
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.indices.len(), 6);
        assert_eq!(mesh.vertices[0].normal, [0.0, 0.0, 1.0]);

        let kinds: Vec<TextureKind> = mesh.textures.iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![TextureKind::Diffuse, TextureKind::Specular, TextureKind::Normal]);
        assert_eq!(mesh.textures[0].path, dir.join("diffuse.png"));

        for vertex in &mesh.vertices {
            assert_relative_eq!(Vec3::from(vertex.tangent), Vec3::x(), epsilon = 1e-5);
            assert_relative_eq!(Vec3::from(vertex.bitangent), Vec3::y(), epsilon = 1e-5);
        }
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_degenerate_uvs_leave_zero_tangents() {
        let mut vertices = vec![Vertex::default(); 3];
        vertices[1].position = [1.0, 0.0, 0.0];
        vertices[2].position = [0.0, 1.0, 0.0];
        compute_tangents(&mut vertices, &[0, 1, 2]);
        assert!(vertices.iter().all(|v| v.tangent == [0.0; 3]));
    }

    #[test]
    fn test_out_of_range_index_drops_its_whole_triangle() {
        assert_eq!(complete_triangles(&[0, 1, 9, 0, 1, 2], 3), vec![0, 1, 2]);
        assert_eq!(complete_triangles(&[0, 1, 2, 2, 1], 3), vec![0, 1, 2]);
        assert_eq!(complete_triangles(&[2, 1, 0], 3), vec![2, 1, 0]);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = ObjLoader::load_obj("definitely/not/here.obj");
        assert!(matches!(result, Err(AssetError::LoadFailed(_))));
    }
}
