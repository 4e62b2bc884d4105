//! Models: meshes loaded together from one asset file

use std::path::{Path, PathBuf};

use crate::assets::{AssetError, ModelData, ObjLoader};
use crate::render::device::Device;
use crate::render::mesh::{Mesh, MeshTexture};
use crate::render::shader::ShaderProgram;

/// Flat list of meshes drawn in asset order
#[derive(Debug)]
pub struct Model {
    meshes: Vec<Mesh>,
    path: PathBuf,
    load_error: Option<AssetError>,
}

impl Model {
    /// Load an OBJ model and upload every mesh
    ///
    /// A file that cannot be decoded yields an empty model that draws
    /// nothing; the reason is kept in [`Model::load_error`].
    pub fn load(device: &Device, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match ObjLoader::load_obj(path) {
            Ok(data) => Self::from_data(device, &data, path),
            Err(e) => {
                log::error!("Failed to load model {:?}: {}", path, e);
                Self {
                    meshes: Vec::new(),
                    path: path.to_path_buf(),
                    load_error: Some(e),
                }
            }
        }
    }

    /// Upload already decoded model data
    ///
    /// Each texture reference is decoded on its own; there is no sharing
    /// between meshes that name the same file.
    pub fn from_data(device: &Device, data: &ModelData, path: impl Into<PathBuf>) -> Self {
        let meshes = data
            .meshes
            .iter()
            .map(|mesh| {
                let textures = mesh
                    .textures
                    .iter()
                    .map(|t| MeshTexture::load(device, &t.path, t.kind))
                    .collect();
                Mesh::new(device, &mesh.vertices, &mesh.indices, textures)
            })
            .collect::<Vec<_>>();
        let path = path.into();
        log::info!("Model {:?} ready with {} mesh(es)", path, meshes.len());
        Self {
            meshes,
            path,
            load_error: None,
        }
    }

    /// Draw every mesh in order
    pub fn draw(&self, shader: &ShaderProgram) {
        for mesh in &self.meshes {
            mesh.draw(shader);
        }
    }

    /// Meshes in asset order
    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    /// Source file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Why loading failed, if it did
    pub fn load_error(&self) -> Option<&AssetError> {
        self.load_error.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::MeshData;
    use crate::render::device::headless::HeadlessDevice;
    use crate::render::mesh::Vertex;
    use crate::render::shader::{ShaderSources, UniformLookup};

    fn shader(device: &Device) -> ShaderProgram {
        let sources = ShaderSources {
            vertex: "uniform mat4 model;\nvoid main() {}".to_string(),
            fragment: "void main() {}".to_string(),
            geometry: None,
        };
        ShaderProgram::from_sources(device, &sources, UniformLookup::PerCall)
    }

    fn mesh_data(name: &str, triangles: u32) -> MeshData {
        MeshData {
            name: name.to_string(),
            vertices: vec![Vertex::default(); 3],
            indices: (0..triangles).flat_map(|_| [0, 1, 2]).collect(),
            textures: Vec::new(),
        }
    }

    fn draw_counts(device: &Device) -> Vec<u32> {
        device
            .inspect(|h: &HeadlessDevice| h.draw_calls().iter().map(|d| d.index_count).collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_empty_model_draws_nothing() {
        let device = Device::headless();
        let shader = shader(&device);
        let model = Model::from_data(&device, &ModelData::default(), "empty.obj");
        shader.enable();
        model.draw(&shader);
        shader.disable();
        assert!(model.meshes().is_empty());
        assert!(draw_counts(&device).is_empty());
        assert_eq!(device.poll_error(), None);
    }

    #[test]
    fn test_missing_file_gives_empty_model() {
        let device = Device::headless();
        let shader = shader(&device);
        let model = Model::load(&device, "no/such/nanosuit.obj");
        assert!(model.load_error().is_some());
        assert!(model.meshes().is_empty());
        model.draw(&shader);
        assert!(draw_counts(&device).is_empty());
    }

    #[test]
    fn test_meshes_draw_in_asset_order() {
        let device = Device::headless();
        let shader = shader(&device);
        let data = ModelData {
            meshes: vec![mesh_data("body", 2), mesh_data("helmet", 1)],
        };
        let model = Model::from_data(&device, &data, "suit.obj");
        shader.enable();
        model.draw(&shader);
        shader.disable();
        assert_eq!(draw_counts(&device), vec![6, 3]);

        drop(model);
        assert_eq!(device.inspect(|h: &HeadlessDevice| h.live_buffers()), Some(0));
        assert_eq!(device.inspect(|h: &HeadlessDevice| h.live_vertex_arrays()), Some(0));
        assert_eq!(device.poll_error(), None);
    }
}
