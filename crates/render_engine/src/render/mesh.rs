//! Meshes with interleaved vertices and semantically tagged textures
//!
//! Texture-to-sampler naming: while drawing, texture `i` is bound to unit `i`
//! and the unit index is written to `material.texture_<kind>N`, where `N`
//! counts textures of the same kind from 1 within the current draw. A mesh
//! with `[diffuse, diffuse, specular]` therefore feeds
//! `material.texture_diffuse1`, `material.texture_diffuse2` and
//! `material.texture_specular1`.

use std::mem;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::render::buffer::{IndexBuffer, VertexBuffer};
use crate::render::device::Device;
use crate::render::shader::ShaderProgram;
use crate::render::texture::Texture;
use crate::render::vertex_layout::{VertexAttribute, VertexLayout};

/// Interleaved vertex record
///
/// `#[repr(C)]` keeps the field order so the attribute offsets below match
/// the packed float stream uploaded to the device.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vertex {
    /// Object-space position
    pub position: [f32; 3],
    /// Vertex normal
    pub normal: [f32; 3],
    /// Texture coordinates
    pub tex_coords: [f32; 2],
    /// Tangent (direction of increasing u)
    pub tangent: [f32; 3],
    /// Bitangent (direction of increasing v)
    pub bitangent: [f32; 3],
}

impl Vertex {
    /// Floats per vertex
    pub const FLOATS: usize = 14;

    /// Byte stride of one vertex
    pub const STRIDE: usize = mem::size_of::<Self>();

    /// Attribute slots 0-4: position, normal, texcoord, tangent, bitangent
    pub const ATTRIBUTES: [VertexAttribute; 5] = [
        VertexAttribute { slot: 0, components: 3, offset: mem::offset_of!(Vertex, position) },
        VertexAttribute { slot: 1, components: 3, offset: mem::offset_of!(Vertex, normal) },
        VertexAttribute { slot: 2, components: 2, offset: mem::offset_of!(Vertex, tex_coords) },
        VertexAttribute { slot: 3, components: 3, offset: mem::offset_of!(Vertex, tangent) },
        VertexAttribute { slot: 4, components: 3, offset: mem::offset_of!(Vertex, bitangent) },
    ];

    /// Flatten vertices into the packed float stream
    pub fn flatten(vertices: &[Self]) -> Vec<f32> {
        let mut floats = Vec::with_capacity(vertices.len() * Self::FLOATS);
        for v in vertices {
            floats.extend_from_slice(&v.position);
            floats.extend_from_slice(&v.normal);
            floats.extend_from_slice(&v.tex_coords);
            floats.extend_from_slice(&v.tangent);
            floats.extend_from_slice(&v.bitangent);
        }
        floats
    }
}

/// Semantic role of a mesh texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureKind {
    /// Base color
    Diffuse,
    /// Specular intensity
    Specular,
    /// Tangent-space normals
    Normal,
    /// Height / displacement
    Height,
}

impl TextureKind {
    /// All kinds in counter order
    pub const ALL: [Self; 4] = [Self::Diffuse, Self::Specular, Self::Normal, Self::Height];

    /// Sampler name stem, e.g. `texture_diffuse`
    pub fn sampler_stem(self) -> &'static str {
        match self {
            Self::Diffuse => "texture_diffuse",
            Self::Specular => "texture_specular",
            Self::Normal => "texture_normal",
            Self::Height => "texture_height",
        }
    }

    fn counter_index(self) -> usize {
        self as usize
    }
}

/// Sampler uniform names for textures of the given kinds, numbered per kind from 1
pub fn texture_uniform_names(kinds: impl IntoIterator<Item = TextureKind>) -> Vec<String> {
    let mut counters = [0u32; TextureKind::ALL.len()];
    kinds
        .into_iter()
        .map(|kind| {
            let counter = &mut counters[kind.counter_index()];
            *counter += 1;
            format!("material.{}{}", kind.sampler_stem(), counter)
        })
        .collect()
}

/// Texture reference held by a mesh
#[derive(Debug, Clone)]
pub struct MeshTexture {
    /// Shared texture object
    pub texture: Rc<Texture>,
    /// Semantic role
    pub kind: TextureKind,
    /// File the texture was loaded from
    pub path: PathBuf,
}

impl MeshTexture {
    /// Tag a texture with its role; the path is taken from the texture
    pub fn new(texture: Rc<Texture>, kind: TextureKind) -> Self {
        let path = texture.path().to_path_buf();
        Self { texture, kind, path }
    }

    /// Load a texture file for `kind`
    pub fn load(device: &Device, path: &Path, kind: TextureKind) -> Self {
        Self::new(Rc::new(Texture::from_file(device, path)), kind)
    }
}

/// Uploaded mesh: one interleaved vertex buffer, one index buffer, textures
pub struct Mesh {
    device: Device,
    layout: VertexLayout,
    indices: IndexBuffer,
    textures: Vec<MeshTexture>,
    vertex_count: usize,
}

impl Mesh {
    /// Upload `vertices` and `indices` (a triangle list) and keep `textures`
    pub fn new(device: &Device, vertices: &[Vertex], indices: &[u32], textures: Vec<MeshTexture>) -> Self {
        let buffer = VertexBuffer::new(device, &Vertex::flatten(vertices), Vertex::FLOATS as u32);
        let index_buffer = IndexBuffer::new(device, indices, 3);
        let mut layout = VertexLayout::new(device);
        layout.attach_interleaved(buffer, Vertex::STRIDE, &Vertex::ATTRIBUTES);

        log::debug!(
            "Created mesh: {} vertices, {} indices, {} textures",
            vertices.len(),
            index_buffer.index_count(),
            textures.len()
        );
        Self {
            device: device.clone(),
            layout,
            indices: index_buffer,
            textures,
            vertex_count: vertices.len(),
        }
    }

    /// Bind textures to the shader's sampler names and draw every index
    ///
    /// Leaves no vertex array, index buffer or texture bound and unit 0 active.
    pub fn draw(&self, shader: &ShaderProgram) {
        let names = texture_uniform_names(self.textures.iter().map(|t| t.kind));

        self.layout.bind();
        self.indices.bind();
        for (unit, (texture, name)) in (0u32..).zip(self.textures.iter().zip(&names)) {
            shader.set_int(name, unit as i32);
            texture.texture.bind(unit);
        }

        self.device.with(|d| {
            d.draw_indexed_triangles(self.indices.index_count());
            for unit in (0u32..).take(self.textures.len()) {
                d.set_active_texture_unit(unit);
                d.bind_texture(None);
            }
            d.set_active_texture_unit(0);
        });
        self.indices.unbind();
        self.layout.unbind();
    }

    /// Textures in binding order
    pub fn textures(&self) -> &[MeshTexture] {
        &self.textures
    }

    /// Number of uploaded vertices
    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    /// Number of indices drawn
    pub fn index_count(&self) -> u32 {
        self.indices.index_count()
    }

    /// Vertex layout of the mesh
    pub fn layout(&self) -> &VertexLayout {
        &self.layout
    }
}

impl std::fmt::Debug for Mesh {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mesh")
            .field("vertices", &self.vertex_count)
            .field("indices", &self.indices.index_count())
            .field("textures", &self.textures.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::ImageData;
    use crate::render::device::headless::HeadlessDevice;
    use crate::render::device::AttributeFormat;
    use crate::render::shader::{ShaderSources, UniformLookup};

    const MODEL_FS: &str = "struct Material {
    sampler2D texture_diffuse1;
    sampler2D texture_diffuse2;
    sampler2D texture_specular1;
};
uniform Material material;
void main() {}
";

    fn shader(device: &Device) -> ShaderProgram {
        let sources = ShaderSources {
            vertex: "uniform mat4 model;\nvoid main() {}".to_string(),
            fragment: MODEL_FS.to_string(),
            geometry: None,
        };
        ShaderProgram::from_sources(device, &sources, UniformLookup::PerCall)
    }

    fn texture(device: &Device, kind: TextureKind) -> MeshTexture {
        let image = ImageData::solid_color(1, 1, &[255, 255, 255]);
        MeshTexture::new(Rc::new(Texture::from_image(device, &image, "white")), kind)
    }

    fn triangle(device: &Device, kinds: &[TextureKind]) -> Mesh {
        let vertices = vec![Vertex::default(); 3];
        let textures = kinds.iter().map(|k| texture(device, *k)).collect();
        Mesh::new(device, &vertices, &[0, 1, 2], textures)
    }

    #[test]
    fn test_uniform_names_count_per_kind() {
        use TextureKind::{Diffuse, Height, Normal, Specular};
        assert_eq!(
            texture_uniform_names([Diffuse, Diffuse, Specular]),
            vec!["material.texture_diffuse1", "material.texture_diffuse2", "material.texture_specular1"]
        );
        assert_eq!(
            texture_uniform_names([Normal, Height, Normal, Diffuse]),
            vec![
                "material.texture_normal1",
                "material.texture_height1",
                "material.texture_normal2",
                "material.texture_diffuse1",
            ]
        );
    }

    #[test]
    fn test_vertex_attribute_offsets() {
        assert_eq!(Vertex::STRIDE, 14 * 4);
        let offsets: Vec<usize> = Vertex::ATTRIBUTES.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 12, 24, 32, 44]);
        let flat = Vertex::flatten(&[Vertex {
            tex_coords: [0.25, 0.75],
            ..Vertex::default()
        }]);
        assert_eq!(flat.len(), Vertex::FLOATS);
        assert_eq!(&flat[6..8], &[0.25, 0.75]);
    }

    #[test]
    fn test_mesh_layout_is_interleaved() {
        let device = Device::headless();
        let mesh = triangle(&device, &[]);
        let record = device
            .inspect(|h: &HeadlessDevice| h.vertex_array(mesh.layout().handle()).cloned())
            .flatten()
            .expect("live layout");
        assert_eq!(record.enabled.len(), 5);
        assert_eq!(
            record.attributes[&3].format,
            AttributeFormat { components: 3, stride: Vertex::STRIDE, offset: 32 }
        );
    }

    #[test]
    fn test_draw_binds_textures_by_naming_convention() {
        use TextureKind::{Diffuse, Specular};
        let device = Device::headless();
        let shader = shader(&device);
        let mesh = triangle(&device, &[Diffuse, Diffuse, Specular]);
        shader.enable();
        device.inspect_mut(HeadlessDevice::reset_log);

        mesh.draw(&shader);
        mesh.draw(&shader);

        let (lookups, draws) = device
            .inspect(|h: &HeadlessDevice| {
                let names: Vec<String> = h.uniform_lookups().iter().map(|l| l.name.clone()).collect();
                (names, h.draw_calls().to_vec())
            })
            .unwrap_or_default();
        let expected = ["material.texture_diffuse1", "material.texture_diffuse2", "material.texture_specular1"];
        assert_eq!(lookups, [expected, expected].concat());

        assert_eq!(draws.len(), 2);
        let draw = &draws[0];
        assert_eq!(draw.index_count, 3);
        assert_eq!(draw.program, Some(shader.handle()));
        let bound: Vec<_> = draw.textures.iter().map(|(unit, handle)| (*unit, *handle)).collect();
        let owned: Vec<_> = (0u32..).zip(mesh.textures().iter().map(|t| t.texture.handle())).collect();
        assert_eq!(bound, owned);

        for (unit, name) in expected.iter().enumerate() {
            let value = device
                .inspect(|h: &HeadlessDevice| h.uniform_value(shader.handle(), name))
                .flatten();
            assert_eq!(value, Some(crate::render::device::UniformValue::Int(unit as i32)));
        }
        shader.disable();
    }

    #[test]
    fn test_draw_leaves_binding_state_neutral() {
        let device = Device::headless();
        let shader = shader(&device);
        let mesh = triangle(&device, &[TextureKind::Diffuse, TextureKind::Specular]);
        let before = device.binding_state();
        shader.enable();
        mesh.draw(&shader);
        shader.disable();
        assert_eq!(device.binding_state(), before);
        assert_eq!(device.poll_error(), None);
    }
}
