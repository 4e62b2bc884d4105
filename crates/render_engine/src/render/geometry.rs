//! Separate-array indexed geometry
//!
//! Each attribute lives in its own buffer and textures are bound to fixed
//! units chosen by the caller, which matches shaders that declare their
//! samplers directly (`material.diffuse` on unit 0 and so on).

use std::rc::Rc;

use crate::render::buffer::{IndexBuffer, VertexBuffer};
use crate::render::cube::{cube_indices, CUBE_NORMALS, CUBE_POSITIONS, CUBE_TEX_COORDS};
use crate::render::device::Device;
use crate::render::texture::Texture;
use crate::render::vertex_layout::VertexLayout;

/// Vertex layout, index buffer and unit-bound textures drawn together
pub struct Geometry {
    device: Device,
    layout: VertexLayout,
    indices: IndexBuffer,
    textures: Vec<(u32, Rc<Texture>)>,
}

impl Geometry {
    /// Wrap an already populated layout and index buffer
    pub fn new(device: &Device, layout: VertexLayout, indices: IndexBuffer) -> Self {
        Self {
            device: device.clone(),
            layout,
            indices,
            textures: Vec::new(),
        }
    }

    /// Textured, lit cube: positions on slot 0, normals on 1, texcoords on 2
    pub fn cube(device: &Device) -> Self {
        let mut layout = VertexLayout::new(device);
        layout.attach(VertexBuffer::new(device, &CUBE_POSITIONS, 3), 0);
        layout.attach(VertexBuffer::new(device, &CUBE_NORMALS, 3), 1);
        layout.attach(VertexBuffer::new(device, &CUBE_TEX_COORDS, 2), 2);
        Self::new(device, layout, IndexBuffer::new(device, &cube_indices(), 3))
    }

    /// Position-only cube for light markers
    pub fn lamp_cube(device: &Device) -> Self {
        let mut layout = VertexLayout::new(device);
        layout.attach(VertexBuffer::new(device, &CUBE_POSITIONS, 3), 0);
        Self::new(device, layout, IndexBuffer::new(device, &cube_indices(), 3))
    }

    /// Bind `texture` to `unit` on every draw
    pub fn with_texture(mut self, unit: u32, texture: Rc<Texture>) -> Self {
        if self.textures.iter().any(|(u, _)| *u == unit) {
            log::warn!("Texture unit {} assigned twice; last one wins", unit);
            self.textures.retain(|(u, _)| *u != unit);
        }
        self.textures.push((unit, texture));
        self
    }

    /// Bind layout, index buffer and textures, draw every index, then unbind
    pub fn draw(&self) {
        self.layout.bind();
        self.indices.bind();
        for (unit, texture) in &self.textures {
            texture.bind(*unit);
        }

        let units: Vec<u32> = self.textures.iter().map(|(unit, _)| *unit).collect();
        self.device.with(|d| {
            d.draw_indexed_triangles(self.indices.index_count());
            for unit in units {
                d.set_active_texture_unit(unit);
                d.bind_texture(None);
            }
            d.set_active_texture_unit(0);
        });
        self.indices.unbind();
        self.layout.unbind();
    }

    /// Number of indices drawn
    pub fn index_count(&self) -> u32 {
        self.indices.index_count()
    }

    /// Unit-bound textures
    pub fn textures(&self) -> &[(u32, Rc<Texture>)] {
        &self.textures
    }

    /// Vertex layout
    pub fn layout(&self) -> &VertexLayout {
        &self.layout
    }
}

impl std::fmt::Debug for Geometry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Geometry")
            .field("layout", &self.layout.handle())
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

    fn texture(device: &Device) -> Rc<Texture> {
        Rc::new(Texture::from_image(device, &ImageData::solid_color(1, 1, &[200, 100, 50]), "tile"))
    }

    #[test]
    fn test_cube_uses_separate_arrays() {
        let device = Device::headless();
        let cube = Geometry::cube(&device);
        assert_eq!(cube.index_count(), 36);
        assert_eq!(cube.layout().buffers().len(), 3);
        assert_eq!(cube.layout().slots().collect::<Vec<_>>(), vec![0, 1, 2]);

        let record = device
            .inspect(|h: &HeadlessDevice| h.vertex_array(cube.layout().handle()).cloned())
            .flatten()
            .expect("live layout");
        assert_eq!(record.attributes[&2].format.stride, 8);
        assert_eq!(record.attributes[&2].format.offset, 0);
    }

    #[test]
    fn test_draw_binds_units_and_restores_state() {
        let device = Device::headless();
        let diffuse = texture(&device);
        let specular = texture(&device);
        let cube = Geometry::cube(&device)
            .with_texture(0, Rc::clone(&diffuse))
            .with_texture(1, Rc::clone(&specular));
        let before = device.binding_state();

        cube.draw();

        assert_eq!(device.binding_state(), before);
        let draws = device
            .inspect(|h: &HeadlessDevice| h.draw_calls().to_vec())
            .unwrap_or_default();
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].index_count, 36);
        assert_eq!(draws[0].textures.get(&0), Some(&diffuse.handle()));
        assert_eq!(draws[0].textures.get(&1), Some(&specular.handle()));
        assert_eq!(device.poll_error(), None);
    }

    #[test]
    fn test_shared_texture_outlives_geometry() {
        let device = Device::headless();
        let shared = texture(&device);
        let lamp = Geometry::lamp_cube(&device).with_texture(0, Rc::clone(&shared));
        drop(lamp);
        assert_eq!(device.inspect(|h: &HeadlessDevice| h.live_textures()), Some(1));
        assert_eq!(device.inspect(|h: &HeadlessDevice| h.live_buffers()), Some(0));
    }
}
