//! Vertex layouts (vertex array objects)
//!
//! A layout records which buffer feeds each shader attribute slot. It owns
//! every buffer attached to it and releases them before its own handle.

use std::collections::BTreeSet;
use std::mem;

use crate::render::buffer::VertexBuffer;
use crate::render::device::{AttributeFormat, BufferTarget, Device, VertexArrayHandle};

/// One float attribute inside a packed (interleaved) vertex buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    /// Shader attribute slot
    pub slot: u32,
    /// Float components
    pub components: u32,
    /// Byte offset inside one vertex
    pub offset: usize,
}

/// Attribute slot bindings over owned vertex buffers
pub struct VertexLayout {
    device: Device,
    handle: VertexArrayHandle,
    buffers: Vec<VertexBuffer>,
    slots: BTreeSet<u32>,
}

impl VertexLayout {
    /// Allocate an empty layout
    pub fn new(device: &Device) -> Self {
        let handle = device.with(|d| d.create_vertex_array());
        log::debug!("Created vertex layout {:?}", handle);
        Self {
            device: device.clone(),
            handle,
            buffers: Vec::new(),
            slots: BTreeSet::new(),
        }
    }

    /// Feed `slot` from its own tightly packed buffer and take ownership of it
    ///
    /// Stride is `components * size_of::<f32>()` with offset 0.
    pub fn attach(&mut self, buffer: VertexBuffer, slot: u32) {
        let attribute = VertexAttribute {
            slot,
            components: buffer.components(),
            offset: 0,
        };
        let stride = buffer.components() as usize * mem::size_of::<f32>();
        self.attach_interleaved(buffer, stride, &[attribute]);
    }

    /// Feed several slots from one packed buffer sharing `stride`
    pub fn attach_interleaved(&mut self, buffer: VertexBuffer, stride: usize, attributes: &[VertexAttribute]) {
        for attribute in attributes {
            if !self.slots.insert(attribute.slot) {
                log::warn!(
                    "Attribute slot {} of layout {:?} attached twice; last write wins",
                    attribute.slot,
                    self.handle
                );
            }
        }

        let handle = self.handle;
        let buffer_handle = buffer.handle();
        self.device.with(|d| {
            d.bind_vertex_array(Some(handle));
            d.bind_buffer(BufferTarget::Vertex, Some(buffer_handle));
            for attribute in attributes {
                d.enable_vertex_attribute(attribute.slot);
                d.vertex_attribute_pointer(
                    attribute.slot,
                    AttributeFormat {
                        components: attribute.components,
                        stride,
                        offset: attribute.offset,
                    },
                );
            }
            d.bind_buffer(BufferTarget::Vertex, None);
            d.bind_vertex_array(None);
        });
        self.buffers.push(buffer);
    }

    /// Make this the active vertex array
    pub fn bind(&self) {
        self.device.with(|d| d.bind_vertex_array(Some(self.handle)));
    }

    /// Unbind the active vertex array
    pub fn unbind(&self) {
        self.device.with(|d| d.bind_vertex_array(None));
    }

    /// Get layout handle
    pub fn handle(&self) -> VertexArrayHandle {
        self.handle
    }

    /// Buffers owned by this layout, in attach order
    pub fn buffers(&self) -> &[VertexBuffer] {
        &self.buffers
    }

    /// Enabled attribute slots
    pub fn slots(&self) -> impl Iterator<Item = u32> + '_ {
        self.slots.iter().copied()
    }
}

impl Drop for VertexLayout {
    fn drop(&mut self) {
        self.buffers.clear();
        log::trace!("Releasing vertex layout {:?}", self.handle);
        let handle = self.handle;
        self.device.release("vertex layout", |d| d.delete_vertex_array(handle));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::device::headless::{HeadlessDevice, Release};

    #[test]
    fn test_attach_declares_separate_array_attributes() {
        let device = Device::headless();
        let mut layout = VertexLayout::new(&device);
        let positions = VertexBuffer::new(&device, &[0.0; 12], 3);
        let uvs = VertexBuffer::new(&device, &[0.0; 8], 2);
        let (position_handle, uv_handle) = (positions.handle(), uvs.handle());
        layout.attach(positions, 0);
        layout.attach(uvs, 2);

        let record = device
            .inspect(|h: &HeadlessDevice| h.vertex_array(layout.handle()).cloned())
            .flatten()
            .expect("live layout");
        assert_eq!(record.enabled.iter().copied().collect::<Vec<_>>(), vec![0, 2]);
        let slot0 = record.attributes[&0];
        assert_eq!(slot0.buffer, Some(position_handle));
        assert_eq!(slot0.format, AttributeFormat { components: 3, stride: 12, offset: 0 });
        let slot2 = record.attributes[&2];
        assert_eq!(slot2.buffer, Some(uv_handle));
        assert_eq!(slot2.format, AttributeFormat { components: 2, stride: 8, offset: 0 });

        assert!(device.binding_state().is_neutral());
        assert_eq!(layout.buffers().len(), 2);
    }

    #[test]
    fn test_bind_unbind_restores_state() {
        let device = Device::headless();
        let layout = VertexLayout::new(&device);
        let before = device.binding_state();
        layout.bind();
        assert_eq!(device.binding_state().vertex_array, Some(layout.handle()));
        layout.unbind();
        assert_eq!(device.binding_state(), before);
    }

    #[test]
    fn test_drop_releases_buffers_before_layout() {
        let device = Device::headless();
        let mut layout = VertexLayout::new(&device);
        let buffer = VertexBuffer::new(&device, &[0.0; 9], 3);
        let buffer_handle = buffer.handle();
        let layout_handle = layout.handle();
        layout.attach(buffer, 0);
        drop(layout);

        let releases = device
            .inspect(|h: &HeadlessDevice| h.releases().to_vec())
            .unwrap_or_default();
        assert_eq!(
            releases,
            vec![Release::Buffer(buffer_handle), Release::VertexArray(layout_handle)]
        );
        assert_eq!(device.poll_error(), None);
    }
}
