//! GPU buffers for vertex and index data
//!
//! Buffers are written once at construction with a static usage hint and
//! released exactly once when dropped. Construction binds the new buffer to
//! upload it and then clears that binding point, so any buffer the caller had
//! bound to the same target is unbound afterwards.

use bytemuck::Pod;

use crate::render::device::{BufferHandle, BufferTarget, BufferUsage, Device};

/// Device buffer holding `count` elements of `components` values each
pub struct GpuBuffer {
    device: Device,
    handle: BufferHandle,
    target: BufferTarget,
    count: u32,
    components: u32,
    size_bytes: usize,
}

impl GpuBuffer {
    /// Allocate a buffer on `target` and upload `data`
    ///
    /// A trailing partial element is dropped with a warning so that
    /// `count * components` always equals the number of values uploaded.
    pub fn new<T: Pod>(device: &Device, target: BufferTarget, data: &[T], components: u32) -> Self {
        let count = if components == 0 {
            log::warn!("Buffer created with zero components per element; uploading nothing");
            0
        } else {
            if data.len() % components as usize != 0 {
                log::warn!(
                    "Buffer data length {} is not a multiple of {} components; dropping the tail",
                    data.len(),
                    components
                );
            }
            data.len() / components as usize
        };
        let used = &data[..count * components as usize];
        let bytes: &[u8] = bytemuck::cast_slice(used);

        let handle = device.with(|d| {
            let handle = d.create_buffer(target, bytes, BufferUsage::Static);
            d.bind_buffer(target, None);
            handle
        });
        log::debug!(
            "Created {:?} buffer {:?}: {} x {} ({} bytes)",
            target,
            handle,
            count,
            components,
            bytes.len()
        );

        Self {
            device: device.clone(),
            handle,
            target,
            count: count as u32,
            components,
            size_bytes: bytes.len(),
        }
    }

    /// Make this the active buffer of its binding point
    pub fn bind(&self) {
        self.device.with(|d| d.bind_buffer(self.target, Some(self.handle)));
    }

    /// Clear the binding point
    pub fn unbind(&self) {
        self.device.with(|d| d.bind_buffer(self.target, None));
    }

    /// Get buffer handle
    pub fn handle(&self) -> BufferHandle {
        self.handle
    }

    /// Binding point
    pub fn target(&self) -> BufferTarget {
        self.target
    }

    /// Number of elements
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Values per element
    pub fn components(&self) -> u32 {
        self.components
    }

    /// Uploaded size in bytes
    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }
}

impl Drop for GpuBuffer {
    fn drop(&mut self) {
        log::trace!("Releasing buffer {:?}", self.handle);
        let handle = self.handle;
        self.device.release("buffer", |d| d.delete_buffer(handle));
    }
}

impl std::fmt::Debug for GpuBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuBuffer")
            .field("handle", &self.handle)
            .field("target", &self.target)
            .field("count", &self.count)
            .field("components", &self.components)
            .finish()
    }
}

/// Vertex buffer of `f32` components
#[derive(Debug)]
pub struct VertexBuffer {
    buffer: GpuBuffer,
}

impl VertexBuffer {
    /// Upload `data` as vertices of `components` floats each
    pub fn new(device: &Device, data: &[f32], components: u32) -> Self {
        Self {
            buffer: GpuBuffer::new(device, BufferTarget::Vertex, data, components),
        }
    }

    /// Bind to the vertex target
    pub fn bind(&self) {
        self.buffer.bind();
    }

    /// Clear the vertex target
    pub fn unbind(&self) {
        self.buffer.unbind();
    }

    /// Number of vertices
    pub fn count(&self) -> u32 {
        self.buffer.count()
    }

    /// Floats per vertex
    pub fn components(&self) -> u32 {
        self.buffer.components()
    }

    /// Get buffer handle
    pub fn handle(&self) -> BufferHandle {
        self.buffer.handle()
    }

    /// Uploaded size in bytes
    pub fn size_bytes(&self) -> usize {
        self.buffer.size_bytes()
    }
}

/// Index buffer of `u32` indices grouped into primitives
#[derive(Debug)]
pub struct IndexBuffer {
    buffer: GpuBuffer,
}

impl IndexBuffer {
    /// Upload `indices` as primitives of `components` indices each (3 for triangles)
    pub fn new(device: &Device, indices: &[u32], components: u32) -> Self {
        Self {
            buffer: GpuBuffer::new(device, BufferTarget::Index, indices, components),
        }
    }

    /// Bind to the index target
    pub fn bind(&self) {
        self.buffer.bind();
    }

    /// Clear the index target
    pub fn unbind(&self) {
        self.buffer.unbind();
    }

    /// Number of primitives
    pub fn count(&self) -> u32 {
        self.buffer.count()
    }

    /// Indices per primitive
    pub fn components(&self) -> u32 {
        self.buffer.components()
    }

    /// Indices covered by a draw of every primitive
    pub fn index_count(&self) -> u32 {
        self.buffer.count() * self.buffer.components()
    }

    /// Get buffer handle
    pub fn handle(&self) -> BufferHandle {
        self.buffer.handle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::device::headless::{HeadlessDevice, Release};

    #[test]
    fn test_accessors_report_upload_shape() {
        let device = Device::headless();
        let positions = [0.0f32; 24 * 3];
        let vertices = VertexBuffer::new(&device, &positions, 3);
        assert_eq!(vertices.count(), 24);
        assert_eq!(vertices.components(), 3);
        assert_eq!(vertices.size_bytes(), 24 * 3 * 4);

        let indices = IndexBuffer::new(&device, &[0, 1, 2, 2, 3, 0], 3);
        assert_eq!(indices.count(), 2);
        assert_eq!(indices.components(), 3);
        assert_eq!(indices.index_count(), 6);

        let stored = device
            .inspect(|h: &HeadlessDevice| h.buffer(indices.handle()).map(|b| b.data.len()))
            .flatten();
        assert_eq!(stored, Some(6 * 4));
    }

    #[test]
    fn test_partial_trailing_element_is_dropped() {
        let device = Device::headless();
        let indices = IndexBuffer::new(&device, &[0, 1, 2, 3], 3);
        assert_eq!(indices.index_count(), 3);
        let stored = device
            .inspect(|h: &HeadlessDevice| h.buffer(indices.handle()).map(|b| b.data.len()))
            .flatten();
        assert_eq!(stored, Some(3 * 4));
    }

    #[test]
    fn test_bind_unbind_restores_state() {
        let device = Device::headless();
        let buffer = VertexBuffer::new(&device, &[1.0, 2.0, 3.0], 3);
        let before = device.binding_state();
        assert!(before.is_neutral());

        buffer.bind();
        buffer.bind();
        assert_eq!(device.binding_state().vertex_buffer, Some(buffer.handle()));
        buffer.unbind();
        buffer.unbind();
        assert_eq!(device.binding_state(), before);
    }

    #[test]
    fn test_construction_clears_its_target() {
        let device = Device::headless();
        let first = VertexBuffer::new(&device, &[1.0, 2.0, 3.0], 3);
        let indices = IndexBuffer::new(&device, &[0, 1, 2], 3);
        first.bind();
        indices.bind();

        let _second = VertexBuffer::new(&device, &[4.0, 5.0, 6.0], 3);
        let state = device.binding_state();
        assert_eq!(state.vertex_buffer, None);
        assert_eq!(state.index_buffer, Some(indices.handle()));
        indices.unbind();
    }

    #[test]
    fn test_empty_buffer_binds_without_error() {
        let device = Device::headless();
        let buffer = VertexBuffer::new(&device, &[], 3);
        assert_eq!(buffer.count(), 0);
        buffer.bind();
        buffer.unbind();
        assert_eq!(device.poll_error(), None);
    }

    #[test]
    fn test_drop_releases_exactly_once() {
        let device = Device::headless();
        let handle = {
            let buffer = IndexBuffer::new(&device, &[0, 1, 2], 3);
            buffer.handle()
        };
        let releases = device
            .inspect(|h: &HeadlessDevice| (h.releases().to_vec(), h.live_buffers()))
            .unwrap_or_default();
        assert_eq!(releases.0, vec![Release::Buffer(handle)]);
        assert_eq!(releases.1, 0);
        assert_eq!(device.poll_error(), None);
    }
}
