//! Graphics device boundary
//!
//! The renderer talks to the GPU through [`GraphicsDevice`], a small
//! GL-shaped surface: create/bind/delete by target, uniform lookup by name,
//! indexed draws, clears and an error query. Two implementations exist:
//!
//! - [`opengl::OpenGlDevice`] drives a real OpenGL 4.3 core context
//! - [`headless::HeadlessDevice`] simulates binding state and records every
//!   call, so resources and the frame loop can be exercised without a GPU
//!
//! Resources keep a clone of [`Device`] so that dropping them releases their
//! handles against the same context they were created on.

pub mod headless;
pub mod opengl;
pub mod reflect;
pub mod types;

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use thiserror::Error;

pub use types::*;

/// Error reported by the device's error query
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceError {
    /// An enum argument was out of range
    #[error("invalid enum")]
    InvalidEnum,
    /// A numeric argument or handle was out of range
    #[error("invalid value")]
    InvalidValue,
    /// The operation is not allowed in the current state
    #[error("invalid operation")]
    InvalidOperation,
    /// The bound framebuffer is incomplete
    #[error("invalid framebuffer operation")]
    InvalidFramebufferOperation,
    /// The device ran out of memory
    #[error("out of memory")]
    OutOfMemory,
    /// Any other code the device reported
    #[error("unknown device error 0x{0:04X}")]
    Unknown(u32),
}

/// Stateful, synchronous graphics API
///
/// All operations act on one implicit context. Operations that address "the
/// bound" object (attribute pointers, sampler state, image upload, mipmaps)
/// affect whatever the preceding bind calls selected.
pub trait GraphicsDevice {
    /// Allocate a buffer on `target` and upload `data` immediately
    ///
    /// Leaves the new buffer bound to `target`.
    fn create_buffer(&mut self, target: BufferTarget, data: &[u8], usage: BufferUsage) -> BufferHandle;

    /// Bind a buffer to `target`, or clear the target with `None`
    fn bind_buffer(&mut self, target: BufferTarget, buffer: Option<BufferHandle>);

    /// Release a buffer handle
    fn delete_buffer(&mut self, buffer: BufferHandle);

    /// Allocate an empty vertex array
    fn create_vertex_array(&mut self) -> VertexArrayHandle;

    /// Bind a vertex array, or unbind with `None`
    fn bind_vertex_array(&mut self, array: Option<VertexArrayHandle>);

    /// Enable an attribute slot on the bound vertex array
    fn enable_vertex_attribute(&mut self, slot: u32);

    /// Point an attribute slot at the bound vertex buffer
    fn vertex_attribute_pointer(&mut self, slot: u32, format: AttributeFormat);

    /// Release a vertex array handle
    fn delete_vertex_array(&mut self, array: VertexArrayHandle);

    /// Allocate a texture object with no storage
    fn create_texture(&mut self) -> TextureHandle;

    /// Select the texture unit later texture calls apply to
    fn set_active_texture_unit(&mut self, unit: u32);

    /// Texture unit currently selected
    fn active_texture_unit(&mut self) -> u32;

    /// Attach a texture to the active unit, or detach with `None`
    fn bind_texture(&mut self, texture: Option<TextureHandle>);

    /// Set wrapping and filtering of the texture on the active unit
    fn set_sampler_state(&mut self, sampler: &SamplerState);

    /// Upload level 0 of the texture on the active unit
    fn upload_texture_image(&mut self, image: &TextureImage<'_>);

    /// Build the full mipmap chain of the texture on the active unit
    fn generate_mipmaps(&mut self);

    /// Release a texture handle
    fn delete_texture(&mut self, texture: TextureHandle);

    /// Create and compile one shader stage
    fn compile_stage(&mut self, stage: ShaderStage, source: &str) -> StageHandle;

    /// Compile log of a stage, `None` when it compiled cleanly
    fn stage_error_log(&mut self, stage: StageHandle) -> Option<String>;

    /// Release a stage handle
    fn delete_stage(&mut self, stage: StageHandle);

    /// Attach `stages` to a new program and link it
    fn link_program(&mut self, stages: &[StageHandle]) -> ProgramHandle;

    /// Link log of a program, `None` when it linked cleanly
    fn program_error_log(&mut self, program: ProgramHandle) -> Option<String>;

    /// Make a program the active pipeline, or none with `None`
    fn use_program(&mut self, program: Option<ProgramHandle>);

    /// Release a program handle
    fn delete_program(&mut self, program: ProgramHandle);

    /// Resolve a uniform name in `program`
    ///
    /// Returns `None` for names the linked program does not contain.
    fn uniform_location(&mut self, program: ProgramHandle, name: &str) -> Option<UniformLocation>;

    /// Write a value to a location of the program in use
    fn set_uniform(&mut self, location: UniformLocation, value: &UniformValue);

    /// Color used by subsequent color clears
    fn set_clear_color(&mut self, color: [f32; 4]);

    /// Clear the selected framebuffer planes
    fn clear(&mut self, flags: ClearFlags);

    /// Enable or disable depth testing
    fn set_depth_test(&mut self, enabled: bool);

    /// Set the viewport rectangle in pixels
    fn set_viewport(&mut self, x: i32, y: i32, width: u32, height: u32);

    /// Draw `index_count` indices from the bound index buffer as triangles
    fn draw_indexed_triangles(&mut self, index_count: u32);

    /// Pop the oldest pending device error
    fn poll_error(&mut self) -> Option<DeviceError>;

    /// Query the current global binding state
    fn binding_state(&mut self) -> BindingState;

    /// Short backend name for logs
    fn name(&self) -> &'static str;

    /// Downcast support for backend-specific inspection
    fn as_any(&self) -> &dyn Any;

    /// Mutable downcast support
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Shared handle to the single graphics context
///
/// Cloning is cheap; all clones address the same device. The renderer is
/// single-threaded so the handle is neither `Send` nor `Sync`.
#[derive(Clone)]
pub struct Device {
    inner: Rc<RefCell<Box<dyn GraphicsDevice>>>,
}

impl Device {
    /// Wrap a device implementation
    pub fn new(backend: impl GraphicsDevice + 'static) -> Self {
        log::info!("Using graphics device: {}", backend.name());
        let backend: Box<dyn GraphicsDevice> = Box::new(backend);
        Self {
            inner: Rc::new(RefCell::new(backend)),
        }
    }

    /// Create a handle backed by a fresh [`headless::HeadlessDevice`]
    pub fn headless() -> Self {
        Self::new(headless::HeadlessDevice::new())
    }

    /// Run `f` against the device
    ///
    /// Calls must not nest: resources are never created or dropped inside `f`.
    pub fn with<R>(&self, f: impl FnOnce(&mut dyn GraphicsDevice) -> R) -> R {
        let mut device = self.inner.borrow_mut();
        f(device.as_mut())
    }

    /// Inspect the concrete backend, `None` when it is not a `T`
    pub fn inspect<T: 'static, R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        let device = self.inner.borrow();
        device.as_any().downcast_ref::<T>().map(f)
    }

    /// Mutable variant of [`Device::inspect`]
    pub fn inspect_mut<T: 'static, R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let mut device = self.inner.borrow_mut();
        device.as_any_mut().downcast_mut::<T>().map(f)
    }

    /// Current binding state
    pub fn binding_state(&self) -> BindingState {
        self.with(|d| d.binding_state())
    }

    /// Pop the oldest pending device error
    pub fn poll_error(&self) -> Option<DeviceError> {
        self.with(|d| d.poll_error())
    }

    /// Backend name
    pub fn name(&self) -> &'static str {
        self.inner.borrow().name()
    }

    /// Release a handle from a `Drop` impl
    ///
    /// Skips the call (with an error log) if the device is already borrowed,
    /// which only happens when a resource is dropped inside [`Device::with`].
    pub(crate) fn release(&self, what: &str, f: impl FnOnce(&mut dyn GraphicsDevice)) {
        match self.inner.try_borrow_mut() {
            Ok(mut device) => f(device.as_mut()),
            Err(_) => log::error!("Device busy while releasing {what}; handle leaked"),
        }
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device").field("backend", &self.name()).finish()
    }
}
