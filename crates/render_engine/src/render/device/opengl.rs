//! OpenGL 4.3 core device using the `gl` function loader
//!
//! Every call requires the context that loaded the function pointers to be
//! current on the calling thread. [`crate::render::window::GlfwWindow`]
//! creates the context, makes it current and constructs this device from it.

#![allow(unsafe_code)]

use std::any::Any;
use std::ffi::{c_void, CString};
use std::ptr;

use gl::types::{GLchar, GLenum, GLint, GLsizei, GLsizeiptr, GLuint};

use super::{
    AttributeFormat, BindingState, BufferHandle, BufferTarget, BufferUsage, ClearFlags,
    DeviceError, FilterMode, GraphicsDevice, PixelFormat, ProgramHandle, SamplerState,
    ShaderStage, StageHandle, TextureHandle, TextureImage, UniformLocation, UniformValue,
    VertexArrayHandle, WrapMode,
};

/// Texture units inspected by [`GraphicsDevice::binding_state`]
const QUERIED_TEXTURE_UNITS: u32 = 16;

/// Device backed by the current OpenGL context
pub struct OpenGlDevice {
    queried_units: u32,
}

impl OpenGlDevice {
    /// Load GL function pointers through `loader` and wrap the context
    ///
    /// `loader` resolves a symbol name in the current context, typically
    /// `window.get_proc_address`.
    pub fn load_with(loader: impl FnMut(&'static str) -> *const c_void) -> Self {
        gl::load_with(loader);
        log::info!("OpenGL function pointers loaded");
        Self {
            queried_units: QUERIED_TEXTURE_UNITS,
        }
    }
}

fn raw(handle: u64) -> GLuint {
    handle as GLuint
}

fn target_enum(target: BufferTarget) -> GLenum {
    match target {
        BufferTarget::Vertex => gl::ARRAY_BUFFER,
        BufferTarget::Index => gl::ELEMENT_ARRAY_BUFFER,
    }
}

fn stage_enum(stage: ShaderStage) -> GLenum {
    match stage {
        ShaderStage::Vertex => gl::VERTEX_SHADER,
        ShaderStage::Fragment => gl::FRAGMENT_SHADER,
        ShaderStage::Geometry => gl::GEOMETRY_SHADER,
    }
}

fn format_enum(format: PixelFormat) -> GLenum {
    match format {
        PixelFormat::R8 => gl::RED,
        PixelFormat::Rgb8 => gl::RGB,
        PixelFormat::Rgba8 => gl::RGBA,
    }
}

fn filter_enum(filter: FilterMode) -> GLint {
    match filter {
        FilterMode::Linear => gl::LINEAR as GLint,
    }
}

fn integer(pname: GLenum) -> GLint {
    let mut value = 0;
    unsafe { gl::GetIntegerv(pname, &mut value) };
    value
}

fn bound(pname: GLenum) -> Option<u64> {
    match integer(pname) {
        0 => None,
        id => Some(u64::from(id as GLuint)),
    }
}

fn info_log(length: GLint, fetch: impl FnOnce(GLsizei, *mut GLchar)) -> String {
    let mut buffer = vec![0u8; usize::try_from(length).unwrap_or(0).max(1)];
    fetch(buffer.len() as GLsizei, buffer.as_mut_ptr().cast());
    let end = buffer.iter().position(|&b| b == 0).unwrap_or(buffer.len());
    String::from_utf8_lossy(&buffer[..end]).trim_end().to_string()
}

fn c_string(text: &str, what: &str) -> CString {
    CString::new(text).unwrap_or_else(|_| {
        log::warn!("{what} contains an interior NUL byte; passing an empty string");
        CString::default()
    })
}

impl GraphicsDevice for OpenGlDevice {
    fn create_buffer(&mut self, target: BufferTarget, data: &[u8], usage: BufferUsage) -> BufferHandle {
        let usage = match usage {
            BufferUsage::Static => gl::STATIC_DRAW,
        };
        let mut id = 0;
        unsafe {
            gl::GenBuffers(1, &mut id);
            gl::BindBuffer(target_enum(target), id);
            gl::BufferData(
                target_enum(target),
                data.len() as GLsizeiptr,
                data.as_ptr().cast(),
                usage,
            );
        }
        BufferHandle(u64::from(id))
    }

    fn bind_buffer(&mut self, target: BufferTarget, buffer: Option<BufferHandle>) {
        unsafe { gl::BindBuffer(target_enum(target), buffer.map_or(0, |b| raw(b.0))) };
    }

    fn delete_buffer(&mut self, buffer: BufferHandle) {
        let id = raw(buffer.0);
        unsafe { gl::DeleteBuffers(1, &id) };
    }

    fn create_vertex_array(&mut self) -> VertexArrayHandle {
        let mut id = 0;
        unsafe { gl::GenVertexArrays(1, &mut id) };
        VertexArrayHandle(u64::from(id))
    }

    fn bind_vertex_array(&mut self, array: Option<VertexArrayHandle>) {
        unsafe { gl::BindVertexArray(array.map_or(0, |a| raw(a.0))) };
    }

    fn enable_vertex_attribute(&mut self, slot: u32) {
        unsafe { gl::EnableVertexAttribArray(slot) };
    }

    fn vertex_attribute_pointer(&mut self, slot: u32, format: AttributeFormat) {
        unsafe {
            gl::VertexAttribPointer(
                slot,
                format.components as GLint,
                gl::FLOAT,
                gl::FALSE,
                format.stride as GLsizei,
                format.offset as *const c_void,
            );
        }
    }

    fn delete_vertex_array(&mut self, array: VertexArrayHandle) {
        let id = raw(array.0);
        unsafe { gl::DeleteVertexArrays(1, &id) };
    }

    fn create_texture(&mut self) -> TextureHandle {
        let mut id = 0;
        unsafe { gl::GenTextures(1, &mut id) };
        TextureHandle(u64::from(id))
    }

    fn set_active_texture_unit(&mut self, unit: u32) {
        unsafe { gl::ActiveTexture(gl::TEXTURE0 + unit) };
    }

    fn active_texture_unit(&mut self) -> u32 {
        (integer(gl::ACTIVE_TEXTURE) as GLenum).saturating_sub(gl::TEXTURE0)
    }

    fn bind_texture(&mut self, texture: Option<TextureHandle>) {
        unsafe { gl::BindTexture(gl::TEXTURE_2D, texture.map_or(0, |t| raw(t.0))) };
    }

    fn set_sampler_state(&mut self, sampler: &SamplerState) {
        let wrap = match sampler.wrap {
            WrapMode::Repeat => gl::REPEAT,
        } as GLint;
        unsafe {
            gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_WRAP_S, wrap);
            gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_WRAP_T, wrap);
            gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_MIN_FILTER, filter_enum(sampler.min_filter));
            gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_MAG_FILTER, filter_enum(sampler.mag_filter));
        }
    }

    fn upload_texture_image(&mut self, image: &TextureImage<'_>) {
        let format = format_enum(image.format);
        unsafe {
            // Rows of 1- and 3-channel images are not 4-byte aligned
            gl::PixelStorei(gl::UNPACK_ALIGNMENT, 1);
            gl::TexImage2D(
                gl::TEXTURE_2D,
                0,
                format as GLint,
                image.width as GLsizei,
                image.height as GLsizei,
                0,
                format,
                gl::UNSIGNED_BYTE,
                image.pixels.as_ptr().cast(),
            );
        }
    }

    fn generate_mipmaps(&mut self) {
        unsafe { gl::GenerateMipmap(gl::TEXTURE_2D) };
    }

    fn delete_texture(&mut self, texture: TextureHandle) {
        let id = raw(texture.0);
        unsafe { gl::DeleteTextures(1, &id) };
    }

    fn compile_stage(&mut self, stage: ShaderStage, source: &str) -> StageHandle {
        let source = c_string(source, "shader source");
        let id = unsafe {
            let id = gl::CreateShader(stage_enum(stage));
            gl::ShaderSource(id, 1, &source.as_ptr(), ptr::null());
            gl::CompileShader(id);
            id
        };
        StageHandle(u64::from(id))
    }

    fn stage_error_log(&mut self, stage: StageHandle) -> Option<String> {
        let id = raw(stage.0);
        let mut status = 0;
        let mut length = 0;
        unsafe {
            gl::GetShaderiv(id, gl::COMPILE_STATUS, &mut status);
            gl::GetShaderiv(id, gl::INFO_LOG_LENGTH, &mut length);
        }
        (status != GLint::from(gl::TRUE)).then(|| {
            info_log(length, |len, buf| unsafe {
                gl::GetShaderInfoLog(id, len, ptr::null_mut(), buf);
            })
        })
    }

    fn delete_stage(&mut self, stage: StageHandle) {
        unsafe { gl::DeleteShader(raw(stage.0)) };
    }

    fn link_program(&mut self, stages: &[StageHandle]) -> ProgramHandle {
        let id = unsafe {
            let id = gl::CreateProgram();
            for stage in stages {
                gl::AttachShader(id, raw(stage.0));
            }
            gl::LinkProgram(id);
            id
        };
        ProgramHandle(u64::from(id))
    }

    fn program_error_log(&mut self, program: ProgramHandle) -> Option<String> {
        let id = raw(program.0);
        let mut status = 0;
        let mut length = 0;
        unsafe {
            gl::GetProgramiv(id, gl::LINK_STATUS, &mut status);
            gl::GetProgramiv(id, gl::INFO_LOG_LENGTH, &mut length);
        }
        (status != GLint::from(gl::TRUE)).then(|| {
            info_log(length, |len, buf| unsafe {
                gl::GetProgramInfoLog(id, len, ptr::null_mut(), buf);
            })
        })
    }

    fn use_program(&mut self, program: Option<ProgramHandle>) {
        unsafe { gl::UseProgram(program.map_or(0, |p| raw(p.0))) };
    }

    fn delete_program(&mut self, program: ProgramHandle) {
        unsafe { gl::DeleteProgram(raw(program.0)) };
    }

    fn uniform_location(&mut self, program: ProgramHandle, name: &str) -> Option<UniformLocation> {
        let name = c_string(name, "uniform name");
        let location = unsafe { gl::GetUniformLocation(raw(program.0), name.as_ptr()) };
        (location >= 0).then_some(UniformLocation(location))
    }

    fn set_uniform(&mut self, location: UniformLocation, value: &UniformValue) {
        let loc = location.0;
        unsafe {
            match value {
                UniformValue::Bool(v) => gl::Uniform1i(loc, GLint::from(*v)),
                UniformValue::Int(v) => gl::Uniform1i(loc, *v),
                UniformValue::Float(v) => gl::Uniform1f(loc, *v),
                UniformValue::Vec2(v) => gl::Uniform2fv(loc, 1, v.as_ptr()),
                UniformValue::Vec3(v) => gl::Uniform3fv(loc, 1, v.as_ptr()),
                UniformValue::Vec4(v) => gl::Uniform4fv(loc, 1, v.as_ptr()),
                UniformValue::Mat2(m) => gl::UniformMatrix2fv(loc, 1, gl::FALSE, m.as_ptr()),
                UniformValue::Mat3(m) => gl::UniformMatrix3fv(loc, 1, gl::FALSE, m.as_ptr()),
                UniformValue::Mat4(m) => gl::UniformMatrix4fv(loc, 1, gl::FALSE, m.as_ptr()),
            }
        }
    }

    fn set_clear_color(&mut self, color: [f32; 4]) {
        unsafe { gl::ClearColor(color[0], color[1], color[2], color[3]) };
    }

    fn clear(&mut self, flags: ClearFlags) {
        let mut mask = 0;
        if flags.contains(ClearFlags::COLOR) {
            mask |= gl::COLOR_BUFFER_BIT;
        }
        if flags.contains(ClearFlags::DEPTH) {
            mask |= gl::DEPTH_BUFFER_BIT;
        }
        unsafe { gl::Clear(mask) };
    }

    fn set_depth_test(&mut self, enabled: bool) {
        unsafe {
            if enabled {
                gl::Enable(gl::DEPTH_TEST);
            } else {
                gl::Disable(gl::DEPTH_TEST);
            }
        }
    }

    fn set_viewport(&mut self, x: i32, y: i32, width: u32, height: u32) {
        unsafe { gl::Viewport(x, y, width as GLsizei, height as GLsizei) };
    }

    fn draw_indexed_triangles(&mut self, index_count: u32) {
        unsafe {
            gl::DrawElements(gl::TRIANGLES, index_count as GLsizei, gl::UNSIGNED_INT, ptr::null());
        }
    }

    fn poll_error(&mut self) -> Option<DeviceError> {
        match unsafe { gl::GetError() } {
            gl::NO_ERROR => None,
            gl::INVALID_ENUM => Some(DeviceError::InvalidEnum),
            gl::INVALID_VALUE => Some(DeviceError::InvalidValue),
            gl::INVALID_OPERATION => Some(DeviceError::InvalidOperation),
            gl::INVALID_FRAMEBUFFER_OPERATION => Some(DeviceError::InvalidFramebufferOperation),
            gl::OUT_OF_MEMORY => Some(DeviceError::OutOfMemory),
            other => Some(DeviceError::Unknown(other)),
        }
    }

    fn binding_state(&mut self) -> BindingState {
        let active_unit = self.active_texture_unit();
        let mut textures = std::collections::BTreeMap::new();
        for unit in 0..self.queried_units {
            unsafe { gl::ActiveTexture(gl::TEXTURE0 + unit) };
            if let Some(id) = bound(gl::TEXTURE_BINDING_2D) {
                textures.insert(unit, TextureHandle(id));
            }
        }
        unsafe { gl::ActiveTexture(gl::TEXTURE0 + active_unit) };

        BindingState {
            vertex_buffer: bound(gl::ARRAY_BUFFER_BINDING).map(BufferHandle),
            index_buffer: bound(gl::ELEMENT_ARRAY_BUFFER_BINDING).map(BufferHandle),
            vertex_array: bound(gl::VERTEX_ARRAY_BINDING).map(VertexArrayHandle),
            program: bound(gl::CURRENT_PROGRAM).map(ProgramHandle),
            active_unit,
            textures,
        }
    }

    fn name(&self) -> &'static str {
        "opengl"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
