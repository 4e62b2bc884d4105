//! Value types shared by every graphics device implementation

use std::collections::BTreeMap;
use std::fmt;

use bitflags::bitflags;

use crate::foundation::math::{Mat2, Mat3, Mat4, Vec2, Vec3, Vec4};

/// Handle to a device buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferHandle(pub(crate) u64);

/// Handle to a vertex array (attribute layout) object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexArrayHandle(pub(crate) u64);

/// Handle to a 2D texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub(crate) u64);

/// Handle to a compiled shader stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StageHandle(pub(crate) u64);

/// Handle to a linked shader program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramHandle(pub(crate) u64);

/// Resolved uniform location inside one program
///
/// Unknown names never produce a location; the device returns `None`
/// (the `-1` sentinel of the underlying API) instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UniformLocation(pub(crate) i32);

/// Binding point a buffer is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    /// Per-vertex attribute data
    Vertex,
    /// Element (index) data
    Index,
}

/// Upload frequency hint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BufferUsage {
    /// Written once, drawn many times
    #[default]
    Static,
}

/// Programmable pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// Vertex stage (mandatory)
    Vertex,
    /// Fragment stage (mandatory)
    Fragment,
    /// Geometry stage (optional)
    Geometry,
}

impl ShaderStage {
    /// Upper-case stage label used in diagnostics
    pub fn label(self) -> &'static str {
        match self {
            Self::Vertex => "VERTEX",
            Self::Fragment => "FRAGMENT",
            Self::Geometry => "GEOMETRY",
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Device-side pixel format of a 2D texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// Single 8-bit channel
    R8,
    /// Three 8-bit channels
    Rgb8,
    /// Four 8-bit channels
    Rgba8,
}

impl PixelFormat {
    /// Select a format for a decoded channel count
    ///
    /// Only 1, 3 and 4 channels have a format; every other count returns `None`
    /// and must be rejected by the caller.
    pub fn from_channel_count(channels: u8) -> Option<Self> {
        match channels {
            1 => Some(Self::R8),
            3 => Some(Self::Rgb8),
            4 => Some(Self::Rgba8),
            _ => None,
        }
    }

    /// Bytes per pixel
    pub fn channel_count(self) -> u8 {
        match self {
            Self::R8 => 1,
            Self::Rgb8 => 3,
            Self::Rgba8 => 4,
        }
    }
}

/// Texture coordinate wrapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WrapMode {
    /// Tile the image
    #[default]
    Repeat,
}

/// Texel filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode {
    /// Bilinear filtering
    #[default]
    Linear,
}

/// Sampling state applied to the texture bound on the active unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SamplerState {
    /// Wrap mode for S and T
    pub wrap: WrapMode,
    /// Minification filter
    pub min_filter: FilterMode,
    /// Magnification filter
    pub mag_filter: FilterMode,
}

/// Pixel upload for the texture bound on the active unit
#[derive(Debug, Clone, Copy)]
pub struct TextureImage<'a> {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Pixel layout of `pixels`
    pub format: PixelFormat,
    /// Tightly packed rows, first row at the bottom of the image
    pub pixels: &'a [u8],
}

/// Float attribute declaration for the currently bound vertex array
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeFormat {
    /// Float components per vertex (1-4)
    pub components: u32,
    /// Distance in bytes between consecutive vertices
    pub stride: usize,
    /// Byte offset of the first component
    pub offset: usize,
}

bitflags! {
    /// Framebuffer planes cleared at the start of a frame
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ClearFlags: u32 {
        /// Color attachment
        const COLOR = 1 << 0;
        /// Depth attachment
        const DEPTH = 1 << 1;
    }
}

/// Typed uniform payload
///
/// Matrices are stored column-major.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    /// Boolean (uploaded as an integer)
    Bool(bool),
    /// Signed integer or sampler unit
    Int(i32),
    /// Scalar float
    Float(f32),
    /// 2-component vector
    Vec2([f32; 2]),
    /// 3-component vector
    Vec3([f32; 3]),
    /// 4-component vector
    Vec4([f32; 4]),
    /// 2x2 matrix
    Mat2([f32; 4]),
    /// 3x3 matrix
    Mat3([f32; 9]),
    /// 4x4 matrix
    Mat4([f32; 16]),
}

impl From<bool> for UniformValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for UniformValue {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<f32> for UniformValue {
    fn from(value: f32) -> Self {
        Self::Float(value)
    }
}

impl From<Vec2> for UniformValue {
    fn from(value: Vec2) -> Self {
        Self::Vec2([value.x, value.y])
    }
}

impl From<Vec3> for UniformValue {
    fn from(value: Vec3) -> Self {
        Self::Vec3([value.x, value.y, value.z])
    }
}

impl From<Vec4> for UniformValue {
    fn from(value: Vec4) -> Self {
        Self::Vec4([value.x, value.y, value.z, value.w])
    }
}

impl From<Mat2> for UniformValue {
    fn from(value: Mat2) -> Self {
        let mut data = [0.0; 4];
        data.copy_from_slice(value.as_slice());
        Self::Mat2(data)
    }
}

impl From<Mat3> for UniformValue {
    fn from(value: Mat3) -> Self {
        let mut data = [0.0; 9];
        data.copy_from_slice(value.as_slice());
        Self::Mat3(data)
    }
}

impl From<Mat4> for UniformValue {
    fn from(value: Mat4) -> Self {
        let mut data = [0.0; 16];
        data.copy_from_slice(value.as_slice());
        Self::Mat4(data)
    }
}

/// Snapshot of the device's global binding state
///
/// Every component must leave this unchanged across its bind/unbind pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingState {
    /// Buffer bound to the vertex target
    pub vertex_buffer: Option<BufferHandle>,
    /// Buffer bound to the index target
    pub index_buffer: Option<BufferHandle>,
    /// Bound vertex array
    pub vertex_array: Option<VertexArrayHandle>,
    /// Program in use
    pub program: Option<ProgramHandle>,
    /// Active texture unit
    pub active_unit: u32,
    /// Textures attached per unit (units with nothing bound are absent)
    pub textures: BTreeMap<u32, TextureHandle>,
}

impl BindingState {
    /// True when nothing is bound and unit 0 is active
    pub fn is_neutral(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_format_channel_mapping() {
        assert_eq!(PixelFormat::from_channel_count(1), Some(PixelFormat::R8));
        assert_eq!(PixelFormat::from_channel_count(3), Some(PixelFormat::Rgb8));
        assert_eq!(PixelFormat::from_channel_count(4), Some(PixelFormat::Rgba8));
        for unsupported in [0, 2, 5, 16] {
            assert_eq!(PixelFormat::from_channel_count(unsupported), None);
        }
        for format in [PixelFormat::R8, PixelFormat::Rgb8, PixelFormat::Rgba8] {
            assert_eq!(PixelFormat::from_channel_count(format.channel_count()), Some(format));
        }
    }

    #[test]
    fn test_matrix_uniforms_are_column_major() {
        let m = Mat2::new(1.0, 2.0, 3.0, 4.0);
        assert_eq!(UniformValue::from(m), UniformValue::Mat2([1.0, 3.0, 2.0, 4.0]));

        let t = Mat4::new_translation(&Vec3::new(5.0, 6.0, 7.0));
        match UniformValue::from(t) {
            UniformValue::Mat4(data) => assert_eq!(&data[12..15], &[5.0, 6.0, 7.0]),
            other => panic!("unexpected {other:?}"),
        }
    }
}
