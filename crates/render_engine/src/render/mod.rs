//! # Rendering System
//!
//! GPU resources and draw submission over a [`device::GraphicsDevice`].
//!
//! ## Architecture
//!
//! - **Device**: GL-shaped trait with an OpenGL and a headless recording implementation
//! - **Resources**: buffers, vertex layouts, textures and shader programs, each
//!   owning one device handle released on drop
//! - **Renderables**: separate-array [`Geometry`], interleaved [`Mesh`] and [`Model`]
//! - **Passes**: a shader program with its per-frame uniforms and placed items
//! - **Window**: the capability the frame driver polls for time, keys and events
//!
//! ## Binding discipline
//!
//! Every component that binds device state unbinds it before returning, so the
//! binding state after any draw is the neutral state (nothing bound, texture
//! unit 0 active).

pub mod buffer;
pub mod camera;
pub mod cube;
pub mod device;
pub mod geometry;
pub mod lighting;
pub mod mesh;
pub mod model;
pub mod pass;
pub mod shader;
pub mod texture;
pub mod vertex_layout;
pub mod window;

pub use buffer::{GpuBuffer, IndexBuffer, VertexBuffer};
pub use camera::{CameraMovement, CameraView, FlyCamera};
pub use device::{Device, DeviceError, GraphicsDevice};
pub use geometry::Geometry;
pub use lighting::{DirectionalLight, LightSetup, PointLight, SpotLight};
pub use mesh::{Mesh, MeshTexture, TextureKind, Vertex};
pub use model::Model;
pub use pass::{FrameContext, ModelTransform, RenderItem, RenderPass, Renderable};
pub use shader::{ShaderError, ShaderPaths, ShaderProgram, ShaderSources, ShaderState, UniformLookup};
pub use texture::{Texture, TextureError, TextureState};
pub use vertex_layout::{VertexAttribute, VertexLayout};
pub use window::{GlfwWindow, ScriptedWindow, WindowBackend, WindowError, WindowEvent};
