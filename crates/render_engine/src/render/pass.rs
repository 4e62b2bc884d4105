//! Render passes: one shader program, its per-frame uniforms, and the items it draws

use std::rc::Rc;

use crate::foundation::math::Mat4;
use crate::render::camera::CameraView;
use crate::render::device::UniformValue;
use crate::render::geometry::Geometry;
use crate::render::lighting::LightSetup;
use crate::render::mesh::Mesh;
use crate::render::model::Model;
use crate::render::shader::ShaderProgram;

/// Anything a pass can draw
#[derive(Debug)]
pub enum Renderable {
    /// Separate-array geometry with unit-bound textures
    Geometry(Geometry),
    /// Single interleaved mesh
    Mesh(Mesh),
    /// Loaded model
    Model(Model),
}

impl Renderable {
    /// Issue the draw calls for this renderable
    pub fn draw(&self, shader: &ShaderProgram) {
        match self {
            Self::Geometry(geometry) => geometry.draw(),
            Self::Mesh(mesh) => mesh.draw(shader),
            Self::Model(model) => model.draw(shader),
        }
    }
}

impl From<Geometry> for Renderable {
    fn from(geometry: Geometry) -> Self {
        Self::Geometry(geometry)
    }
}

impl From<Mesh> for Renderable {
    fn from(mesh: Mesh) -> Self {
        Self::Mesh(mesh)
    }
}

impl From<Model> for Renderable {
    fn from(model: Model) -> Self {
        Self::Model(model)
    }
}

/// Model matrix of an item, fixed or animated over time
pub enum ModelTransform {
    /// Same matrix every frame
    Static(Mat4),
    /// Matrix computed from the elapsed time in seconds
    Animated(Box<dyn Fn(f32) -> Mat4>),
}

impl ModelTransform {
    /// Animated transform from a closure
    pub fn animated(f: impl Fn(f32) -> Mat4 + 'static) -> Self {
        Self::Animated(Box::new(f))
    }

    /// Model matrix at `time`
    pub fn at(&self, time: f32) -> Mat4 {
        match self {
            Self::Static(matrix) => *matrix,
            Self::Animated(f) => f(time),
        }
    }
}

impl std::fmt::Debug for ModelTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Static(matrix) => f.debug_tuple("Static").field(matrix).finish(),
            Self::Animated(_) => f.write_str("Animated"),
        }
    }
}

/// A renderable placed by a model transform
///
/// Renderables are reference counted so several items can draw the same
/// uploaded geometry.
#[derive(Debug)]
pub struct RenderItem {
    /// What to draw
    pub renderable: Rc<Renderable>,
    /// Where to draw it
    pub transform: ModelTransform,
}

impl RenderItem {
    /// Place `renderable` with `transform`
    pub fn new(renderable: Rc<Renderable>, transform: ModelTransform) -> Self {
        Self { renderable, transform }
    }
}

/// Per-frame values shared by every pass
pub struct FrameContext<'a> {
    /// Camera the frame is rendered from
    pub camera: &'a dyn CameraView,
    /// World-to-view matrix
    pub view: Mat4,
    /// Projection matrix
    pub projection: Mat4,
    /// Seconds since the window system started
    pub time: f32,
}

/// One shader program and everything drawn with it
#[derive(Debug)]
pub struct RenderPass {
    name: String,
    shader: ShaderProgram,
    camera_uniforms: bool,
    lights: Option<LightSetup>,
    items: Vec<RenderItem>,
}

impl RenderPass {
    /// Pass drawing with `shader`; camera uniforms are written by default
    pub fn new(name: impl Into<String>, shader: ShaderProgram) -> Self {
        Self {
            name: name.into(),
            shader,
            camera_uniforms: true,
            lights: None,
            items: Vec::new(),
        }
    }

    /// Write a uniform once now; it keeps its value across frames
    pub fn with_constant(self, name: &str, value: impl Into<UniformValue>) -> Self {
        self.shader.enable();
        self.shader.set_uniform(name, value);
        self.shader.disable();
        self
    }

    /// Whether to write `viewPos`, `view` and `projection` every frame
    pub fn with_camera_uniforms(mut self, enabled: bool) -> Self {
        self.camera_uniforms = enabled;
        self
    }

    /// Lights written every frame
    pub fn with_lights(mut self, lights: LightSetup) -> Self {
        self.lights = Some(lights);
        self
    }

    /// Append an item
    pub fn with_item(mut self, item: RenderItem) -> Self {
        self.items.push(item);
        self
    }

    /// Append an item
    pub fn add_item(&mut self, item: RenderItem) {
        self.items.push(item);
    }

    /// Enable the shader, write frame uniforms, draw every item, disable
    pub fn render(&self, frame: &FrameContext<'_>) {
        self.shader.enable();
        if self.camera_uniforms {
            self.shader.set_vec3("viewPos", &frame.camera.position());
            self.shader.set_mat4("view", &frame.view);
            self.shader.set_mat4("projection", &frame.projection);
        }
        if let Some(lights) = &self.lights {
            lights.apply(&self.shader, frame.camera);
        }
        for item in &self.items {
            self.shader.set_mat4("model", &item.transform.at(frame.time));
            item.renderable.draw(&self.shader);
        }
        self.shader.disable();
        log::trace!("Pass '{}' drew {} item(s)", self.name, self.items.len());
    }

    /// Pass name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shader program
    pub fn shader(&self) -> &ShaderProgram {
        &self.shader
    }

    /// Items in draw order
    pub fn items(&self) -> &[RenderItem] {
        &self.items
    }
}
