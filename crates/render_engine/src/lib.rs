//! # Render Engine
//!
//! A minimal real-time OpenGL rendering pipeline: GPU-resident buffers,
//! textures and shader programs, meshes and models drawn with a sampler
//! naming convention, and a single-threaded frame driver with a fly camera.
//!
//! Every test runs against the headless recording device, so no GPU or
//! display is required outside the application.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use render_engine::prelude::*;
//!
//! fn main() -> Result<(), EngineError> {
//!     let config = ApplicationConfig::load_or_default("config/scene.toml");
//!     let mut driver = FrameDriver::from_config(&config)?;
//!     let shader = ShaderProgram::from_files(
//!         driver.device(),
//!         &ShaderPaths::new("shaders/lamp.vs", "shaders/lamp.fs"),
//!         UniformLookup::PerCall,
//!     );
//!     let cube = std::rc::Rc::new(Renderable::from(Geometry::lamp_cube(driver.device())));
//!     driver.add_pass(
//!         RenderPass::new("lamp", shader)
//!             .with_item(RenderItem::new(cube, ModelTransform::Static(Mat4::identity()))),
//!     );
//!     driver.run();
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod assets;
pub mod config;
pub mod foundation;
pub mod input;
pub mod render;

mod engine;


pub use engine::{EngineError, FrameDriver};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        config::{ApplicationConfig, BackendKind, Config},
        foundation::math::{Mat4, Mat4Ext, Vec3},
        render::{
            CameraView, Device, FlyCamera, Geometry, LightSetup, Mesh, Model, ModelTransform,
            RenderItem, RenderPass, Renderable, ShaderPaths, ShaderProgram, Texture, UniformLookup,
        },
        EngineError, FrameDriver,
    };
}
