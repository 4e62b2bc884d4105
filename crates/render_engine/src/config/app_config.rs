//! # Application Configuration
//!
//! Everything a scene needs to open a window, pick a device, place the
//! camera and find its assets. Every section has defaults matching the
//! reference lighting scene, so a partial TOML file only overrides what it
//! names.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{Config, ConfigError};
use crate::foundation::math::Vec3;
use crate::render::camera::{FlyCamera, PITCH, SENSITIVITY, SPEED, YAW, ZOOM};
use crate::render::shader::{ShaderPaths, UniformLookup};

/// Window settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Title bar text
    pub title: String,
    /// Client width in screen coordinates
    pub width: u32,
    /// Client height in screen coordinates
    pub height: u32,
    /// Wait for vertical sync on present
    pub vsync: bool,
    /// Hide and capture the cursor for mouse look
    pub capture_cursor: bool,
}

impl WindowConfig {
    /// Window with the given title and default size
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Set the size
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set vsync
    pub fn with_vsync(mut self, enabled: bool) -> Self {
        self.vsync = enabled;
        self
    }

    /// Set cursor capture
    pub fn with_capture_cursor(mut self, enabled: bool) -> Self {
        self.capture_cursor = enabled;
        self
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Render Engine".to_string(),
            width: 800,
            height: 600,
            vsync: true,
            capture_cursor: true,
        }
    }
}

/// Which graphics device to create
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// OpenGL 4.3 core through a glfw window
    #[default]
    OpenGl,
    /// Recording device, no GPU or display needed
    Headless,
}

/// Renderer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Device backend
    pub backend: BackendKind,
    /// Clear color (RGBA)
    pub clear_color: [f32; 4],
    /// Depth testing
    pub depth_test: bool,
    /// Uniform location lookup strategy
    pub uniform_lookup: UniformLookup,
    /// Near clip distance
    pub near: f32,
    /// Far clip distance
    pub far: f32,
}

impl RendererConfig {
    /// Set the backend
    pub fn with_backend(mut self, backend: BackendKind) -> Self {
        self.backend = backend;
        self
    }

    /// Set the clear color
    pub fn with_clear_color(mut self, color: [f32; 4]) -> Self {
        self.clear_color = color;
        self
    }

    /// Set the uniform lookup strategy
    pub fn with_uniform_lookup(mut self, lookup: UniformLookup) -> Self {
        self.uniform_lookup = lookup;
        self
    }

    /// Set the clip planes
    pub fn with_clip_planes(mut self, near: f32, far: f32) -> Self {
        self.near = near;
        self.far = far;
        self
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::OpenGl,
            clear_color: [0.1, 0.1, 0.1, 1.0],
            depth_test: true,
            uniform_lookup: UniformLookup::PerCall,
            near: 0.1,
            far: 100.0,
        }
    }
}

/// Initial camera placement and tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Eye position
    pub position: Vec3,
    /// Heading in degrees
    pub yaw: f32,
    /// Elevation in degrees
    pub pitch: f32,
    /// Movement speed in units per second
    pub speed: f32,
    /// Mouse sensitivity in degrees per pixel
    pub sensitivity: f32,
    /// Field of view in degrees
    pub zoom: f32,
}

impl CameraConfig {
    /// Build the camera described by this configuration
    pub fn build(&self) -> FlyCamera {
        FlyCamera::new(self.position, Vec3::y(), self.yaw, self.pitch)
            .with_speed(self.speed)
            .with_sensitivity(self.sensitivity)
            .with_zoom(self.zoom)
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 3.0),
            yaw: YAW,
            pitch: PITCH,
            speed: SPEED,
            sensitivity: SENSITIVITY,
            zoom: ZOOM,
        }
    }
}

/// Asset locations, relative to `root` unless absolute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Base directory for every relative path below
    pub root: PathBuf,
    /// Diffuse map of the containers
    pub diffuse_texture: PathBuf,
    /// Specular map of the containers
    pub specular_texture: PathBuf,
    /// Optional OBJ model drawn next to the containers
    pub model: Option<PathBuf>,
    /// Lit container shader
    pub lighting_shader: ShaderPaths,
    /// Lamp marker shader
    pub lamp_shader: ShaderPaths,
    /// Model shader using the mesh sampler naming
    pub model_shader: ShaderPaths,
}

impl AssetConfig {
    /// Set the asset root
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Set the optional model
    pub fn with_model(mut self, model: impl Into<PathBuf>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Resolve a path against `root`
    pub fn resolve(&self, path: &Path) -> PathBuf {
        self.root.join(path)
    }

    /// Resolve every stage of a shader against `root`
    pub fn resolve_shader(&self, paths: &ShaderPaths) -> ShaderPaths {
        paths.resolved(&self.root)
    }
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("resources"),
            diffuse_texture: PathBuf::from("textures/container2.png"),
            specular_texture: PathBuf::from("textures/container2_specular.png"),
            model: None,
            lighting_shader: ShaderPaths::new("shaders/lighting.vs", "shaders/lighting.fs"),
            lamp_shader: ShaderPaths::new("shaders/lamp.vs", "shaders/lamp.fs"),
            model_shader: ShaderPaths::new("shaders/model.vs", "shaders/model.fs"),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter, overridden by `RUST_LOG`
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Fixed-step run used with the headless backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadlessRunConfig {
    /// Frames to render before closing
    pub frames: u32,
    /// Seconds between frames
    pub time_step: f64,
}

impl Default for HeadlessRunConfig {
    fn default() -> Self {
        Self {
            frames: 120,
            time_step: 1.0 / 60.0,
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Window section
    pub window: WindowConfig,
    /// Renderer section
    pub renderer: RendererConfig,
    /// Camera section
    pub camera: CameraConfig,
    /// Assets section
    pub assets: AssetConfig,
    /// Logging section
    pub logging: LoggingConfig,
    /// Headless run section
    pub headless: HeadlessRunConfig,
}

impl ApplicationConfig {
    /// Configuration for a titled application with defaults elsewhere
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            window: WindowConfig::new(title),
            ..Self::default()
        }
    }

    /// Replace the window section
    pub fn with_window(mut self, window: WindowConfig) -> Self {
        self.window = window;
        self
    }

    /// Replace the renderer section
    pub fn with_renderer(mut self, renderer: RendererConfig) -> Self {
        self.renderer = renderer;
        self
    }

    /// Replace the camera section
    pub fn with_camera(mut self, camera: CameraConfig) -> Self {
        self.camera = camera;
        self
    }

    /// Replace the assets section
    pub fn with_assets(mut self, assets: AssetConfig) -> Self {
        self.assets = assets;
        self
    }

    /// Check values the renderer cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "window size {}x{} must be non-zero",
                self.window.width, self.window.height
            )));
        }
        let (near, far) = (self.renderer.near, self.renderer.far);
        if !(near > 0.0 && far > near) {
            return Err(ConfigError::Invalid(format!(
                "clip planes must satisfy 0 < near < far (got {near}, {far})"
            )));
        }
        if self.headless.time_step < 0.0 {
            return Err(ConfigError::Invalid("headless time step must not be negative".to_string()));
        }
        Ok(())
    }
}

impl Config for ApplicationConfig {}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: ApplicationConfig = toml::from_str(
            r#"
[window]
title = "Containers"
width = 1280

[renderer]
backend = "headless"
uniform_lookup = "cached"

[camera]
position = [1.0, 2.0, 5.0]
"#,
        )
        .expect("valid toml");

        assert_eq!(config.window.title, "Containers");
        assert_eq!((config.window.width, config.window.height), (1280, 600));
        assert_eq!(config.renderer.backend, BackendKind::Headless);
        assert_eq!(config.renderer.uniform_lookup, UniformLookup::Cached);
        assert_eq!(config.renderer.clear_color, [0.1, 0.1, 0.1, 1.0]);
        assert_eq!(config.camera.position, Vec3::new(1.0, 2.0, 5.0));
        assert_relative_eq!(config.camera.zoom, 45.0);
        assert_eq!(config.assets, AssetConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_save_and_load_file() {
        let path = std::env::temp_dir().join(format!("render_engine_config_{}.toml", std::process::id()));
        let config = ApplicationConfig::new("Saved")
            .with_assets(AssetConfig::default().with_model("objects/backpack/backpack.obj"));
        config.save_to_file(&path).expect("save");
        let loaded = ApplicationConfig::load_from_file(&path).expect("load");
        assert_eq!(loaded, config);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_rejects_other_formats_and_missing_files() {
        assert!(matches!(
            ApplicationConfig::load_from_file("scene.ron"),
            Err(ConfigError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            ApplicationConfig::load_from_file("no/such/scene.toml"),
            Err(ConfigError::Io(_))
        ));
        assert_eq!(ApplicationConfig::load_or_default("no/such/scene.toml"), ApplicationConfig::default());
    }

    #[test]
    fn test_validate_catches_bad_values() {
        let zero = ApplicationConfig::new("zero").with_window(WindowConfig::default().with_size(0, 600));
        assert!(matches!(zero.validate(), Err(ConfigError::Invalid(_))));

        let planes = ApplicationConfig::default()
            .with_renderer(RendererConfig::default().with_clip_planes(1.0, 0.5));
        assert!(matches!(planes.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_camera_config_builds_camera() {
        let camera = CameraConfig {
            zoom: 90.0,
            ..CameraConfig::default()
        }
        .build();
        use crate::render::camera::CameraView;
        assert_relative_eq!(camera.zoom(), 45.0);
        assert_relative_eq!(camera.position(), Vec3::new(0.0, 0.0, 3.0));
    }
}
