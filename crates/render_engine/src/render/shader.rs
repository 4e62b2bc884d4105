//! Shader programs and the uniform-setting protocol
//!
//! A program is compiled and linked once at construction. Nothing here
//! fails hard: unreadable sources, compile errors and link errors are logged
//! with the stage they belong to, kept as [`ShaderError`] diagnostics, and the
//! program is marked [`ShaderState::Failed`]. The handle is still used as-is
//! so a broken shader draws nothing instead of stopping the frame loop.
//!
//! Uniforms are addressed by their GLSL path, e.g. `"pointLights[2].specular"`
//! or `"material.shininess"`. A name the linked program does not contain
//! resolves to no location and the write is silently dropped.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::foundation::math::{Mat2, Mat3, Mat4, Vec2, Vec3, Vec4};
use crate::render::device::{Device, ProgramHandle, ShaderStage, StageHandle, UniformLocation, UniformValue};

/// Problem found while building a program
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShaderError {
    /// A source file could not be read; an empty source was compiled instead
    #[error("failed to read {stage} shader source {path:?}: {message}")]
    Read {
        /// Stage the file was meant for
        stage: ShaderStage,
        /// File that could not be read
        path: PathBuf,
        /// I/O error text
        message: String,
    },

    /// A stage failed to compile
    #[error("{stage} shader compilation failed:\n{log}")]
    Compile {
        /// Failing stage
        stage: ShaderStage,
        /// Compiler info log
        log: String,
    },

    /// The program failed to link
    #[error("PROGRAM linking failed:\n{log}")]
    Link {
        /// Linker info log
        log: String,
    },
}

/// Outcome of the build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderState {
    /// Every stage compiled and the program linked
    Linked,
    /// Something failed; see [`ShaderProgram::diagnostics`]
    Failed,
}

/// How uniform names are resolved to locations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UniformLookup {
    /// Ask the device on every write
    #[default]
    PerCall,
    /// Ask once per name and remember the answer (including misses)
    Cached,
}

/// Source files of a program; the geometry stage is optional
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShaderPaths {
    /// Vertex stage source file
    pub vertex: PathBuf,
    /// Fragment stage source file
    pub fragment: PathBuf,
    /// Geometry stage source file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<PathBuf>,
}

impl ShaderPaths {
    /// Vertex and fragment sources without a geometry stage
    pub fn new(vertex: impl Into<PathBuf>, fragment: impl Into<PathBuf>) -> Self {
        Self {
            vertex: vertex.into(),
            fragment: fragment.into(),
            geometry: None,
        }
    }

    /// Add a geometry stage
    pub fn with_geometry(mut self, geometry: impl Into<PathBuf>) -> Self {
        self.geometry = Some(geometry.into());
        self
    }

    /// Resolve relative paths against `base`
    pub fn resolved(&self, base: &Path) -> Self {
        Self {
            vertex: base.join(&self.vertex),
            fragment: base.join(&self.fragment),
            geometry: self.geometry.as_ref().map(|g| base.join(g)),
        }
    }
}

/// Source text of a program
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderSources {
    /// Vertex stage source
    pub vertex: String,
    /// Fragment stage source
    pub fragment: String,
    /// Geometry stage source
    pub geometry: Option<String>,
}

impl ShaderSources {
    /// Read every stage file; unreadable files become empty sources plus a diagnostic
    pub fn read(paths: &ShaderPaths) -> (Self, Vec<ShaderError>) {
        let mut diagnostics = Vec::new();
        let mut read = |stage: ShaderStage, path: &Path| {
            std::fs::read_to_string(path).unwrap_or_else(|e| {
                let error = ShaderError::Read {
                    stage,
                    path: path.to_path_buf(),
                    message: e.to_string(),
                };
                log::error!("{error}");
                diagnostics.push(error);
                String::new()
            })
        };
        let sources = Self {
            vertex: read(ShaderStage::Vertex, &paths.vertex),
            fragment: read(ShaderStage::Fragment, &paths.fragment),
            geometry: paths.geometry.as_deref().map(|g| read(ShaderStage::Geometry, g)),
        };
        (sources, diagnostics)
    }

    fn stages(&self) -> Vec<(ShaderStage, &str)> {
        let mut stages = vec![
            (ShaderStage::Vertex, self.vertex.as_str()),
            (ShaderStage::Fragment, self.fragment.as_str()),
        ];
        if let Some(geometry) = &self.geometry {
            stages.push((ShaderStage::Geometry, geometry.as_str()));
        }
        stages
    }
}

/// Linked shader program
pub struct ShaderProgram {
    device: Device,
    handle: ProgramHandle,
    label: String,
    state: ShaderState,
    diagnostics: Vec<ShaderError>,
    lookup: UniformLookup,
    locations: RefCell<HashMap<String, Option<UniformLocation>>>,
}

impl ShaderProgram {
    /// Read, compile and link the stages named by `paths`
    pub fn from_files(device: &Device, paths: &ShaderPaths, lookup: UniformLookup) -> Self {
        let (sources, diagnostics) = ShaderSources::read(paths);
        let label = paths.vertex.display().to_string();
        Self::build(device, &sources, diagnostics, label, lookup)
    }

    /// Compile and link in-memory sources
    pub fn from_sources(device: &Device, sources: &ShaderSources, lookup: UniformLookup) -> Self {
        Self::build(device, sources, Vec::new(), "<inline>".to_string(), lookup)
    }

    fn build(
        device: &Device,
        sources: &ShaderSources,
        mut diagnostics: Vec<ShaderError>,
        label: String,
        lookup: UniformLookup,
    ) -> Self {
        let (handle, link_log) = device.with(|d| {
            let stages: Vec<StageHandle> = sources
                .stages()
                .into_iter()
                .map(|(stage, source)| {
                    let handle = d.compile_stage(stage, source);
                    if let Some(log) = d.stage_error_log(handle) {
                        diagnostics.push(ShaderError::Compile { stage, log });
                    }
                    handle
                })
                .collect();

            let program = d.link_program(&stages);
            let link_log = d.program_error_log(program);
            for stage in stages {
                d.delete_stage(stage);
            }
            (program, link_log)
        });

        let state = match link_log {
            Some(log) => {
                diagnostics.push(ShaderError::Link { log });
                ShaderState::Failed
            }
            None => ShaderState::Linked,
        };
        for diagnostic in &diagnostics {
            if !matches!(diagnostic, ShaderError::Read { .. }) {
                log::error!("Shader {label}: {diagnostic}");
            }
        }
        match state {
            ShaderState::Linked => log::debug!("Linked shader program {:?} ({label})", handle),
            ShaderState::Failed => log::warn!("Shader program {:?} ({label}) is unusable", handle),
        }

        Self {
            device: device.clone(),
            handle,
            label,
            state,
            diagnostics,
            lookup,
            locations: RefCell::new(HashMap::new()),
        }
    }

    /// Make this the active program
    pub fn enable(&self) {
        self.device.with(|d| d.use_program(Some(self.handle)));
    }

    /// Clear the active program
    pub fn disable(&self) {
        self.device.with(|d| d.use_program(None));
    }

    /// True when the program linked
    pub fn is_valid(&self) -> bool {
        self.state == ShaderState::Linked
    }

    /// Build outcome
    pub fn state(&self) -> ShaderState {
        self.state
    }

    /// Read, compile and link problems in the order they occurred
    pub fn diagnostics(&self) -> &[ShaderError] {
        &self.diagnostics
    }

    /// Get program handle
    pub fn handle(&self) -> ProgramHandle {
        self.handle
    }

    /// Label used in logs (vertex source path)
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Resolve a uniform name, `None` when the program does not declare it
    pub fn uniform_location(&self, name: &str) -> Option<UniformLocation> {
        match self.lookup {
            UniformLookup::PerCall => self.device.with(|d| d.uniform_location(self.handle, name)),
            UniformLookup::Cached => {
                if let Some(cached) = self.locations.borrow().get(name) {
                    return *cached;
                }
                let location = self.device.with(|d| d.uniform_location(self.handle, name));
                self.locations.borrow_mut().insert(name.to_string(), location);
                location
            }
        }
    }

    /// Write any uniform value; unknown names are ignored
    pub fn set_uniform(&self, name: &str, value: impl Into<UniformValue>) {
        let value = value.into();
        if let Some(location) = self.uniform_location(name) {
            self.device.with(|d| d.set_uniform(location, &value));
        }
    }

    /// Set a `bool` uniform
    pub fn set_bool(&self, name: &str, value: bool) {
        self.set_uniform(name, value);
    }

    /// Set an `int` (or sampler) uniform
    pub fn set_int(&self, name: &str, value: i32) {
        self.set_uniform(name, value);
    }

    /// Set a `float` uniform
    pub fn set_float(&self, name: &str, value: f32) {
        self.set_uniform(name, value);
    }

    /// Set a `vec2` uniform
    pub fn set_vec2(&self, name: &str, value: &Vec2) {
        self.set_uniform(name, *value);
    }

    /// Set a `vec2` uniform from components
    pub fn set_vec2_xy(&self, name: &str, x: f32, y: f32) {
        self.set_uniform(name, Vec2::new(x, y));
    }

    /// Set a `vec3` uniform
    pub fn set_vec3(&self, name: &str, value: &Vec3) {
        self.set_uniform(name, *value);
    }

    /// Set a `vec3` uniform from components
    pub fn set_vec3_xyz(&self, name: &str, x: f32, y: f32, z: f32) {
        self.set_uniform(name, Vec3::new(x, y, z));
    }

    /// Set a `vec4` uniform
    pub fn set_vec4(&self, name: &str, value: &Vec4) {
        self.set_uniform(name, *value);
    }

    /// Set a `vec4` uniform from components
    pub fn set_vec4_xyzw(&self, name: &str, x: f32, y: f32, z: f32, w: f32) {
        self.set_uniform(name, Vec4::new(x, y, z, w));
    }

    /// Set a `mat2` uniform
    pub fn set_mat2(&self, name: &str, value: &Mat2) {
        self.set_uniform(name, *value);
    }

    /// Set a `mat3` uniform
    pub fn set_mat3(&self, name: &str, value: &Mat3) {
        self.set_uniform(name, *value);
    }

    /// Set a `mat4` uniform
    pub fn set_mat4(&self, name: &str, value: &Mat4) {
        self.set_uniform(name, *value);
    }
}

impl Drop for ShaderProgram {
    fn drop(&mut self) {
        log::trace!("Releasing shader program {:?} ({})", self.handle, self.label);
        let handle = self.handle;
        self.device.release("shader program", |d| d.delete_program(handle));
    }
}

impl std::fmt::Debug for ShaderProgram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShaderProgram")
            .field("handle", &self.handle)
            .field("label", &self.label)
            .field("state", &self.state)
            .finish()
    }
}
