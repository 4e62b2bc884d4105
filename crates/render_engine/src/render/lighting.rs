//! Lighting uniforms
//!
//! Writes one directional light, an array of point lights and a spot light
//! attached to the camera into the `dirLight`, `pointLights[i]` and
//! `spotLight` structs of the lighting shader.

use crate::foundation::math::{radians, Vec3};
use crate::render::camera::CameraView;
use crate::render::shader::ShaderProgram;

/// Phong color terms shared by every light type
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightColors {
    /// Ambient term
    pub ambient: Vec3,
    /// Diffuse term
    pub diffuse: Vec3,
    /// Specular term
    pub specular: Vec3,
}

impl LightColors {
    /// Grey terms from scalar intensities
    pub fn grey(ambient: f32, diffuse: f32, specular: f32) -> Self {
        Self {
            ambient: Vec3::repeat(ambient),
            diffuse: Vec3::repeat(diffuse),
            specular: Vec3::repeat(specular),
        }
    }

    fn apply(&self, shader: &ShaderProgram, prefix: &str) {
        shader.set_vec3(&format!("{prefix}.ambient"), &self.ambient);
        shader.set_vec3(&format!("{prefix}.diffuse"), &self.diffuse);
        shader.set_vec3(&format!("{prefix}.specular"), &self.specular);
    }
}

/// Distance attenuation `1 / (constant + linear*d + quadratic*d²)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attenuation {
    /// Constant term
    pub constant: f32,
    /// Linear term
    pub linear: f32,
    /// Quadratic term
    pub quadratic: f32,
}

impl Attenuation {
    fn apply(&self, shader: &ShaderProgram, prefix: &str) {
        shader.set_float(&format!("{prefix}.constant"), self.constant);
        shader.set_float(&format!("{prefix}.linear"), self.linear);
        shader.set_float(&format!("{prefix}.quadratic"), self.quadratic);
    }
}

impl Default for Attenuation {
    /// Roughly a 50 unit range
    fn default() -> Self {
        Self {
            constant: 1.0,
            linear: 0.09,
            quadratic: 0.032,
        }
    }
}

/// Light from infinitely far away (sunlight)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    /// Direction the light travels
    pub direction: Vec3,
    /// Color terms
    pub colors: LightColors,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            direction: Vec3::new(-0.2, -1.0, -0.3),
            colors: LightColors::grey(0.05, 0.4, 0.5),
        }
    }
}

/// Omnidirectional light with attenuation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    /// World position
    pub position: Vec3,
    /// Color terms
    pub colors: LightColors,
    /// Falloff
    pub attenuation: Attenuation,
}

impl PointLight {
    /// White bulb at `position`
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            colors: LightColors::grey(0.05, 0.8, 1.0),
            attenuation: Attenuation::default(),
        }
    }
}

/// Cone light that follows the camera (flashlight)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpotLight {
    /// Color terms
    pub colors: LightColors,
    /// Falloff
    pub attenuation: Attenuation,
    /// Inner cone half-angle in degrees
    pub cut_off: f32,
    /// Outer cone half-angle in degrees
    pub outer_cut_off: f32,
}

impl Default for SpotLight {
    fn default() -> Self {
        Self {
            colors: LightColors::grey(0.0, 1.0, 1.0),
            attenuation: Attenuation::default(),
            cut_off: 12.5,
            outer_cut_off: 15.0,
        }
    }
}

/// Lights written to a shader once per frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LightSetup {
    /// Optional sun
    pub directional: Option<DirectionalLight>,
    /// Point lights, written as `pointLights[0..n]`
    pub point_lights: Vec<PointLight>,
    /// Optional camera-attached spot light
    pub spot: Option<SpotLight>,
}

impl LightSetup {
    /// Create an empty setup
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the directional light
    pub fn with_directional(mut self, light: DirectionalLight) -> Self {
        self.directional = Some(light);
        self
    }

    /// Add a point light
    pub fn add_point_light(mut self, light: PointLight) -> Self {
        self.point_lights.push(light);
        self
    }

    /// Set the camera spot light
    pub fn with_spot(mut self, light: SpotLight) -> Self {
        self.spot = Some(light);
        self
    }

    /// Reference scene lighting: sun, one bulb per position, and a flashlight
    pub fn reference(point_positions: &[Vec3]) -> Self {
        point_positions.iter().fold(
            Self::new()
                .with_directional(DirectionalLight::default())
                .with_spot(SpotLight::default()),
            |setup, position| setup.add_point_light(PointLight::at(*position)),
        )
    }

    /// Write every light into `shader`, which must be enabled
    ///
    /// The spot light takes its position and direction from `camera`.
    pub fn apply(&self, shader: &ShaderProgram, camera: &dyn CameraView) {
        if let Some(sun) = &self.directional {
            shader.set_vec3("dirLight.direction", &sun.direction);
            sun.colors.apply(shader, "dirLight");
        }

        for (i, light) in self.point_lights.iter().enumerate() {
            let prefix = format!("pointLights[{i}]");
            shader.set_vec3(&format!("{prefix}.position"), &light.position);
            light.colors.apply(shader, &prefix);
            light.attenuation.apply(shader, &prefix);
        }

        if let Some(spot) = &self.spot {
            shader.set_vec3("spotLight.position", &camera.position());
            shader.set_vec3("spotLight.direction", &camera.front());
            spot.colors.apply(shader, "spotLight");
            spot.attenuation.apply(shader, "spotLight");
            shader.set_float("spotLight.cutOff", radians(spot.cut_off).cos());
            shader.set_float("spotLight.outerCutOff", radians(spot.outer_cut_off).cos());
        }
    }
}
