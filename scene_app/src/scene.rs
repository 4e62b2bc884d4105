//! The lit container scene: ten spinning crates, four lamps, and an optional model

use std::rc::Rc;

use render_engine::config::AssetConfig;
use render_engine::foundation::math::radians;
use render_engine::prelude::*;

/// World positions of the ten containers
pub const CUBE_POSITIONS: [[f32; 3]; 10] = [
    [0.0, 0.0, 0.0],
    [2.0, 5.0, -15.0],
    [-1.5, -2.2, -2.5],
    [-3.8, -2.0, -12.3],
    [2.4, -0.4, -3.5],
    [-1.7, 3.0, -7.5],
    [1.3, -2.0, -2.5],
    [1.5, 2.0, -2.5],
    [1.5, 0.2, -1.5],
    [-1.3, 1.0, -1.5],
];

/// World positions of the four point lights
pub const POINT_LIGHT_POSITIONS: [[f32; 3]; 4] = [
    [0.7, 0.2, 2.0],
    [2.3, -3.3, -4.0],
    [-4.0, 2.0, -12.0],
    [0.0, 0.0, -3.0],
];

const LAMP_SCALE: f32 = 0.2;
const SHININESS: f32 = 32.0;
const MODEL_OFFSET: [f32; 3] = [0.0, -1.75, -5.0];
const MODEL_SCALE: f32 = 0.2;

/// Spin of container `index` at `time` seconds
pub fn container_transform(index: usize, position: Vec3, time: f32) -> Mat4 {
    Mat4::identity()
        .translated(&position)
        .rotated(time, &Vec3::new(0.5, 1.0, 0.0))
        .rotated(radians(20.0 * index as f32), &Vec3::new(1.0, 0.3, 0.5))
}

fn point_lights() -> Vec<Vec3> {
    POINT_LIGHT_POSITIONS.iter().map(|p| Vec3::new(p[0], p[1], p[2])).collect()
}

/// Build every pass of the scene and hand them to `driver`
pub fn build(driver: &mut FrameDriver, assets: &AssetConfig, lookup: UniformLookup) {
    let device = driver.device().clone();

    let diffuse = Rc::new(Texture::from_file(&device, assets.resolve(&assets.diffuse_texture)));
    let specular = Rc::new(Texture::from_file(&device, assets.resolve(&assets.specular_texture)));
    let container: Rc<Renderable> = Rc::new(
        Geometry::cube(&device)
            .with_texture(0, diffuse)
            .with_texture(1, specular)
            .into(),
    );

    let lighting = ShaderProgram::from_files(&device, &assets.resolve_shader(&assets.lighting_shader), lookup);
    let containers = CUBE_POSITIONS.iter().enumerate().fold(
        RenderPass::new("containers", lighting)
            .with_constant("material.diffuse", 0)
            .with_constant("material.specular", 1)
            .with_constant("material.shininess", SHININESS)
            .with_camera_uniforms(true)
            .with_lights(LightSetup::reference(&point_lights())),
        |pass, (i, p)| {
            let position = Vec3::new(p[0], p[1], p[2]);
            pass.with_item(RenderItem::new(
                container.clone(),
                ModelTransform::animated(move |time| container_transform(i, position, time)),
            ))
        },
    );
    driver.add_pass(containers);

    let lamp_shader = ShaderProgram::from_files(&device, &assets.resolve_shader(&assets.lamp_shader), lookup);
    let lamp: Rc<Renderable> = Rc::new(Geometry::lamp_cube(&device).into());
    let lamps = point_lights().into_iter().fold(
        RenderPass::new("lamps", lamp_shader).with_camera_uniforms(true),
        |pass, position| {
            pass.with_item(RenderItem::new(
                lamp.clone(),
                ModelTransform::Static(Mat4::identity().translated(&position).scaled(LAMP_SCALE)),
            ))
        },
    );
    driver.add_pass(lamps);

    if let Some(model_path) = &assets.model {
        let model = Model::load(&device, assets.resolve(model_path));
        log::info!("Model '{}' has {} mesh(es)", model.path().display(), model.meshes().len());
        let model_shader = ShaderProgram::from_files(&device, &assets.resolve_shader(&assets.model_shader), lookup);
        let offset = Vec3::new(MODEL_OFFSET[0], MODEL_OFFSET[1], MODEL_OFFSET[2]);
        driver.add_pass(
            RenderPass::new("model", model_shader)
                .with_camera_uniforms(true)
                .with_item(RenderItem::new(
                    Rc::new(model.into()),
                    ModelTransform::Static(Mat4::identity().translated(&offset).scaled(MODEL_SCALE)),
                )),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use render_engine::config::{ApplicationConfig, BackendKind, RendererConfig};

    fn headless_driver(frames: u32) -> FrameDriver {
        let mut config = ApplicationConfig::new("scene test")
            .with_renderer(RendererConfig::default().with_backend(BackendKind::Headless));
        config.headless.frames = frames;
        FrameDriver::from_config(&config).expect("headless driver")
    }

    #[test]
    fn test_container_transform_places_then_spins() {
        let at_rest = container_transform(0, Vec3::zeros(), 0.0);
        assert_eq!(at_rest, Mat4::identity());

        let shifted = container_transform(3, Vec3::new(1.0, 2.0, 3.0), 0.0);
        assert_eq!(shifted[(0, 3)], 1.0);
        assert_eq!(shifted[(1, 3)], 2.0);
        assert_eq!(shifted[(2, 3)], 3.0);
    }

    #[test]
    fn test_scene_builds_container_and_lamp_passes() {
        let mut driver = headless_driver(2);
        build(&mut driver, &AssetConfig::default().with_root("missing-root"), UniformLookup::PerCall);

        let names: Vec<&str> = driver.passes().iter().map(RenderPass::name).collect();
        assert_eq!(names, ["containers", "lamps"]);
        assert_eq!(driver.passes()[0].items().len(), CUBE_POSITIONS.len());
        assert_eq!(driver.passes()[1].items().len(), POINT_LIGHT_POSITIONS.len());
    }

    #[test]
    fn test_missing_assets_do_not_stop_the_loop() {
        let mut driver = headless_driver(3);
        let assets = AssetConfig::default().with_root("missing-root").with_model("models/none.obj");
        build(&mut driver, &assets, UniformLookup::PerCall);

        assert_eq!(driver.passes().len(), 3);
        assert_eq!(driver.run(), 3);
    }
}
