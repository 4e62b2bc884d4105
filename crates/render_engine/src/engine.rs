//! Frame driver
//!
//! Owns the window, the device, the camera and the render passes, and runs
//! the per-frame sequence: advance time, apply held keys, clear, render every
//! pass, poll one device error, present, then drain window events.

use thiserror::Error;

use crate::config::{ApplicationConfig, BackendKind, ConfigError, RendererConfig};
use crate::foundation::math::{radians, Mat4, Mat4Ext};
use crate::foundation::time::FrameTimer;
use crate::input::{held_movements, KeyCode, MouseTracker};
use crate::render::camera::{CameraView, FlyCamera};
use crate::render::device::{ClearFlags, Device};
use crate::render::pass::{FrameContext, RenderPass};
use crate::render::window::{GlfwWindow, ScriptedWindow, WindowBackend, WindowError, WindowEvent};

/// Startup errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// The window could not be created
    #[error("Window error: {0}")]
    Window(#[from] WindowError),

    /// The configuration is unusable
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Single-threaded render loop
pub struct FrameDriver {
    // Passes hold device resources and must drop before the window and its context.
    passes: Vec<RenderPass>,
    device: Device,
    window: Box<dyn WindowBackend>,
    camera: FlyCamera,
    mouse: MouseTracker,
    timer: FrameTimer,
    renderer: RendererConfig,
    framebuffer: (u32, u32),
    device_errors: u64,
}

impl FrameDriver {
    /// Drive `window` and `device`, applying the renderer's fixed state
    pub fn new(window: Box<dyn WindowBackend>, device: Device, camera: FlyCamera, renderer: RendererConfig) -> Self {
        let framebuffer = window.framebuffer_size();
        let timer = FrameTimer::new(window.time());
        device.with(|d| {
            d.set_clear_color(renderer.clear_color);
            d.set_depth_test(renderer.depth_test);
            d.set_viewport(0, 0, framebuffer.0, framebuffer.1);
        });
        log::info!(
            "Frame driver ready on {} ({}x{})",
            device.name(),
            framebuffer.0,
            framebuffer.1
        );
        Self {
            passes: Vec::new(),
            device,
            window,
            camera,
            mouse: MouseTracker::new(),
            timer,
            renderer,
            framebuffer,
            device_errors: 0,
        }
    }

    /// Open the window and device selected by `config`
    ///
    /// The headless backend uses a [`ScriptedWindow`] that closes after the
    /// configured number of frames.
    pub fn from_config(config: &ApplicationConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let camera = config.camera.build();
        let (window, device): (Box<dyn WindowBackend>, Device) = match config.renderer.backend {
            BackendKind::OpenGl => {
                let (window, device) = GlfwWindow::create(&config.window)?;
                (Box::new(window), device)
            }
            BackendKind::Headless => {
                let window = ScriptedWindow::new(config.window.width, config.window.height)
                    .with_time_step(config.headless.time_step)
                    .close_after(config.headless.frames);
                (Box::new(window), Device::headless())
            }
        };
        Ok(Self::new(window, device, camera, config.renderer.clone()))
    }

    /// Append a pass; passes render in insertion order
    pub fn add_pass(&mut self, pass: RenderPass) {
        log::debug!("Added render pass '{}'", pass.name());
        self.passes.push(pass);
    }

    /// Render frames until the window asks to close; returns the frames rendered
    pub fn run(&mut self) -> u64 {
        log::info!("Starting render loop...");
        let mut frames = 0;
        while !self.window.should_close() {
            self.run_frame();
            frames += 1;
        }
        log::info!(
            "Render loop finished after {} frame(s), {} device error(s)",
            frames,
            self.device_errors
        );
        frames
    }

    /// Run exactly one iteration of the loop
    pub fn run_frame(&mut self) {
        self.timer.advance(self.window.time());
        self.process_input(self.timer.delta_time());

        self.device.with(|d| d.clear(ClearFlags::COLOR | ClearFlags::DEPTH));

        let frame = FrameContext {
            camera: &self.camera,
            view: self.camera.view_matrix(),
            projection: self.projection(),
            time: self.timer.last_time(),
        };
        for pass in &self.passes {
            pass.render(&frame);
        }

        if let Some(error) = self.device.poll_error() {
            self.device_errors += 1;
            log::warn!("Device error in frame {}: {}", self.timer.frame_count(), error);
        }

        self.window.swap_buffers();
        for event in self.window.poll_events() {
            self.handle_event(event);
        }
    }

    fn process_input(&mut self, delta_time: f32) {
        if self.window.is_key_pressed(KeyCode::Escape) {
            self.window.set_should_close(true);
        }
        let window = &self.window;
        for movement in held_movements(|key| window.is_key_pressed(key)) {
            self.camera.process_keyboard(movement, delta_time);
        }
    }

    fn handle_event(&mut self, event: WindowEvent) {
        match event {
            WindowEvent::CursorMoved { x, y } => {
                if let Some((dx, dy)) = self.mouse.offset(x, y) {
                    self.camera.process_mouse_movement(dx, dy, true);
                }
            }
            WindowEvent::Scrolled { y, .. } => self.camera.process_mouse_scroll(y as f32),
            WindowEvent::FramebufferResized { width, height } => {
                log::debug!("Framebuffer resized to {}x{}", width, height);
                self.framebuffer = (width, height);
                self.device.with(|d| d.set_viewport(0, 0, width, height));
            }
            WindowEvent::CloseRequested => self.window.set_should_close(true),
        }
    }

    /// Perspective projection for the current zoom and framebuffer
    pub fn projection(&self) -> Mat4 {
        let (width, height) = self.framebuffer;
        let aspect = width.max(1) as f32 / height.max(1) as f32;
        Mat4::perspective_gl(radians(self.camera.zoom()), aspect, self.renderer.near, self.renderer.far)
    }

    /// Device shared by every resource of this driver
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Camera
    pub fn camera(&self) -> &FlyCamera {
        &self.camera
    }

    /// Frame timer
    pub fn timer(&self) -> &FrameTimer {
        &self.timer
    }

    /// Passes in render order
    pub fn passes(&self) -> &[RenderPass] {
        &self.passes
    }

    /// Current framebuffer size
    pub fn framebuffer_size(&self) -> (u32, u32) {
        self.framebuffer
    }

    /// Device errors seen so far
    pub fn device_errors(&self) -> u64 {
        self.device_errors
    }

    /// Ask the loop to stop after the current frame
    pub fn request_close(&mut self) {
        self.window.set_should_close(true);
    }
}

impl std::fmt::Debug for FrameDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameDriver")
            .field("device", &self.device)
            .field("passes", &self.passes.len())
            .field("frames", &self.timer.frame_count())
            .finish()
    }
}
