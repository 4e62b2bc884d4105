//! Window management using GLFW
//!
//! Creates a window with an OpenGL 4.3 core context, makes the context
//! current and loads the function pointers for [`OpenGlDevice`].

use glfw::{Action, Context, Key};

use super::backend::{WindowBackend, WindowError, WindowEvent, WindowResult};
use crate::config::WindowConfig;
use crate::input::{KeyCode, MouseButton};
use crate::render::device::opengl::OpenGlDevice;
use crate::render::device::Device;

/// Requested context version
pub const GL_VERSION: (u32, u32) = (4, 3);

/// GLFW window owning the OpenGL context
pub struct GlfwWindow {
    glfw: glfw::Glfw,
    window: glfw::PWindow,
    events: glfw::GlfwReceiver<(f64, glfw::WindowEvent)>,
}

impl GlfwWindow {
    /// Open a window and return it with a device bound to its context
    pub fn create(config: &WindowConfig) -> WindowResult<(Self, Device)> {
        let mut glfw = glfw::init(glfw::fail_on_errors)
            .map_err(|e| WindowError::InitializationFailed(e.to_string()))?;

        let (major, minor) = GL_VERSION;
        glfw.window_hint(glfw::WindowHint::ContextVersion(major, minor));
        glfw.window_hint(glfw::WindowHint::OpenGlProfile(glfw::OpenGlProfileHint::Core));
        glfw.window_hint(glfw::WindowHint::OpenGlForwardCompat(true));
        glfw.window_hint(glfw::WindowHint::Resizable(true));

        let (mut window, events) = glfw
            .create_window(config.width, config.height, &config.title, glfw::WindowMode::Windowed)
            .ok_or(WindowError::CreationFailed {
                width: config.width,
                height: config.height,
                major,
                minor,
            })?;

        window.make_current();
        window.set_framebuffer_size_polling(true);
        window.set_cursor_pos_polling(true);
        window.set_scroll_polling(true);
        window.set_close_polling(true);
        if config.capture_cursor {
            window.set_cursor_mode(glfw::CursorMode::Disabled);
        }
        glfw.set_swap_interval(if config.vsync {
            glfw::SwapInterval::Sync(1)
        } else {
            glfw::SwapInterval::None
        });

        let device = Device::new(OpenGlDevice::load_with(|symbol| {
            window.get_proc_address(symbol) as *const _
        }));
        log::info!(
            "Created window '{}' ({}x{}) with OpenGL {}.{} core context",
            config.title,
            config.width,
            config.height,
            major,
            minor
        );

        Ok((Self { glfw, window, events }, device))
    }
}

fn glfw_key(key: KeyCode) -> Key {
    match key {
        KeyCode::W => Key::W,
        KeyCode::A => Key::A,
        KeyCode::S => Key::S,
        KeyCode::D => Key::D,
        KeyCode::Escape => Key::Escape,
    }
}

fn glfw_mouse_button(button: MouseButton) -> glfw::MouseButton {
    match button {
        MouseButton::Left => glfw::MouseButton::Button1,
        MouseButton::Right => glfw::MouseButton::Button2,
        MouseButton::Middle => glfw::MouseButton::Button3,
    }
}

impl WindowBackend for GlfwWindow {
    fn time(&self) -> f64 {
        self.glfw.get_time()
    }

    fn is_key_pressed(&self, key: KeyCode) -> bool {
        self.window.get_key(glfw_key(key)) == Action::Press
    }

    fn is_mouse_button_pressed(&self, button: MouseButton) -> bool {
        self.window.get_mouse_button(glfw_mouse_button(button)) == Action::Press
    }

    fn should_close(&self) -> bool {
        self.window.should_close()
    }

    fn set_should_close(&mut self, should_close: bool) {
        self.window.set_should_close(should_close);
    }

    fn swap_buffers(&mut self) {
        self.window.swap_buffers();
    }

    fn poll_events(&mut self) -> Vec<WindowEvent> {
        self.glfw.poll_events();
        glfw::flush_messages(&self.events)
            .filter_map(|(_, event)| match event {
                glfw::WindowEvent::CursorPos(x, y) => Some(WindowEvent::CursorMoved { x, y }),
                glfw::WindowEvent::Scroll(x, y) => Some(WindowEvent::Scrolled { x, y }),
                glfw::WindowEvent::FramebufferSize(width, height) => Some(WindowEvent::FramebufferResized {
                    width: width.max(0) as u32,
                    height: height.max(0) as u32,
                }),
                glfw::WindowEvent::Close => Some(WindowEvent::CloseRequested),
                _ => None,
            })
            .collect()
    }

    fn framebuffer_size(&self) -> (u32, u32) {
        let (width, height) = self.window.get_framebuffer_size();
        (width.max(0) as u32, height.max(0) as u32)
    }
}
