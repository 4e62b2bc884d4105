//! Backend-agnostic window trait

use thiserror::Error;

use crate::input::{KeyCode, MouseButton};

/// Window management errors
///
/// The only failures that abort the application: without a window there is
/// no context to render into.
#[derive(Error, Debug)]
pub enum WindowError {
    /// GLFW could not be initialised
    #[error("GLFW initialization failed: {0}")]
    InitializationFailed(String),

    /// The window or its context could not be created
    #[error("Window creation failed ({width}x{height}, OpenGL {major}.{minor} core)")]
    CreationFailed {
        /// Requested width
        width: u32,
        /// Requested height
        height: u32,
        /// Requested context major version
        major: u32,
        /// Requested context minor version
        minor: u32,
    },
}

/// Result alias for window operations
pub type WindowResult<T> = Result<T, WindowError>;

/// Events drained from the window after a present
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WindowEvent {
    /// Cursor moved to an absolute position in screen coordinates
    CursorMoved {
        /// Horizontal position
        x: f64,
        /// Vertical position, growing downwards
        y: f64,
    },
    /// Scroll wheel or trackpad offset
    Scrolled {
        /// Horizontal offset
        x: f64,
        /// Vertical offset
        y: f64,
    },
    /// Drawable area changed size in pixels
    FramebufferResized {
        /// New width
        width: u32,
        /// New height
        height: u32,
    },
    /// The user asked to close the window
    CloseRequested,
}

/// Window operations the frame driver relies on
pub trait WindowBackend {
    /// Seconds since the window system started
    fn time(&self) -> f64;

    /// Whether `key` is currently held
    fn is_key_pressed(&self, key: KeyCode) -> bool;

    /// Whether `button` is currently held
    fn is_mouse_button_pressed(&self, button: MouseButton) -> bool;

    /// Check if the window should close
    fn should_close(&self) -> bool;

    /// Set whether the window should close
    fn set_should_close(&mut self, should_close: bool);

    /// Present the back buffer
    fn swap_buffers(&mut self);

    /// Process pending window system events and return the ones the driver handles
    fn poll_events(&mut self) -> Vec<WindowEvent>;

    /// Drawable size in pixels
    fn framebuffer_size(&self) -> (u32, u32);
}
