//! Window capability
//!
//! The frame driver owns one [`WindowBackend`] and talks to it through
//! polled values only: time, per-key and per-button state, the close flag, framebuffer size
//! and the events drained after each present. Nothing is delivered through
//! callbacks.
//!
//! - **`backend`**: the trait, events and errors
//! - **`glfw_window`**: OpenGL 4.3 core window
//! - **`scripted`**: deterministic window for headless runs and tests

pub mod backend;
pub mod glfw_window;
pub mod scripted;

pub use backend::{WindowBackend, WindowError, WindowEvent, WindowResult};
pub use glfw_window::GlfwWindow;
pub use scripted::ScriptedWindow;
