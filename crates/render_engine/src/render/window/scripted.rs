//! Deterministic window for headless runs and tests
//!
//! Time advances by a fixed step per presented frame, keys and mouse buttons
//! are held for scripted frames, and events are delivered by the poll that follows a
//! given frame's present.

use std::collections::{BTreeMap, BTreeSet};

use super::backend::{WindowBackend, WindowEvent};
use crate::input::{KeyCode, MouseButton};

/// Scripted window with no display
#[derive(Debug, Clone)]
pub struct ScriptedWindow {
    size: (u32, u32),
    start_time: f64,
    time_step: f64,
    frame: u32,
    close_after: Option<u32>,
    should_close: bool,
    keys: BTreeMap<u32, BTreeSet<KeyCode>>,
    buttons: BTreeMap<u32, BTreeSet<MouseButton>>,
    events: BTreeMap<u32, Vec<WindowEvent>>,
}

impl ScriptedWindow {
    /// Window with the given framebuffer size, stepping 1/60 s per frame
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: (width, height),
            start_time: 0.0,
            time_step: 1.0 / 60.0,
            frame: 0,
            close_after: None,
            should_close: false,
            keys: BTreeMap::new(),
            buttons: BTreeMap::new(),
            events: BTreeMap::new(),
        }
    }

    /// Set the seconds added per presented frame
    pub fn with_time_step(mut self, step: f64) -> Self {
        self.time_step = step;
        self
    }

    /// Set the time reported before the first present
    pub fn with_start_time(mut self, start: f64) -> Self {
        self.start_time = start;
        self
    }

    /// Request close once `frames` frames have been presented
    pub fn close_after(mut self, frames: u32) -> Self {
        self.close_after = Some(frames);
        self.should_close = frames == 0;
        self
    }

    /// Hold `key` while frame `frame` (0-based) is rendered
    pub fn press(mut self, frame: u32, key: KeyCode) -> Self {
        self.keys.entry(frame).or_default().insert(key);
        self
    }

    /// Hold `button` while frame `frame` (0-based) is rendered
    pub fn press_button(mut self, frame: u32, button: MouseButton) -> Self {
        self.buttons.entry(frame).or_default().insert(button);
        self
    }

    /// Deliver `event` by the poll after frame `frame` is presented
    pub fn event_after(mut self, frame: u32, event: WindowEvent) -> Self {
        self.events.entry(frame).or_default().push(event);
        self
    }

    /// Frames presented so far
    pub fn frames_presented(&self) -> u32 {
        self.frame
    }
}

impl WindowBackend for ScriptedWindow {
    fn time(&self) -> f64 {
        self.start_time + f64::from(self.frame) * self.time_step
    }

    fn is_key_pressed(&self, key: KeyCode) -> bool {
        self.keys.get(&self.frame).is_some_and(|keys| keys.contains(&key))
    }

    fn is_mouse_button_pressed(&self, button: MouseButton) -> bool {
        self.buttons.get(&self.frame).is_some_and(|buttons| buttons.contains(&button))
    }

    fn should_close(&self) -> bool {
        self.should_close
    }

    fn set_should_close(&mut self, should_close: bool) {
        self.should_close = should_close;
    }

    fn swap_buffers(&mut self) {
        self.frame += 1;
    }

    fn poll_events(&mut self) -> Vec<WindowEvent> {
        let Some(presented) = self.frame.checked_sub(1) else {
            return Vec::new();
        };
        let events = self.events.remove(&presented).unwrap_or_default();
        for event in &events {
            match event {
                WindowEvent::CloseRequested => self.should_close = true,
                WindowEvent::FramebufferResized { width, height } => self.size = (*width, *height),
                _ => {}
            }
        }
        if self.close_after.is_some_and(|n| self.frame >= n) {
            self.should_close = true;
        }
        events
    }

    fn framebuffer_size(&self) -> (u32, u32) {
        self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_time_advances_per_present() {
        let mut window = ScriptedWindow::new(800, 600).with_time_step(0.5).with_start_time(1.0);
        assert_relative_eq!(window.time(), 1.0);
        window.swap_buffers();
        window.swap_buffers();
        assert_relative_eq!(window.time(), 2.0);
        assert_eq!(window.frames_presented(), 2);
    }

    #[test]
    fn test_keys_are_held_for_their_frame() {
        let mut window = ScriptedWindow::new(800, 600).press(1, KeyCode::W);
        assert!(!window.is_key_pressed(KeyCode::W));
        window.swap_buffers();
        assert!(window.is_key_pressed(KeyCode::W));
        assert!(!window.is_key_pressed(KeyCode::S));
        window.swap_buffers();
        assert!(!window.is_key_pressed(KeyCode::W));
    }

    #[test]
    fn test_mouse_buttons_are_held_for_their_frame() {
        let mut window = ScriptedWindow::new(800, 600)
            .press_button(0, MouseButton::Left)
            .press_button(1, MouseButton::Right)
            .press_button(1, MouseButton::Middle);
        assert!(window.is_mouse_button_pressed(MouseButton::Left));
        assert!(!window.is_mouse_button_pressed(MouseButton::Right));
        window.swap_buffers();
        assert!(!window.is_mouse_button_pressed(MouseButton::Left));
        assert!(window.is_mouse_button_pressed(MouseButton::Right));
        assert!(window.is_mouse_button_pressed(MouseButton::Middle));
        window.swap_buffers();
        assert!(!window.is_mouse_button_pressed(MouseButton::Middle));
        assert!(!window.is_key_pressed(KeyCode::W));
    }

    #[test]
    fn test_close_after_frames_and_events() {
        let mut window = ScriptedWindow::new(800, 600)
            .close_after(3)
            .event_after(0, WindowEvent::FramebufferResized { width: 1024, height: 768 });
        assert!(!window.should_close());
        window.swap_buffers();
        assert_eq!(
            window.poll_events(),
            vec![WindowEvent::FramebufferResized { width: 1024, height: 768 }]
        );
        assert_eq!(window.framebuffer_size(), (1024, 768));
        window.swap_buffers();
        assert!(window.poll_events().is_empty());
        assert!(!window.should_close());
        window.swap_buffers();
        window.poll_events();
        assert!(window.should_close());
    }

    #[test]
    fn test_close_request_event() {
        let mut window = ScriptedWindow::new(1, 1).event_after(0, WindowEvent::CloseRequested);
        window.swap_buffers();
        window.poll_events();
        assert!(window.should_close());
    }
}
