//! Input state helpers
//!
//! The window reports raw key state and cursor positions; these helpers turn
//! them into camera motion.

use serde::{Deserialize, Serialize};

use crate::render::camera::CameraMovement;

/// Keys the frame driver queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum KeyCode {
    /// W key
    W,
    /// A key
    A,
    /// S key
    S,
    /// D key
    D,
    /// Escape key
    Escape,
}

/// Mouse buttons the window can report
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    /// Primary button
    Left,
    /// Secondary button
    Right,
    /// Wheel button
    Middle,
}

/// Movement key bindings in the order they are polled
pub const MOVEMENT_KEYS: [(KeyCode, CameraMovement); 4] = [
    (KeyCode::W, CameraMovement::Forward),
    (KeyCode::S, CameraMovement::Backward),
    (KeyCode::A, CameraMovement::Left),
    (KeyCode::D, CameraMovement::Right),
];

/// Camera movements for the keys currently held
pub fn held_movements(mut is_pressed: impl FnMut(KeyCode) -> bool) -> Vec<CameraMovement> {
    MOVEMENT_KEYS
        .iter()
        .filter(|(key, _)| is_pressed(*key))
        .map(|(_, movement)| *movement)
        .collect()
}

/// Turns absolute cursor positions into look offsets
///
/// The first position only primes the tracker so the camera does not jump
/// when the cursor enters the window.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MouseTracker {
    last: Option<(f64, f64)>,
}

impl MouseTracker {
    /// Create an unprimed tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a cursor position and return `(dx, dy)` since the last one
    ///
    /// `dy` is reversed because window y grows downwards while pitch grows
    /// upwards. Returns `None` for the first position.
    pub fn offset(&mut self, x: f64, y: f64) -> Option<(f32, f32)> {
        let previous = self.last.replace((x, y))?;
        Some(((x - previous.0) as f32, (previous.1 - y) as f32))
    }

    /// Forget the last position
    pub fn reset(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_event_only_primes() {
        let mut tracker = MouseTracker::new();
        assert_eq!(tracker.offset(400.0, 300.0), None);
        assert_eq!(tracker.offset(410.0, 290.0), Some((10.0, 10.0)));
        assert_eq!(tracker.offset(405.0, 295.0), Some((-5.0, -5.0)));
        tracker.reset();
        assert_eq!(tracker.offset(0.0, 0.0), None);
    }

    #[test]
    fn test_held_movements_follow_binding_order() {
        let held = held_movements(|key| matches!(key, KeyCode::D | KeyCode::W | KeyCode::Escape));
        assert_eq!(held, vec![CameraMovement::Forward, CameraMovement::Right]);
        assert!(held_movements(|_| false).is_empty());
    }
}
