//! Frame timing
//!
//! The window reports an absolute timestamp once per frame; [`FrameTimer`]
//! turns that into the delta time consumed by camera movement and animated
//! transforms.

/// Per-frame time state advanced from the window clock
#[derive(Debug, Clone, Default)]
pub struct FrameTimer {
    last_time: f32,
    delta_time: f32,
    frame_count: u64,
}

impl FrameTimer {
    /// Create a timer anchored at `start_time` seconds
    pub fn new(start_time: f64) -> Self {
        Self {
            last_time: start_time as f32,
            delta_time: 0.0,
            frame_count: 0,
        }
    }

    /// Advance to `current_time` (should be called once per frame)
    ///
    /// A clock that moves backwards yields a zero delta rather than a negative one.
    pub fn advance(&mut self, current_time: f64) {
        let now = current_time as f32;
        self.delta_time = (now - self.last_time).max(0.0);
        self.last_time = now;
        self.frame_count += 1;
    }

    /// Get the time since the last frame in seconds
    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }

    /// Timestamp of the most recent frame in seconds
    pub fn last_time(&self) -> f32 {
        self.last_time
    }

    /// Get the current frame count
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Get the current FPS (based on last frame time)
    pub fn current_fps(&self) -> f32 {
        if self.delta_time > 0.0 {
            1.0 / self.delta_time
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_advance_computes_delta() {
        let mut timer = FrameTimer::new(1.0);
        timer.advance(1.25);
        assert_relative_eq!(timer.delta_time(), 0.25);
        assert_relative_eq!(timer.last_time(), 1.25);
        timer.advance(1.5);
        assert_relative_eq!(timer.delta_time(), 0.25);
        assert_eq!(timer.frame_count(), 2);
        assert_relative_eq!(timer.current_fps(), 4.0);
    }

    #[test]
    fn test_backwards_clock_clamps_to_zero() {
        let mut timer = FrameTimer::new(5.0);
        timer.advance(4.0);
        assert_eq!(timer.delta_time(), 0.0);
        assert_eq!(timer.current_fps(), 0.0);
    }
}
