//! Frame time source
//!
//! `Time` is advanced once per loop iteration. Simulation code reads the
//! scaled `delta_time`, input code reads the unscaled `pure_delta_time` so
//! the camera keeps moving when the simulation is paused.

use std::time::Instant;

/// Fixed simulation step used by systems that want one (60 Hz)
pub const FIXED_DELTA_TIME: f32 = 1.0 / 60.0;

/// Monotonic frame clock with a user-controlled time scale
#[derive(Debug, Clone)]
pub struct Time {
    last_frame: Instant,
    pure_delta_time: f32,
    time_scale: f32,
    total_time: f32,
    frame_count: u64,
}

impl Default for Time {
    fn default() -> Self {
        Self::new()
    }
}

impl Time {
    /// Create a clock starting now with a time scale of 1
    pub fn new() -> Self {
        Self {
            last_frame: Instant::now(),
            pure_delta_time: 0.0,
            time_scale: 1.0,
            total_time: 0.0,
            frame_count: 0,
        }
    }

    /// Create a clock whose current step is exactly `delta_time` seconds
    ///
    /// Used to drive systems deterministically outside the frame loop.
    pub fn from_delta(delta_time: f32) -> Self {
        Self {
            pure_delta_time: delta_time,
            ..Self::new()
        }
    }

    /// Advance the clock (call once per frame)
    pub fn update(&mut self) {
        let now = Instant::now();
        self.pure_delta_time = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;
        self.total_time += self.pure_delta_time;
        self.frame_count += 1;
    }

    /// Scaled seconds since the previous frame
    pub fn delta_time(&self) -> f32 {
        self.pure_delta_time * self.time_scale
    }

    /// Unscaled seconds since the previous frame
    pub fn pure_delta_time(&self) -> f32 {
        self.pure_delta_time
    }

    /// Constant 60 Hz step
    pub fn fixed_delta_time(&self) -> f32 {
        FIXED_DELTA_TIME
    }

    /// Current time scale (1 = real time, 0 = paused)
    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    /// Set the time scale; negative values are clamped to zero
    pub fn set_time_scale(&mut self, scale: f32) {
        self.time_scale = scale.max(0.0);
    }

    /// Unscaled seconds accumulated since creation
    pub fn total_time(&self) -> f32 {
        self.total_time
    }

    /// Number of `update` calls so far
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Instantaneous frames per second
    pub fn fps(&self) -> f32 {
        if self.pure_delta_time > 0.0 {
            1.0 / self.pure_delta_time
        } else {
            0.0
        }
    }
}
