//! Fixed-timestep accumulator.
//!
//! Decouples the simulation rate (the authority's tick rate) from the outer
//! frame rate. Each frame adds the measured wall time to an accumulator and
//! reports how many fixed steps are due.

use std::time::{Duration, Instant};

use tracing::warn;

/// Fixed-timestep loop state.
pub struct GameLoop {
    previous_time: Instant,
    accumulator: f64,
    fixed_dt: f64,
    max_frame_time: f64,
    frame_count: u64,
    update_count: u64,
}

impl GameLoop {
    /// Creates a loop stepping every `fixed_dt` seconds. Frames longer than
    /// `max_frame` are clamped rather than caught up.
    pub fn new(fixed_dt: f64, max_frame: Duration) -> Self {
        Self {
            previous_time: Instant::now(),
            accumulator: 0.0,
            fixed_dt,
            max_frame_time: max_frame.as_secs_f64(),
            frame_count: 0,
            update_count: 0,
        }
    }

    /// Measures the time since the previous frame and returns how many
    /// fixed steps to run now.
    pub fn frame(&mut self) -> u32 {
        let current_time = Instant::now();
        let frame_time = current_time
            .duration_since(self.previous_time)
            .as_secs_f64();
        self.previous_time = current_time;
        self.accumulate(frame_time)
    }

    /// Adds an explicit frame time (in seconds) and returns the due steps.
    pub fn accumulate(&mut self, mut frame_time: f64) -> u32 {
        // Clamp to avoid a catch-up spiral.
        if frame_time > self.max_frame_time {
            warn!(
                "Frame time {:.1}ms exceeds maximum, clamping to {:.1}ms",
                frame_time * 1000.0,
                self.max_frame_time * 1000.0
            );
            frame_time = self.max_frame_time;
        }

        self.accumulator += frame_time;

        let mut steps = 0;
        while self.accumulator >= self.fixed_dt {
            self.accumulator -= self.fixed_dt;
            steps += 1;
        }
        self.update_count += u64::from(steps);
        self.frame_count += 1;
        steps
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn update_count(&self) -> u64 {
        self.update_count
    }
}
