//! Time management utilities

use std::time::{Duration, Instant};

/// High-precision timer for frame timing
pub struct Timer {
    last_frame: Instant,
    delta_time: f32,
    total_time: f32,
    frame_count: u64,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer {
    /// Create a new timer
    pub fn new() -> Self {
        Self {
            last_frame: Instant::now(),
            delta_time: 0.0,
            total_time: 0.0,
            frame_count: 0,
        }
    }

    /// Wall-clock seconds since the previous call (or the last
    /// [`reset_delta`](Self::reset_delta)). Totals are left to [`advance`](Self::advance).
    pub fn measure_delta(&mut self) -> f32 {
        let now = Instant::now();
        let delta = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;
        delta
    }

    /// Advance the timer by an explicit delta, e.g. for fixed-step driving
    pub fn advance(&mut self, delta_time: f32) {
        self.delta_time = delta_time.max(0.0);
        self.total_time += self.delta_time;
        self.frame_count += 1;
    }

    /// Restart delta measurement from now without touching the totals.
    ///
    /// Used after a pause so the first resumed frame does not see the
    /// whole paused interval as its delta.
    pub fn reset_delta(&mut self) {
        self.last_frame = Instant::now();
        self.delta_time = 0.0;
    }

    /// Get the time since the last frame in seconds
    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }

    /// Get the total elapsed time since timer creation
    pub fn total_time(&self) -> f32 {
        self.total_time
    }

    /// Get the current frame count
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Get the average FPS since timer creation
    #[allow(clippy::cast_precision_loss)]
    pub fn average_fps(&self) -> f32 {
        if self.total_time > 0.0 {
            self.frame_count as f32 / self.total_time
        } else {
            0.0
        }
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

/// Simple stopwatch for measuring elapsed time
pub struct Stopwatch {
    start_time: Instant,
}

impl Stopwatch {
    /// Create a new stopwatch and start it immediately
    pub fn start_new() -> Self {
        Self {
            start_time: Instant::now(),
        }
    }

    /// Get the elapsed time
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_advance_accumulates_and_reports_fps() {
        let mut timer = Timer::new();
        timer.advance(0.5);
        timer.advance(0.5);

        assert_eq!(timer.frame_count(), 2);
        assert_relative_eq!(timer.total_time(), 1.0);
        assert_relative_eq!(timer.current_fps(), 2.0);
        assert_relative_eq!(timer.average_fps(), 2.0);
    }

    #[test]
    fn test_negative_delta_is_clamped() {
        let mut timer = Timer::new();
        timer.advance(-1.0);
        assert_eq!(timer.delta_time(), 0.0);
        assert_eq!(timer.current_fps(), 0.0);
    }

    #[test]
    fn test_measure_delta_restarts_after_reset() {
        let mut timer = Timer::new();
        std::thread::sleep(Duration::from_millis(20));
        timer.reset_delta();
        let delta = timer.measure_delta();
        assert!(delta < 0.02);
        assert_eq!(timer.frame_count(), 0);
    }

    #[test]
    fn test_stopwatch_measures_from_start() {
        let stopwatch = Stopwatch::start_new();
        std::thread::sleep(Duration::from_millis(2));
        assert!(stopwatch.elapsed() >= Duration::from_millis(2));
    }
}
