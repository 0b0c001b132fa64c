//! Clock and frame-cadence utilities.
//!
//! Preview animations are driven by a monotonic clock anchored at an epoch;
//! export and playback convert between seconds, frames, and frame intervals
//! with the helpers here so every crate rounds the same way.

use std::time::{Duration, Instant};

/// A monotonic clock reporting seconds relative to a fixed epoch.
#[derive(Debug, Clone)]
pub struct EditorClock {
    epoch: Instant,

    /// Wall-clock time at epoch (RFC 3339 string).
    epoch_wall: String,
}

impl EditorClock {
    /// Create a clock anchored to now.
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
            epoch_wall: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Seconds elapsed since the epoch.
    pub fn now_secs(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    /// Wall-clock time at the epoch.
    pub fn epoch_wall(&self) -> &str {
        &self.epoch_wall
    }
}

impl Default for EditorClock {
    fn default() -> Self {
        Self::start()
    }
}

/// Number of frames needed to cover `duration_secs` at `fps`.
///
/// A small epsilon keeps exact multiples (e.g. 4.0s at 30fps) from rounding
/// up to an extra frame through floating point noise.
pub fn frames_for_duration(duration_secs: f64, fps: u32) -> u64 {
    if duration_secs <= 0.0 || fps == 0 {
        return 0;
    }
    (duration_secs * fps as f64 - 1e-9).ceil().max(0.0) as u64
}

/// Wall-clock length of one frame.
pub fn frame_interval(fps: u32) -> Duration {
    Duration::from_nanos(1_000_000_000 / fps.max(1) as u64)
}

/// Time offset of frame `index` at `fps`.
pub fn frame_time_secs(index: u64, fps: u32) -> f64 {
    index as f64 / fps.max(1) as f64
}

/// Frame rate controller for tick sampling.
#[derive(Debug)]
pub struct RateController {
    target_interval_secs: f64,
    last_tick_secs: Option<f64>,
}

impl RateController {
    /// Create a controller targeting the given Hz rate.
    pub fn new(target_hz: u32) -> Self {
        Self {
            target_interval_secs: 1.0 / target_hz.max(1) as f64,
            last_tick_secs: None,
        }
    }

    /// Check if enough time has passed for the next tick.
    /// Returns true and updates internal state if ready.
    /// The first call always returns true.
    pub fn should_tick(&mut self, now_secs: f64) -> bool {
        match self.last_tick_secs {
            None => {
                self.last_tick_secs = Some(now_secs);
                true
            }
            Some(last) if now_secs >= last + self.target_interval_secs - 1e-9 => {
                self.last_tick_secs = Some(now_secs);
                true
            }
            _ => false,
        }
    }

    /// Target interval in seconds.
    pub fn interval_secs(&self) -> f64 {
        self.target_interval_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_elapsed() {
        let clock = EditorClock::start();
        assert!(clock.now_secs() < 1.0);
        assert!(!clock.epoch_wall().is_empty());
    }

    #[test]
    fn test_frames_for_duration_exact_and_fractional() {
        assert_eq!(frames_for_duration(4.0, 30), 120);
        assert_eq!(frames_for_duration(0.1, 30), 3);
        assert_eq!(frames_for_duration(1.01, 30), 31);
        assert_eq!(frames_for_duration(0.0, 30), 0);
        assert_eq!(frames_for_duration(2.0, 0), 0);
    }

    #[test]
    fn test_frame_interval_and_time() {
        assert_eq!(frame_interval(30), Duration::from_nanos(33_333_333));
        assert!((frame_time_secs(45, 30) - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_rate_controller() {
        let mut ctrl = RateController::new(60);
        assert!(ctrl.should_tick(0.0));
        assert!(!ctrl.should_tick(0.001));
        assert!(ctrl.should_tick(0.017));
    }
}
