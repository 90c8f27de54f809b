//! Frame timing utilities.
//!
//! Preview redraws, transitions, and export all advance in whole frames.
//! [`FrameClock`] converts between frame indices and seconds for a fixed
//! frame rate so every subsystem agrees on where frame boundaries fall.

use std::time::Duration;

/// Fixed-rate frame clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameClock {
    fps: u32,
}

impl FrameClock {
    /// Create a clock ticking at `fps` frames per second (minimum 1).
    pub fn new(fps: u32) -> Self {
        Self { fps: fps.max(1) }
    }

    /// Frames per second.
    pub fn fps(&self) -> u32 {
        self.fps
    }

    /// Wall-clock interval between two frames.
    pub fn interval(&self) -> Duration {
        Duration::from_nanos(1_000_000_000 / self.fps as u64)
    }

    /// Presentation time of a frame index, in seconds.
    pub fn frame_to_secs(&self, frame: u64) -> f64 {
        frame as f64 / self.fps as f64
    }

    /// Index of the frame that is showing at `secs`.
    pub fn secs_to_frame(&self, secs: f64) -> u64 {
        (secs.max(0.0) * self.fps as f64).floor() as u64
    }

    /// Number of frames needed to cover `duration_secs`.
    /// Any positive duration yields at least one frame.
    pub fn frame_count(&self, duration_secs: f64) -> u64 {
        if duration_secs <= 0.0 {
            return 0;
        }
        ((duration_secs * self.fps as f64).round() as u64).max(1)
    }
}

/// Format seconds as `m:ss` for time displays.
pub fn format_timecode(seconds: f64) -> String {
    let seconds = if seconds.is_finite() {
        seconds.max(0.0)
    } else {
        0.0
    };
    let mins = (seconds / 60.0).floor() as u64;
    let secs = (seconds % 60.0).floor() as u64;
    format!("{mins}:{secs:02}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_count_at_30fps() {
        let clock = FrameClock::new(30);
        assert_eq!(clock.frame_count(3.0), 90);
        assert_eq!(clock.frame_count(0.0), 0);
        assert_eq!(clock.frame_count(0.001), 1);
    }

    #[test]
    fn test_frame_seconds_conversion() {
        let clock = FrameClock::new(30);
        assert!((clock.frame_to_secs(45) - 1.5).abs() < 1e-9);
        assert_eq!(clock.secs_to_frame(1.5), 45);
        assert_eq!(clock.interval(), Duration::from_nanos(33_333_333));
    }

    #[test]
    fn test_zero_fps_is_clamped() {
        assert_eq!(FrameClock::new(0).fps(), 1);
    }

    #[test]
    fn test_format_timecode() {
        assert_eq!(format_timecode(0.0), "0:00");
        assert_eq!(format_timecode(8.0), "0:08");
        assert_eq!(format_timecode(75.9), "1:15");
        assert_eq!(format_timecode(f64::NAN), "0:00");
    }
}
