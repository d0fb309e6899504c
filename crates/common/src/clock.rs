//! Clock and timing utilities for session playback.
//!
//! Autoplay advances session time by a fixed step per wall-clock tick,
//! independent of the playback rate applied to the video source.

use std::time::Duration;

use crate::config::PlaybackDefaults;

/// Fixed-step clock driving autoplay of a recorded session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutoplayClock {
    step_secs: f64,
    interval: Duration,
}

impl AutoplayClock {
    /// Create a clock adding `step_secs` of session time every `interval`.
    pub fn new(step_secs: f64, interval: Duration) -> Self {
        Self {
            step_secs: step_secs.max(0.0),
            interval: interval.max(Duration::from_millis(1)),
        }
    }

    /// Clock with the configured step and interval.
    pub fn from_config(defaults: &PlaybackDefaults) -> Self {
        Self::new(
            defaults.autoplay_step_secs,
            Duration::from_millis(defaults.autoplay_interval_ms),
        )
    }

    /// Session seconds added per tick.
    pub fn step_secs(&self) -> f64 {
        self.step_secs
    }

    /// Wall time between ticks.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Advance `current` by one step, capped at `duration`.
    ///
    /// Returns the new time and whether the end was reached.
    pub fn advance(&self, current: f64, duration: f64) -> (f64, bool) {
        let next = (current + self.step_secs).min(duration);
        (next, next >= duration)
    }
}

impl Default for AutoplayClock {
    fn default() -> Self {
        Self::new(0.1, Duration::from_millis(100))
    }
}

/// Format seconds as `mm:ss`, truncating fractional seconds.
pub fn format_timecode(secs: f64) -> String {
    let secs = if secs.is_finite() { secs.max(0.0) } else { 0.0 };
    let minutes = (secs / 60.0).floor() as u64;
    let seconds = (secs % 60.0).floor() as u64;
    format!("{minutes:02}:{seconds:02}")
}

/// Convert a redraw rate to a tick period.
pub fn refresh_period(refresh_hz: u32) -> Duration {
    Duration::from_nanos(1_000_000_000 / refresh_hz.max(1) as u64)
}
