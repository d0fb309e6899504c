//! Playback transport: the `currentTime` state machine.
//!
//! Time moves either by autoplay ticks of a fixed step or by scrubbing.
//! Autoplay pauses itself when it reaches the end of the track.

use reframe_common::clock::AutoplayClock;

/// Transport state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    /// No track loaded; nothing to resolve.
    Idle,
    /// Track loaded, time only moves by scrubbing.
    Paused,
    /// Autoplay is advancing time.
    Playing,
}

/// Session-time transport over a loaded track.
#[derive(Debug, Clone)]
pub struct Transport {
    clock: AutoplayClock,
    state: TransportState,
    current_time: f64,
    duration: f64,
}

impl Transport {
    pub fn new(clock: AutoplayClock) -> Self {
        Self {
            clock,
            state: TransportState::Idle,
            current_time: 0.0,
            duration: 0.0,
        }
    }

    /// Load a track of `keyframes` samples spanning `duration` seconds.
    ///
    /// Rewinds to zero. An empty track returns the transport to idle.
    pub fn load(&mut self, keyframes: usize, duration: f64) {
        self.current_time = 0.0;
        if keyframes == 0 {
            self.duration = 0.0;
            self.state = TransportState::Idle;
        } else {
            self.duration = if duration.is_finite() { duration.max(0.0) } else { 0.0 };
            self.state = TransportState::Paused;
        }
        tracing::debug!(keyframes, duration = self.duration, "Transport loaded track");
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn clock(&self) -> AutoplayClock {
        self.clock
    }

    pub fn is_playing(&self) -> bool {
        self.state == TransportState::Playing
    }

    /// Start autoplay. No effect while idle.
    pub fn play(&mut self) {
        if self.state == TransportState::Paused {
            self.state = TransportState::Playing;
        }
    }

    /// Stop autoplay, keeping the current time.
    pub fn pause(&mut self) {
        if self.state == TransportState::Playing {
            self.state = TransportState::Paused;
        }
    }

    /// Toggle between playing and paused.
    pub fn toggle(&mut self) {
        match self.state {
            TransportState::Playing => self.pause(),
            TransportState::Paused => self.play(),
            TransportState::Idle => {}
        }
    }

    /// Advance one autoplay step. Returns the new time if it moved.
    pub fn tick(&mut self) -> Option<f64> {
        if self.state != TransportState::Playing {
            return None;
        }
        let (next, finished) = self.clock.advance(self.current_time, self.duration);
        self.current_time = next;
        if finished {
            self.state = TransportState::Paused;
            tracing::debug!(time_secs = next, "Autoplay reached end of track");
        }
        Some(next)
    }

    /// Jump to `time`, clamped to `[0, duration]`. Non-finite input is ignored.
    pub fn scrub(&mut self, time: f64) -> f64 {
        if time.is_finite() && self.state != TransportState::Idle {
            self.current_time = time.clamp(0.0, self.duration);
        }
        self.current_time
    }
}

impl Default for Transport {
    fn default() -> Self {
        Self::new(AutoplayClock::default())
    }
}
