//! Keyframe resolution for a playback time.
//!
//! Resolution is a pure function of `(track snapshot, time)`: the same track
//! at the same time always yields the same sample, whether the time was
//! reached by seeking or by continuous playback.

use serde::{Deserialize, Serialize};

use reframe_track_model::geometry::CropRect;
use reframe_track_model::keyframe::Keyframe;
use reframe_track_model::store::TrackSnapshot;

/// Which keyframe applies at a given time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionStrategy {
    /// Most recent keyframe not in the future; before the first keyframe,
    /// the earliest one.
    #[default]
    LastAtOrBefore,
    /// Next keyframe at or after the time; past the end, the latest one.
    FirstAtOrAfter,
}

/// What to apply to the video source for one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedSample {
    /// Timestamp of the keyframe that produced this sample.
    pub keyframe_time: f64,
    /// Crop in display space at capture time.
    pub rect: CropRect,
    pub volume: f64,
    pub playback_rate: f64,
}

impl From<&Keyframe> for ResolvedSample {
    fn from(keyframe: &Keyframe) -> Self {
        Self {
            keyframe_time: keyframe.timestamp,
            rect: keyframe.rect,
            volume: keyframe.volume,
            playback_rate: keyframe.playback_rate,
        }
    }
}

/// Maps playback time to the applicable keyframe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaybackResolver {
    strategy: ResolutionStrategy,
}

impl PlaybackResolver {
    pub fn new(strategy: ResolutionStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> ResolutionStrategy {
        self.strategy
    }

    /// Resolve the sample in effect at `current_time`.
    ///
    /// Returns `None` ("no overlay") only when the track is empty.
    pub fn resolve(&self, track: &TrackSnapshot, current_time: f64) -> Option<ResolvedSample> {
        let keyframe = match self.strategy {
            ResolutionStrategy::LastAtOrBefore => track
                .find_last_at_or_before(current_time)
                .or_else(|| track.earliest()),
            ResolutionStrategy::FirstAtOrAfter => track
                .find_at_or_after(current_time)
                .or_else(|| track.latest()),
        };
        keyframe.map(ResolvedSample::from)
    }
}
