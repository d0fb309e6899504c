//! Render pipeline: turns a resolved sample into one output frame.
//!
//! Per frame the pipeline applies volume and rate to the source, corrects
//! drift beyond the seek tolerance, maps the crop into intrinsic pixels and
//! stretches that region over the output raster. Missing metadata and empty
//! tracks produce no draw rather than an error.

use image::RgbaImage;

use reframe_common::config::PlaybackDefaults;
use reframe_common::error::{ReframeError, ReframeResult};
use reframe_playback_core::{CoordinateMapper, PlaybackResolver, ResolvedSample};
use reframe_track_model::geometry::{CropRect, Size};
use reframe_track_model::store::TrackSnapshot;

use crate::compositor::{crop_native, output_size_for, OutputRaster};
use crate::source::VideoSource;

/// Tunables for a [`RenderPipeline`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineSettings {
    /// Drift between source and session time that triggers a seek.
    pub seek_tolerance_secs: f64,
    /// Output raster width; height follows the intrinsic aspect.
    pub output_width: u32,
    /// Display size the track was captured against. Falls back to the
    /// raster's logical size.
    pub reference_display: Option<Size>,
    /// Clear the raster instead of keeping the last frame when nothing can
    /// be drawn.
    pub clear_on_miss: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from_config(&PlaybackDefaults::default())
    }
}

impl PipelineSettings {
    pub fn from_config(config: &PlaybackDefaults) -> Self {
        Self {
            seek_tolerance_secs: config.seek_tolerance_secs,
            output_width: config.output_width,
            reference_display: None,
            clear_on_miss: false,
        }
    }

    pub fn with_reference_display(mut self, display: Size) -> Self {
        self.reference_display = Some(display);
        self
    }

    pub fn with_clear_on_miss(mut self, clear: bool) -> Self {
        self.clear_on_miss = clear;
        self
    }
}

/// What happened on one render call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameOutcome {
    /// The raster now shows this sample.
    Drawn(ResolvedSample),
    /// Empty track; nothing to show.
    NoOverlay,
    /// A seek is outstanding; try again on the next tick.
    AwaitingSeek,
    /// The source has no metadata or decoded frame yet.
    NotReady,
}

/// Drives a video source and owns the output raster.
#[derive(Debug, Clone)]
pub struct RenderPipeline {
    mapper: CoordinateMapper,
    resolver: PlaybackResolver,
    settings: PipelineSettings,
    raster: OutputRaster,
    awaiting_seek: bool,
    frames_drawn: u64,
}

impl RenderPipeline {
    pub fn new(
        mapper: CoordinateMapper,
        resolver: PlaybackResolver,
        settings: PipelineSettings,
    ) -> Self {
        let width = settings.output_width.max(1);
        Self {
            mapper,
            resolver,
            settings,
            raster: OutputRaster::new(width, width),
            awaiting_seek: false,
            frames_drawn: 0,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn raster(&self) -> &OutputRaster {
        &self.raster
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }

    pub fn is_awaiting_seek(&self) -> bool {
        self.awaiting_seek
    }

    /// Resolve the track at `current_time` and render it.
    pub fn render_frame(
        &mut self,
        source: &mut dyn VideoSource,
        track: &TrackSnapshot,
        current_time: f64,
    ) -> ReframeResult<FrameOutcome> {
        match self.resolver.resolve(track, current_time) {
            Some(sample) => self.render_sample(source, sample, current_time),
            None => {
                self.miss();
                Ok(FrameOutcome::NoOverlay)
            }
        }
    }

    /// Render a specific sample with the source positioned at `current_time`.
    pub fn render_sample(
        &mut self,
        source: &mut dyn VideoSource,
        sample: ResolvedSample,
        current_time: f64,
    ) -> ReframeResult<FrameOutcome> {
        source.set_volume(sample.volume);
        source.set_playback_rate(sample.playback_rate);
        source.poll();

        let Some(intrinsic) = source.intrinsic_size() else {
            self.miss();
            return Ok(FrameOutcome::NotReady);
        };

        if self.awaiting_seek {
            if source.is_seeking() {
                return Ok(FrameOutcome::AwaitingSeek);
            }
            self.awaiting_seek = false;
        }

        // The source cannot go past its own end; drift is measured against
        // where a seek can actually land.
        let target = seek_target(current_time, source.duration());
        if (source.current_time() - target).abs() > self.settings.seek_tolerance_secs {
            tracing::trace!(
                from_secs = source.current_time(),
                to_secs = target,
                "Seeking video source"
            );
            source.seek(target);
            if source.is_seeking() {
                self.awaiting_seek = true;
                return Ok(FrameOutcome::AwaitingSeek);
            }
        }

        let (width, height) = output_size_for(intrinsic, self.settings.output_width);
        self.raster.ensure_size(width, height);

        let display = self.settings.reference_display.unwrap_or(self.raster.size());
        let region = self.mapper.map_to_intrinsic(sample.rect, display, intrinsic)?;

        let Some(frame) = source.current_frame() else {
            self.miss();
            return Ok(FrameOutcome::NotReady);
        };
        self.raster.draw_region(frame, region)?;
        self.frames_drawn += 1;

        Ok(FrameOutcome::Drawn(sample))
    }

    /// Cut the current crop out of the source frame at native resolution.
    ///
    /// `display` is the editor's current display frame.
    pub fn preview_crop(
        &self,
        source: &dyn VideoSource,
        rect: CropRect,
        display: Size,
    ) -> ReframeResult<RgbaImage> {
        let intrinsic = source
            .intrinsic_size()
            .ok_or_else(|| ReframeError::not_ready("video metadata not loaded"))?;
        let frame = source
            .current_frame()
            .ok_or_else(|| ReframeError::not_ready("no decoded frame"))?;
        let region = self.mapper.map_to_intrinsic(rect, display, intrinsic)?;
        crop_native(frame, region)
    }

    /// Encode the current raster as a PNG still.
    pub fn snapshot_png(&self) -> ReframeResult<Vec<u8>> {
        self.raster.encode_png()
    }

    fn miss(&mut self) {
        if self.settings.clear_on_miss {
            self.raster.clear();
        }
    }
}

fn seek_target(time: f64, duration: f64) -> f64 {
    if duration.is_finite() && duration > 0.0 {
        time.clamp(0.0, duration)
    } else {
        time.max(0.0)
    }
}
