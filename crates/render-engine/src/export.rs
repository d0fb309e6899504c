//! One-shot stills: a single instant, or one still per keyframe.

use std::path::{Path, PathBuf};

use image::RgbaImage;

use reframe_common::error::{ReframeError, ReframeResult};
use reframe_playback_core::ResolvedSample;
use reframe_track_model::keyframe::Keyframe;
use reframe_track_model::store::TrackSnapshot;

use crate::compositor::save_png;
use crate::pipeline::{FrameOutcome, RenderPipeline};
use crate::source::VideoSource;

/// Render attempts allowed while a seek is outstanding.
const MAX_SEEK_POLLS: usize = 1_000;

/// A still produced for one keyframe of a walk.
#[derive(Debug, Clone)]
pub struct WalkFrame {
    /// Position of the keyframe in recording order.
    pub index: usize,
    pub keyframe: Keyframe,
    pub image: RgbaImage,
}

/// Render the track as it appears at `time`.
pub fn render_still(
    pipeline: &mut RenderPipeline,
    source: &mut dyn VideoSource,
    track: &TrackSnapshot,
    time: f64,
) -> ReframeResult<RgbaImage> {
    for _ in 0..MAX_SEEK_POLLS {
        match pipeline.render_frame(source, track, time)? {
            FrameOutcome::Drawn(sample) => {
                tracing::debug!(
                    time_secs = time,
                    keyframe_secs = sample.keyframe_time,
                    "Rendered still"
                );
                return Ok(pipeline.raster().image().clone());
            }
            FrameOutcome::NoOverlay => return Err(ReframeError::EmptyTrack),
            FrameOutcome::NotReady => {
                return Err(ReframeError::not_ready("video source has no frame"))
            }
            FrameOutcome::AwaitingSeek => continue,
        }
    }
    Err(ReframeError::not_ready(format!(
        "seek to {time}s did not complete"
    )))
}

/// Replay every keyframe in recording order, one still each.
///
/// Each keyframe is drawn with its own geometry once the source has reached
/// its timestamp. Keyframes that cannot be drawn are logged and skipped.
pub fn walk_keyframes(
    pipeline: &mut RenderPipeline,
    source: &mut dyn VideoSource,
    track: &TrackSnapshot,
) -> ReframeResult<Vec<WalkFrame>> {
    if track.is_empty() {
        return Err(ReframeError::EmptyTrack);
    }

    let mut frames = Vec::with_capacity(track.len());
    for (index, keyframe) in track.iter().enumerate() {
        match render_keyframe(pipeline, source, keyframe) {
            Ok(image) => frames.push(WalkFrame {
                index,
                keyframe: *keyframe,
                image,
            }),
            Err(e) if e.is_recoverable() => {
                tracing::warn!(index, time_secs = keyframe.timestamp, error = %e, "Skipping keyframe");
            }
            Err(e) => return Err(e),
        }
    }

    tracing::info!(
        keyframes = track.len(),
        stills = frames.len(),
        "Keyframe walk finished"
    );
    Ok(frames)
}

fn render_keyframe(
    pipeline: &mut RenderPipeline,
    source: &mut dyn VideoSource,
    keyframe: &Keyframe,
) -> ReframeResult<RgbaImage> {
    let sample = ResolvedSample::from(keyframe);
    for _ in 0..MAX_SEEK_POLLS {
        match pipeline.render_sample(source, sample, keyframe.timestamp)? {
            FrameOutcome::Drawn(_) => return Ok(pipeline.raster().image().clone()),
            FrameOutcome::AwaitingSeek => continue,
            FrameOutcome::NoOverlay | FrameOutcome::NotReady => break,
        }
    }
    Err(ReframeError::not_ready(format!(
        "no frame for keyframe at {}s",
        keyframe.timestamp
    )))
}

/// Write walk stills into `dir` as `keyframe_0000.png`, `keyframe_0001.png` …
pub fn save_walk(dir: &Path, frames: &[WalkFrame]) -> ReframeResult<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let mut paths = Vec::with_capacity(frames.len());
    for frame in frames {
        let path = dir.join(format!("keyframe_{:04}.png", frame.index));
        save_png(&frame.image, &path)?;
        paths.push(path);
    }
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::PipelineSettings;
    use crate::source::FrameSequenceSource;
    use image::Rgba;
    use reframe_playback_core::{CoordinateMapper, PlaybackResolver};
    use reframe_track_model::geometry::{CropRect, Size};

    /// Frame `i` is a solid shade `i * 20`.
    fn source(latency: u32) -> FrameSequenceSource {
        let frames = (0..10u8)
            .map(|i| RgbaImage::from_pixel(20, 20, Rgba([i * 20, i * 20, i * 20, 255])))
            .collect();
        FrameSequenceSource::new(frames, 10.0)
            .unwrap()
            .with_seek_latency(latency)
    }

    fn pipeline() -> RenderPipeline {
        RenderPipeline::new(
            CoordinateMapper::default(),
            PlaybackResolver::default(),
            PipelineSettings {
                seek_tolerance_secs: 0.1,
                output_width: 10,
                reference_display: Some(Size::new(100.0, 100.0)),
                clear_on_miss: false,
            },
        )
    }

    fn kf(t: f64) -> Keyframe {
        Keyframe::new(t, CropRect::new(0.0, 0.0, 50.0, 50.0), 0.8, 1.0)
    }

    #[test]
    fn test_render_still_waits_for_seek() {
        let mut source = source(3);
        let track = TrackSnapshot::from_keyframes(vec![kf(0.0)]);
        let still = render_still(&mut pipeline(), &mut source, &track, 0.5).unwrap();
        assert_eq!(still.dimensions(), (10, 10));
        assert_eq!(*still.get_pixel(0, 0), Rgba([100, 100, 100, 255]));
    }

    #[test]
    fn test_render_still_on_empty_track() {
        let err = render_still(
            &mut pipeline(),
            &mut source(0),
            &TrackSnapshot::default(),
            0.0,
        )
        .unwrap_err();
        assert!(matches!(err, ReframeError::EmptyTrack));
    }

    #[test]
    fn test_walk_draws_each_keyframe_in_order() {
        let mut source = source(2);
        let mut offscreen = kf(0.3);
        offscreen.rect = CropRect::new(300.0, 0.0, 50.0, 50.0);
        let track = TrackSnapshot::from_keyframes(vec![kf(0.2), kf(0.0), offscreen, kf(0.6)]);

        let frames = walk_keyframes(&mut pipeline(), &mut source, &track).unwrap();
        assert_eq!(
            frames.iter().map(|f| f.index).collect::<Vec<_>>(),
            vec![0, 1, 3]
        );
        assert_eq!(frames[0].image.get_pixel(0, 0)[0], 40);
        assert_eq!(frames[1].image.get_pixel(0, 0)[0], 0);
        assert_eq!(frames[2].image.get_pixel(0, 0)[0], 120);

        let dir = tempfile::tempdir().unwrap();
        let paths = save_walk(dir.path(), &frames).unwrap();
        assert_eq!(paths.len(), 3);
        assert!(paths[2].ends_with("keyframe_0003.png"));
        assert!(paths.iter().all(|p| p.exists()));
    }
}
