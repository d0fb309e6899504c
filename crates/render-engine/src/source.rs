//! Video sources the render pipeline can drive.

use std::path::Path;

use image::RgbaImage;

use reframe_common::error::{ReframeError, ReframeResult};
use reframe_track_model::geometry::Size;

/// A seekable video source with a readable current frame.
///
/// Seeks are fire-and-forget: `seek` starts one, `poll` lets the source make
/// progress, and `is_seeking` reports whether it is still outstanding.
pub trait VideoSource: Send {
    /// Current decode position in seconds.
    fn current_time(&self) -> f64;

    /// Total length in seconds.
    fn duration(&self) -> f64;

    /// Decoded frame dimensions, once metadata has loaded.
    fn intrinsic_size(&self) -> Option<Size>;

    /// Start moving the decode position to `time`.
    fn seek(&mut self, time: f64);

    /// Whether a seek is still in flight.
    fn is_seeking(&self) -> bool;

    /// Let the source make progress on pending work.
    fn poll(&mut self) {}

    fn set_volume(&mut self, volume: f64);

    fn set_playback_rate(&mut self, rate: f64);

    fn play(&mut self);

    fn pause(&mut self);

    /// The frame at the current position, if one is decoded.
    fn current_frame(&self) -> Option<&RgbaImage>;
}

/// A video source backed by a sequence of decoded frames at a fixed rate.
#[derive(Debug, Clone)]
pub struct FrameSequenceSource {
    frames: Vec<RgbaImage>,
    fps: f64,
    position: f64,
    pending_seek: Option<PendingSeek>,
    seek_latency_polls: u32,
    seeks_issued: u64,
    volume: f64,
    playback_rate: f64,
    playing: bool,
}

#[derive(Debug, Clone, Copy)]
struct PendingSeek {
    target: f64,
    polls_left: u32,
}

impl FrameSequenceSource {
    /// Wrap in-memory frames played at `fps`.
    pub fn new(frames: Vec<RgbaImage>, fps: f64) -> ReframeResult<Self> {
        if !(fps.is_finite() && fps > 0.0) {
            return Err(ReframeError::config(format!("frame rate {fps} must be positive")));
        }
        if let Some(first) = frames.first() {
            let dims = first.dimensions();
            if frames.iter().any(|f| f.dimensions() != dims) {
                return Err(ReframeError::render("frames have mixed dimensions"));
            }
        }

        Ok(Self {
            frames,
            fps,
            position: 0.0,
            pending_seek: None,
            seek_latency_polls: 0,
            seeks_issued: 0,
            volume: 1.0,
            playback_rate: 1.0,
            playing: false,
        })
    }

    /// Load every PNG/JPEG in `dir`, ordered by file name.
    pub fn load_dir(dir: &Path, fps: f64) -> ReframeResult<Self> {
        if !dir.is_dir() {
            return Err(ReframeError::FileNotFound {
                path: dir.to_path_buf(),
            });
        }

        let mut paths: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| {
                        matches!(ext.to_ascii_lowercase().as_str(), "png" | "jpg" | "jpeg")
                    })
                    .unwrap_or(false)
            })
            .collect();
        paths.sort();

        let mut frames = Vec::with_capacity(paths.len());
        for path in &paths {
            frames.push(image::open(path)?.to_rgba8());
        }
        tracing::info!(dir = %dir.display(), frames = frames.len(), fps, "Loaded frame sequence");

        Self::new(frames, fps)
    }

    /// Make every seek take `polls` calls to [`VideoSource::poll`] to land.
    pub fn with_seek_latency(mut self, polls: u32) -> Self {
        self.seek_latency_polls = polls;
        self
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn playback_rate(&self) -> f64 {
        self.playback_rate
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Number of seeks started so far.
    pub fn seeks_issued(&self) -> u64 {
        self.seeks_issued
    }

    /// Advance a playing source by `elapsed` wall seconds at its playback rate.
    pub fn advance(&mut self, elapsed: f64) {
        if self.playing && self.pending_seek.is_none() && elapsed.is_finite() {
            self.position = (self.position + elapsed * self.playback_rate).clamp(0.0, self.duration());
        }
    }

    fn frame_index(&self) -> Option<usize> {
        let last = self.frames.len().checked_sub(1)?;
        let index = (self.position * self.fps).floor().max(0.0) as usize;
        Some(index.min(last))
    }
}

impl VideoSource for FrameSequenceSource {
    fn current_time(&self) -> f64 {
        self.position
    }

    fn duration(&self) -> f64 {
        self.frames.len() as f64 / self.fps
    }

    fn intrinsic_size(&self) -> Option<Size> {
        self.frames
            .first()
            .map(|f| Size::new(f.width() as f64, f.height() as f64))
    }

    fn seek(&mut self, time: f64) {
        if !time.is_finite() {
            return;
        }
        let target = time.clamp(0.0, self.duration());
        self.seeks_issued += 1;
        if self.seek_latency_polls == 0 {
            self.position = target;
            self.pending_seek = None;
        } else {
            self.pending_seek = Some(PendingSeek {
                target,
                polls_left: self.seek_latency_polls,
            });
        }
    }

    fn is_seeking(&self) -> bool {
        self.pending_seek.is_some()
    }

    fn poll(&mut self) {
        if let Some(seek) = self.pending_seek.as_mut() {
            seek.polls_left = seek.polls_left.saturating_sub(1);
            if seek.polls_left == 0 {
                self.position = seek.target;
                self.pending_seek = None;
            }
        }
    }

    fn set_volume(&mut self, volume: f64) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    fn set_playback_rate(&mut self, rate: f64) {
        if rate.is_finite() && rate > 0.0 {
            self.playback_rate = rate;
        }
    }

    fn play(&mut self) {
        self.playing = true;
    }

    fn pause(&mut self) {
        self.playing = false;
    }

    fn current_frame(&self) -> Option<&RgbaImage> {
        self.frame_index().map(|i| &self.frames[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn solid_frames(count: u8) -> Vec<RgbaImage> {
        (0..count)
            .map(|i| RgbaImage::from_pixel(8, 4, Rgba([i, 0, 0, 255])))
            .collect()
    }

    #[test]
    fn test_frame_lookup_follows_position() {
        let mut source = FrameSequenceSource::new(solid_frames(10), 10.0).unwrap();
        assert_eq!(source.duration(), 1.0);
        assert_eq!(source.intrinsic_size(), Some(Size::new(8.0, 4.0)));

        source.seek(0.35);
        assert!(!source.is_seeking());
        assert_eq!(source.current_frame().unwrap().get_pixel(0, 0)[0], 3);

        source.seek(5.0);
        assert_eq!(source.current_time(), 1.0);
        assert_eq!(source.current_frame().unwrap().get_pixel(0, 0)[0], 9);
    }

    #[test]
    fn test_seek_latency() {
        let mut source = FrameSequenceSource::new(solid_frames(10), 10.0)
            .unwrap()
            .with_seek_latency(2);
        source.seek(0.5);
        assert!(source.is_seeking());
        assert_eq!(source.current_time(), 0.0);

        source.poll();
        assert!(source.is_seeking());
        source.poll();
        assert!(!source.is_seeking());
        assert_eq!(source.current_time(), 0.5);
        assert_eq!(source.seeks_issued(), 1);
    }

    #[test]
    fn test_empty_source_has_no_metadata() {
        let source = FrameSequenceSource::new(vec![], 30.0).unwrap();
        assert!(source.intrinsic_size().is_none());
        assert!(source.current_frame().is_none());
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(FrameSequenceSource::new(solid_frames(1), 0.0).is_err());

        let mixed = vec![
            RgbaImage::new(4, 4),
            RgbaImage::new(8, 4),
        ];
        assert!(FrameSequenceSource::new(mixed, 30.0).is_err());
    }

    #[test]
    fn test_playback_parameters() {
        let mut source = FrameSequenceSource::new(solid_frames(20), 10.0).unwrap();
        source.set_volume(1.5);
        source.set_playback_rate(-1.0);
        assert_eq!(source.volume(), 1.0);
        assert_eq!(source.playback_rate(), 1.0);

        source.set_playback_rate(2.0);
        source.play();
        source.advance(0.25);
        assert_eq!(source.current_time(), 0.5);

        source.pause();
        source.advance(1.0);
        assert_eq!(source.current_time(), 0.5);
    }

    #[test]
    fn test_load_dir_orders_by_name() {
        let dir = tempfile::tempdir().unwrap();
        for (name, shade) in [("frame_002.png", 2u8), ("frame_000.png", 0), ("frame_001.png", 1)] {
            RgbaImage::from_pixel(4, 4, Rgba([shade, 0, 0, 255]))
                .save(dir.path().join(name))
                .unwrap();
        }
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let mut source = FrameSequenceSource::load_dir(dir.path(), 1.0).unwrap();
        assert_eq!(source.frame_count(), 3);
        source.seek(1.0);
        assert_eq!(source.current_frame().unwrap().get_pixel(0, 0)[0], 1);
    }

    #[test]
    fn test_load_missing_dir() {
        let err = FrameSequenceSource::load_dir(Path::new("/nonexistent/frames"), 30.0).unwrap_err();
        assert!(matches!(err, ReframeError::FileNotFound { .. }));
    }
}
