//! Recording session lifecycle.
//!
//! A session owns the link between the editor's geometry updates and the
//! persistence worker. Only one session may record against a worker at a
//! time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use reframe_common::error::{ReframeError, ReframeResult};
use reframe_playback_core::CoordinateMapper;
use reframe_track_model::geometry::{CropRect, Size};
use reframe_track_model::keyframe::{ExportedDocument, Keyframe};
use reframe_track_model::store::TrackSnapshot;

use crate::worker::WorkerHandle;

fn default_volume() -> f64 {
    0.8
}

fn default_rate() -> f64 {
    1.0
}

/// One geometry update produced by the editor on an interaction tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EditorUpdate {
    /// Session time in seconds.
    #[serde(rename = "t")]
    pub timestamp: f64,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub display_width: f64,
    pub display_height: f64,
    #[serde(default = "default_volume")]
    pub volume: f64,
    #[serde(default = "default_rate")]
    pub playback_rate: f64,
}

impl EditorUpdate {
    /// Crop rectangle in display space.
    pub fn rect(&self) -> CropRect {
        CropRect::new(self.x, self.y, self.width, self.height)
    }

    /// Display frame the crop was drawn on.
    pub fn display(&self) -> Size {
        Size::new(self.display_width, self.display_height)
    }

    /// The editor sends a zero-size crop before anything has been drawn.
    pub fn has_crop(&self) -> bool {
        self.width != 0.0 || self.height != 0.0
    }
}

/// Parse editor updates from JSON lines, skipping blanks and `#` comments.
pub fn parse_updates(jsonl: &str) -> Result<Vec<EditorUpdate>, serde_json::Error> {
    jsonl
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(serde_json::from_str::<EditorUpdate>)
        .collect()
}

/// State of a recording session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Created or reset, not recording.
    Idle,
    /// Accepting updates.
    Recording,
    /// Recording finished; the track can be exported.
    Stopped,
}

/// Counters and timing for a session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub state: SessionState,
    pub recorded: u64,
    pub rejected: u64,
    pub started_at: Option<DateTime<Utc>>,
    pub stopped_at: Option<DateTime<Utc>>,
    /// Display frame of the most recent accepted update.
    pub capture_display: Option<Size>,
}

/// Explicit recording session over a persistence worker.
pub struct RecordingSession {
    worker: WorkerHandle,
    mapper: CoordinateMapper,
    state: SessionState,
    recorded: u64,
    rejected: u64,
    started_at: Option<DateTime<Utc>>,
    stopped_at: Option<DateTime<Utc>>,
    capture_display: Option<Size>,
}

impl RecordingSession {
    pub fn new(worker: WorkerHandle, mapper: CoordinateMapper) -> Self {
        Self {
            worker,
            mapper,
            state: SessionState::Idle,
            recorded: 0,
            rejected: 0,
            started_at: None,
            stopped_at: None,
            capture_display: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Start recording a fresh track.
    ///
    /// Clears whatever the worker held. Fails with `SessionConflict` if this
    /// or another session is already recording against the same worker.
    pub fn start(&mut self) -> ReframeResult<()> {
        if self.state == SessionState::Recording {
            return Err(ReframeError::session_conflict("session already recording"));
        }
        if !self.worker.try_claim_session() {
            return Err(ReframeError::session_conflict(
                "another session is recording against this worker",
            ));
        }

        if !self.worker.is_available() {
            tracing::warn!("Starting session without a persistence worker; updates will be dropped");
        }
        self.worker.clear();

        self.state = SessionState::Recording;
        self.recorded = 0;
        self.rejected = 0;
        self.started_at = Some(Utc::now());
        self.stopped_at = None;
        self.capture_display = None;

        tracing::info!("Recording session started");
        Ok(())
    }

    /// Turn one editor update into a keyframe and hand it to the worker.
    ///
    /// Returns `Ok(None)` when the session is not recording. An update with
    /// no crop drawn yet records the mapper's default crop for its display.
    /// Updates with unusable geometry or a non-positive rate are rejected and
    /// leave the track untouched.
    pub fn capture(&mut self, update: &EditorUpdate) -> ReframeResult<Option<Keyframe>> {
        if self.state != SessionState::Recording {
            tracing::debug!(state = ?self.state, "Ignoring update outside recording");
            return Ok(None);
        }

        match build_keyframe(&self.mapper, update) {
            Ok(keyframe) => {
                self.worker.record(keyframe);
                self.recorded += 1;
                self.capture_display = Some(update.display());
                Ok(Some(keyframe))
            }
            Err(e) => {
                self.rejected += 1;
                tracing::debug!(error = %e, time_secs = update.timestamp, "Rejected editor update");
                Err(e)
            }
        }
    }

    /// Stop recording. The worker keeps the track.
    pub fn stop(&mut self) -> SessionSummary {
        if self.state == SessionState::Recording {
            self.state = SessionState::Stopped;
            self.stopped_at = Some(Utc::now());
            self.worker.release_session();
            tracing::info!(
                recorded = self.recorded,
                rejected = self.rejected,
                "Recording session stopped"
            );
        }
        self.summary()
    }

    /// Stop if needed, drop the recorded track and return to idle.
    pub fn reset(&mut self) {
        self.stop();
        self.worker.clear();
        self.state = SessionState::Idle;
        self.recorded = 0;
        self.rejected = 0;
        self.started_at = None;
        self.stopped_at = None;
        self.capture_display = None;
        tracing::debug!("Recording session reset");
    }

    /// Serialize the recorded track.
    pub async fn export(&self) -> ReframeResult<ExportedDocument> {
        self.worker.export_document().await
    }

    /// Snapshot of the recorded track.
    pub async fn snapshot(&self) -> ReframeResult<TrackSnapshot> {
        self.worker.get_all().await.map(TrackSnapshot::from_keyframes)
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            state: self.state,
            recorded: self.recorded,
            rejected: self.rejected,
            started_at: self.started_at,
            stopped_at: self.stopped_at,
            capture_display: self.capture_display,
        }
    }
}

impl Drop for RecordingSession {
    fn drop(&mut self) {
        if self.state == SessionState::Recording {
            self.worker.release_session();
        }
    }
}

fn build_keyframe(mapper: &CoordinateMapper, update: &EditorUpdate) -> ReframeResult<Keyframe> {
    let rect = if update.has_crop() {
        update.rect()
    } else {
        mapper.default_crop(update.display())
    };
    mapper.validate_capture(rect, update.display())?;
    if rect.width < 0.0 || rect.height < 0.0 {
        return Err(ReframeError::invalid_geometry(format!(
            "negative crop size {}x{}",
            rect.width, rect.height
        )));
    }
    if !update.timestamp.is_finite() {
        return Err(ReframeError::invalid_geometry("timestamp is not finite"));
    }
    if !update.volume.is_finite() {
        return Err(ReframeError::invalid_geometry("volume is not finite"));
    }
    if !(update.playback_rate.is_finite() && update.playback_rate > 0.0) {
        return Err(ReframeError::invalid_geometry(format!(
            "playback rate {} is not positive",
            update.playback_rate
        )));
    }

    Ok(Keyframe::new(
        update.timestamp,
        rect,
        update.volume.clamp(0.0, 1.0),
        update.playback_rate,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::PersistenceWorker;
    use reframe_track_model::geometry::AspectRatio;
    use reframe_track_model::keyframe::{parse_document, DEFAULT_EXPORT_FILENAME};

    fn update(t: f64, x: f64) -> EditorUpdate {
        EditorUpdate {
            timestamp: t,
            x,
            y: 0.0,
            width: 100.0,
            height: 178.0,
            display_width: 640.0,
            display_height: 360.0,
            volume: 0.8,
            playback_rate: 1.0,
        }
    }

    #[tokio::test]
    async fn test_record_and_export() {
        let worker = PersistenceWorker::spawn(DEFAULT_EXPORT_FILENAME);
        let mut session = RecordingSession::new(worker.handle(), CoordinateMapper::default());

        assert_eq!(session.capture(&update(0.0, 0.0)).unwrap(), None);

        session.start().unwrap();
        for (i, t) in [0.0, 0.42, 1.0].into_iter().enumerate() {
            session.capture(&update(t, i as f64)).unwrap().unwrap();
        }
        let summary = session.stop();
        assert_eq!(summary.state, SessionState::Stopped);
        assert_eq!(summary.recorded, 3);
        assert_eq!(summary.capture_display, Some(Size::new(640.0, 360.0)));

        let document = session.export().await.unwrap();
        let track = parse_document(document.as_str()).unwrap();
        assert_eq!(track.len(), 3);
        assert_eq!(
            track.iter().map(|k| k.timestamp).collect::<Vec<_>>(),
            vec![0.0, 0.42, 1.0]
        );

        worker.shutdown().await;
    }

    #[tokio::test]
    async fn test_start_clears_previous_track() {
        let worker = PersistenceWorker::spawn(DEFAULT_EXPORT_FILENAME);
        let mut session = RecordingSession::new(worker.handle(), CoordinateMapper::default());

        session.start().unwrap();
        session.capture(&update(0.0, 0.0)).unwrap();
        session.stop();

        session.start().unwrap();
        session.capture(&update(5.0, 9.0)).unwrap();
        let snapshot = session.snapshot().await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].rect.x, 9.0);

        worker.shutdown().await;
    }

    #[tokio::test]
    async fn test_second_session_conflicts() {
        let worker = PersistenceWorker::spawn(DEFAULT_EXPORT_FILENAME);
        let mut first = RecordingSession::new(worker.handle(), CoordinateMapper::default());
        let mut second = RecordingSession::new(worker.handle(), CoordinateMapper::default());

        first.start().unwrap();
        assert!(matches!(first.start(), Err(ReframeError::SessionConflict { .. })));
        assert!(matches!(second.start(), Err(ReframeError::SessionConflict { .. })));

        drop(first);
        second.start().unwrap();

        worker.shutdown().await;
    }

    #[tokio::test]
    async fn test_invalid_updates_are_rejected() {
        let worker = PersistenceWorker::spawn(DEFAULT_EXPORT_FILENAME);
        let mut session = RecordingSession::new(worker.handle(), CoordinateMapper::default());
        session.start().unwrap();

        let mut zero_display = update(0.0, 0.0);
        zero_display.display_width = 0.0;
        let mut nan_rect = update(0.1, 0.0);
        nan_rect.x = f64::NAN;
        let mut stopped_rate = update(0.2, 0.0);
        stopped_rate.playback_rate = 0.0;

        for bad in [zero_display, nan_rect, stopped_rate] {
            let err = session.capture(&bad).unwrap_err();
            assert!(matches!(err, ReframeError::InvalidGeometry { .. }));
        }

        let mut loud = update(0.3, 1.0);
        loud.volume = 1.7;
        let keyframe = session.capture(&loud).unwrap().unwrap();
        assert_eq!(keyframe.volume, 1.0);

        let summary = session.stop();
        assert_eq!(summary.rejected, 3);
        assert_eq!(summary.recorded, 1);
        assert_eq!(session.snapshot().await.unwrap().len(), 1);

        worker.shutdown().await;
    }

    #[tokio::test]
    async fn test_undrawn_crop_records_default_geometry() {
        let worker = PersistenceWorker::spawn(DEFAULT_EXPORT_FILENAME);
        let mapper = CoordinateMapper::default().with_aspect(AspectRatio::new(1, 1));
        let mut session = RecordingSession::new(worker.handle(), mapper);
        session.start().unwrap();

        let mut blank = update(0.0, 0.0);
        blank.width = 0.0;
        blank.height = 0.0;
        assert!(!blank.has_crop());
        let keyframe = session.capture(&blank).unwrap().unwrap();
        assert_eq!(keyframe.rect, CropRect::new(0.0, 0.0, 100.0, 100.0));

        // A small display shrinks the default to fit.
        let mut cramped = blank;
        cramped.timestamp = 0.5;
        cramped.display_width = 80.0;
        cramped.display_height = 40.0;
        let keyframe = session.capture(&cramped).unwrap().unwrap();
        assert_eq!(keyframe.rect, CropRect::new(0.0, 0.0, 40.0, 40.0));

        session.stop();
        assert_eq!(session.snapshot().await.unwrap().len(), 2);
        worker.shutdown().await;
    }

    #[tokio::test]
    async fn test_reset_returns_to_idle() {
        let worker = PersistenceWorker::spawn(DEFAULT_EXPORT_FILENAME);
        let mut session = RecordingSession::new(worker.handle(), CoordinateMapper::default());
        session.start().unwrap();
        session.capture(&update(0.0, 0.0)).unwrap();

        session.reset();
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.summary().recorded, 0);
        assert!(session.snapshot().await.unwrap().is_empty());

        worker.shutdown().await;
    }

    #[tokio::test]
    async fn test_missing_worker_degrades_to_noop() {
        let mut session =
            RecordingSession::new(WorkerHandle::disconnected(), CoordinateMapper::default());
        session.start().unwrap();
        assert!(session.capture(&update(0.0, 0.0)).unwrap().is_some());
        session.stop();

        assert!(matches!(
            session.export().await,
            Err(ReframeError::WorkerUnavailable)
        ));
    }

    #[test]
    fn test_parse_updates_skips_comments() {
        let jsonl = "# header\n\n{\"t\":0,\"x\":0,\"y\":0,\"width\":100,\"height\":100,\"display_width\":640,\"display_height\":360}\n";
        let updates = parse_updates(jsonl).unwrap();
        assert_eq!(updates.len(), 1);
        assert!(parse_updates("{not json}").is_err());
    }

    #[test]
    fn test_update_parses_with_defaults() {
        let raw = r#"{"t":1.5,"x":10,"y":0,"width":100,"height":178,"display_width":640,"display_height":360}"#;
        let update: EditorUpdate = serde_json::from_str(raw).unwrap();
        assert_eq!(update.timestamp, 1.5);
        assert_eq!(update.volume, 0.8);
        assert_eq!(update.playback_rate, 1.0);
        assert_eq!(update.display(), Size::new(640.0, 360.0));
    }
}
