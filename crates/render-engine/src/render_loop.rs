//! Continuous redraw loop.
//!
//! Runs the pipeline once per refresh period against the latest session time
//! and track, publishing each drawn frame. Errors skip the tick; nothing
//! short of cancellation ends the loop. Dropping the [`RenderLoop`] cancels
//! the task.

use std::sync::Arc;
use std::time::Duration;

use image::RgbaImage;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::{CancellationToken, DropGuard};

use reframe_playback_core::TransportState;
use reframe_track_model::store::TrackSnapshot;

use crate::pipeline::{FrameOutcome, RenderPipeline};
use crate::source::VideoSource;

/// Latest published frame; `None` when the overlay is cleared.
pub type FrameFeed = watch::Receiver<Option<Arc<RgbaImage>>>;

/// Counters reported when the loop stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderLoopStats {
    pub ticks: u64,
    pub frames_drawn: u64,
    pub skipped: u64,
    pub errors: u64,
}

/// Inputs the loop reads on every tick.
pub struct RenderInputs {
    pub time: watch::Receiver<f64>,
    pub track: watch::Receiver<TrackSnapshot>,
    /// Transport state; the source is played and paused to follow it.
    pub state: Option<watch::Receiver<TransportState>>,
}

impl RenderInputs {
    pub fn new(time: watch::Receiver<f64>, track: watch::Receiver<TrackSnapshot>) -> Self {
        Self {
            time,
            track,
            state: None,
        }
    }

    pub fn with_transport_state(mut self, state: watch::Receiver<TransportState>) -> Self {
        self.state = Some(state);
        self
    }
}

/// Handle to a running render loop.
pub struct RenderLoop {
    stop: Option<DropGuard>,
    frames: FrameFeed,
    task: Option<JoinHandle<RenderLoopStats>>,
}

impl RenderLoop {
    /// Spawn the loop on the current tokio runtime.
    pub fn spawn<S>(
        pipeline: RenderPipeline,
        source: S,
        inputs: RenderInputs,
        period: Duration,
    ) -> Self
    where
        S: VideoSource + 'static,
    {
        let stop_token = CancellationToken::new();
        let (frame_tx, frame_rx) = watch::channel(None);
        let task = tokio::spawn(run(
            pipeline,
            source,
            inputs,
            period,
            frame_tx,
            stop_token.child_token(),
        ));

        Self {
            stop: Some(stop_token.drop_guard()),
            frames: frame_rx,
            task: Some(task),
        }
    }

    /// Subscribe to published frames.
    pub fn frames(&self) -> FrameFeed {
        self.frames.clone()
    }

    /// Cancel the loop and wait for it to finish.
    pub async fn stop(mut self) -> RenderLoopStats {
        drop(self.stop.take());
        match self.task.take() {
            Some(task) => match task.await {
                Ok(stats) => stats,
                Err(e) => {
                    tracing::warn!(error = %e, "Render loop join failed");
                    RenderLoopStats::default()
                }
            },
            None => RenderLoopStats::default(),
        }
    }
}

async fn run<S: VideoSource>(
    mut pipeline: RenderPipeline,
    mut source: S,
    inputs: RenderInputs,
    period: Duration,
    frame_tx: watch::Sender<Option<Arc<RgbaImage>>>,
    stop: CancellationToken,
) -> RenderLoopStats {
    let mut stats = RenderLoopStats::default();
    let mut applied_state: Option<TransportState> = None;
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tracing::debug!(period_ms = period.as_millis() as u64, "Render loop started");

    loop {
        tokio::select! {
            biased;
            _ = stop.cancelled() => break,
            _ = ticker.tick() => {}
        }
        stats.ticks += 1;

        if let Some(state) = &inputs.state {
            let state = *state.borrow();
            if applied_state != Some(state) {
                follow_transport(&mut source, state);
                applied_state = Some(state);
            }
        }

        let current_time = *inputs.time.borrow();
        let track = inputs.track.borrow().clone();

        match pipeline.render_frame(&mut source, &track, current_time) {
            Ok(FrameOutcome::Drawn(_)) => {
                stats.frames_drawn += 1;
                frame_tx.send_replace(Some(Arc::new(pipeline.raster().image().clone())));
            }
            Ok(FrameOutcome::NoOverlay) => {
                stats.skipped += 1;
                if pipeline.settings().clear_on_miss {
                    frame_tx.send_replace(None);
                }
            }
            Ok(FrameOutcome::AwaitingSeek | FrameOutcome::NotReady) => stats.skipped += 1,
            Err(e) if e.is_recoverable() => {
                stats.skipped += 1;
                tracing::trace!(error = %e, time_secs = current_time, "Skipping frame");
            }
            Err(e) => {
                stats.errors += 1;
                tracing::warn!(error = %e, time_secs = current_time, "Render tick failed");
            }
        }
    }

    tracing::debug!(
        ticks = stats.ticks,
        frames_drawn = stats.frames_drawn,
        skipped = stats.skipped,
        "Render loop stopped"
    );
    stats
}

fn follow_transport<S: VideoSource>(source: &mut S, state: TransportState) {
    tracing::debug!(?state, "Following transport");
    match state {
        TransportState::Playing => source.play(),
        TransportState::Paused | TransportState::Idle => source.pause(),
    }
}
