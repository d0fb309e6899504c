//! Autoplay a track through the live render loop.

use std::path::PathBuf;

use tokio::sync::watch;

use reframe_common::clock::{format_timecode, refresh_period, AutoplayClock};
use reframe_common::config::AppConfig;
use reframe_playback_core::{CoordinateMapper, PlaybackResolver, Transport, TransportState};
use reframe_render_engine::compositor::save_png;
use reframe_render_engine::{
    FrameSequenceSource, PipelineSettings, Player, RenderInputs, RenderLoop, RenderPipeline,
};
use reframe_track_model::geometry::Size;

pub struct PlayArgs {
    pub path: PathBuf,
    pub frames: PathBuf,
    pub fps: f64,
    pub display: Option<String>,
    pub out: Option<PathBuf>,
}

pub async fn run(config: &AppConfig, args: PlayArgs) -> anyhow::Result<()> {
    let track = super::load_track(&args.path)?;
    if track.is_empty() {
        return Err(anyhow::anyhow!("Track is empty, nothing to play"));
    }
    let source = FrameSequenceSource::load_dir(&args.frames, args.fps)
        .map_err(|e| anyhow::anyhow!("Failed to load frames: {e}"))?;

    let mut settings = PipelineSettings::from_config(&config.playback);
    if let Some(display) = &args.display {
        let display: Size = display
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid --display: {e}"))?;
        settings = settings.with_reference_display(display);
    }
    let pipeline = RenderPipeline::new(
        CoordinateMapper::from_config(&config.playback)?,
        PlaybackResolver::default(),
        settings,
    );

    let clock = AutoplayClock::from_config(&config.playback);
    let player = Player::spawn(Transport::new(clock));
    let (_track_tx, track_rx) = watch::channel(track.clone());
    let render_loop = RenderLoop::spawn(
        pipeline,
        source,
        RenderInputs::new(player.time(), track_rx).with_transport_state(player.state()),
        refresh_period(config.playback.refresh_hz),
    );

    println!("Playing {}", args.path.display());
    println!(
        "  Duration: {} ({} keyframes)",
        format_timecode(track.duration()),
        track.len()
    );

    player.load(track.len(), track.duration());
    player.play();

    let duration = track.duration();
    let mut time = player.time();
    let mut state = player.state();
    time.wait_for(|t| *t >= duration).await?;
    state.wait_for(|s| *s != TransportState::Playing).await?;

    let frame = render_loop.frames().borrow().clone();
    let stats = render_loop.stop().await;
    let transport = player.stop().await;

    if let Some(transport) = transport {
        println!("  Stopped at: {}", format_timecode(transport.current_time()));
    }
    println!(
        "  Ticks: {}, frames drawn: {}, skipped: {}",
        stats.ticks, stats.frames_drawn, stats.skipped
    );

    if let Some(out) = &args.out {
        let frame = frame.ok_or_else(|| anyhow::anyhow!("No frame was drawn"))?;
        save_png(&frame, out)?;
        println!("\nWrote last frame to: {}", out.display());
    }

    Ok(())
}
