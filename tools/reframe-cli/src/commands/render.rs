//! Render stills of a track over a frame sequence.

use std::path::{Path, PathBuf};

use reframe_common::config::AppConfig;
use reframe_playback_core::{CoordinateMapper, PlaybackResolver};
use reframe_render_engine::compositor::save_png;
use reframe_render_engine::{
    render_still, save_walk, walk_keyframes, FrameSequenceSource, PipelineSettings, RenderPipeline,
};
use reframe_track_model::geometry::Size;

pub struct RenderArgs {
    pub path: PathBuf,
    pub frames: PathBuf,
    pub fps: f64,
    pub display: Option<String>,
    pub at: Option<f64>,
    pub walk: bool,
    pub native: bool,
    pub width: Option<u32>,
    pub out: PathBuf,
}

pub fn run(config: &AppConfig, args: RenderArgs) -> anyhow::Result<()> {
    let track = super::load_track(&args.path)?;
    let mut source = FrameSequenceSource::load_dir(&args.frames, args.fps)
        .map_err(|e| anyhow::anyhow!("Failed to load frames: {e}"))?;

    let mut settings = PipelineSettings::from_config(&config.playback);
    if let Some(width) = args.width {
        settings.output_width = width;
    }
    if let Some(display) = &args.display {
        let display: Size = display
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid --display: {e}"))?;
        settings = settings.with_reference_display(display);
    }

    let mapper = CoordinateMapper::from_config(&config.playback)?;
    let resolver = PlaybackResolver::default();
    let mut pipeline = RenderPipeline::new(mapper, resolver, settings);

    println!("Rendering {}", args.path.display());
    println!("  Frames: {} at {} fps", source.frame_count(), source.fps());

    if args.walk {
        let stills = walk_keyframes(&mut pipeline, &mut source, &track)?;
        let paths = save_walk(&args.out, &stills)?;
        println!("  Stills: {} of {} keyframes", paths.len(), track.len());
        println!("\nWrote stills to: {}", args.out.display());
        return Ok(());
    }

    let Some(at) = args.at else {
        return Err(anyhow::anyhow!("Pass either --at <SECS> or --walk"));
    };

    let still = render_still(&mut pipeline, &mut source, &track, at)?;
    save_png(&still, &args.out)?;
    println!("  Output: {}x{}", still.width(), still.height());
    println!("\nWrote still to: {}", args.out.display());

    if args.native {
        let sample = resolver
            .resolve(&track, at)
            .ok_or_else(|| anyhow::anyhow!("Track is empty"))?;
        let display = settings
            .reference_display
            .unwrap_or_else(|| pipeline.raster().size());
        let crop = pipeline.preview_crop(&source, sample.rect, display)?;
        let native_path = native_path(&args.out);
        save_png(&crop, &native_path)?;
        println!(
            "Wrote native crop ({}x{}) to: {}",
            crop.width(),
            crop.height(),
            native_path.display()
        );
    }

    Ok(())
}

fn native_path(out: &Path) -> PathBuf {
    let stem = out
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("still");
    out.with_file_name(format!("{stem}_native.png"))
}
