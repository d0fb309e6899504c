//! Record a session from a file of editor updates.

use std::path::{Path, PathBuf};

use reframe_common::config::AppConfig;
use reframe_playback_core::CoordinateMapper;
use reframe_recorder::{parse_updates, PersistenceWorker, RecordingSession};
use reframe_track_model::keyframe::save_document;

pub async fn run(config: &AppConfig, input: PathBuf, output: Option<PathBuf>) -> anyhow::Result<()> {
    println!("Recording from: {}", input.display());

    let content = std::fs::read_to_string(&input)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", input.display()))?;
    let updates = parse_updates(&content).map_err(|e| anyhow::anyhow!("Bad editor update: {e}"))?;

    let (dir, filename) = match &output {
        Some(path) => split_output(path)?,
        None => (PathBuf::from("."), config.export.filename.clone()),
    };

    let mapper = CoordinateMapper::from_config(&config.playback)?;
    let worker = PersistenceWorker::spawn(filename);
    let mut session = RecordingSession::new(worker.handle(), mapper);
    session.start()?;

    for update in &updates {
        if let Err(e) = session.capture(update) {
            println!("  Skipped update at {}s: {e}", update.timestamp);
        }
    }
    let summary = session.stop();

    let document = session.export().await?;
    let path = save_document(&dir, &document)?;
    let stored = worker.shutdown().await;
    tracing::debug!(keyframes = stored, path = %path.display(), "Track saved");

    println!("  Updates: {}", updates.len());
    println!("  Recorded: {}", summary.recorded);
    println!("  Rejected: {}", summary.rejected);
    if let Some(display) = summary.capture_display {
        println!("  Display: {display}");
    }
    println!("\nTrack written to: {}", path.display());

    Ok(())
}

fn split_output(path: &Path) -> anyhow::Result<(PathBuf, String)> {
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| anyhow::anyhow!("Output path has no file name: {}", path.display()))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((dir, filename.to_string()))
}
