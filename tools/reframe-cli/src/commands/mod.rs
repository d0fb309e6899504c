pub mod info;
pub mod play;
pub mod record;
pub mod render;
pub mod resolve;
pub mod validate;

use std::path::Path;

use reframe_track_model::keyframe::load_document;
use reframe_track_model::store::TrackSnapshot;

fn load_track(path: &Path) -> anyhow::Result<TrackSnapshot> {
    let keyframes =
        load_document(path).map_err(|e| anyhow::anyhow!("Failed to load track: {e}"))?;
    Ok(TrackSnapshot::from_keyframes(keyframes))
}
