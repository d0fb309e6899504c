//! Show the keyframe that applies at a playback time.

use std::path::PathBuf;

use reframe_common::clock::format_timecode;
use reframe_playback_core::{PlaybackResolver, ResolutionStrategy};

pub fn run(path: PathBuf, at: f64, strategy: String) -> anyhow::Result<()> {
    let strategy = match strategy.as_str() {
        "last-at-or-before" => ResolutionStrategy::LastAtOrBefore,
        "first-at-or-after" => ResolutionStrategy::FirstAtOrAfter,
        _ => {
            return Err(anyhow::anyhow!(
                "Unknown strategy: {strategy}. Use: last-at-or-before, first-at-or-after"
            ));
        }
    };

    let track = super::load_track(&path)?;
    let resolver = PlaybackResolver::new(strategy);

    println!("Resolving {} at {at}s ({})", path.display(), format_timecode(at));
    match resolver.resolve(&track, at) {
        Some(sample) => {
            println!("  Keyframe: {:.3}s", sample.keyframe_time);
            println!("  Crop: {}", sample.rect);
            println!("  Volume: {:.2}", sample.volume);
            println!("  Playback rate: {}x", sample.playback_rate);
        }
        None => println!("  No overlay (track is empty)"),
    }

    Ok(())
}
