//! Show track information.

use std::path::PathBuf;

use serde::Serialize;

use reframe_common::clock::format_timecode;
use reframe_track_model::store::TrackSnapshot;

#[derive(Debug, Serialize)]
struct TrackInfo {
    keyframes: usize,
    duration_secs: f64,
    timecode: String,
    playback_rate: Option<(f64, f64)>,
    volume: Option<(f64, f64)>,
    time_ordered: bool,
}

impl TrackInfo {
    fn from_track(track: &TrackSnapshot) -> Self {
        let duration = track.duration();
        Self {
            keyframes: track.len(),
            duration_secs: duration,
            timecode: format_timecode(duration),
            playback_rate: range(track.iter().map(|k| k.playback_rate)),
            volume: range(track.iter().map(|k| k.volume)),
            time_ordered: track.is_time_ordered(),
        }
    }
}

pub fn run(path: PathBuf, json: bool) -> anyhow::Result<()> {
    let track = super::load_track(&path)?;
    let info = TrackInfo::from_track(&track);

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("Track: {}", path.display());
    println!("  Keyframes: {}", info.keyframes);
    if track.is_empty() {
        println!("  (empty)");
        return Ok(());
    }

    println!("  Duration: {:.3}s ({})", info.duration_secs, info.timecode);
    if let Some((lo, hi)) = info.playback_rate {
        println!("  Playback rate: {lo}x - {hi}x");
    }
    if let Some((lo, hi)) = info.volume {
        println!("  Volume: {lo:.2} - {hi:.2}");
    }
    if info.time_ordered {
        println!("  Order: sorted by time");
    } else {
        println!("  Order: out of order (linear lookups)");
    }

    if let (Some(first), Some(last)) = (track.earliest(), track.latest()) {
        println!("  First: {:.3}s {}", first.timestamp, first.rect);
        println!("  Last: {:.3}s {}", last.timestamp, last.rect);
    }

    Ok(())
}

fn range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values.fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((f64::min(lo, v), f64::max(hi, v))),
    })
}
