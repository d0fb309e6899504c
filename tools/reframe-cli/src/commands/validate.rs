//! Validate an exported track.

use std::path::PathBuf;

use reframe_track_model::keyframe::validate_track;

pub fn run(path: PathBuf) -> anyhow::Result<()> {
    println!("Validating track at: {}", path.display());

    let track = super::load_track(&path)?;
    println!("  Keyframes: {}", track.len());

    let issues = validate_track(&track);
    if issues.is_empty() {
        println!("\nTrack is valid.");
    } else {
        println!("\nValidation issues:");
        for (index, issue) in &issues {
            println!("  - keyframe {index}: {issue}");
        }
        println!(
            "\n{} issue(s) found. Track may not replay as recorded.",
            issues.len()
        );
    }

    Ok(())
}
