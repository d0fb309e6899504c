//! Keyframes and the exported track document.
//!
//! A keyframe is one recorded sample of crop geometry plus the playback
//! parameters in effect at that moment. The exported document is a pretty
//! printed JSON array in recording order:
//!
//! ```json
//! [
//!   { "timeStamp": 0.42, "coordinates": [12, 0, 200, 356], "volume": 0.8, "playbackRate": 1 }
//! ]
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::geometry::CropRect;

/// Default filename offered for an exported track.
pub const DEFAULT_EXPORT_FILENAME: &str = "recorded_session.json";

/// Playback rates offered by the editor's rate selector.
pub const PLAYBACK_RATE_PRESETS: [f64; 4] = [0.5, 1.0, 1.5, 2.0];

/// Increment used by the editor's faster/slower buttons.
pub const PLAYBACK_RATE_STEP: f64 = 0.5;

/// One recorded sample. Immutable once recorded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    /// Session time in seconds.
    #[serde(rename = "timeStamp")]
    pub timestamp: f64,

    /// Crop rectangle in display space at capture time.
    #[serde(rename = "coordinates", with = "rect_as_array")]
    pub rect: CropRect,

    /// Normalized volume in `[0, 1]`.
    pub volume: f64,

    /// Positive playback-rate multiplier.
    #[serde(rename = "playbackRate")]
    pub playback_rate: f64,
}

impl Keyframe {
    pub fn new(timestamp: f64, rect: CropRect, volume: f64, playback_rate: f64) -> Self {
        Self {
            timestamp,
            rect,
            volume,
            playback_rate,
        }
    }

    /// Problems that make this keyframe unsafe to replay as-is.
    pub fn issues(&self) -> Vec<String> {
        let mut issues = vec![];
        if !self.timestamp.is_finite() || self.timestamp < 0.0 {
            issues.push(format!("timestamp {} is not a valid time", self.timestamp));
        }
        if !self.rect.is_finite() {
            issues.push("coordinates contain non-finite values".to_string());
        } else if self.rect.width < 0.0 || self.rect.height < 0.0 {
            issues.push(format!(
                "negative crop size {}x{}",
                self.rect.width, self.rect.height
            ));
        }
        if !(0.0..=1.0).contains(&self.volume) {
            issues.push(format!("volume {} outside [0, 1]", self.volume));
        }
        if !(self.playback_rate.is_finite() && self.playback_rate > 0.0) {
            issues.push(format!("playback rate {} is not positive", self.playback_rate));
        }
        issues
    }
}

/// Serialize `CropRect` as `[x, y, width, height]`.
mod rect_as_array {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use crate::geometry::CropRect;

    pub fn serialize<S: Serializer>(rect: &CropRect, serializer: S) -> Result<S::Ok, S::Error> {
        rect.to_array().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<CropRect, D::Error> {
        <[f64; 4]>::deserialize(deserializer).map(CropRect::from_array)
    }
}

/// Rate one step faster than `rate`.
pub fn faster(rate: f64) -> f64 {
    rate + PLAYBACK_RATE_STEP
}

/// Rate one step slower than `rate`, never below the slowest preset.
pub fn slower(rate: f64) -> f64 {
    (rate - PLAYBACK_RATE_STEP).max(PLAYBACK_RATE_PRESETS[0])
}

/// A serialized track ready to hand to a download/save sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedDocument {
    /// UTF-8 JSON bytes.
    pub bytes: Vec<u8>,

    /// Suggested filename.
    pub filename: String,
}

impl ExportedDocument {
    /// Serialize a track under the given filename.
    pub fn from_track(track: &[Keyframe], filename: impl Into<String>) -> serde_json::Result<Self> {
        Ok(Self {
            bytes: serialize_document(track)?.into_bytes(),
            filename: filename.into(),
        })
    }

    /// Document contents as text.
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.bytes).unwrap_or_default()
    }
}

/// Parse an exported document.
pub fn parse_document(json: &str) -> Result<Vec<Keyframe>, serde_json::Error> {
    serde_json::from_str(json)
}

/// Serialize a track as a pretty-printed document.
pub fn serialize_document(track: &[Keyframe]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(track)
}

/// Read and parse a document from disk.
pub fn load_document(path: impl AsRef<Path>) -> Result<Vec<Keyframe>, DocumentError> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path).map_err(|e| DocumentError::IoError {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_document(&json).map_err(|e| DocumentError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Write an exported document into `dir` under its suggested filename.
pub fn save_document(
    dir: impl AsRef<Path>,
    document: &ExportedDocument,
) -> Result<PathBuf, DocumentError> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir).map_err(|e| DocumentError::IoError {
        path: dir.to_path_buf(),
        source: e,
    })?;
    let path = dir.join(&document.filename);
    std::fs::write(&path, &document.bytes).map_err(|e| DocumentError::IoError {
        path: path.clone(),
        source: e,
    })?;
    Ok(path)
}

/// Issues found in a track, as `(index, message)` pairs.
///
/// Out-of-order timestamps are reported but remain replayable.
pub fn validate_track(track: &[Keyframe]) -> Vec<(usize, String)> {
    let mut issues = vec![];
    let mut prev: Option<f64> = None;
    for (index, keyframe) in track.iter().enumerate() {
        for issue in keyframe.issues() {
            issues.push((index, issue));
        }
        if let Some(prev) = prev {
            if keyframe.timestamp < prev {
                issues.push((
                    index,
                    format!(
                        "timestamp {} is earlier than the previous sample ({prev})",
                        keyframe.timestamp
                    ),
                ));
            }
        }
        prev = Some(keyframe.timestamp);
    }
    issues
}

/// Errors reading or writing track documents.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(t: f64) -> Keyframe {
        Keyframe::new(t, CropRect::new(12.0, 0.0, 200.0, 356.0), 0.8, 1.0)
    }

    #[test]
    fn test_json_format_matches_export_shape() {
        let json = serde_json::to_string(&sample(0.42)).unwrap();
        assert!(json.contains("\"timeStamp\":0.42"));
        assert!(json.contains("\"coordinates\":[12.0,0.0,200.0,356.0]"));
        assert!(json.contains("\"volume\":0.8"));
        assert!(json.contains("\"playbackRate\":1.0"));
    }

    #[test]
    fn test_parses_integer_coordinates() {
        let raw = r#"[
            { "timeStamp": 0.42, "coordinates": [12, 0, 200, 356], "volume": 0.8, "playbackRate": 1 }
        ]"#;
        let track = parse_document(raw).unwrap();
        assert_eq!(track.len(), 1);
        assert_eq!(track[0], sample(0.42));
    }

    #[test]
    fn test_document_roundtrip_preserves_order() {
        let track = vec![sample(0.0), sample(2.0), sample(1.0)];
        let document = ExportedDocument::from_track(&track, DEFAULT_EXPORT_FILENAME).unwrap();
        assert_eq!(document.filename, "recorded_session.json");
        assert!(document.as_str().contains('\n'), "document should be pretty printed");

        let parsed = parse_document(document.as_str()).unwrap();
        assert_eq!(parsed, track);
    }

    #[test]
    fn test_rejects_short_coordinates() {
        let raw = r#"[{ "timeStamp": 0, "coordinates": [1, 2, 3], "volume": 1, "playbackRate": 1 }]"#;
        assert!(parse_document(raw).is_err());
    }

    #[test]
    fn test_save_and_load_document() {
        let dir = tempfile::tempdir().unwrap();
        let document =
            ExportedDocument::from_track(&[sample(0.0), sample(1.5)], DEFAULT_EXPORT_FILENAME)
                .unwrap();
        let path = save_document(dir.path().join("out"), &document).unwrap();
        assert!(path.ends_with("recorded_session.json"));

        let loaded = load_document(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[1].timestamp, 1.5);
    }

    #[test]
    fn test_load_missing_document_reports_path() {
        let err = load_document("/nonexistent/recorded_session.json").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/recorded_session.json"));
    }

    #[test]
    fn test_rate_steps() {
        assert_eq!(faster(1.0), 1.5);
        assert_eq!(slower(1.0), 0.5);
        assert_eq!(slower(0.5), 0.5);
    }

    #[test]
    fn test_validate_track_flags_problems() {
        let mut bad = sample(1.0);
        bad.volume = 1.4;
        bad.playback_rate = 0.0;
        let track = vec![sample(2.0), bad];

        let issues = validate_track(&track);
        assert!(issues.iter().all(|(index, _)| *index == 1));
        assert!(issues.iter().any(|(_, msg)| msg.contains("volume")));
        assert!(issues.iter().any(|(_, msg)| msg.contains("playback rate")));
        assert!(issues.iter().any(|(_, msg)| msg.contains("earlier")));
    }

    #[test]
    fn test_clean_track_has_no_issues() {
        assert!(validate_track(&[sample(0.0), sample(0.0), sample(1.0)]).is_empty());
    }
}
