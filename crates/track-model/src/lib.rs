//! Reframe Track Model
//!
//! Defines the core data contracts for recorded crop sessions:
//! - **Geometry:** Pixel sizes, crop rectangles, and aspect-ratio presets
//! - **Keyframes:** Timestamped samples of crop, volume, and playback rate
//! - **Document:** The exported `recorded_session.json` wire format
//! - **Store:** Append-only keyframe track with snapshot reads
//!
//! Crop rectangles are stored in display space, i.e. relative to the
//! on-screen video element at capture time.

pub mod geometry;
pub mod keyframe;
pub mod store;

pub use geometry::*;
pub use keyframe::*;
pub use store::*;
