//! Reframe Render Engine
//!
//! Replays a recorded keyframe track against a video source and draws the
//! cropped region into an output raster.
//!
//! # Pipeline Architecture
//!
//! ```text
//! Player (autoplay / scrub) ──► session time ─┐
//!                                             ├── PlaybackResolver ──► sample
//! KeyframeStore snapshot ─────────────────────┘                          │
//!                                                                        ▼
//! VideoSource ◄── volume / rate / seek ──────────────────────── RenderPipeline
//!      │                                                                 │
//!      └── current frame ──► CoordinateMapper ──► crop ──► OutputRaster ─┤
//!                                                                        ▼
//!                                                     RenderLoop feed / PNG still
//! ```

pub mod compositor;
pub mod export;
pub mod pipeline;
pub mod player;
pub mod render_loop;
pub mod source;

pub use compositor::{output_size_for, OutputRaster};
pub use export::{render_still, save_walk, walk_keyframes, WalkFrame};
pub use pipeline::{FrameOutcome, PipelineSettings, RenderPipeline};
pub use player::Player;
pub use render_loop::{FrameFeed, RenderInputs, RenderLoop, RenderLoopStats};
pub use source::{FrameSequenceSource, VideoSource};
