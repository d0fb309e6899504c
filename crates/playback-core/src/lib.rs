//! Reframe Playback Core
//!
//! Turns a recorded keyframe track into what should be on screen right now:
//! - **Mapper:** Display-space to intrinsic-space scaling and bounds clamping
//! - **Resolver:** Keyframe lookup for a playback time
//! - **Transport:** Autoplay and scrub state machine over session time
//!
//! This crate is pure computation with no I/O and no video access.
//! All inputs are data; all outputs are data.

pub mod mapper;
pub mod resolver;
pub mod transport;

pub use mapper::{ClampPolicy, CoordinateMapper};
pub use resolver::{PlaybackResolver, ResolutionStrategy, ResolvedSample};
pub use transport::{Transport, TransportState};
