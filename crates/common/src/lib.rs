//! Reframe Common Utilities
//!
//! Shared infrastructure for all Reframe crates:
//! - Error taxonomy and result alias
//! - Autoplay clock and timecode helpers
//! - Tracing/logging initialization
//! - Configuration loading

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
