//! Reframe Recorder
//!
//! Captures crop-state samples while the user edits and keeps the
//! authoritative track in an isolated persistence worker:
//!
//! - **Worker:** A task owning the keyframe store, reachable only through
//!   `record`, `clear`, `get_all` and `export_document` messages
//! - **Session:** Explicit `start`/`stop`/`reset` lifecycle around one
//!   worker, with capture-time geometry validation
//!
//! Editor updates are pushed synchronously; nothing on the capture path
//! awaits.

pub mod session;
pub mod worker;

pub use session::{parse_updates, EditorUpdate, RecordingSession, SessionState, SessionSummary};
pub use worker::{PersistenceWorker, WorkerHandle, WorkerMessage};
