//! Persistence worker.
//!
//! The authoritative keyframe store lives inside a spawned task and is only
//! reachable through [`WorkerMessage`]s. Messages from one handle are
//! processed in send order; there is no atomicity across messages.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use reframe_common::error::{ReframeError, ReframeResult};
use reframe_track_model::keyframe::{ExportedDocument, Keyframe};
use reframe_track_model::store::KeyframeStore;

/// Messages understood by the persistence worker.
#[derive(Debug)]
pub enum WorkerMessage {
    /// Append one keyframe.
    Record(Keyframe),
    /// Drop the whole track.
    Clear,
    /// Reply with the track in recording order.
    GetAll {
        reply: oneshot::Sender<Vec<Keyframe>>,
    },
    /// Reply with the serialized track and its suggested filename.
    ExportDocument {
        reply: oneshot::Sender<ReframeResult<ExportedDocument>>,
    },
}

/// Cloneable sender side of the worker.
///
/// When the worker is gone, `record` and `clear` degrade to logged no-ops;
/// `get_all` and `export_document` return [`ReframeError::WorkerUnavailable`].
#[derive(Debug, Clone)]
pub struct WorkerHandle {
    tx: mpsc::UnboundedSender<WorkerMessage>,
    session_active: Arc<AtomicBool>,
}

impl WorkerHandle {
    /// A handle whose worker was never started.
    pub fn disconnected() -> Self {
        let (tx, _rx) = mpsc::unbounded_channel();
        Self {
            tx,
            session_active: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether the worker is still accepting messages.
    pub fn is_available(&self) -> bool {
        !self.tx.is_closed()
    }

    /// Queue a keyframe. Returns `false` if the worker is unavailable.
    pub fn record(&self, keyframe: Keyframe) -> bool {
        self.send(WorkerMessage::Record(keyframe), "record")
    }

    /// Queue a clear. Returns `false` if the worker is unavailable.
    pub fn clear(&self) -> bool {
        self.send(WorkerMessage::Clear, "clear")
    }

    /// Fetch the track as of every message sent before this call.
    pub async fn get_all(&self) -> ReframeResult<Vec<Keyframe>> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(WorkerMessage::GetAll { reply })
            .map_err(|_| ReframeError::WorkerUnavailable)?;
        rx.await.map_err(|_| ReframeError::WorkerUnavailable)
    }

    /// Serialize the track as an exported document.
    pub async fn export_document(&self) -> ReframeResult<ExportedDocument> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(WorkerMessage::ExportDocument { reply })
            .map_err(|_| ReframeError::WorkerUnavailable)?;
        rx.await.map_err(|_| ReframeError::WorkerUnavailable)?
    }

    /// Claim the single recording slot. Returns `false` if already taken.
    pub(crate) fn try_claim_session(&self) -> bool {
        self.session_active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub(crate) fn release_session(&self) {
        self.session_active.store(false, Ordering::SeqCst);
    }

    fn send(&self, message: WorkerMessage, kind: &'static str) -> bool {
        match self.tx.send(message) {
            Ok(()) => true,
            Err(_) => {
                tracing::warn!(message = kind, "Persistence worker unavailable, dropping message");
                false
            }
        }
    }
}

/// A running persistence worker.
pub struct PersistenceWorker {
    handle: WorkerHandle,
    stop: CancellationToken,
    task: JoinHandle<usize>,
}

impl PersistenceWorker {
    /// Spawn a worker that exports under `filename`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(filename: impl Into<String>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let stop = CancellationToken::new();
        let task = tokio::spawn(run_worker(rx, stop.child_token(), filename.into()));

        Self {
            handle: WorkerHandle {
                tx,
                session_active: Arc::new(AtomicBool::new(false)),
            },
            stop,
            task,
        }
    }

    /// A new handle to this worker.
    pub fn handle(&self) -> WorkerHandle {
        self.handle.clone()
    }

    /// Stop the worker and wait for it to exit.
    ///
    /// Messages already queued are processed first. Returns the number of
    /// keyframes it held.
    pub async fn shutdown(self) -> usize {
        self.stop.cancel();
        match self.task.await {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!(error = %e, "Persistence worker join failed");
                0
            }
        }
    }
}

async fn run_worker(
    mut rx: mpsc::UnboundedReceiver<WorkerMessage>,
    stop: CancellationToken,
    filename: String,
) -> usize {
    let store = KeyframeStore::new();
    tracing::info!(filename = %filename, "Persistence worker started");

    loop {
        tokio::select! {
            biased;
            _ = stop.cancelled() => {
                // Messages accepted before shutdown still land.
                rx.close();
                let mut drained = 0usize;
                while let Ok(message) = rx.try_recv() {
                    handle_message(&store, &filename, message);
                    drained += 1;
                }
                if drained > 0 {
                    tracing::debug!(drained, "Drained queued messages on shutdown");
                }
                break;
            }
            message = rx.recv() => match message {
                Some(message) => handle_message(&store, &filename, message),
                None => break,
            },
        }
    }

    let held = store.len();
    tracing::info!(keyframes = held, "Persistence worker stopped");
    held
}

fn handle_message(store: &KeyframeStore, filename: &str, message: WorkerMessage) {
    match message {
        WorkerMessage::Record(keyframe) => {
            tracing::debug!(time_secs = keyframe.timestamp, "Recording keyframe");
            store.append(keyframe);
        }
        WorkerMessage::Clear => {
            tracing::debug!(dropped = store.len(), "Clearing track");
            store.clear();
        }
        WorkerMessage::GetAll { reply } => {
            let track = store.all().to_vec();
            tracing::debug!(keyframes = track.len(), "Sending recorded track");
            let _ = reply.send(track);
        }
        WorkerMessage::ExportDocument { reply } => {
            let snapshot = store.all();
            let document = ExportedDocument::from_track(&snapshot, filename)
                .map_err(|e| ReframeError::export(format!("Failed to serialize track: {e}")));
            if let Ok(document) = &document {
                tracing::info!(
                    keyframes = snapshot.len(),
                    bytes = document.bytes.len(),
                    filename = %document.filename,
                    "Exported track"
                );
            }
            let _ = reply.send(document);
        }
    }
}
