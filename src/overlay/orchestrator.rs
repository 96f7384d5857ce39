use crate::overlay::boundary::RecognitionBoundary;
use crate::overlay::messages::{ConversionOutcome, ConversionRequest, ConversionResult, RequestId};
use anyhow::{anyhow, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Bounded wait for a cancelled worker before the UI proceeds regardless.
pub const DEFAULT_CANCEL_WAIT: Duration = Duration::from_millis(1500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecognitionState {
    Idle,
    Pending(RequestId),
}

struct PendingWorker {
    id: RequestId,
    cancel: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

/// Owns at most one in-flight recognition request.
///
/// The state machine is explicit (`Idle`/`Pending`) rather than a scattering
/// of booleans. Workers communicate back exclusively through immutable
/// [`ConversionResult`] values over an mpsc channel; [`poll`] runs on the
/// UI thread and discards any result whose id no longer matches the pending
/// request, so a stale recognition can never overwrite newer user edits.
///
/// [`poll`]: RecognitionOrchestrator::poll
pub struct RecognitionOrchestrator {
    boundary: Arc<dyn RecognitionBoundary>,
    result_tx: Sender<ConversionResult>,
    result_rx: Receiver<ConversionResult>,
    pending: Option<PendingWorker>,
    next_id: u64,
    cancel_wait: Duration,
}

impl RecognitionOrchestrator {
    pub fn new(boundary: Arc<dyn RecognitionBoundary>) -> Self {
        Self::with_cancel_wait(boundary, DEFAULT_CANCEL_WAIT)
    }

    pub fn with_cancel_wait(boundary: Arc<dyn RecognitionBoundary>, cancel_wait: Duration) -> Self {
        let (result_tx, result_rx) = channel();
        Self {
            boundary,
            result_tx,
            result_rx,
            pending: None,
            next_id: 0,
            cancel_wait,
        }
    }

    pub fn state(&self) -> RecognitionState {
        match &self.pending {
            Some(worker) => RecognitionState::Pending(worker.id),
            None => RecognitionState::Idle,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Cancels any pending request, allocates a fresh id, and dispatches the
    /// work to a background worker. Returns after the worker is spawned; the
    /// outcome arrives later through [`RecognitionOrchestrator::poll`].
    pub fn submit(&mut self, image_png: Vec<u8>, prompt: String) -> Result<RequestId> {
        self.cancel();

        let id = RequestId::new(self.next_id);
        self.next_id += 1;
        let request = ConversionRequest {
            id,
            image_png,
            prompt,
        };
        let cancel = Arc::new(AtomicBool::new(false));
        let worker_cancel = Arc::clone(&cancel);
        let boundary = Arc::clone(&self.boundary);
        let result_tx = self.result_tx.clone();

        let handle = thread::Builder::new()
            .name("recognition-worker".to_string())
            .spawn(move || run_worker(boundary, request, worker_cancel, result_tx))
            .map_err(|err| anyhow!("failed to spawn recognition worker: {err}"))?;

        self.pending = Some(PendingWorker {
            id,
            cancel,
            handle: Some(handle),
        });
        tracing::debug!(id = id.raw(), "recognition request dispatched");
        Ok(id)
    }

    /// Requests worker termination and returns to `Idle` immediately from the
    /// orchestrator's perspective. Cancellation is cooperative: the worker is
    /// flagged and joined with a bounded timeout, and any result it still
    /// delivers is dropped as stale.
    pub fn cancel(&mut self) {
        let Some(mut worker) = self.pending.take() else {
            return;
        };
        tracing::debug!(id = worker.id.raw(), "cancelling pending recognition");
        worker.cancel.store(true, Ordering::Release);
        join_with_timeout(worker.handle.take(), self.cancel_wait);
    }

    /// Drains delivered results on the UI thread. Results are consumed in the
    /// order their owning requests were dispatched; anything not matching the
    /// currently pending id was superseded or cancelled and is discarded.
    pub fn poll(&mut self) -> Option<ConversionOutcome> {
        loop {
            match self.result_rx.try_recv() {
                Ok(result) => match &self.pending {
                    Some(worker) if worker.id == result.id => {
                        self.pending = None;
                        return Some(result.outcome);
                    }
                    _ => {
                        tracing::debug!(id = result.id.raw(), "discarding stale recognition result");
                    }
                },
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return None,
            }
        }
    }

    /// Teardown path: cancel and wait out the bounded timeout so no worker
    /// callback dangles into destroyed UI state.
    pub fn shutdown(&mut self) {
        self.cancel();
    }
}

impl Drop for RecognitionOrchestrator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_worker(
    boundary: Arc<dyn RecognitionBoundary>,
    request: ConversionRequest,
    cancel: Arc<AtomicBool>,
    result_tx: Sender<ConversionResult>,
) {
    if cancel.load(Ordering::Acquire) {
        return;
    }
    let outcome = match boundary.recognize(&request.image_png, &request.prompt) {
        Ok(text) => ConversionOutcome::Success(text),
        Err(err) => {
            tracing::warn!(id = request.id.raw(), error = %format!("{err:#}"), "recognition call failed");
            ConversionOutcome::Failure(format!("{err:#}"))
        }
    };
    // Delivered regardless of cancellation; the poll-side id check is the
    // single point of stale-result suppression.
    let _ = result_tx.send(ConversionResult {
        id: request.id,
        outcome,
    });
}

fn join_with_timeout(handle: Option<JoinHandle<()>>, wait: Duration) {
    let Some(handle) = handle else {
        return;
    };
    if handle.is_finished() {
        let _ = handle.join();
        return;
    }
    let (done_tx, done_rx) = channel();
    thread::spawn(move || {
        let _ = done_tx.send(handle.join());
    });
    match done_rx.recv_timeout(wait) {
        Ok(Ok(())) => {}
        Ok(Err(_)) => {
            tracing::error!("recognition worker panicked while joining");
        }
        Err(RecvTimeoutError::Timeout) => {
            tracing::warn!("recognition worker join timed out; proceeding without it");
        }
        Err(RecvTimeoutError::Disconnected) => {
            tracing::error!("recognition worker join channel disconnected");
        }
    }
}
