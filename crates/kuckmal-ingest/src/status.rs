//! Progress and cancellation controller
//!
//! One [`PipelineController`] exists per pipeline. It owns the status that
//! pollers read, the "already running" slot, and the cancellation flag that
//! every stage polls from its inner loop.
//!
//! State machine:
//!
//! ```text
//! idle ─► decompressing ─► decompress_complete ─► parsing ─► complete
//!              │                   │                 │
//!              └───────────────────┴─────────────────┴──► error | cancelled
//! ```
//!
//! `decompressing` and `parsing` can also be entered directly from `idle` or
//! any terminal state, which starts a fresh set of counters.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{IngestError, Result};

/// Pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    Decompressing,
    DecompressComplete,
    Parsing,
    Complete,
    Error,
    Cancelled,
}

impl PipelineState {
    pub fn as_str(&self) -> &str {
        match self {
            PipelineState::Idle => "idle",
            PipelineState::Decompressing => "decompressing",
            PipelineState::DecompressComplete => "decompress_complete",
            PipelineState::Parsing => "parsing",
            PipelineState::Complete => "complete",
            PipelineState::Error => "error",
            PipelineState::Cancelled => "cancelled",
        }
    }

    /// A stage is doing work
    pub fn is_active(&self) -> bool {
        matches!(self, PipelineState::Decompressing | PipelineState::Parsing)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PipelineState::Complete | PipelineState::Error | PipelineState::Cancelled
        )
    }

    fn can_transition_to(&self, next: PipelineState) -> bool {
        use PipelineState::*;

        match next {
            Decompressing => *self == Idle || self.is_terminal(),
            DecompressComplete => *self == Decompressing,
            Parsing => *self == Idle || *self == DecompressComplete || self.is_terminal(),
            Complete => *self == Parsing,
            Error | Cancelled => self.is_active() || *self == DecompressComplete,
            Idle => false,
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a pipeline's progress
#[derive(Debug, Clone, Serialize)]
pub struct PipelineStatus {
    pub state: PipelineState,
    /// Percentage of the current stage, 0-100
    pub progress: u8,
    pub entries_parsed: u64,
    pub bytes_processed: u64,
    pub message: String,
    pub run_id: Option<Uuid>,
    pub started_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl Default for PipelineStatus {
    fn default() -> Self {
        Self {
            state: PipelineState::Idle,
            progress: 0,
            entries_parsed: 0,
            bytes_processed: 0,
            message: String::new(),
            run_id: None,
            started_at: None,
            updated_at: Utc::now(),
        }
    }
}

/// Shared cancellation signal
///
/// Set by an external request, polled by the running stage. Cloning shares
/// the underlying flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once cancellation has been requested
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(IngestError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Status holder and run slot for one pipeline
#[derive(Debug, Default)]
pub struct PipelineController {
    status: Mutex<PipelineStatus>,
    running: AtomicBool,
    cancel: CancellationFlag,
}

impl PipelineController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consistent copy of the current status
    pub fn status(&self) -> PipelineStatus {
        self.lock().clone()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Request cancellation of the active run
    ///
    /// A request made while no run is active is discarded by the next
    /// [`try_begin`](Self::try_begin).
    pub fn cancel(&self) {
        info!("Cancellation requested");
        self.cancel.cancel();
    }

    pub fn cancellation_flag(&self) -> CancellationFlag {
        self.cancel.clone()
    }

    /// Claim the run slot
    ///
    /// Fails with [`IngestError::AlreadyRunning`] without touching the status
    /// when another run holds the slot.
    pub fn try_begin(self: &Arc<Self>) -> Result<RunGuard> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("Rejected start request: a run is already active");
            return Err(IngestError::AlreadyRunning);
        }

        self.cancel.reset();
        Ok(RunGuard {
            controller: Arc::clone(self),
            run_id: Uuid::new_v4(),
        })
    }

    fn lock(&self) -> MutexGuard<'_, PipelineStatus> {
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn transition(&self, run_id: Uuid, next: PipelineState, message: &str) -> bool {
        let mut status = self.lock();
        let current = status.state;

        if !current.can_transition_to(next) {
            warn!(from = %current, to = %next, "Ignoring illegal pipeline transition");
            return false;
        }

        let now = Utc::now();
        let fresh_run =
            matches!(next, PipelineState::Decompressing | PipelineState::Parsing)
                && current != PipelineState::DecompressComplete;
        if fresh_run {
            *status = PipelineStatus {
                run_id: Some(run_id),
                started_at: Some(now),
                ..PipelineStatus::default()
            };
        }

        if next.is_active() {
            status.progress = 0;
        }
        if next == PipelineState::Complete || next == PipelineState::DecompressComplete {
            status.progress = 100;
        }

        status.state = next;
        status.message = message.to_string();
        status.updated_at = now;

        info!(run_id = %run_id, from = %current, to = %next, "{}", message);
        true
    }

    fn report(&self, progress: u8, entries_parsed: u64, bytes_processed: u64) {
        let mut status = self.lock();
        if !status.state.is_active() {
            return;
        }
        status.progress = progress.min(100);
        status.entries_parsed = entries_parsed;
        status.bytes_processed = bytes_processed;
        status.updated_at = Utc::now();
    }
}

/// Exclusive claim on a pipeline for the duration of one run
///
/// Dropping the guard frees the run slot. A guard dropped before the run
/// reached a terminal state marks the run as failed.
#[derive(Debug)]
pub struct RunGuard {
    controller: Arc<PipelineController>,
    run_id: Uuid,
}

impl RunGuard {
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn cancellation_flag(&self) -> CancellationFlag {
        self.controller.cancellation_flag()
    }

    /// Move to `next`; returns false when the transition is illegal
    pub fn enter(&self, next: PipelineState, message: &str) -> bool {
        self.controller.transition(self.run_id, next, message)
    }

    /// Update the counters of the active stage
    pub fn report(&self, progress: u8, entries_parsed: u64, bytes_processed: u64) {
        self.controller.report(progress, entries_parsed, bytes_processed);
    }

    /// Record `err` as the run's terminal state
    ///
    /// Cancellation lands in `cancelled`; anything else in `error`.
    pub fn record_failure(&self, err: &IngestError) {
        if err.is_cancelled() {
            self.enter(PipelineState::Cancelled, "Import cancelled");
        } else {
            self.enter(PipelineState::Error, &err.to_string());
        }
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        let state = self.controller.lock().state;
        if state != PipelineState::Idle && !state.is_terminal() {
            self.enter(PipelineState::Error, "run aborted");
        }
        self.controller.running.store(false, Ordering::SeqCst);
    }
}
