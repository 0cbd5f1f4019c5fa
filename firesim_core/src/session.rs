//! Simulation Session - one isolated run driven by a timed loop.
//!
//! # State machine
//!
//! ```text
//!                       ┌──► Completed  (active set empty, terminal marker sent)
//! Created ──► Running ──┼──► Cancelled  (signal or consumer disconnect)
//!                       └──► Failed     (fault inside a generation)
//! ```
//!
//! The loop owns the grid, the active set and the RNG exclusively; nothing
//! else mutates them, so no locks are taken on per-session data.

use crate::cancel::CancelSignal;
use crate::error::FireError;
use crate::grid::{ActiveSet, Grid};
use crate::params::Parameters;
use crate::stats::SessionStats;
use crate::transition::{self, DiffBatch};

use firesim_env::{EventSink, FireContext, SessionId};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Created,
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }
}

/// One item of a session's output sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Cells changed by one generation
    Batch(DiffBatch),

    /// Normal completion: nothing is left to burn
    End,
}

impl StreamEvent {
    pub fn is_end(&self) -> bool {
        matches!(self, Self::End)
    }

    pub fn batch(&self) -> Option<&DiffBatch> {
        match self {
            Self::Batch(batch) => Some(batch),
            Self::End => None,
        }
    }
}

/// Summary produced when the loop exits.
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub id: SessionId,
    pub state: SessionState,
    pub stats: SessionStats,
    /// Failure description for `Failed` sessions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
    /// Context time spent in `Running`
    pub elapsed: Duration,
}

/// One simulation run: grid, parameters, active set, RNG and cancellation.
pub struct Session {
    id: SessionId,
    grid: Grid,
    params: Parameters,
    active: ActiveSet,
    rng: ChaCha8Rng,
    cancel: CancelSignal,
    state: SessionState,
    stats: SessionStats,
}

impl Session {
    /// Binds a grid and parameters into a `Created` session.
    ///
    /// Scans the grid once to seed the active set.
    pub fn new(
        id: SessionId,
        grid: Grid,
        params: Parameters,
        rng: ChaCha8Rng,
    ) -> Result<Self, FireError> {
        params.validate()?;

        let active = grid.burning_positions();
        let stats = SessionStats {
            peak_active: active.len(),
            ..SessionStats::default()
        };

        Ok(Self {
            id,
            grid,
            params,
            active,
            rng,
            cancel: CancelSignal::new(),
            state: SessionState::Created,
            stats,
        })
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn params(&self) -> &Parameters {
        &self.params
    }

    pub fn active(&self) -> &ActiveSet {
        &self.active
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// A handle to this session's cancellation signal.
    pub fn cancel_signal(&self) -> CancelSignal {
        self.cancel.clone()
    }

    /// Marks `position` active whether or not the grid has it.
    #[cfg(test)]
    pub(crate) fn force_active(&mut self, position: usize) {
        self.active.insert(position);
    }

    /// Computes one generation without any timing.
    pub fn step(&mut self) -> Result<DiffBatch, FireError> {
        let batch = transition::step(&mut self.grid, &self.params, &mut self.active, &mut self.rng)?;
        self.stats.record_generation(batch.len(), self.active.len());

        debug!(
            session = %self.id,
            generation = self.stats.generations,
            changed = batch.len(),
            active = self.active.len(),
            "generation"
        );

        Ok(batch)
    }

    /// Drives the session to a terminal state, delivering batches to `sink`.
    ///
    /// Cancellation is observed before every generation and during the wait
    /// between generations. A consumer that disconnects cancels the session.
    /// Consumes the session: the grid is released when this returns.
    pub async fn run<Ctx, S>(mut self, ctx: &Ctx, sink: &S) -> SessionReport
    where
        Ctx: FireContext,
        S: EventSink<StreamEvent>,
    {
        self.state = SessionState::Running;
        let interval = self.params.update_interval();
        let started = ctx.now();

        info!(
            session = %self.id,
            cells = self.grid.len(),
            burning = self.active.len(),
            interval_ms = interval.as_millis() as u64,
            "session running"
        );

        let mut failure = None;
        let terminal = loop {
            if self.cancel.is_cancelled() {
                break SessionState::Cancelled;
            }

            let batch = match self.step() {
                Ok(batch) => batch,
                Err(err) => {
                    error!(session = %self.id, error = %err, "generation failed");
                    failure = Some(err.to_string());
                    break SessionState::Failed;
                }
            };

            if !batch.is_empty() {
                if self.cancel.is_cancelled() {
                    break SessionState::Cancelled;
                }
                match sink.deliver(StreamEvent::Batch(batch)).await {
                    Ok(()) => self.stats.record_emission(),
                    Err(err) if err.is_disconnect() => {
                        debug!(session = %self.id, "consumer disconnected");
                        self.cancel.cancel();
                        break SessionState::Cancelled;
                    }
                    Err(err) => {
                        let err = FireError::from(err);
                        error!(session = %self.id, error = %err, "delivery failed");
                        failure = Some(err.to_string());
                        break SessionState::Failed;
                    }
                }
            }

            if self.active.is_empty() {
                if sink.deliver(StreamEvent::End).await.is_err() {
                    debug!(session = %self.id, "consumer left before the terminal marker");
                }
                break SessionState::Completed;
            }

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break SessionState::Cancelled,
                _ = sink.closed() => {
                    debug!(session = %self.id, "consumer disconnected while waiting");
                    self.cancel.cancel();
                    break SessionState::Cancelled;
                }
                _ = ctx.sleep(interval) => {}
            }
        };

        self.state = terminal;
        let elapsed = ctx.now().saturating_sub(started);

        info!(
            session = %self.id,
            state = ?terminal,
            generations = self.stats.generations,
            batches = self.stats.batches_emitted,
            "session finished"
        );

        SessionReport {
            id: self.id,
            state: terminal,
            stats: self.stats,
            failure,
            elapsed,
        }
    }
}

/// Consumer side of a running session.
///
/// Yields each batch, then `StreamEvent::End` on completion, then `None`.
/// Cancellation or failure ends the sequence with `None` and no marker.
/// Dropping the stream cancels the session.
pub struct SessionStream {
    id: SessionId,
    rx: mpsc::UnboundedReceiver<StreamEvent>,
    cancel: CancelSignal,
    done: bool,
}

impl SessionStream {
    pub(crate) fn new(
        id: SessionId,
        rx: mpsc::UnboundedReceiver<StreamEvent>,
        cancel: CancelSignal,
    ) -> Self {
        Self {
            id,
            rx,
            cancel,
            done: false,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Waits for the next event.
    pub async fn next(&mut self) -> Option<StreamEvent> {
        if self.done || self.cancel.is_cancelled() {
            self.done = true;
            return None;
        }

        let event = self.rx.recv().await;

        // Nothing is handed out once cancellation has been observed
        if self.cancel.is_cancelled() {
            self.done = true;
            return None;
        }
        if !matches!(event, Some(StreamEvent::Batch(_))) {
            self.done = true;
        }
        event
    }

    /// Signals cancellation without dropping the stream.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Drains the stream to its end.
    pub async fn collect(mut self) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.next().await {
            events.push(event);
        }
        events
    }
}

impl Drop for SessionStream {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
