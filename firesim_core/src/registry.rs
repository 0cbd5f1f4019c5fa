//! Session Registry - process-wide session-id → session lookup.
//!
//! The registry is the one shared structure in the engine. It guards only
//! its own map; a session's internals are owned by its driving task once a
//! stream is opened.
//!
//! # Lifecycle
//!
//! ```text
//! create ──► [Created entry] ──open_stream──► [Running entry] ──┐
//!               │                                               │
//!               └───────────── cancel / delete ─────────────────┤
//!                                                               ▼
//!                                       removed exactly once (first remover wins)
//! ```

use crate::cancel::CancelSignal;
use crate::error::FireError;
use crate::grid::Grid;
use crate::params::Parameters;
use crate::session::{Session, SessionState, SessionStream};
use crate::wire::CreateSessionRequest;

use firesim_env::{FireContext, SessionId};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Read-only view of a registered session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    pub id: SessionId,
    pub state: SessionState,
    pub params: Parameters,
    pub width: u32,
    pub height: u32,
    cancel: CancelSignal,
}

impl SessionHandle {
    /// Signals cancellation on the session without removing it.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Registry bookkeeping for one session.
struct SessionEntry {
    state: SessionState,
    params: Parameters,
    width: u32,
    height: u32,
    cancel: CancelSignal,
    /// Present until a stream takes ownership
    session: Option<Session>,
}

/// Owns every live session of one process.
pub struct SessionRegistry<Ctx: FireContext> {
    /// Environment context (time, spawn, randomness)
    context: Arc<Ctx>,

    /// Live sessions
    sessions: Mutex<HashMap<SessionId, SessionEntry>>,

    /// Seed extension handed to the next unseeded session
    next_extension: AtomicU64,
}

impl<Ctx: FireContext> SessionRegistry<Ctx> {
    /// Creates an empty registry.
    pub fn new(context: Arc<Ctx>) -> Self {
        Self {
            context,
            sessions: Mutex::new(HashMap::new()),
            next_extension: AtomicU64::new(0),
        }
    }

    /// Creates an Arc-wrapped registry for sharing across tasks.
    pub fn shared(context: Arc<Ctx>) -> Arc<Self> {
        Arc::new(Self::new(context))
    }

    pub fn context(&self) -> &Arc<Ctx> {
        &self.context
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<SessionId, SessionEntry>> {
        // Entries stay structurally valid even if a holder panicked
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a new session in `Created` state.
    ///
    /// The session's RNG is derived from the context.
    pub fn create(&self, grid: Grid, params: Parameters) -> Result<SessionId, FireError> {
        let extension = self.next_extension.fetch_add(1, Ordering::Relaxed);
        let rng = self.context.derive_rng(extension);
        self.insert(grid, params, rng)
    }

    /// Registers a session with a fixed RNG seed.
    pub fn create_seeded(
        &self,
        grid: Grid,
        params: Parameters,
        seed: u64,
    ) -> Result<SessionId, FireError> {
        self.insert(grid, params, ChaCha8Rng::seed_from_u64(seed))
    }

    /// Validates a creation payload and registers the session it describes.
    pub fn create_from_request(&self, request: CreateSessionRequest) -> Result<SessionId, FireError> {
        let (grid, params, seed) = request.into_parts()?;
        match seed {
            Some(seed) => self.create_seeded(grid, params, seed),
            None => self.create(grid, params),
        }
    }

    fn insert(&self, grid: Grid, params: Parameters, rng: ChaCha8Rng) -> Result<SessionId, FireError> {
        let (width, height, cells) = (grid.width(), grid.height(), grid.len());

        let mut sessions = self.sessions();
        let mut id = SessionId::new();
        while sessions.contains_key(&id) {
            id = SessionId::new();
        }

        let session = Session::new(id, grid, params, rng)?;
        let burning = session.active().len();
        sessions.insert(
            id,
            SessionEntry {
                state: SessionState::Created,
                params,
                width,
                height,
                cancel: session.cancel_signal(),
                session: Some(session),
            },
        );
        drop(sessions);

        info!(session = %id, cells, burning, "session created");
        Ok(id)
    }

    /// Looks up a session.
    pub fn get(&self, id: SessionId) -> Result<SessionHandle, FireError> {
        let sessions = self.sessions();
        let entry = sessions.get(&id).ok_or(FireError::NotFound(id))?;
        Ok(SessionHandle {
            id,
            state: entry.state,
            params: entry.params,
            width: entry.width,
            height: entry.height,
            cancel: entry.cancel.clone(),
        })
    }

    /// Signals cancellation and removes the session.
    ///
    /// `NotFound` if the id is unknown or already terminated.
    pub fn cancel(&self, id: SessionId) -> Result<(), FireError> {
        let entry = self.sessions().remove(&id);
        match entry {
            Some(entry) => {
                entry.cancel.cancel();
                info!(session = %id, "session cancelled");
                Ok(())
            }
            None => {
                warn!(session = %id, "cancel for unknown session");
                Err(FireError::NotFound(id))
            }
        }
    }

    /// Removes the session if present. Returns whether this call removed it.
    ///
    /// Removing twice is a no-op.
    pub fn delete(&self, id: SessionId) -> bool {
        let removed = self.sessions().remove(&id).is_some();
        if removed {
            debug!(session = %id, "session removed");
        }
        removed
    }

    /// Starts the session's driving loop and returns its consumer side.
    ///
    /// The loop runs on a task spawned through the context. When it reaches
    /// a terminal state the entry is removed from the registry.
    pub fn open_stream(self: &Arc<Self>, id: SessionId) -> Result<SessionStream, FireError> {
        let session = {
            let mut sessions = self.sessions();
            let entry = sessions.get_mut(&id).ok_or(FireError::NotFound(id))?;
            let session = entry.session.take().ok_or(FireError::AlreadyStreaming(id))?;
            entry.state = SessionState::Running;
            session
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let stream = SessionStream::new(id, rx, session.cancel_signal());

        let guard = RemovalGuard {
            registry: Arc::clone(self),
            id,
        };
        let context = Arc::clone(&self.context);
        self.context.spawn(&format!("session-{}", id), async move {
            let _guard = guard;
            let report = session.run(context.as_ref(), &tx).await;
            debug!(session = %report.id, state = ?report.state, "driving task done");
        });

        Ok(stream)
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions().contains_key(&id)
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions().is_empty()
    }
}

/// Removes a session's entry when its driving task ends, unwinding included.
struct RemovalGuard<Ctx: FireContext> {
    registry: Arc<SessionRegistry<Ctx>>,
    id: SessionId,
}

impl<Ctx: FireContext> Drop for RemovalGuard<Ctx> {
    fn drop(&mut self) {
        self.registry.delete(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{CellState, Coord};
    use crate::session::StreamEvent;
    use firesim_env::TokioContext;
    use std::time::Duration;

    fn registry() -> Arc<SessionRegistry<TokioContext>> {
        SessionRegistry::shared(TokioContext::shared())
    }

    fn spark_grid(side: u32) -> Grid {
        let mut grid = Grid::square(side).unwrap();
        grid.paint(Coord::new(0, 0), CellState::Burning).unwrap();
        grid
    }

    fn fast(p_burn: f64, burn_time: u32) -> Parameters {
        Parameters::default()
            .with_p_burn(p_burn)
            .with_burn_time(burn_time)
            .with_update_interval(0.001)
    }

    async fn wait_until_removed(registry: &SessionRegistry<TokioContext>, id: SessionId) {
        for _ in 0..200 {
            if !registry.contains(id) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("session {} was never removed", id);
    }

    #[test]
    fn test_create_and_get() {
        let registry = registry();
        let id = registry.create(spark_grid(3), fast(1.0, 1)).unwrap();

        let handle = registry.get(id).unwrap();
        assert_eq!(handle.state, SessionState::Created);
        assert_eq!((handle.width, handle.height), (3, 3));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_create_rejects_invalid_params() {
        let registry = registry();
        let err = registry
            .create(spark_grid(3), Parameters::default().with_burn_time(0))
            .unwrap_err();

        assert!(matches!(err, FireError::InvalidInput(_)));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unknown_ids_are_not_found() {
        let registry = registry();
        let id = SessionId::new();

        assert!(matches!(registry.get(id), Err(FireError::NotFound(_))));
        assert!(matches!(registry.cancel(id), Err(FireError::NotFound(_))));
        assert!(matches!(registry.open_stream(id), Err(FireError::NotFound(_))));
        assert!(!registry.delete(id));
    }

    #[test]
    fn test_cancel_removes_and_signals() {
        let registry = registry();
        let id = registry.create(spark_grid(3), fast(1.0, 1)).unwrap();
        let handle = registry.get(id).unwrap();

        registry.cancel(id).unwrap();

        assert!(handle.is_cancelled());
        assert!(matches!(registry.get(id), Err(FireError::NotFound(_))));
        assert!(matches!(registry.cancel(id), Err(FireError::NotFound(_))));
    }

    #[test]
    fn test_delete_is_idempotent() {
        let registry = registry();
        let id = registry.create(spark_grid(3), fast(1.0, 1)).unwrap();

        assert!(registry.delete(id));
        assert!(!registry.delete(id));
    }

    #[tokio::test]
    async fn test_stream_runs_to_completion_and_unregisters() {
        let registry = registry();
        let id = registry.create(spark_grid(3), fast(1.0, 1)).unwrap();

        let stream = registry.open_stream(id).unwrap();
        assert_eq!(registry.get(id).map(|h| h.state).ok(), Some(SessionState::Running));

        let events = stream.collect().await;
        let sizes: Vec<usize> = events.iter().filter_map(StreamEvent::batch).map(|b| b.len()).collect();
        assert_eq!(sizes, vec![9, 9, 8]);
        assert_eq!(events.last(), Some(&StreamEvent::End));

        wait_until_removed(&registry, id).await;
    }

    #[tokio::test]
    async fn test_failed_session_is_unregistered() {
        let registry = registry();
        let id = registry.create(spark_grid(3), fast(1.0, 1)).unwrap();
        registry
            .sessions()
            .get_mut(&id)
            .and_then(|entry| entry.session.as_mut())
            .unwrap()
            .force_active(99);

        let events = registry.open_stream(id).unwrap().collect().await;

        assert!(events.is_empty());
        wait_until_removed(&registry, id).await;
        assert!(matches!(registry.get(id), Err(FireError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_second_stream_is_rejected() {
        let registry = registry();
        let id = registry
            .create(spark_grid(5), fast(0.0, 100).with_update_interval(3600.0))
            .unwrap();

        let _stream = registry.open_stream(id).unwrap();
        assert!(matches!(registry.open_stream(id), Err(FireError::AlreadyStreaming(_))));
    }

    #[tokio::test]
    async fn test_cancel_stops_a_running_stream() {
        let registry = registry();
        let id = registry
            .create(spark_grid(5), fast(0.0, 100).with_update_interval(3600.0))
            .unwrap();

        let mut stream = registry.open_stream(id).unwrap();
        let first = stream.next().await.unwrap();
        assert_eq!(first.batch().map(|b| b.len()), Some(1));

        registry.cancel(id).unwrap();

        let next = tokio::time::timeout(Duration::from_secs(2), stream.next())
            .await
            .expect("stream should end promptly");
        assert_eq!(next, None);
        assert!(matches!(registry.get(id), Err(FireError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_dropping_stream_tears_down_session() {
        let registry = registry();
        let id = registry
            .create(spark_grid(5), fast(0.0, 100).with_update_interval(3600.0))
            .unwrap();

        let handle = registry.get(id).unwrap();
        let stream = registry.open_stream(id).unwrap();
        drop(stream);

        assert!(handle.is_cancelled());
        wait_until_removed(&registry, id).await;
    }

    #[tokio::test]
    async fn test_seeded_requests_reproduce() {
        let registry = registry();
        let params = fast(0.45, 2);
        let request = CreateSessionRequest::from_grid(&spark_grid(11), params).with_seed(2024);

        let a = registry.create_from_request(request.clone()).unwrap();
        let b = registry.create_from_request(request).unwrap();
        assert_ne!(a, b);

        let events_a = registry.open_stream(a).unwrap().collect().await;
        let events_b = registry.open_stream(b).unwrap().collect().await;
        assert_eq!(events_a, events_b);
        assert_eq!(events_a.last(), Some(&StreamEvent::End));
    }

    #[tokio::test]
    async fn test_concurrent_sessions_are_isolated() {
        let registry = registry();
        let ids: Vec<SessionId> = (0..8)
            .map(|_| registry.create(spark_grid(5), fast(1.0, 1)).unwrap())
            .collect();

        let streams: Vec<SessionStream> = ids.iter().map(|id| registry.open_stream(*id).unwrap()).collect();
        let mut handles = Vec::new();
        for stream in streams {
            handles.push(tokio::spawn(stream.collect()));
        }

        for handle in handles {
            let events = handle.await.unwrap();
            assert_eq!(events.last(), Some(&StreamEvent::End));
        }
        for id in ids {
            wait_until_removed(&registry, id).await;
        }
    }
}
