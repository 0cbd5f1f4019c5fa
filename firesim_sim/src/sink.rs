//! In-memory sink that records every delivered event.

use async_trait::async_trait;
use firesim_env::{EnvError, EventSink};
use std::sync::{Mutex, PoisonError};

/// Collects events in delivery order. Never disconnects.
#[derive(Debug, Default)]
pub struct RecordingSink<T> {
    events: Mutex<Vec<T>>,
}

impl<T: Clone> RecordingSink<T> {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    /// Copy of everything delivered so far.
    pub fn events(&self) -> Vec<T> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl<T: Send + 'static> EventSink<T> for RecordingSink<T> {
    async fn deliver(&self, item: T) -> Result<(), EnvError> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).push(item);
        Ok(())
    }

    async fn closed(&self) {
        std::future::pending::<()>().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SimContext;
    use firesim_core::{CellState, Coord, Grid, Parameters, Session, SessionState, StreamEvent};
    use firesim_env::{FireContext, SessionId};
    use std::time::Duration;

    #[tokio::test]
    async fn test_session_on_virtual_clock() {
        let ctx = SimContext::new(3);
        let sink: RecordingSink<StreamEvent> = RecordingSink::new();

        let mut grid = Grid::square(3).unwrap();
        grid.paint(Coord::new(0, 0), CellState::Burning).unwrap();
        // An hour between generations costs nothing on the virtual clock
        let params = Parameters::default()
            .with_p_burn(1.0)
            .with_burn_time(1)
            .with_update_interval(3600.0);
        let session = Session::new(SessionId::from_seed(1), grid, params, ctx.derive_rng(0)).unwrap();

        let report = session.run(&ctx, &sink).await;

        assert_eq!(report.state, SessionState::Completed);
        assert_eq!(report.elapsed, Duration::from_secs(7200));
        assert_eq!(sink.len(), 4);
        assert_eq!(sink.events().last(), Some(&StreamEvent::End));
    }
}
