//! Firesim Core - Forest Fire Cellular Automaton and Session Engine
//!
//! This library has two halves:
//! 1. **Transition rule**: advances a grid one generation using an
//!    incrementally maintained active set of burning cells, never rescanning
//!    the whole grid after the first pass.
//! 2. **Session engine**: owns one run's state, emits per-generation diffs on
//!    a fixed cadence, and tears down on completion, cancellation or
//!    consumer disconnect.
//!
//! # Example
//!
//! ```ignore
//! use firesim_core::{Grid, Parameters, SessionRegistry};
//! use firesim_env::TokioContext;
//!
//! let registry = SessionRegistry::shared(TokioContext::shared());
//! let id = registry.create(Grid::square(20)?, Parameters::default())?;
//! let mut stream = registry.open_stream(id)?;
//! while let Some(event) = stream.next().await {
//!     forward(event);
//! }
//! ```

pub mod cancel;
pub mod error;
pub mod grid;
pub mod neighbors;
pub mod params;
pub mod registry;
pub mod session;
pub mod stats;
pub mod transition;
pub mod wire;

// Re-export key types for convenience
pub use cancel::CancelSignal;
pub use error::FireError;
pub use grid::{ActiveSet, Cell, CellState, Coord, CoordIndex, Grid};
pub use neighbors::neighbors;
pub use params::Parameters;
pub use registry::{SessionHandle, SessionRegistry};
pub use session::{Session, SessionReport, SessionState, SessionStream, StreamEvent};
pub use stats::SessionStats;
pub use transition::{step, DiffBatch};
pub use wire::{CreateSessionRequest, CreateSessionResponse};
