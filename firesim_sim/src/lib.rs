//! Firesim Deterministic Simulation Harness
//!
//! Runs fire sessions end to end on a virtual clock and checks every emitted
//! diff against the transition rule.
//!
//! # Core Principle
//!
//! All sources of non-determinism are controlled:
//! - **Time**: virtual clock advances only when a session waits
//! - **Randomness**: scenario layout and ignition draws derive from one seed
//! - **Consumers**: the stream is read in-process, through the same registry
//!   and wire payload a remote client would use
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                    ScenarioRunner                    │
//! │                                                      │
//! │  ScenarioId ──build──► Grid ──JSON──► SessionRegistry│
//! │                                          │           │
//! │                                   open_stream        │
//! │                                          ▼           │
//! │  ReplayOracle ◄──────── events ──── SessionStream    │
//! │       │                                              │
//! │       └──► ScenarioResult / RunExport                │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use firesim_sim::{RunnerConfig, ScenarioRunner};
//! use firesim_sim::scenarios::ScenarioId;
//!
//! let runner = ScenarioRunner::new(RunnerConfig::default().with_seed(7));
//! let result = runner.run(ScenarioId::Firebreak).await?;
//! assert!(result.passed);
//! ```

mod context;
mod exporter;
mod oracle;
mod runner;
mod sink;
pub mod scenarios;

pub use context::SimContext;
pub use exporter::{ExportFrame, RunExport};
pub use oracle::{ReplayOracle, Violation};
pub use runner::{RunnerConfig, ScenarioResult, ScenarioRunner};
pub use sink::RecordingSink;
