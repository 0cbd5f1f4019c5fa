//! Fire Session Environment Abstraction Layer
//!
//! This crate provides the abstraction allowing the fire session engine to
//! run in both **Production** (tokio) and **Simulation** (virtual clock)
//! environments.
//!
//! # Core Concept
//!
//! A session loop touches the outside world in three ways:
//! - Time (`now()`, `sleep()`)
//! - Randomness (`derive_rng()`)
//! - Its consumer (`EventSink::deliver()`, `EventSink::closed()`)
//!
//! Routing all three through traits lets the same loop run against tokio
//! timers in production and against a seeded virtual clock in tests.
//!
//! # Example
//!
//! ```ignore
//! use firesim_env::{FireContext, EventSink};
//!
//! async fn drive<Ctx: FireContext, S: EventSink<u64>>(ctx: &Ctx, sink: &S) {
//!     loop {
//!         tokio::select! {
//!             _ = sink.closed() => break,
//!             _ = ctx.sleep(Duration::from_millis(100)) => tick(),
//!         }
//!     }
//! }
//! ```

mod context;
mod error;
mod sink;
mod tokio_impl;
mod types;

pub use context::FireContext;
pub use error::EnvError;
pub use sink::EventSink;
pub use tokio_impl::TokioContext;
pub use types::SessionId;
