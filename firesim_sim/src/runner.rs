//! Scenario runner - drives sessions end to end through the registry.
//!
//! Each run goes the full client path: the scenario field is described as a
//! JSON creation request, registered, streamed, and every event is replayed
//! through a [`ReplayOracle`].

use crate::context::SimContext;
use crate::exporter::{ExportFrame, RunExport};
use crate::oracle::{ReplayOracle, Violation};
use crate::scenarios::ScenarioId;

use firesim_core::{CellState, CreateSessionRequest, FireError, Parameters, SessionRegistry, StreamEvent};
use firesim_env::FireContext;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Run configuration shared by every scenario of one runner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunnerConfig {
    /// Seed for scenario layout and ignition draws
    pub seed: u64,

    /// Side of the square field
    pub side: u32,

    /// Session parameters
    pub params: Parameters,

    /// Cancel the session after this many generations
    pub max_generations: Option<u64>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            side: 20,
            params: Parameters::default(),
            max_generations: None,
        }
    }
}

impl RunnerConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the field side; `interactionArea` follows it.
    pub fn with_side(mut self, side: u32) -> Self {
        self.side = side;
        self.params = self.params.with_interaction_area(side);
        self
    }

    pub fn with_params(mut self, params: Parameters) -> Self {
        self.params = params;
        self
    }

    pub fn with_max_generations(mut self, max: Option<u64>) -> Self {
        self.max_generations = max;
        self
    }
}

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether the stream obeyed every rule and the scenario check held
    pub passed: bool,

    /// Batches received
    pub generations: u64,

    /// Initial trees that caught fire
    pub trees_burnt: usize,

    /// Trees never touched by the fire
    pub trees_remaining: usize,

    /// Context time from stream open to the last event, in seconds
    pub final_time_secs: f64,

    /// Whether the stream ended with the terminal marker
    pub completed: bool,

    /// Failure message if any
    pub failure_reason: Option<String>,

    /// Rule violations found by the oracle
    pub violations: Vec<Violation>,
}

/// Runs fire scenarios against a session registry.
///
/// Uses the virtual clock of [`SimContext`] unless built with another context.
pub struct ScenarioRunner<Ctx: FireContext = SimContext> {
    config: RunnerConfig,
    registry: Arc<SessionRegistry<Ctx>>,
}

impl ScenarioRunner<SimContext> {
    /// Creates a runner on a fresh virtual clock seeded from the config.
    pub fn new(config: RunnerConfig) -> Self {
        Self::with_context(config, SimContext::shared(config.seed))
    }
}

impl<Ctx: FireContext> ScenarioRunner<Ctx> {
    /// Creates a runner on the given context.
    pub fn with_context(config: RunnerConfig, context: Arc<Ctx>) -> Self {
        Self {
            config,
            registry: SessionRegistry::shared(context),
        }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<SessionRegistry<Ctx>> {
        &self.registry
    }

    /// Runs a scenario and returns the result.
    pub async fn run(&self, scenario: ScenarioId) -> Result<ScenarioResult, FireError> {
        let (result, _) = self.execute(scenario, false).await?;
        Ok(result)
    }

    /// Runs a scenario and records every emitted frame.
    pub async fn run_with_export(&self, scenario: ScenarioId) -> Result<(ScenarioResult, RunExport), FireError> {
        let (result, export) = self.execute(scenario, true).await?;
        let export = export.ok_or_else(|| FireError::streaming("export was not recorded"))?;
        Ok((result, export))
    }

    async fn execute(
        &self,
        scenario: ScenarioId,
        record: bool,
    ) -> Result<(ScenarioResult, Option<RunExport>), FireError> {
        let RunnerConfig {
            seed,
            side,
            params,
            max_generations,
        } = self.config;

        let context = self.registry.context();
        info!(
            scenario = scenario.name(),
            seed,
            side,
            context_seed = context.seed(),
            "starting scenario"
        );

        let grid = scenario.build(side, seed)?;
        let initial_trees = grid.count(CellState::Tree);
        let mut oracle = ReplayOracle::new(&grid, params.burn_time);
        let mut export = record.then(|| {
            RunExport::new(
                scenario.name(),
                seed,
                grid.width(),
                grid.height(),
                params,
                grid.non_tree_cells(),
            )
        });

        // Same path as a remote client: serialize, parse, register
        let body = serde_json::to_string(&CreateSessionRequest::from_grid(&grid, params).with_seed(seed))?;
        drop(grid);
        let id = self.registry.create_from_request(CreateSessionRequest::from_json(&body)?)?;

        let started = context.now();
        if let Some(export) = export.as_mut() {
            export.set_recorded_at(context.system_time());
        }
        let mut stream = self.registry.open_stream(id)?;
        let mut capped = false;

        while let Some(event) = stream.next().await {
            oracle.apply(&event);

            if let (Some(export), StreamEvent::Batch(batch)) = (export.as_mut(), &event) {
                export.add_frame(ExportFrame {
                    time_sec: context.now().saturating_sub(started).as_secs_f64(),
                    generation: oracle.generations(),
                    changes: batch.clone(),
                });
            }

            if max_generations.map_or(false, |max| oracle.generations() >= max) && !event.is_end() {
                debug!(session = %id, generations = oracle.generations(), "generation cap reached");
                if let Err(err) = self.registry.cancel(id) {
                    warn!(session = %id, error = %err, "could not cancel capped session");
                }
                capped = true;
                break;
            }
        }
        drop(stream);

        let final_time_secs = context.now().saturating_sub(started).as_secs_f64();
        let trees_remaining = oracle.count(CellState::Tree);

        let failure_reason = if let Some(first) = oracle.violations().first() {
            Some(format!("{} rule violations, first: {}", oracle.violations().len(), first))
        } else if !oracle.ended() && !capped {
            Some("stream ended without the terminal marker".to_string())
        } else {
            scenario
                .check(|coord| oracle.cell(coord).map_or(false, |cell| !cell.is_tree()), side)
                .err()
        };
        let passed = failure_reason.is_none();

        let result = ScenarioResult {
            scenario,
            seed,
            passed,
            generations: oracle.generations(),
            trees_burnt: initial_trees.saturating_sub(trees_remaining),
            trees_remaining,
            final_time_secs,
            completed: oracle.ended(),
            failure_reason,
            violations: oracle.violations().to_vec(),
        };

        match &result.failure_reason {
            None => info!(
                scenario = scenario.name(),
                generations = result.generations,
                burnt = result.trees_burnt,
                remaining = result.trees_remaining,
                "scenario finished"
            ),
            Some(reason) => warn!(scenario = scenario.name(), seed, %reason, "scenario failed"),
        }

        if let Some(export) = export.as_mut() {
            export.finalize(result.completed, result.passed);
        }

        Ok((result, export))
    }
}
