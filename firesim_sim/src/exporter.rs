//! JSON exporter for recorded runs.
//!
//! Writes the initial field plus every emitted diff so a run can be replayed
//! or plotted offline.

use firesim_core::{Cell, DiffBatch, Parameters};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::time::{SystemTime, UNIX_EPOCH};

/// One emitted generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportFrame {
    /// Context time when the batch was received, in seconds
    pub time_sec: f64,

    /// 1-based generation number
    pub generation: u64,

    /// Cells changed by this generation
    pub changes: DiffBatch,
}

/// Complete run export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunExport {
    /// Scenario name
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    /// Context wall-clock time when the stream opened, ms since the Unix epoch
    pub recorded_at_ms: u64,

    pub width: u32,
    pub height: u32,
    pub params: Parameters,

    /// Non-Tree cells of the initial field
    pub initial: Vec<Cell>,

    /// Time of the last frame in seconds
    pub duration_sec: f64,

    /// All frames
    pub frames: Vec<ExportFrame>,

    /// Whether the stream ended with the terminal marker
    pub completed: bool,

    /// Final verdict
    pub passed: bool,
}

impl RunExport {
    /// Creates a new export container.
    pub fn new(scenario: &str, seed: u64, width: u32, height: u32, params: Parameters, initial: Vec<Cell>) -> Self {
        Self {
            scenario: scenario.to_string(),
            seed,
            recorded_at_ms: 0,
            width,
            height,
            params,
            initial,
            duration_sec: 0.0,
            frames: Vec::new(),
            completed: false,
            passed: false,
        }
    }

    /// Stamps the wall-clock time the run started at.
    pub fn set_recorded_at(&mut self, at: SystemTime) {
        self.recorded_at_ms = at
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0);
    }

    /// Adds a frame.
    pub fn add_frame(&mut self, frame: ExportFrame) {
        self.duration_sec = frame.time_sec;
        self.frames.push(frame);
    }

    /// Finalizes the export.
    pub fn finalize(&mut self, completed: bool, passed: bool) {
        self.completed = completed;
        self.passed = passed;
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}
