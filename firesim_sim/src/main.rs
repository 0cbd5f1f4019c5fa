//! Firesim CLI
//!
//! Run forest-fire scenarios through the session engine and validate the
//! emitted streams.

use clap::Parser;
use firesim_core::Parameters;
use firesim_env::TokioContext;
use firesim_sim::scenarios::ScenarioId;
use firesim_sim::{RunExport, RunnerConfig, ScenarioResult, ScenarioRunner};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// Forest-fire session simulator
#[derive(Parser, Debug)]
#[command(name = "firesim")]
#[command(about = "Run forest-fire scenarios through the session engine", long_about = None)]
struct Args {
    /// Master seed for determinism (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Scenario to run (center_spark, corners, line_front, scattered, firebreak, all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// Side of the square field
    #[arg(long, default_value = "20")]
    size: u32,

    /// Ignition probability per candidate tree
    #[arg(long, default_value = "0.3")]
    p_burn: f64,

    /// Ticks a cell burns before it is extinguished
    #[arg(long, default_value = "3")]
    burn_time: u32,

    /// Seconds between generations
    #[arg(short, long, default_value = "0.1")]
    interval: f64,

    /// Wait on the wall clock instead of the virtual one
    #[arg(long)]
    realtime: bool,

    /// Cancel each session after this many generations
    #[arg(long)]
    max_generations: Option<u64>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,

    /// Export the run's frames to a JSON file
    #[arg(long)]
    export: Option<String>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    if !args.json {
        info!("Firesim v{}", env!("CARGO_PKG_VERSION"));
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    let scenarios: Vec<ScenarioId> = if args.scenario == "all" {
        ScenarioId::all()
    } else {
        match args.scenario.parse() {
            Ok(scenario) => vec![scenario],
            Err(e) => {
                eprintln!("Error: {}", e);
                eprintln!("Available scenarios: center_spark, corners, line_front, scattered, firebreak, all");
                std::process::exit(1);
            }
        }
    };

    let seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(1)
    } else {
        args.seed
    };

    let params = Parameters::default()
        .with_p_burn(args.p_burn)
        .with_burn_time(args.burn_time)
        .with_interaction_area(args.size)
        .with_update_interval(args.interval);
    if let Err(e) = params.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    let config = RunnerConfig::default()
        .with_seed(seed)
        .with_side(args.size)
        .with_params(params)
        .with_max_generations(args.max_generations);

    if let Some(export_path) = &args.export {
        if scenarios.len() > 1 {
            eprintln!("Error: --export only supports a single scenario, not 'all'");
            std::process::exit(1);
        }

        info!("Running with export to: {}", export_path);
        if !args.json {
            info!("▶ {}: {}", scenarios[0].name(), scenarios[0].description());
        }
        let outcome = if args.realtime {
            ScenarioRunner::with_context(config, TokioContext::shared())
                .run_with_export(scenarios[0])
                .await
        } else {
            ScenarioRunner::new(config).run_with_export(scenarios[0]).await
        };

        let (result, export) = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("✗ {} could not run: {}", scenarios[0].name(), e);
                std::process::exit(1);
            }
        };
        write_export(&export, export_path);
        if !args.json {
            log_result(&result);
        }
        report(&[result], args.json);
        return;
    }

    let mut results: Vec<ScenarioResult> = Vec::new();
    for scenario in &scenarios {
        if !args.json {
            info!("▶ {}: {}", scenario.name(), scenario.description());
        }
        let outcome = if args.realtime {
            ScenarioRunner::with_context(config, TokioContext::shared())
                .run(*scenario)
                .await
        } else {
            ScenarioRunner::new(config).run(*scenario).await
        };

        match outcome {
            Ok(result) => {
                if !args.json {
                    log_result(&result);
                }
                results.push(result);
            }
            Err(e) => {
                error!("✗ {} could not run: {}", scenario.name(), e);
                std::process::exit(1);
            }
        }
    }

    report(&results, args.json);
}

fn write_export(export: &RunExport, path: &str) {
    if let Err(e) = export.write_to_file(path) {
        error!("Failed to write export: {:?}", e);
    } else {
        info!("Exported {} frames to {}", export.frames.len(), path);
    }
}

fn log_result(result: &ScenarioResult) {
    if result.passed {
        info!(
            "✓ {} (seed={}) PASSED | generations={} burnt={} remaining={} t={:.1}s",
            result.scenario.name(),
            result.seed,
            result.generations,
            result.trees_burnt,
            result.trees_remaining,
            result.final_time_secs
        );
    } else {
        error!(
            "✗ {} (seed={}) FAILED: {}",
            result.scenario.name(),
            result.seed,
            result.failure_reason.as_deref().unwrap_or("unknown")
        );
    }
}

/// Prints the summary and exits non-zero if any run failed.
fn report(results: &[ScenarioResult], json: bool) {
    let total = results.len();
    let failed = results.iter().filter(|r| !r.passed).count();

    if json {
        let summary = serde_json::json!({
            "total": total,
            "passed": total - failed,
            "failed": failed,
            "results": results.iter().map(|r| {
                serde_json::json!({
                    "scenario": r.scenario.name(),
                    "seed": r.seed,
                    "passed": r.passed,
                    "generations": r.generations,
                    "treesBurnt": r.trees_burnt,
                    "treesRemaining": r.trees_remaining,
                    "completed": r.completed,
                    "timeSecs": r.final_time_secs,
                    "failureReason": r.failure_reason,
                })
            }).collect::<Vec<_>>(),
        });
        match serde_json::to_string_pretty(&summary) {
            Ok(text) => println!("{}", text),
            Err(e) => error!("Failed to encode summary: {}", e),
        }
    } else {
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        if failed == 0 {
            info!("✅ All {} scenario runs passed!", total);
        } else {
            error!("❌ {}/{} scenario runs failed!", failed, total);
            for result in results.iter().filter(|r| !r.passed) {
                error!(
                    "  - {} seed={}: {}",
                    result.scenario.name(),
                    result.seed,
                    result.failure_reason.as_deref().unwrap_or("unknown")
                );
            }
        }
    }

    if failed > 0 {
        std::process::exit(1);
    }
}
