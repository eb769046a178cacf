//! DC-net Benchmark Harness
//!
//! Runs parameter sweeps over complete DC-net executions and writes one CSV
//! file per sweep. Sweep definitions come from a JSON config file:
//!
//! ```json
//! [
//!   { "mode": "n", "k": 1, "msg_len": 1024, "min": 3, "max": 30, "step": 3 },
//!   { "mode": "k", "n": 10, "msg_len": 1024, "shamir": true, "min": 2, "max": 10 },
//!   { "mode": "bytes_per_round", "n": 5, "msg_len": 4096, "min": 8, "max": 256 }
//! ]
//! ```

mod sweep;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, Level};

/// DC-net benchmarking
#[derive(Parser)]
#[command(name = "dcnet-bench")]
#[command(about = "Parameter sweeps for the DC-net protocol engine")]
#[command(version)]
struct Cli {
    /// Sweep definitions (JSON array of tasks)
    #[arg(short, long, env = "DCNET_BENCH_CONFIG", default_value = "benchmarks.json")]
    config: PathBuf,

    /// Output folder for CSV results
    #[arg(short, long, env = "DCNET_BENCH_OUT", default_value = ".")]
    out: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    std::fs::create_dir_all(&cli.out)?;

    let raw = std::fs::read_to_string(&cli.config)
        .with_context(|| format!("reading config file {}", cli.config.display()))?;
    let tasks: Vec<sweep::SweepTask> =
        serde_json::from_str(&raw).context("parsing sweep definitions")?;

    info!(tasks = tasks.len(), "starting benchmark run");
    for task in &tasks {
        info!(task = %task.label(), "running sweep");
        let measurements = task.run().await?;
        sweep::write_csv(task, &measurements, &cli.out)?;
    }
    info!("benchmark run complete");

    Ok(())
}
