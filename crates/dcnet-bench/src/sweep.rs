//! Sweep definitions and execution.
//!
//! A sweep grows one parameter of the network (member count, threshold or
//! round block width) and measures end-to-end throughput at each point by
//! running complete networks: start, enqueue a fixed-length message on
//! member 1, wait for the queue to drain, stop.

use anyhow::Result;
use chrono::Utc;
use dcnet_core::{
    util, DuplicateSplitCombine, Network, NetworkConfig, Participant, ShamirSplitCombine,
    SplitCombine,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Which parameter the sweep grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepMode {
    /// Member count from `min` to `max` in steps of `step`.
    N,
    /// Threshold from `min` to `max` in steps of `step`.
    K,
    /// Round block width doubling from `min` to `max`.
    BytesPerRound,
}

impl SweepMode {
    fn tag(self) -> &'static str {
        match self {
            SweepMode::N => "n",
            SweepMode::K => "k",
            SweepMode::BytesPerRound => "bpr",
        }
    }
}

/// One sweep task from the JSON config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepTask {
    pub mode: SweepMode,

    /// Member count (fixed value for sweeps that grow another parameter).
    #[serde(default = "default_n")]
    pub n: usize,

    /// Threshold (ignored and forced to 1 when `shamir` is false).
    #[serde(default = "default_k")]
    pub k: usize,

    #[serde(default = "default_bytes_per_round")]
    pub bytes_per_round: usize,

    /// Length of the message sent through each network, in bytes.
    pub msg_len: usize,

    /// Use the Shamir scheme instead of duplication.
    #[serde(default)]
    pub shamir: bool,

    pub min: usize,
    pub max: usize,

    #[serde(default = "default_step")]
    pub step: usize,

    /// Artificial per-round delay in milliseconds.
    #[serde(default)]
    pub delay_ms: u64,

    /// Networks run per sweep point.
    #[serde(default = "default_reps")]
    pub reps: usize,
}

fn default_n() -> usize {
    3
}

fn default_k() -> usize {
    1
}

fn default_bytes_per_round() -> usize {
    dcnet_core::DEFAULT_BYTES_PER_ROUND
}

fn default_step() -> usize {
    1
}

fn default_reps() -> usize {
    10
}

/// One measured sweep point.
#[derive(Debug, Clone)]
pub struct Measurement {
    pub x: usize,
    pub mean: f64,
    pub sigma: f64,
}

impl SweepTask {
    /// File-name label, joining every parameter of the task.
    pub fn label(&self) -> String {
        format!(
            "{}_{}_{}_{}_{}_{}_{}_{}_{}_{}",
            self.mode.tag(),
            self.n,
            self.k,
            self.bytes_per_round,
            self.msg_len,
            self.shamir,
            self.min,
            self.max,
            self.step,
            self.delay_ms
        )
    }

    fn points(&self) -> Vec<usize> {
        match self.mode {
            SweepMode::N | SweepMode::K => util::test_points(self.min, self.max, self.step),
            SweepMode::BytesPerRound => {
                let mut points = Vec::new();
                let mut width = self.min.max(1);
                while width <= self.max {
                    points.push(width);
                    width <<= 1;
                }
                points
            }
        }
    }

    /// Run the sweep, returning one measurement per point.
    pub async fn run(&self) -> Result<Vec<Measurement>> {
        // warm up scheduler and allocator before taking times
        for _ in 0..10 {
            run_network(3, 3, 32, 0, self.shamir, &[b'x'; 10]).await?;
        }

        let mut measurements = Vec::new();
        for x in self.points() {
            let (n, k, bytes_per_round) = match self.mode {
                SweepMode::N => (x, self.k, self.bytes_per_round),
                SweepMode::K => (self.n, x, self.bytes_per_round),
                SweepMode::BytesPerRound => (self.n, self.k, x),
            };
            // duplication is a 1-of-n scheme no matter what the task says
            let k = if self.shamir { k } else { 1 };

            let (mean, sigma) = self
                .measure(n, k, bytes_per_round)
                .await?;
            debug!(x, mean, sigma, "sweep point done");
            measurements.push(Measurement { x, mean, sigma });
        }
        Ok(measurements)
    }

    async fn measure(&self, n: usize, k: usize, bytes_per_round: usize) -> Result<(f64, f64)> {
        let message = vec![b'x'; self.msg_len];
        let mut throughputs = Vec::with_capacity(self.reps);
        for _ in 0..self.reps {
            let elapsed =
                run_network(n, k, bytes_per_round, self.delay_ms, self.shamir, &message).await?;
            // KiB per second
            throughputs.push((self.msg_len as f64 / 1024.0) / elapsed.as_secs_f64());
        }

        let mean = throughputs.iter().sum::<f64>() / throughputs.len() as f64;
        let sigma = if throughputs.len() > 1 {
            let variance = throughputs
                .iter()
                .map(|t| (t - mean) * (t - mean))
                .sum::<f64>()
                / (throughputs.len() - 1) as f64;
            variance.sqrt()
        } else {
            0.0
        };
        Ok((mean, sigma))
    }
}

/// Run one complete network end-to-end and return the wall time from start
/// to stop.
async fn run_network(
    n: usize,
    k: usize,
    bytes_per_round: usize,
    delay_ms: u64,
    shamir: bool,
    message: &[u8],
) -> Result<Duration> {
    let scheme: Arc<dyn SplitCombine> = if shamir {
        Arc::new(ShamirSplitCombine::new(n, k)?)
    } else {
        Arc::new(DuplicateSplitCombine::new(n)?)
    };
    let config = NetworkConfig {
        k,
        bytes_per_round,
        round_delay: Duration::from_millis(delay_ms),
    };
    let mut network = Network::new(config)?;

    let mut members = Vec::with_capacity(n);
    for i in 1..=n {
        let member = Arc::new(Participant::new(i, scheme.clone(), bytes_per_round));
        let buffer: Arc<Mutex<Vec<u8>>> = Arc::new(Mutex::new(Vec::new()));
        member.on_message_received(move |block| {
            buffer.lock().expect("receive buffer poisoned").extend_from_slice(block);
        });
        network.add_participant(member.clone())?;
        members.push(member);
    }

    let started = Instant::now();
    network.start()?;
    members[0].enqueue(message);

    while members[0].pending_to_send() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    network.stop().await?;
    Ok(started.elapsed())
}

/// Write the sweep results as `<out>/<label>.csv`.
pub fn write_csv(task: &SweepTask, measurements: &[Measurement], out: &Path) -> Result<PathBuf> {
    let path = out.join(format!("{}.csv", task.label()));
    let mut contents = format!("# generated {}\nx,y,sigma\n", Utc::now().to_rfc3339());
    for m in measurements {
        contents.push_str(&format!("{},{},{}\n", m.x, m.mean, m.sigma));
    }
    std::fs::write(&path, contents)?;
    info!(path = %path.display(), "sweep results written");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_task() {
        let json = r#"{
            "mode": "n",
            "k": 2,
            "msg_len": 1024,
            "shamir": true,
            "min": 3,
            "max": 9,
            "step": 3
        }"#;
        let task: SweepTask = serde_json::from_str(json).unwrap();
        assert_eq!(task.mode, SweepMode::N);
        assert_eq!(task.bytes_per_round, 32);
        assert_eq!(task.reps, 10);
        assert_eq!(task.points(), vec![3, 6, 9]);
    }

    #[test]
    fn test_bpr_points_double() {
        let json = r#"{"mode": "bytes_per_round", "msg_len": 64, "min": 8, "max": 64}"#;
        let task: SweepTask = serde_json::from_str(json).unwrap();
        assert_eq!(task.points(), vec![8, 16, 32, 64]);
    }

    #[test]
    fn test_label_joins_parameters() {
        let json = r#"{"mode": "k", "n": 5, "msg_len": 100, "min": 1, "max": 5}"#;
        let task: SweepTask = serde_json::from_str(json).unwrap();
        assert_eq!(task.label(), "k_5_1_32_100_false_1_5_1_0");
    }
}
