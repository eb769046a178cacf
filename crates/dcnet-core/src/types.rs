//! Core types for the DC-net protocol

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Unique identifier for a participant in the network.
///
/// Identities are dense: a network of `n` members carries exactly the
/// identities `1..=n`.
pub type ParticipantId = usize;

/// Lifecycle state of a [`Network`](crate::network::Network).
///
/// States are traversed in one direction only; no state is ever revisited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetworkState {
    /// Freshly constructed, still accepting participants.
    Created,
    /// Workers are executing protocol rounds.
    Running,
    /// Stopped; workers have observed the flag and exited.
    Terminated,
}

/// Construction parameters for a network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Number of message parts needed to reconstruct a message. Used when
    /// assigning sharing partners at start.
    pub k: usize,

    /// Number of plaintext bytes transmitted each round. Every block, mask
    /// and accumulator in the network has exactly this width.
    pub bytes_per_round: usize,

    /// Artificial per-round delay simulating transmission latency.
    pub round_delay: Duration,
}

impl NetworkConfig {
    /// Create a configuration, rejecting degenerate parameters.
    pub fn new(k: usize, bytes_per_round: usize, round_delay: Duration) -> Result<Self> {
        if k < 1 {
            return Err(Error::InvalidConfig(
                "Threshold k must be at least 1".into(),
            ));
        }
        if bytes_per_round < 1 {
            return Err(Error::InvalidConfig(
                "Bytes per round must be at least 1".into(),
            ));
        }
        Ok(Self {
            k,
            bytes_per_round,
            round_delay,
        })
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            k: 1,
            bytes_per_round: crate::DEFAULT_BYTES_PER_ROUND,
            round_delay: Duration::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_rejects_zero_k() {
        assert!(NetworkConfig::new(0, 32, Duration::ZERO).is_err());
    }

    #[test]
    fn test_config_rejects_zero_width() {
        assert!(NetworkConfig::new(1, 0, Duration::ZERO).is_err());
    }

    #[test]
    fn test_default_config() {
        let config = NetworkConfig::default();
        assert_eq!(config.k, 1);
        assert_eq!(config.bytes_per_round, 32);
        assert_eq!(config.round_delay, Duration::ZERO);
    }
}
