//! Network lifecycle, topology assignment, and worker management.

use crate::error::{Error, Result};
use crate::keystream;
use crate::participant::Participant;
use crate::types::{NetworkConfig, NetworkState};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::{Barrier, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// State shared by every worker of a running network.
pub(crate) struct RoundShared {
    /// All participants, indexed by identity: `roster[id - 1].number() == id`.
    pub(crate) roster: Vec<Arc<Participant>>,
    /// The n-party rendezvous hit three times per round.
    pub(crate) barrier: Barrier,
    /// Termination gate: n permits, one held per worker across its per-round
    /// state check, all n taken by `stop` to flip the flag.
    pub(crate) gate: Arc<Semaphore>,
    /// Global lifecycle flag, read by workers only under the gate.
    pub(crate) state: Arc<RwLock<NetworkState>>,
    /// Artificial per-round transmission delay.
    pub(crate) delay: Duration,
}

/// A Dining Cryptographers network.
///
/// Owns the participants, establishes pairwise keystreams at admission time,
/// assigns sharing partners at start, and manages the Created → Running →
/// Terminated lifecycle together with the synchronization primitives the
/// workers rendezvous on.
///
/// Workers block indefinitely at the round barriers. A caller that stops
/// advancing any worker (or lets one die) deadlocks the whole network; that
/// is a caller obligation, not a recoverable fault.
pub struct Network {
    config: NetworkConfig,
    state: Arc<RwLock<NetworkState>>,
    participants: Vec<Arc<Participant>>,
    gate: Option<Arc<Semaphore>>,
    workers: Vec<JoinHandle<()>>,
}

impl Network {
    /// Construct a network from validated parameters.
    pub fn new(config: NetworkConfig) -> Result<Self> {
        let config = NetworkConfig::new(config.k, config.bytes_per_round, config.round_delay)?;
        Ok(Self {
            config,
            state: Arc::new(RwLock::new(NetworkState::Created)),
            participants: Vec::new(),
            gate: None,
            workers: Vec::new(),
        })
    }

    /// The current lifecycle state.
    pub fn state(&self) -> NetworkState {
        *self.state.read().expect("state lock poisoned")
    }

    /// Number of registered participants.
    pub fn len(&self) -> usize {
        self.participants.len()
    }

    /// True if no participant has been added yet.
    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// Add a participant to this network.
    ///
    /// The new member establishes a keystream with every member already
    /// present. Returns `Ok(false)` without side effects if the identity is
    /// already registered. Only valid while the network is in the Created
    /// state.
    pub fn add_participant(&mut self, participant: Arc<Participant>) -> Result<bool> {
        self.check_state(NetworkState::Created)?;

        if participant.bytes_per_round() != self.config.bytes_per_round {
            return Err(Error::InvalidConfig(format!(
                "Participant {} uses {} bytes per round, network uses {}",
                participant.number(),
                participant.bytes_per_round(),
                self.config.bytes_per_round
            )));
        }
        if self
            .participants
            .iter()
            .any(|p| p.number() == participant.number())
        {
            return Ok(false);
        }

        for partner in &self.participants {
            keystream::agree(&participant, partner);
        }
        info!(participant = participant.number(), "participant joined");
        self.participants.push(participant);
        Ok(true)
    }

    /// Start the network.
    ///
    /// Assigns each participant its sharing partners (itself plus the next
    /// k-1 members in registration order, wrapping around), freezes the
    /// topology, flips the state to Running and spawns one worker task per
    /// participant. The workers execute protocol rounds until [`stop`] is
    /// called.
    ///
    /// Must be called from within a tokio runtime. Only valid in the Created
    /// state; starting twice fails with a lifecycle error.
    ///
    /// [`stop`]: Network::stop
    pub fn start(&mut self) -> Result<()> {
        self.check_state(NetworkState::Created)?;

        let n = self.participants.len();
        if n == 0 {
            return Err(Error::InvalidConfig(
                "Cannot start a network without participants".into(),
            ));
        }
        if self.config.k > n {
            return Err(Error::InvalidConfig(format!(
                "Threshold k={} exceeds participant count {}",
                self.config.k, n
            )));
        }

        // Shares are routed by identity, so the identities must be exactly
        // 1..=n and every scheme must produce one share per member.
        let mut roster = self.participants.clone();
        roster.sort_by_key(|p| p.number());
        for (index, participant) in roster.iter().enumerate() {
            if participant.number() != index + 1 {
                return Err(Error::InvalidConfig(format!(
                    "Identities must be exactly 1..={}, found {}",
                    n,
                    participant.number()
                )));
            }
            if participant.scheme_parts() != n {
                return Err(Error::InvalidConfig(format!(
                    "Participant {} splits into {} parts, network has {} members",
                    participant.number(),
                    participant.scheme_parts(),
                    n
                )));
            }
        }

        for (i, participant) in self.participants.iter().enumerate() {
            for j in 1..self.config.k {
                participant.add_sharing_partner(self.participants[(i + j) % n].number())?;
            }
        }

        *self.state.write().expect("state lock poisoned") = NetworkState::Running;

        let gate = Arc::new(Semaphore::new(n));
        self.gate = Some(gate.clone());
        let shared = Arc::new(RoundShared {
            roster,
            barrier: Barrier::new(n),
            gate,
            state: self.state.clone(),
            delay: self.config.round_delay,
        });

        for participant in &self.participants {
            let participant = participant.clone();
            let shared = shared.clone();
            self.workers.push(tokio::spawn(async move {
                if let Err(err) = participant.run_protocol(&shared).await {
                    error!(
                        participant = participant.number(),
                        %err,
                        "worker aborted"
                    );
                }
            }));
        }

        info!(n, k = self.config.k, "network started");
        Ok(())
    }

    /// Stop the network.
    ///
    /// Takes all n gate permits at once, which can only succeed while no
    /// worker is inside its per-round state check, flips the flag, then
    /// waits for every worker to finish its current round and exit. Only
    /// valid in the Running state.
    pub async fn stop(&mut self) -> Result<()> {
        self.check_state(NetworkState::Running)?;

        let gate = self
            .gate
            .clone()
            .ok_or_else(|| Error::Internal("Running network has no gate".into()))?;
        let n = self.participants.len() as u32;

        info!("network stopping");

        // The gate is fair, so a queued acquire_many would starve workers
        // that still need their single permits to finish the round and
        // release the ones held across the rendezvous. Poll instead; the
        // permits are all free during every round's two protocol phases.
        let all_permits = loop {
            match gate.try_acquire_many(n) {
                Ok(permits) => break permits,
                Err(_) => tokio::task::yield_now().await,
            }
        };
        *self.state.write().expect("state lock poisoned") = NetworkState::Terminated;
        drop(all_permits);

        for worker in self.workers.drain(..) {
            worker
                .await
                .map_err(|e| Error::Internal(format!("Worker panicked: {}", e)))?;
        }

        info!("network stopped");
        Ok(())
    }

    /// Ensure the network is in `desired` state, mapping the actual state to
    /// a descriptive lifecycle error otherwise.
    fn check_state(&self, desired: NetworkState) -> Result<()> {
        let current = self.state();
        if current == desired {
            return Ok(());
        }
        debug!(?current, ?desired, "lifecycle violation");
        Err(match current {
            NetworkState::Created => Error::NotStarted,
            NetworkState::Running => Error::AlreadyRunning,
            NetworkState::Terminated => Error::AlreadyTerminated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sharing::DuplicateSplitCombine;
    use crate::sharing::SplitCombine;

    fn member(number: usize, n: usize) -> Arc<Participant> {
        let scheme: Arc<dyn SplitCombine> = Arc::new(DuplicateSplitCombine::new(n).unwrap());
        Arc::new(Participant::new(number, scheme, 32))
    }

    fn network(k: usize) -> Network {
        Network::new(NetworkConfig {
            k,
            bytes_per_round: 32,
            round_delay: Duration::ZERO,
        })
        .unwrap()
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        assert!(Network::new(NetworkConfig {
            k: 0,
            bytes_per_round: 32,
            round_delay: Duration::ZERO,
        })
        .is_err());
    }

    #[test]
    fn test_duplicate_identity_rejected() {
        let mut net = network(1);
        assert!(net.add_participant(member(1, 2)).unwrap());
        assert!(!net.add_participant(member(1, 2)).unwrap());
        assert_eq!(net.len(), 1);
    }

    #[test]
    fn test_width_mismatch_rejected() {
        let mut net = network(1);
        let scheme: Arc<dyn SplitCombine> = Arc::new(DuplicateSplitCombine::new(1).unwrap());
        let odd = Arc::new(Participant::new(1, scheme, 16));
        assert!(net.add_participant(odd).is_err());
    }

    #[tokio::test]
    async fn test_start_empty_network_fails() {
        let mut net = network(1);
        assert!(net.start().is_err());
        assert_eq!(net.state(), NetworkState::Created);
    }

    #[tokio::test]
    async fn test_start_with_gapped_identities_fails() {
        let mut net = network(1);
        net.add_participant(member(1, 2)).unwrap();
        net.add_participant(member(3, 2)).unwrap();
        assert!(net.start().is_err());
    }

    #[tokio::test]
    async fn test_threshold_larger_than_network_fails() {
        let mut net = network(3);
        net.add_participant(member(1, 2)).unwrap();
        net.add_participant(member(2, 2)).unwrap();
        assert!(net.start().is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_ring_topology_assignment() {
        let mut net = network(2);
        let members: Vec<_> = (1..=3).map(|i| member(i, 3)).collect();
        for m in &members {
            net.add_participant(m.clone()).unwrap();
        }
        net.start().unwrap();
        net.stop().await.unwrap();

        // each member shares with itself and its successor, wrapping around
        assert_eq!(members[0].sharing_partners(), vec![1, 2]);
        assert_eq!(members[1].sharing_partners(), vec![2, 3]);
        assert_eq!(members[2].sharing_partners(), vec![1, 3]);
    }
}
