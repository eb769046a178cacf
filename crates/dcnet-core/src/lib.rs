//! # DC-net Core
//!
//! A Dining Cryptographers network: anonymous broadcast among `n`
//! participants such that no participant, short of full collusion, can tell
//! which member originated a message.
//!
//! ## Protocol Overview
//!
//! Every pair of participants agrees on a keystream once, at admission time.
//! Each round, every participant splits a block of its outgoing bytes (or an
//! all-zero block if it has nothing to say) into `n` labeled shares, masks
//! every share with every pairwise keystream block, and delivers the shares.
//! Because both holders of a keystream apply the identical mask to their own
//! outgoing shares, XOR-folding all round outputs cancels every mask, leaving
//! the XOR of the plaintext shares. Layering an (n,k) threshold scheme over
//! the shares lets any `k` participants' round outputs reconstruct the
//! message, so every member receives every broadcast without learning the
//! sender.
//!
//! Workers run in lockstep: one tokio task per participant, three barrier
//! rendezvous per round, and an all-permits gate that makes shutdown
//! observable by every worker in the same round.
//!
//! ## Example
//!
//! ```rust,ignore
//! use dcnet_core::{
//!     DuplicateSplitCombine, Network, NetworkConfig, Participant, SplitCombine,
//! };
//! use std::sync::Arc;
//!
//! let config = NetworkConfig::default();
//! let scheme: Arc<dyn SplitCombine> = Arc::new(DuplicateSplitCombine::new(3)?);
//!
//! let mut network = Network::new(config.clone())?;
//! let members: Vec<_> = (1..=3)
//!     .map(|i| Arc::new(Participant::new(i, scheme.clone(), config.bytes_per_round)))
//!     .collect();
//! for member in &members {
//!     member.on_message_received(|block| println!("{:?}", block));
//!     network.add_participant(member.clone())?;
//! }
//!
//! network.start()?;
//! members[0].enqueue(b"Hello");
//! // ... wait until members[0].pending_to_send() turns false ...
//! network.stop().await?;
//! ```

pub mod error;
pub mod keystream;
pub mod network;
pub mod participant;
pub mod sharing;
pub mod types;
pub mod util;

pub use error::{Error, Result};
pub use network::Network;
pub use participant::Participant;
pub use sharing::{DuplicateSplitCombine, MessagePart, ShamirSplitCombine, SplitCombine};
pub use types::{NetworkConfig, NetworkState, ParticipantId};

/// Protocol version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default number of plaintext bytes transmitted per round
pub const DEFAULT_BYTES_PER_ROUND: usize = 32;
