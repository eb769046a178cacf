//! Split/combine strategies for threshold message sharing.
//!
//! Splitting a round block into labeled parts is what lets k participants'
//! round outputs jointly reconstruct one message stream. Exactly two
//! strategies exist: trivial duplication ([`DuplicateSplitCombine`]) and
//! genuine (n,k) secret sharing over GF(256) ([`ShamirSplitCombine`]).

mod duplicate;
mod gf256;
mod shamir;

pub use duplicate::DuplicateSplitCombine;
pub use shamir::ShamirSplitCombine;

use crate::error::Result;
use crate::types::ParticipantId;

/// A labeled share produced by splitting and consumed by combining.
///
/// The label is the scheme's share index, which in a running network equals
/// the identity of the participant the share is destined for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessagePart {
    point: ParticipantId,
    content: Vec<u8>,
}

impl MessagePart {
    /// Create a part from a share index and its payload.
    pub fn new(point: ParticipantId, content: Vec<u8>) -> Self {
        Self { point, content }
    }

    /// The share index.
    pub fn point(&self) -> ParticipantId {
        self.point
    }

    /// The share payload.
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Consumes the part, returning its payload.
    pub fn into_content(self) -> Vec<u8> {
        self.content
    }
}

/// A strategy for splitting a message block into n parts and combining k of
/// them back into the block.
///
/// `split` and `combine` must be mutual inverses for any subset of at least
/// `k` parts, matched by label rather than position. Combining fewer than `k`
/// parts of a genuine threshold scheme has no meaningful result and is
/// reported as an error.
pub trait SplitCombine: Send + Sync {
    /// The number of parts produced by `split`.
    fn n(&self) -> usize;

    /// The minimum number of parts required to reconstruct a message.
    fn k(&self) -> usize;

    /// Split `block` into `n` parts labeled `1..=n`.
    fn split(&self, block: &[u8]) -> Vec<MessagePart>;

    /// Combine at least `k` parts back into the original block.
    fn combine(&self, parts: &[MessagePart]) -> Result<Vec<u8>>;
}
