//! Pairwise keystream agreement.
//!
//! Two participants establish a shared seed once, after which each side owns
//! its own generator instance and can derive an unbounded sequence of
//! identical mask blocks without further communication.

use crate::participant::Participant;
use rand::rngs::OsRng;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use sha2::{Digest, Sha256};
use tracing::debug;

/// One side's half of a pairwise keystream.
///
/// The two instances created by [`agree`] are seeded identically and yield
/// bitwise-identical block sequences as long as both sides draw the same
/// number of blocks, which the round engine guarantees by drawing exactly one
/// block per partner per round.
pub struct Keystream {
    rng: ChaCha20Rng,
}

impl Keystream {
    fn from_shared_secret(secret: u64) -> Self {
        let seed: [u8; 32] = Sha256::digest(secret.to_le_bytes()).into();
        Self {
            rng: ChaCha20Rng::from_seed(seed),
        }
    }

    /// Draws the next `len`-byte mask block.
    pub fn next_block(&mut self, len: usize) -> Vec<u8> {
        let mut block = vec![0u8; len];
        self.rng.fill_bytes(&mut block);
        block
    }
}

/// Establishes a shared keystream between two participants.
///
/// Each side draws a private random value; the commutative product of the two
/// forms the shared secret from which both generator seeds are derived. Both
/// participants store their generator keyed by the other's identity. Runs
/// exactly once per unordered pair, when the second of the pair joins the
/// network. Pure local computation, no I/O.
pub(crate) fn agree(a: &Participant, b: &Participant) {
    let a_private = OsRng.next_u64();
    let b_private = OsRng.next_u64();
    let shared = a_private.wrapping_mul(b_private);

    a.add_keystream(b.number(), Keystream::from_shared_secret(shared));
    b.add_keystream(a.number(), Keystream::from_shared_secret(shared));

    debug!(a = a.number(), b = b.number(), "keystream agreed");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_stream() {
        let mut left = Keystream::from_shared_secret(0xfeed_beef);
        let mut right = Keystream::from_shared_secret(0xfeed_beef);

        for _ in 0..64 {
            assert_eq!(left.next_block(32), right.next_block(32));
        }
    }

    #[test]
    fn test_different_seed_different_stream() {
        let mut left = Keystream::from_shared_secret(1);
        let mut right = Keystream::from_shared_secret(2);
        assert_ne!(left.next_block(32), right.next_block(32));
    }

    #[test]
    fn test_blocks_advance() {
        let mut ks = Keystream::from_shared_secret(42);
        assert_ne!(ks.next_block(32), ks.next_block(32));
    }
}
