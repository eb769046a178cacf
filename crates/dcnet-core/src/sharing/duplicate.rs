//! The trivial (n,1) scheme: splitting copies, combining picks any part.

use super::{MessagePart, SplitCombine};
use crate::error::{Error, Result};

/// A (n,1) sharing scheme. Every part carries a full copy of the block, so a
/// single part suffices to reconstruct it.
#[derive(Debug, Clone)]
pub struct DuplicateSplitCombine {
    n: usize,
}

impl DuplicateSplitCombine {
    /// Create a duplication scheme producing `n` parts.
    pub fn new(n: usize) -> Result<Self> {
        if n < 1 {
            return Err(Error::InvalidConfig(
                "Scheme must produce at least one part".into(),
            ));
        }
        Ok(Self { n })
    }
}

impl SplitCombine for DuplicateSplitCombine {
    fn n(&self) -> usize {
        self.n
    }

    fn k(&self) -> usize {
        1
    }

    fn split(&self, block: &[u8]) -> Vec<MessagePart> {
        (1..=self.n)
            .map(|point| MessagePart::new(point, block.to_vec()))
            .collect()
    }

    fn combine(&self, parts: &[MessagePart]) -> Result<Vec<u8>> {
        parts
            .first()
            .map(|part| part.content().to_vec())
            .ok_or(Error::InvalidShareCount {
                required: 1,
                actual: 0,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_copies() {
        let scheme = DuplicateSplitCombine::new(4).unwrap();
        let parts = scheme.split(b"hello");

        assert_eq!(parts.len(), 4);
        for (i, part) in parts.iter().enumerate() {
            assert_eq!(part.point(), i + 1);
            assert_eq!(part.content(), b"hello");
        }
    }

    #[test]
    fn test_round_trip() {
        let scheme = DuplicateSplitCombine::new(3).unwrap();
        let parts = scheme.split(&[9, 0, 4]);
        assert_eq!(scheme.combine(&parts).unwrap(), vec![9, 0, 4]);
    }

    #[test]
    fn test_any_single_part_suffices() {
        let scheme = DuplicateSplitCombine::new(5).unwrap();
        let parts = scheme.split(&[7; 16]);
        assert_eq!(scheme.combine(&parts[3..4]).unwrap(), vec![7; 16]);
    }

    #[test]
    fn test_combine_nothing_fails() {
        let scheme = DuplicateSplitCombine::new(2).unwrap();
        assert!(scheme.combine(&[]).is_err());
    }

    #[test]
    fn test_rejects_zero_parts() {
        assert!(DuplicateSplitCombine::new(0).is_err());
    }
}
