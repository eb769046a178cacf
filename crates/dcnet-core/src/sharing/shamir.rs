//! Byte-wise Shamir secret sharing over GF(256).

use super::{gf256, MessagePart, SplitCombine};
use crate::error::{Error, Result};
use rand::rngs::OsRng;
use rand::Rng;

/// A genuine (n,k) threshold scheme.
///
/// Each byte of the block is protected by its own random polynomial of degree
/// `k - 1` with the byte as constant term; part `j` holds the evaluations at
/// `x = j`. Any `k` parts determine the block via Lagrange interpolation at
/// zero, any `k - 1` reveal nothing.
///
/// Because GF(256) addition is XOR, the XOR of several splits' part-`j`
/// payloads is itself a valid part `j` of the XOR of the blocks. The round
/// engine leans on this: every participant splits its (possibly all-zero)
/// block each round, and the XOR-folded round outputs remain combinable.
#[derive(Debug, Clone)]
pub struct ShamirSplitCombine {
    n: usize,
    k: usize,
}

impl ShamirSplitCombine {
    /// Create an (n,k) scheme. Share labels are field elements, so at most
    /// 255 parts can be produced.
    pub fn new(n: usize, k: usize) -> Result<Self> {
        if n < 1 || n > 255 {
            return Err(Error::InvalidConfig(format!(
                "Part count must be in 1..=255, got {}",
                n
            )));
        }
        if k < 1 || k > n {
            return Err(Error::InvalidConfig(format!(
                "Threshold must be in 1..=n, got k={} n={}",
                k, n
            )));
        }
        Ok(Self { n, k })
    }
}

impl SplitCombine for ShamirSplitCombine {
    fn n(&self) -> usize {
        self.n
    }

    fn k(&self) -> usize {
        self.k
    }

    fn split(&self, block: &[u8]) -> Vec<MessagePart> {
        let mut rng = OsRng;
        let mut shares = vec![vec![0u8; block.len()]; self.n];
        let mut coeffs = vec![0u8; self.k];

        for (index, &byte) in block.iter().enumerate() {
            coeffs[0] = byte;
            for c in coeffs[1..].iter_mut() {
                *c = rng.gen();
            }
            for (j, share) in shares.iter_mut().enumerate() {
                share[index] = gf256::eval(&coeffs, (j + 1) as u8);
            }
        }

        shares
            .into_iter()
            .enumerate()
            .map(|(j, share)| MessagePart::new(j + 1, share))
            .collect()
    }

    fn combine(&self, parts: &[MessagePart]) -> Result<Vec<u8>> {
        if parts.len() < self.k {
            return Err(Error::InvalidShareCount {
                required: self.k,
                actual: parts.len(),
            });
        }

        let parts = &parts[..self.k];
        let len = parts[0].content().len();
        let mut seen = [false; 256];
        for part in parts {
            let point = part.point();
            if point == 0 || point > 255 {
                return Err(Error::MalformedShare(format!(
                    "Share label {} outside GF(256)",
                    point
                )));
            }
            if seen[point] {
                return Err(Error::MalformedShare(format!(
                    "Duplicate share label {}",
                    point
                )));
            }
            seen[point] = true;
            if part.content().len() != len {
                return Err(Error::MalformedShare(
                    "Shares have inconsistent lengths".into(),
                ));
            }
        }

        let mut block = vec![0u8; len];
        let mut points = vec![(0u8, 0u8); self.k];
        for (index, byte) in block.iter_mut().enumerate() {
            for (point, part) in points.iter_mut().zip(parts) {
                *point = (part.point() as u8, part.content()[index]);
            }
            *byte = gf256::interpolate_at_zero(&points);
        }
        Ok(block)
    }
}
