//! LWE matrix and key types
//!
//! All LWE arithmetic is over Z_{2^w} with w ≤ 32, carried out as wrapping
//! `u32` arithmetic and masked down to w bits where it matters.

use rand::RngCore;

use crate::math::prng::{domain, PrngKind};

/// LWE secret key: ternary vector s ∈ {-1, 0, 1}^k
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LweSecretKey {
    /// Secret key coefficients
    pub coeffs: Vec<i64>,
}

/// Public LWE matrix A ∈ Z_q^{rows × cols}, expanded from a seed.
///
/// In SimplePIR `rows` is the number of database columns and `cols` the
/// LWE secret dimension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LweMatrix {
    rows: usize,
    cols: usize,
    /// Row-major entries (full 32-bit words; reduce with the modulus mask)
    data: Vec<u32>,
}

impl LweMatrix {
    /// Expand the matrix deterministically from a 32-byte seed
    pub fn from_seed(kind: PrngKind, seed: &[u8; 32], rows: usize, cols: usize) -> Self {
        let mut rng = kind.expand(seed, domain::LWE_MATRIX, 0);
        let data = (0..rows * cols).map(|_| rng.next_u32()).collect();
        Self { rows, cols, data }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Row `i` of the matrix
    pub fn row(&self, i: usize) -> &[u32] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }
}
