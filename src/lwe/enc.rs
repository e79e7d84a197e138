//! LWE query encryption and answer decoding

use super::types::{LweMatrix, LweSecretKey};
use crate::math::GaussianSampler;

impl LweSecretKey {
    /// Sample a fresh ternary secret of dimension `dim`
    pub fn generate_ternary(dim: usize, sampler: &mut GaussianSampler) -> Self {
        Self {
            coeffs: (0..dim).map(|_| sampler.sample_ternary()).collect(),
        }
    }

    pub fn dim(&self) -> usize {
        self.coeffs.len()
    }
}

/// <row, s> over Z_{2^32} for a ternary s
#[inline]
pub fn inner_product_ternary(row: &[u32], secret: &[i64]) -> u32 {
    row.iter().zip(secret).fold(0u32, |acc, (&a, &s)| match s {
        1 => acc.wrapping_add(a),
        -1 => acc.wrapping_sub(a),
        _ => acc,
    })
}

/// Encrypt the one-hot selection vector u_col under `sk`.
///
/// Computes qu = A·s + e + Δ·u_col (mod 2^w), one entry per matrix row.
/// `mask` reduces modulo 2^w and `delta_log` is log2(Δ).
pub fn encrypt_selection(
    matrix: &LweMatrix,
    sk: &LweSecretKey,
    col: usize,
    delta_log: u32,
    mask: u32,
    sampler: &mut GaussianSampler,
) -> Vec<u32> {
    assert_eq!(matrix.cols(), sk.dim(), "secret dimension mismatch");
    assert!(col < matrix.rows(), "selected column out of range");

    let delta = 1u32 << delta_log;
    (0..matrix.rows())
        .map(|c| {
            let mut value = inner_product_ternary(matrix.row(c), &sk.coeffs);
            value = value.wrapping_add(sampler.sample() as u32);
            if c == col {
                value = value.wrapping_add(delta);
            }
            value & mask
        })
        .collect()
}

/// Round a noisy plaintext Δ·m + e (mod 2^w) to m ∈ Z_p.
#[inline]
pub fn decode(noisy: u32, delta_log: u32, plaintext_bits: u32, mask: u32) -> u32 {
    let half = 1u32 << (delta_log - 1);
    let rounded = noisy.wrapping_add(half) & mask;
    (rounded >> delta_log) & ((1u32 << plaintext_bits) - 1)
}
