//! Number-Theoretic Transform (NTT) for fast polynomial multiplication.
//!
//! Implements Cooley-Tukey radix-2 NTT for negacyclic convolution over
//! R_q = Z_q[X]/(X^n + 1), one residue ring per RNS modulus.
//!
//! # Theory
//!
//! For negacyclic convolution we use a primitive 2n-th root of unity ψ with
//! ψ^n = -1. The forward transform evaluates a polynomial at the odd powers
//! ψ^e, so every NTT index corresponds to one odd exponent `e` in `[0, 2n)`.
//! The context records that correspondence: it is what lets Galois
//! automorphisms X -> X^g act on NTT vectors as a plain permutation, and what
//! the SIMD batch encoder uses to place slots.
//!
//! # Requirements
//!
//! Every modulus must satisfy q ≡ 1 (mod 2n) and q < 2^63.
//!
//! # Example
//!
//! ```
//! use hintless_pir::math::ntt::NttContext;
//!
//! let ctx = NttContext::new(256, 35184371884033);
//!
//! let mut coeffs = vec![1u64; 256];
//! ctx.forward(&mut coeffs);
//! ctx.inverse(&mut coeffs);
//! assert_eq!(coeffs[0], 1);
//! ```

use std::collections::HashMap;

/// Precomputed NTT context with twiddle factors.
///
/// Values produced by [`NttContext::forward`] are in Montgomery form, and
/// [`NttContext::inverse`] converts back. Addition, subtraction and
/// multiplication by a plain scalar commute with the Montgomery encoding, so
/// NTT vectors can be combined with ordinary modular arithmetic; only
/// products of two NTT vectors must go through [`NttContext::pointwise_mul`].
#[derive(Clone, Debug)]
pub struct NttContext {
    /// Ring dimension (power of two).
    n: usize,
    /// RNS moduli.
    moduli: Vec<u64>,
    /// Precomputed values for Montgomery arithmetic (per modulus).
    q_inv_neg: Vec<u64>,
    r_squared: Vec<u64>,
    /// Primitive 2n-th root of unity per modulus (standard form).
    psi: Vec<u64>,
    /// Forward twiddle factors (powers of ψ where ψ^(2n) = 1 and ψ^n = -1).
    psi_powers: Vec<Vec<u64>>,
    /// Inverse twiddle factors (powers of ψ^(-1)).
    psi_inv_powers: Vec<Vec<u64>>,
    /// n^(-1) mod q in Montgomery form for inverse NTT scaling.
    n_inv: Vec<u64>,
    /// Odd exponent evaluated at each NTT index, per modulus.
    eval_exponents: Vec<Vec<usize>>,
    /// NTT index for each exponent in `[0, 2n)` (only odd entries are meaningful).
    index_of_exponent: Vec<Vec<usize>>,
}

impl NttContext {
    /// Creates an NTT context for a single modulus.
    ///
    /// # Panics
    ///
    /// Panics if `n` is not a power of two or `q` does not satisfy
    /// q ≡ 1 (mod 2n).
    pub fn new(n: usize, q: u64) -> Self {
        Self::with_moduli(n, &[q])
    }

    /// Creates an NTT context over several RNS moduli.
    ///
    /// Polynomials are stored flat, residue ring after residue ring, so every
    /// buffer handed to this context has length `n * moduli.len()`.
    pub fn with_moduli(n: usize, moduli: &[u64]) -> Self {
        assert!(n.is_power_of_two() && n >= 2, "n must be a power of two");
        assert!(!moduli.is_empty(), "moduli must be non-empty");

        let mut ctx = Self {
            n,
            moduli: moduli.to_vec(),
            q_inv_neg: Vec::with_capacity(moduli.len()),
            r_squared: Vec::with_capacity(moduli.len()),
            psi: Vec::with_capacity(moduli.len()),
            psi_powers: Vec::with_capacity(moduli.len()),
            psi_inv_powers: Vec::with_capacity(moduli.len()),
            n_inv: Vec::with_capacity(moduli.len()),
            eval_exponents: Vec::with_capacity(moduli.len()),
            index_of_exponent: Vec::with_capacity(moduli.len()),
        };

        for &q in moduli {
            assert!(q % (2 * n as u64) == 1, "q must be ≡ 1 (mod 2n)");
            assert!(q < (1u64 << 63), "q must be below 2^63");

            let q_inv = Self::compute_q_inv_neg(q);
            let r2 = Self::compute_r_squared(q);

            let psi = Self::find_primitive_root(2 * n as u64, q);
            let psi_mont = Self::to_montgomery(psi, q, r2, q_inv);
            let psi_pow = Self::compute_twiddle_factors(n, psi_mont, q, q_inv, r2);

            let psi_inv = Self::mod_pow(psi, q - 2, q);
            let psi_inv_mont = Self::to_montgomery(psi_inv, q, r2, q_inv);
            let psi_inv_pow = Self::compute_twiddle_factors(n, psi_inv_mont, q, q_inv, r2);

            let n_inv_val = Self::mod_pow(n as u64, q - 2, q);
            let n_inv_mont = Self::to_montgomery(n_inv_val, q, r2, q_inv);

            ctx.q_inv_neg.push(q_inv);
            ctx.r_squared.push(r2);
            ctx.psi.push(psi);
            ctx.psi_powers.push(psi_pow);
            ctx.psi_inv_powers.push(psi_inv_pow);
            ctx.n_inv.push(n_inv_mont);
        }

        for idx in 0..moduli.len() {
            let (exponents, index_of) = ctx.evaluation_order(idx);
            ctx.eval_exponents.push(exponents);
            ctx.index_of_exponent.push(index_of);
        }

        ctx
    }

    /// Returns the ring dimension.
    pub fn dimension(&self) -> usize {
        self.n
    }

    /// Returns the RNS moduli.
    pub fn moduli(&self) -> &[u64] {
        &self.moduli
    }

    /// Number of RNS moduli.
    pub fn crt_count(&self) -> usize {
        self.moduli.len()
    }

    /// Primitive 2n-th root of unity used for modulus `idx`.
    pub fn psi(&self, idx: usize) -> u64 {
        self.psi[idx]
    }

    /// NTT index holding the evaluation at ψ^exponent, for modulus `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `exponent` is even.
    pub fn index_of_exponent(&self, idx: usize, exponent: usize) -> usize {
        let e = exponent % (2 * self.n);
        assert!(e % 2 == 1, "evaluation exponents are odd");
        self.index_of_exponent[idx][e]
    }

    /// Performs forward NTT in-place.
    ///
    /// Input coefficients are converted to Montgomery form first.
    ///
    /// # Panics
    ///
    /// Panics if `coeffs.len() != n * crt_count`.
    pub fn forward(&self, coeffs: &mut [u64]) {
        self.check_len(coeffs.len());

        for idx in 0..self.crt_count() {
            let start = idx * self.n;
            let end = start + self.n;

            for c in coeffs[start..end].iter_mut() {
                *c = Self::to_montgomery(
                    *c,
                    self.moduli[idx],
                    self.r_squared[idx],
                    self.q_inv_neg[idx],
                );
            }

            self.forward_inplace_at(&mut coeffs[start..end], idx);
        }
    }

    fn forward_inplace_at(&self, coeffs: &mut [u64], idx: usize) {
        let n = self.n;
        let q = self.moduli[idx];
        let psi_powers = &self.psi_powers[idx];

        let mut t = n;
        let mut m = 1;

        while m < n {
            t >>= 1;
            for i in 0..m {
                let j1 = 2 * i * t;
                let j2 = j1 + t;
                let w = psi_powers[m + i];

                for j in j1..j2 {
                    let u = coeffs[j];
                    let v = self.montgomery_mul_at(coeffs[j + t], w, idx);

                    coeffs[j] = if u + v >= q { u + v - q } else { u + v };
                    coeffs[j + t] = if u >= v { u - v } else { q - v + u };
                }
            }
            m <<= 1;
        }
    }

    /// Performs inverse NTT in-place using Gentleman-Sande decimation-in-frequency.
    ///
    /// Output is converted from Montgomery form back to standard form.
    ///
    /// # Panics
    ///
    /// Panics if `coeffs.len() != n * crt_count`.
    pub fn inverse(&self, coeffs: &mut [u64]) {
        self.check_len(coeffs.len());

        for idx in 0..self.crt_count() {
            let start = idx * self.n;
            let end = start + self.n;
            self.inverse_inplace_at(&mut coeffs[start..end], idx);
            for c in coeffs[start..end].iter_mut() {
                *c = self.montgomery_mul_at(*c, 1, idx);
            }
        }
    }

    fn inverse_inplace_at(&self, coeffs: &mut [u64], idx: usize) {
        let n = self.n;
        let q = self.moduli[idx];
        let psi_inv_powers = &self.psi_inv_powers[idx];

        let mut t = 1;
        let mut m = n;

        while m > 1 {
            m >>= 1;
            for i in 0..m {
                let j2 = i * 2 * t;
                let w = psi_inv_powers[m + i];

                for j in j2..(j2 + t) {
                    let u = coeffs[j];
                    let v = coeffs[j + t];

                    coeffs[j] = if u + v >= q { u + v - q } else { u + v };
                    let diff = if u >= v { u - v } else { q - v + u };
                    coeffs[j + t] = self.montgomery_mul_at(diff, w, idx);
                }
            }
            t <<= 1;
        }

        for c in coeffs.iter_mut() {
            *c = self.montgomery_mul_at(*c, self.n_inv[idx], idx);
        }
    }

    /// Pointwise product of two NTT vectors (both in Montgomery form).
    pub fn pointwise_mul(&self, a: &[u64], b: &[u64], result: &mut [u64]) {
        self.check_len(a.len());
        self.check_len(b.len());
        self.check_len(result.len());

        for idx in 0..self.crt_count() {
            let start = idx * self.n;
            for i in start..start + self.n {
                result[i] = self.montgomery_mul_at(a[i], b[i], idx);
            }
        }
    }

    /// Fused `acc += a * b` over NTT vectors.
    pub fn pointwise_mul_acc(&self, a: &[u64], b: &[u64], acc: &mut [u64]) {
        self.check_len(a.len());
        self.check_len(b.len());
        self.check_len(acc.len());

        for idx in 0..self.crt_count() {
            let q = self.moduli[idx];
            let start = idx * self.n;
            for i in start..start + self.n {
                let prod = self.montgomery_mul_at(a[i], b[i], idx);
                let sum = acc[i] + prod;
                acc[i] = if sum >= q { sum - q } else { sum };
            }
        }
    }

    /// Applies X -> X^g to an NTT vector by permuting evaluation points.
    ///
    /// `g` must be odd. The result at the index of exponent `e` is the input
    /// at the index of exponent `e * g mod 2n`.
    pub fn automorphism(&self, values: &[u64], g: usize, result: &mut [u64]) {
        assert!(g % 2 == 1, "Galois element must be odd");
        self.check_len(values.len());
        self.check_len(result.len());

        let two_n = 2 * self.n;
        for idx in 0..self.crt_count() {
            let start = idx * self.n;
            let exponents = &self.eval_exponents[idx];
            let index_of = &self.index_of_exponent[idx];
            for (i, &e) in exponents.iter().enumerate() {
                let src = index_of[(e * g) % two_n];
                result[start + i] = values[start + src];
            }
        }
    }

    /// Converts a value to Montgomery form for modulus `idx`.
    pub fn to_mont_at(&self, a: u64, idx: usize) -> u64 {
        Self::to_montgomery(
            a,
            self.moduli[idx],
            self.r_squared[idx],
            self.q_inv_neg[idx],
        )
    }

    /// Converts a value from Montgomery form for modulus `idx`.
    pub fn from_mont_at(&self, a: u64, idx: usize) -> u64 {
        self.montgomery_mul_at(a, 1, idx)
    }

    #[inline]
    fn check_len(&self, len: usize) {
        assert_eq!(
            len,
            self.n * self.crt_count(),
            "Input length must match dimension * crt_count"
        );
    }

    #[inline]
    fn montgomery_mul_at(&self, a: u64, b: u64, idx: usize) -> u64 {
        let q = self.moduli[idx];
        let q_inv_neg = self.q_inv_neg[idx];
        let ab = (a as u128) * (b as u128);
        let m = ((ab as u64).wrapping_mul(q_inv_neg)) as u128;
        let t = ((ab + m * (q as u128)) >> 64) as u64;
        if t >= q {
            t - q
        } else {
            t
        }
    }

    fn to_montgomery(a: u64, q: u64, r_squared: u64, q_inv_neg: u64) -> u64 {
        let ab = (a as u128) * (r_squared as u128);
        let m = ((ab as u64).wrapping_mul(q_inv_neg)) as u128;
        let t = ((ab + m * (q as u128)) >> 64) as u64;
        if t >= q {
            t - q
        } else {
            t
        }
    }

    fn compute_q_inv_neg(q: u64) -> u64 {
        let mut y: u64 = 1;
        for i in 1..64 {
            let yi = y.wrapping_mul(q) & (1u64 << i);
            y |= yi;
        }
        y.wrapping_neg()
    }

    fn compute_r_squared(q: u64) -> u64 {
        let r_mod_q = (1u128 << 64) % (q as u128);
        ((r_mod_q * r_mod_q) % (q as u128)) as u64
    }

    fn mod_pow(mut base: u64, mut exp: u64, m: u64) -> u64 {
        let mut result = 1u64;
        base %= m;
        while exp > 0 {
            if exp & 1 == 1 {
                result = ((result as u128 * base as u128) % m as u128) as u64;
            }
            exp >>= 1;
            base = ((base as u128 * base as u128) % m as u128) as u64;
        }
        result
    }

    /// Find a primitive n-th root of unity modulo q (n a power of two)
    fn find_primitive_root(n: u64, q: u64) -> u64 {
        let exp = (q - 1) / n;

        for g in 2..q {
            let candidate = Self::mod_pow(g, exp, q);
            if Self::mod_pow(candidate, n / 2, q) != 1 {
                return candidate;
            }
        }
        panic!("No primitive root found (should not happen for valid parameters)");
    }

    /// Compute twiddle factors in the order needed for NTT
    fn compute_twiddle_factors(
        n: usize,
        psi: u64,
        q: u64,
        q_inv_neg: u64,
        r_squared: u64,
    ) -> Vec<u64> {
        let mut factors = vec![0u64; n];
        factors[1] = Self::to_montgomery(1, q, r_squared, q_inv_neg);

        // Bit-reversed order
        for m in 1..n {
            if m.is_power_of_two() {
                let exp = n / (2 * m);

                let mut pow = Self::to_montgomery(1, q, r_squared, q_inv_neg);
                for _ in 0..exp {
                    let ab = (pow as u128) * (psi as u128);
                    let mm = ((ab as u64).wrapping_mul(q_inv_neg)) as u128;
                    pow = ((ab + mm * (q as u128)) >> 64) as u64;
                    if pow >= q {
                        pow -= q;
                    }
                }
                factors[m] = pow;
            } else {
                let prev_idx = m & (m - 1);
                let step_idx = m & (!m + 1);

                let ab = (factors[prev_idx] as u128) * (factors[step_idx] as u128);
                let mm = ((ab as u64).wrapping_mul(q_inv_neg)) as u128;
                let t = ((ab + mm * (q as u128)) >> 64) as u64;
                factors[m] = if t >= q { t - q } else { t };
            }
        }

        factors
    }

    /// Recover which power of ψ each NTT index evaluates at, by transforming
    /// the monomial X and matching the outputs against the powers of ψ.
    fn evaluation_order(&self, idx: usize) -> (Vec<usize>, Vec<usize>) {
        let n = self.n;
        let q = self.moduli[idx];
        let psi = self.psi[idx];

        let mut powers = HashMap::with_capacity(2 * n);
        let mut acc = 1u64;
        for e in 0..2 * n {
            powers.insert(acc, e);
            acc = ((acc as u128 * psi as u128) % q as u128) as u64;
        }

        let mut x = vec![0u64; n];
        x[1] = 1;
        for c in x.iter_mut() {
            *c = self.to_mont_at(*c, idx);
        }
        self.forward_inplace_at(&mut x, idx);

        let mut exponents = Vec::with_capacity(n);
        let mut index_of = vec![usize::MAX; 2 * n];
        for (i, &v) in x.iter().enumerate() {
            let value = self.from_mont_at(v, idx);
            let e = *powers
                .get(&value)
                .unwrap_or_else(|| panic!("NTT output {} is not a power of psi", i));
            exponents.push(e);
            index_of[e] = i;
        }
        (exponents, index_of)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const Q0: u64 = 35184371884033;
    const Q1: u64 = 35184371703809;

    #[test]
    fn test_ntt_inverse_roundtrip_small() {
        let n = 16;
        let ctx = NttContext::new(n, Q0);

        let original: Vec<u64> = (0..n as u64).collect();
        let mut coeffs = original.clone();

        ctx.forward(&mut coeffs);
        ctx.inverse(&mut coeffs);

        assert_eq!(coeffs, original);
    }

    #[test]
    fn test_ntt_inverse_roundtrip_rns_4096() {
        let n = 4096;
        let ctx = NttContext::with_moduli(n, &[Q0, Q1]);

        let original: Vec<u64> = (0..2 * n as u64)
            .map(|i| (i * 12345) % if (i as usize) < n { Q0 } else { Q1 })
            .collect();
        let mut coeffs = original.clone();

        ctx.forward(&mut coeffs);
        ctx.inverse(&mut coeffs);

        assert_eq!(coeffs, original);
    }

    #[test]
    fn test_negacyclic_convolution() {
        // x * x^(n-1) = x^n = -1 (mod X^n + 1)
        let n = 64;
        let ctx = NttContext::new(n, Q0);

        let mut a = vec![0u64; n];
        a[1] = 1;
        let mut b = vec![0u64; n];
        b[n - 1] = 1;

        ctx.forward(&mut a);
        ctx.forward(&mut b);

        let mut result = vec![0u64; n];
        ctx.pointwise_mul(&a, &b, &mut result);
        ctx.inverse(&mut result);

        assert_eq!(result[0], Q0 - 1);
        assert!(result[1..].iter().all(|&c| c == 0));
    }

    #[test]
    fn test_pointwise_mul_acc() {
        let n = 32;
        let ctx = NttContext::new(n, Q0);

        let mut a = vec![0u64; n];
        a[0] = 3;
        let mut b = vec![0u64; n];
        b[1] = 5;
        ctx.forward(&mut a);
        ctx.forward(&mut b);

        let mut acc = vec![0u64; n];
        ctx.pointwise_mul_acc(&a, &b, &mut acc);
        ctx.pointwise_mul_acc(&a, &b, &mut acc);
        ctx.inverse(&mut acc);

        assert_eq!(acc[1], 30);
        assert_eq!(acc[0], 0);
    }

    #[test]
    fn test_evaluation_exponents_are_odd_and_distinct() {
        let n = 64;
        let ctx = NttContext::new(n, 3072001);
        let mut seen = std::collections::HashSet::new();
        for &e in &ctx.eval_exponents[0] {
            assert_eq!(e % 2, 1);
            assert!(seen.insert(e));
            assert_eq!(ctx.eval_exponents[0][ctx.index_of_exponent(0, e)], e);
        }
        assert_eq!(seen.len(), n);
    }

    #[test]
    fn test_automorphism_matches_coefficient_map() {
        // X -> X^g maps X to X^g; compare against the NTT of the monomial X^g.
        let n = 32;
        let g = 5;
        let ctx = NttContext::with_moduli(n, &[Q0, Q1]);

        let mut x = vec![0u64; 2 * n];
        x[1] = 1;
        x[n + 1] = 1;
        ctx.forward(&mut x);

        let mut expected = vec![0u64; 2 * n];
        expected[g] = 1;
        expected[n + g] = 1;
        ctx.forward(&mut expected);

        let mut result = vec![0u64; 2 * n];
        ctx.automorphism(&x, g, &mut result);
        assert_eq!(result, expected);
    }
}
