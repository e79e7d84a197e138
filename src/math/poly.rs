//! Polynomial operations over R_Q = Z_Q[X]/(X^n + 1) in RNS form.
//!
//! The modulus Q = q_0 * q_1 * ... is never materialized: a polynomial keeps
//! one residue ring per prime, stored flat (all coefficients mod q_0, then
//! all coefficients mod q_1, ...). This matches the buffer layout expected by
//! [`NttContext`].
//!
//! Polynomials can exist in either coefficient domain or NTT domain.
//!
//! # Example
//!
//! ```
//! use hintless_pir::math::{NttContext, Poly};
//!
//! let moduli = [35184371884033u64, 35184371703809];
//! let ctx = NttContext::with_moduli(64, &moduli);
//!
//! let mut a = Poly::from_signed(&[1, -2, 3], 64, &moduli);
//! let mut b = Poly::from_signed(&[0, 1], 64, &moduli);
//! a.to_ntt(&ctx);
//! b.to_ntt(&ctx);
//!
//! let mut product = a.mul_ntt_domain(&b, &ctx);
//! product.from_ntt(&ctx);
//! assert_eq!(product.signed_coeff(2), -2);
//! ```

use super::modular::ModQ;
use super::ntt::NttContext;
use super::prng::PrngKind;
use super::sampler::GaussianSampler;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

/// Polynomial in R_Q with RNS representation.
///
/// # Fields
///
/// * `coeffs` - Residues, `moduli.len()` blocks of `n` values
/// * `moduli` - RNS primes
/// * `is_ntt` - Whether values are NTT evaluations (Montgomery form)
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Poly {
    coeffs: Vec<u64>,
    moduli: Vec<u64>,
    is_ntt: bool,
}

impl Poly {
    /// Create zero polynomial with given dimension and moduli
    pub fn zero(dim: usize, moduli: &[u64]) -> Self {
        Self {
            coeffs: vec![0; dim * moduli.len()],
            moduli: moduli.to_vec(),
            is_ntt: false,
        }
    }

    /// Create a polynomial from signed coefficients (missing ones are zero)
    pub fn from_signed(values: &[i64], dim: usize, moduli: &[u64]) -> Self {
        assert!(values.len() <= dim, "too many coefficients");
        let mut poly = Self::zero(dim, moduli);
        for (idx, &q) in moduli.iter().enumerate() {
            let residue = &mut poly.coeffs[idx * dim..(idx + 1) * dim];
            for (c, &v) in residue.iter_mut().zip(values) {
                *c = ModQ::from_signed(v, q);
            }
        }
        poly
    }

    /// Create a polynomial from raw residues laid out flat
    pub fn from_residues(coeffs: Vec<u64>, moduli: &[u64]) -> Self {
        assert!(!moduli.is_empty(), "moduli must be non-empty");
        assert_eq!(coeffs.len() % moduli.len(), 0, "residue layout mismatch");
        let mut poly = Self {
            coeffs,
            moduli: moduli.to_vec(),
            is_ntt: false,
        };
        poly.reduce();
        poly
    }

    /// Uniformly random polynomial
    pub fn random_with_rng<R: Rng + ?Sized>(dim: usize, moduli: &[u64], rng: &mut R) -> Self {
        let mut coeffs = Vec::with_capacity(dim * moduli.len());
        for &q in moduli {
            coeffs.extend((0..dim).map(|_| rng.gen_range(0..q)));
        }
        Self {
            coeffs,
            moduli: moduli.to_vec(),
            is_ntt: false,
        }
    }

    /// Deterministic uniform polynomial expanded from `(seed, domain, index)`.
    ///
    /// A uniform vector is uniform in either domain, so the result is marked
    /// as NTT domain and used directly as a public pad.
    pub fn from_seed_indexed(
        kind: PrngKind,
        seed: &[u8; 32],
        domain: u8,
        index: u64,
        dim: usize,
        moduli: &[u64],
    ) -> Self {
        let mut rng = kind.expand(seed, domain, index);
        let mut poly = Self::random_with_rng(dim, moduli, &mut rng);
        poly.is_ntt = true;
        poly
    }

    /// Sample polynomial with coefficients from discrete Gaussian distribution
    pub fn sample_gaussian(dim: usize, moduli: &[u64], sampler: &mut GaussianSampler) -> Self {
        let values = sampler.sample_vec(dim);
        Self::from_signed(&values, dim, moduli)
    }

    /// Sample polynomial with uniform ternary coefficients in {-1, 0, 1}
    pub fn sample_ternary(dim: usize, moduli: &[u64], sampler: &mut GaussianSampler) -> Self {
        let values: Vec<i64> = (0..dim).map(|_| sampler.sample_ternary()).collect();
        Self::from_signed(&values, dim, moduli)
    }

    /// Get polynomial dimension
    pub fn dimension(&self) -> usize {
        if self.moduli.is_empty() {
            0
        } else {
            self.coeffs.len() / self.moduli.len()
        }
    }

    /// RNS moduli
    pub fn moduli(&self) -> &[u64] {
        &self.moduli
    }

    /// Check if in NTT domain
    pub fn is_ntt(&self) -> bool {
        self.is_ntt
    }

    /// Force polynomial to be marked as NTT domain
    ///
    /// **Warning**: Only use when you know the values are already NTT values
    /// (or uniformly random, where the distinction does not matter).
    #[inline]
    pub fn force_ntt_domain(&mut self) {
        self.is_ntt = true;
    }

    /// Residues modulo `moduli[idx]`
    pub fn residue(&self, idx: usize) -> &[u64] {
        let n = self.dimension();
        &self.coeffs[idx * n..(idx + 1) * n]
    }

    /// Mutable residues modulo `moduli[idx]`
    pub fn residue_mut(&mut self, idx: usize) -> &mut [u64] {
        let n = self.dimension();
        &mut self.coeffs[idx * n..(idx + 1) * n]
    }

    /// Get reference to the flat residue vector
    pub fn coeffs(&self) -> &[u64] {
        &self.coeffs
    }

    /// Coefficient `i` modulo the first prime, centered
    pub fn signed_coeff(&self, i: usize) -> i64 {
        assert!(!self.is_ntt, "Cannot access coefficients in NTT domain");
        ModQ::to_signed(self.coeffs[i], self.moduli[0])
    }

    fn reduce(&mut self) {
        let n = self.dimension();
        for (idx, &q) in self.moduli.iter().enumerate() {
            for c in &mut self.coeffs[idx * n..(idx + 1) * n] {
                *c %= q;
            }
        }
    }

    /// Check if polynomial is zero
    pub fn is_zero(&self) -> bool {
        self.coeffs.iter().all(|&c| c == 0)
    }

    /// Convert to NTT domain
    pub fn to_ntt(&mut self, ctx: &NttContext) {
        if !self.is_ntt {
            assert_eq!(self.moduli, ctx.moduli(), "Moduli must match context");
            ctx.forward(&mut self.coeffs);
            self.is_ntt = true;
        }
    }

    /// Convert from NTT domain to coefficient domain
    pub fn from_ntt(&mut self, ctx: &NttContext) {
        if self.is_ntt {
            assert_eq!(self.moduli, ctx.moduli(), "Moduli must match context");
            ctx.inverse(&mut self.coeffs);
            self.is_ntt = false;
        }
    }

    /// Create a copy in NTT domain
    pub fn to_ntt_new(&self, ctx: &NttContext) -> Self {
        let mut result = self.clone();
        result.to_ntt(ctx);
        result
    }

    /// Create a copy in coefficient domain
    pub fn from_ntt_new(&self, ctx: &NttContext) -> Self {
        let mut result = self.clone();
        result.from_ntt(ctx);
        result
    }

    /// Multiply residue ring `idx` by `scalars[idx]`.
    ///
    /// Works in either domain: scaling commutes with the NTT and with the
    /// Montgomery encoding.
    pub fn scalar_mul_rns(&self, scalars: &[u64]) -> Self {
        assert_eq!(scalars.len(), self.moduli.len(), "one scalar per modulus");
        let n = self.dimension();
        let mut result = self.clone();
        for (idx, (&q, &s)) in self.moduli.iter().zip(scalars).enumerate() {
            for c in &mut result.coeffs[idx * n..(idx + 1) * n] {
                *c = ModQ::mul(*c, s, q);
            }
        }
        result
    }

    /// Polynomial multiplication when both are already in NTT domain
    pub fn mul_ntt_domain(&self, other: &Self, ctx: &NttContext) -> Self {
        assert!(
            self.is_ntt && other.is_ntt,
            "Both polynomials must be in NTT domain"
        );
        assert_eq!(self.moduli, other.moduli, "Moduli must match");

        let mut result = vec![0u64; self.coeffs.len()];
        ctx.pointwise_mul(&self.coeffs, &other.coeffs, &mut result);

        Self {
            coeffs: result,
            moduli: self.moduli.clone(),
            is_ntt: true,
        }
    }

    /// In-place multiply-accumulate in NTT domain: self += a * b
    pub fn mul_acc_ntt_domain(&mut self, a: &Self, b: &Self, ctx: &NttContext) {
        assert!(
            self.is_ntt && a.is_ntt && b.is_ntt,
            "All polynomials must be in NTT domain"
        );
        assert_eq!(self.moduli, a.moduli, "Moduli must match");
        assert_eq!(self.moduli, b.moduli, "Moduli must match");

        ctx.pointwise_mul_acc(&a.coeffs, &b.coeffs, &mut self.coeffs);
    }

    /// Apply the Galois automorphism X -> X^g in coefficient domain.
    pub fn automorphism(&self, g: usize) -> Self {
        assert!(!self.is_ntt, "Coefficient-domain automorphism on NTT values");
        assert!(g % 2 == 1, "Galois element must be odd");
        let n = self.dimension();
        let two_n = 2 * n;
        let mut result = Self::zero(n, &self.moduli);

        for (idx, &q) in self.moduli.iter().enumerate() {
            let src = &self.coeffs[idx * n..(idx + 1) * n];
            let dst = &mut result.coeffs[idx * n..(idx + 1) * n];
            for (i, &c) in src.iter().enumerate() {
                let e = (i * g) % two_n;
                if e < n {
                    dst[e] = c;
                } else {
                    dst[e - n] = ModQ::negate(c, q);
                }
            }
        }
        result
    }

    /// Apply the Galois automorphism X -> X^g in NTT domain.
    pub fn automorphism_ntt(&self, g: usize, ctx: &NttContext) -> Self {
        assert!(self.is_ntt, "NTT automorphism on coefficient values");
        let mut result = vec![0u64; self.coeffs.len()];
        ctx.automorphism(&self.coeffs, g, &mut result);
        Self {
            coeffs: result,
            moduli: self.moduli.clone(),
            is_ntt: true,
        }
    }

    /// Divide by the last prime with rounding and drop it: Q -> Q / q_last.
    ///
    /// Computes `x' = (x - [x]_{q_last}) / q_last` residue-wise, where
    /// `[x]_{q_last}` is the centered residue modulo the dropped prime.
    pub fn rescale_drop_last(&self) -> Self {
        assert!(!self.is_ntt, "Rescale requires coefficient domain");
        assert!(self.moduli.len() >= 2, "Need at least two moduli to rescale");

        let n = self.dimension();
        let last = self.moduli.len() - 1;
        let q_last = self.moduli[last];
        let kept = &self.moduli[..last];
        let last_residue = &self.coeffs[last * n..];

        let mut result = Self::zero(n, kept);
        for (idx, &q) in kept.iter().enumerate() {
            let inv = ModQ::inverse(q_last % q, q).unwrap_or_else(|| {
                panic!("moduli {} and {} are not coprime", q, q_last)
            });
            let src = &self.coeffs[idx * n..(idx + 1) * n];
            let dst = &mut result.coeffs[idx * n..(idx + 1) * n];
            for ((d, &x), &r) in dst.iter_mut().zip(src).zip(last_residue) {
                let r_centered = ModQ::from_signed(ModQ::to_signed(r, q_last), q);
                *d = ModQ::mul(ModQ::sub(x, r_centered, q), inv, q);
            }
        }
        result
    }
}

impl Add for &Poly {
    type Output = Poly;

    fn add(self, rhs: Self) -> Self::Output {
        let mut result = self.clone();
        result += rhs;
        result
    }
}

impl AddAssign<&Poly> for Poly {
    fn add_assign(&mut self, rhs: &Poly) {
        assert_eq!(self.moduli, rhs.moduli, "Moduli must match");
        assert_eq!(self.is_ntt, rhs.is_ntt, "NTT domains must match");
        let n = self.dimension();
        for (idx, &q) in self.moduli.iter().enumerate() {
            let range = idx * n..(idx + 1) * n;
            for (a, &b) in self.coeffs[range.clone()].iter_mut().zip(&rhs.coeffs[range]) {
                *a = ModQ::add(*a, b, q);
            }
        }
    }
}

impl Sub for &Poly {
    type Output = Poly;

    fn sub(self, rhs: Self) -> Self::Output {
        let mut result = self.clone();
        result -= rhs;
        result
    }
}

impl SubAssign<&Poly> for Poly {
    fn sub_assign(&mut self, rhs: &Poly) {
        assert_eq!(self.moduli, rhs.moduli, "Moduli must match");
        assert_eq!(self.is_ntt, rhs.is_ntt, "NTT domains must match");
        let n = self.dimension();
        for (idx, &q) in self.moduli.iter().enumerate() {
            let range = idx * n..(idx + 1) * n;
            for (a, &b) in self.coeffs[range.clone()].iter_mut().zip(&rhs.coeffs[range]) {
                *a = ModQ::sub(*a, b, q);
            }
        }
    }
}

impl Neg for &Poly {
    type Output = Poly;

    fn neg(self) -> Self::Output {
        let n = self.dimension();
        let mut result = self.clone();
        for (idx, &q) in self.moduli.iter().enumerate() {
            for c in &mut result.coeffs[idx * n..(idx + 1) * n] {
                *c = ModQ::negate(*c, q);
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODULI: [u64; 2] = [35184371884033, 35184371703809];

    fn make_ctx(n: usize) -> NttContext {
        NttContext::with_moduli(n, &MODULI)
    }

    #[test]
    fn test_from_signed_residues() {
        let p = Poly::from_signed(&[-1, 2], 8, &MODULI);
        assert_eq!(p.residue(0)[0], MODULI[0] - 1);
        assert_eq!(p.residue(1)[0], MODULI[1] - 1);
        assert_eq!(p.residue(1)[1], 2);
        assert_eq!(p.dimension(), 8);
    }

    #[test]
    fn test_addition_and_subtraction() {
        let a = Poly::from_signed(&[1, 2, 3], 8, &MODULI);
        let b = Poly::from_signed(&[4, -5, 6], 8, &MODULI);
        let sum = &a + &b;
        assert_eq!(sum.signed_coeff(1), -3);
        let diff = &sum - &b;
        assert_eq!(diff, a);
        assert!((&a - &a).is_zero());
    }

    #[test]
    fn test_negation() {
        let a = Poly::from_signed(&[7, 0, -3], 8, &MODULI);
        let neg = -&a;
        assert_eq!(neg.signed_coeff(0), -7);
        assert_eq!(neg.signed_coeff(1), 0);
        assert_eq!(neg.signed_coeff(2), 3);
    }

    #[test]
    fn test_ntt_domain_multiplication() {
        let n = 32;
        let ctx = make_ctx(n);
        // (1 + X) * (1 - X) = 1 - X^2
        let mut a = Poly::from_signed(&[1, 1], n, &MODULI);
        let mut b = Poly::from_signed(&[1, -1], n, &MODULI);
        a.to_ntt(&ctx);
        b.to_ntt(&ctx);

        let mut c = a.mul_ntt_domain(&b, &ctx);
        c.from_ntt(&ctx);
        assert_eq!(c, Poly::from_signed(&[1, 0, -1], n, &MODULI));
    }

    #[test]
    fn test_mul_acc() {
        let n = 16;
        let ctx = make_ctx(n);
        let a = Poly::from_signed(&[2], n, &MODULI).to_ntt_new(&ctx);
        let b = Poly::from_signed(&[0, 3], n, &MODULI).to_ntt_new(&ctx);
        let mut acc = Poly::zero(n, &MODULI).to_ntt_new(&ctx);
        acc.mul_acc_ntt_domain(&a, &b, &ctx);
        acc.mul_acc_ntt_domain(&a, &b, &ctx);
        acc.from_ntt(&ctx);
        assert_eq!(acc.signed_coeff(1), 12);
    }

    #[test]
    fn test_automorphism_coefficient_and_ntt_agree() {
        let n = 32;
        let ctx = make_ctx(n);
        let values: Vec<i64> = (0..n as i64).map(|i| i * 7 - 50).collect();
        let p = Poly::from_signed(&values, n, &MODULI);

        for g in [3usize, 9, 2 * n - 1] {
            let coeff_domain = p.automorphism(g);
            let mut ntt_domain = p.to_ntt_new(&ctx).automorphism_ntt(g, &ctx);
            ntt_domain.from_ntt(&ctx);
            assert_eq!(coeff_domain, ntt_domain);
        }
    }

    #[test]
    fn test_automorphism_sign() {
        // X^(n-1) -> X^(3(n-1)) = X^(2n + n - 3) = -X^(n-3)
        let n = 16;
        let mut values = vec![0i64; n];
        values[n - 1] = 1;
        let p = Poly::from_signed(&values, n, &MODULI);
        let r = p.automorphism(3);
        assert_eq!(r.signed_coeff(n - 3), -1);
    }

    #[test]
    fn test_rescale_drop_last() {
        let n = 8;
        let q1 = MODULI[1] as i128;
        // x = 5 * q1 + 17 rounds to 5; x = -3 * q1 - 20 rounds to -3
        let big = |v: i128| -> Vec<u64> {
            MODULI
                .iter()
                .map(|&q| v.rem_euclid(q as i128) as u64)
                .collect()
        };
        let mut coeffs = vec![0u64; 2 * n];
        for (i, v) in [5 * q1 + 17, -3 * q1 - 20].iter().enumerate() {
            let r = big(*v);
            coeffs[i] = r[0];
            coeffs[n + i] = r[1];
        }
        let p = Poly::from_residues(coeffs, &MODULI);
        let r = p.rescale_drop_last();
        assert_eq!(r.moduli(), &MODULI[..1]);
        assert_eq!(r.signed_coeff(0), 5);
        assert_eq!(r.signed_coeff(1), -3);
    }

    #[test]
    fn test_seeded_pad_is_deterministic() {
        let seed = [3u8; 32];
        let a = Poly::from_seed_indexed(PrngKind::ChaCha20, &seed, 2, 0, 16, &MODULI);
        let b = Poly::from_seed_indexed(PrngKind::ChaCha20, &seed, 2, 0, 16, &MODULI);
        let c = Poly::from_seed_indexed(PrngKind::ChaCha20, &seed, 2, 1, 16, &MODULI);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.is_ntt());
    }
}
