//! RLWE ciphertext and key types.
//!
//! Ring-LWE over R_Q = Z_Q[X]/(X^n + 1), Q given in RNS form.

use crate::math::{NttContext, Poly};
use serde::{Deserialize, Serialize};

/// RLWE secret key: ternary polynomial z ∈ R.
///
/// Only the signed coefficients are kept; callers materialize the NTT form
/// for whichever modulus chain they work in.
///
/// # Example
///
/// ```
/// use hintless_pir::math::NttContext;
/// use hintless_pir::rlwe::RlweSecretKey;
///
/// let sk = RlweSecretKey::from_coeffs(vec![1, 0, -1, 0]);
/// let ctx = NttContext::new(4, 35184371884033);
/// assert_eq!(sk.ring_dim(), 4);
/// assert!(sk.to_ntt(&ctx).is_ntt());
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RlweSecretKey {
    coeffs: Vec<i64>,
}

/// RLWE ciphertext: (a, b) ∈ R_Q × R_Q where b = -a·z + e + Δ·m.
///
/// # Decryption
///
/// The phase `b + a·z = Δ·m + e` rounds to m.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RlweCiphertext {
    /// Mask polynomial
    pub a: Poly,
    /// Body polynomial: b = -a·z + e + Δ·m
    pub b: Poly,
}

impl RlweSecretKey {
    /// Wrap signed coefficients
    pub fn from_coeffs(coeffs: Vec<i64>) -> Self {
        Self { coeffs }
    }

    /// Signed coefficients
    pub fn coeffs(&self) -> &[i64] {
        &self.coeffs
    }

    pub fn ring_dim(&self) -> usize {
        self.coeffs.len()
    }

    /// The key in NTT form over the moduli of `ctx`
    pub fn to_ntt(&self, ctx: &NttContext) -> Poly {
        let mut poly = Poly::from_signed(&self.coeffs, ctx.dimension(), ctx.moduli());
        poly.to_ntt(ctx);
        poly
    }
}

impl RlweCiphertext {
    /// Creates a ciphertext from component polynomials.
    ///
    /// # Panics
    ///
    /// Debug-asserts that `a` and `b` share dimension and moduli.
    pub fn from_parts(a: Poly, b: Poly) -> Self {
        debug_assert_eq!(
            a.dimension(),
            b.dimension(),
            "Ciphertext polynomials must have same dimension"
        );
        debug_assert_eq!(
            a.moduli(),
            b.moduli(),
            "Ciphertext polynomials must have same moduli"
        );
        Self { a, b }
    }

    pub fn ring_dim(&self) -> usize {
        self.a.dimension()
    }

    pub fn moduli(&self) -> &[u64] {
        self.a.moduli()
    }

    /// Apply X -> X^g to both halves (NTT domain).
    ///
    /// The result is encrypted under τ_g(z) and needs a key switch.
    pub fn automorphism_ntt(&self, g: usize, ctx: &NttContext) -> Self {
        Self {
            a: self.a.automorphism_ntt(g, ctx),
            b: self.b.automorphism_ntt(g, ctx),
        }
    }

    /// Drop the last modulus with rounding, on both halves independently.
    ///
    /// Expects coefficient domain.
    pub fn rescale_drop_last(&self) -> Self {
        Self {
            a: self.a.rescale_drop_last(),
            b: self.b.rescale_drop_last(),
        }
    }
}
