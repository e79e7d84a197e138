//! SIMD batch encoding over Z_t[X]/(X^n + 1).
//!
//! For a prime t ≡ 1 (mod 2n) the plaintext ring splits into n copies of
//! Z_t, one per root ψ^e of X^n + 1. Slot `(h, c)` (flat index
//! `h·n/2 + c`) lives at exponent `3^c` when `h = 0` and `-3^c` when `h = 1`,
//! so τ_{3^r} rotates each half of the slot vector left by r.

use crate::math::NttContext;

/// Slot encoder for one plaintext modulus
#[derive(Clone, Debug)]
pub struct BatchEncoder {
    t: u64,
    ctx: NttContext,
    /// NTT index of each slot
    slot_index: Vec<usize>,
}

impl BatchEncoder {
    /// # Panics
    ///
    /// Panics unless t ≡ 1 (mod 2n).
    pub fn new(ring_dim: usize, t: u64) -> Self {
        let ctx = NttContext::new(ring_dim, t);
        let two_n = 2 * ring_dim;
        let half = ring_dim / 2;

        let mut slot_index = vec![0usize; ring_dim];
        let mut e = 1usize;
        for c in 0..half {
            slot_index[c] = ctx.index_of_exponent(0, e);
            slot_index[half + c] = ctx.index_of_exponent(0, two_n - e);
            e = e * 3 % two_n;
        }
        Self { t, ctx, slot_index }
    }

    pub fn plaintext_modulus(&self) -> u64 {
        self.t
    }

    pub fn slot_count(&self) -> usize {
        self.slot_index.len()
    }

    /// Coefficients in [0, t) of the polynomial holding `slots`.
    ///
    /// Missing trailing slots are zero.
    pub fn encode(&self, slots: &[u64]) -> Vec<u64> {
        assert!(slots.len() <= self.slot_count(), "too many slot values");
        let mut values = vec![0u64; self.slot_count()];
        for (&idx, &v) in self.slot_index.iter().zip(slots) {
            values[idx] = self.ctx.to_mont_at(v % self.t, 0);
        }
        self.ctx.inverse(&mut values);
        values
    }

    /// Encode and center coefficients into (-t/2, t/2]
    pub fn encode_centered(&self, slots: &[u64]) -> Vec<i64> {
        let half = self.t / 2;
        self.encode(slots)
            .into_iter()
            .map(|c| if c > half { c as i64 - self.t as i64 } else { c as i64 })
            .collect()
    }

    /// Slot values of a polynomial given by coefficients in [0, t)
    pub fn decode(&self, coeffs: &[u64]) -> Vec<u64> {
        let mut values = coeffs.to_vec();
        self.ctx.forward(&mut values);
        self.slot_index
            .iter()
            .map(|&idx| self.ctx.from_mont_at(values[idx], 0))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{ModQ, Poly};
    use crate::rlwe::rotation_element;

    const T: u64 = 3072001;

    #[test]
    fn test_encode_decode() {
        let encoder = BatchEncoder::new(32, T);
        let slots: Vec<u64> = (0..32u64).map(|i| i * i * 1000 + 7).collect();
        let coeffs = encoder.encode(&slots);
        assert!(coeffs.iter().all(|&c| c < T));
        assert_eq!(encoder.decode(&coeffs), slots);
    }

    #[test]
    fn test_slot_products_are_pointwise() {
        let n = 16;
        let encoder = BatchEncoder::new(n, T);
        let ctx = NttContext::new(n, T);
        let x: Vec<u64> = (1..=n as u64).collect();
        let y: Vec<u64> = (0..n as u64).map(|i| T - 2 - i).collect();

        let px = Poly::from_residues(encoder.encode(&x), &[T]).to_ntt_new(&ctx);
        let py = Poly::from_residues(encoder.encode(&y), &[T]).to_ntt_new(&ctx);
        let prod = px.mul_ntt_domain(&py, &ctx).from_ntt_new(&ctx);

        let expected: Vec<u64> = x.iter().zip(&y).map(|(&a, &b)| ModQ::mul(a, b, T)).collect();
        assert_eq!(encoder.decode(prod.coeffs()), expected);
    }

    #[test]
    fn test_rotation_moves_slots_left_per_half() {
        let n = 32;
        let half = n / 2;
        let encoder = BatchEncoder::new(n, T);
        let slots: Vec<u64> = (0..n as u64).map(|i| 100 + i).collect();
        let poly = Poly::from_residues(encoder.encode(&slots), &[T]);

        for r in [1usize, 3, 5] {
            let rotated = poly.automorphism(rotation_element(r, n));
            let decoded = encoder.decode(rotated.coeffs());
            for h in 0..2 {
                for c in 0..half {
                    assert_eq!(decoded[h * half + c], slots[h * half + (c + r) % half]);
                }
            }
        }
    }

    #[test]
    fn test_encode_centered_range() {
        let encoder = BatchEncoder::new(16, T);
        let coeffs = encoder.encode_centered(&[T - 1, 5, 123456]);
        assert!(coeffs.iter().all(|&c| c.abs() <= (T / 2) as i64));
        let lifted: Vec<u64> = coeffs.iter().map(|&c| ModQ::from_signed(c, T)).collect();
        assert_eq!(&encoder.decode(&lifted)[..3], &[T - 1, 5, 123456]);
    }
}
