//! RLWE encryption and BFV-style decoding

use super::types::{RlweCiphertext, RlweSecretKey};
use crate::math::{CrtBasis, GaussianSampler, ModQ, NttContext, Poly};

impl RlweSecretKey {
    /// Sample a ternary secret with coefficients uniform in {-1, 0, 1}
    pub fn generate_ternary(ring_dim: usize, sampler: &mut GaussianSampler) -> Self {
        Self::from_coeffs((0..ring_dim).map(|_| sampler.sample_ternary()).collect())
    }
}

/// Δ_t = ⌊Q/t⌋ reduced modulo each prime of Q.
///
/// With r = Q mod t we have Δ_t = (Q - r)/t, and since Q ≡ 0 (mod q_i) this
/// is -r·t^{-1} (mod q_i). Q itself is never formed.
pub fn scaling_factor(moduli: &[u64], t: u64) -> Vec<u64> {
    let r = moduli.iter().fold(1u64, |acc, &q| ModQ::mul(acc, q % t, t));
    moduli
        .iter()
        .map(|&q| {
            let t_inv = ModQ::inverse(t % q, q)
                .unwrap_or_else(|| panic!("t = {} is not invertible modulo {}", t, q));
            ModQ::negate(ModQ::mul(r % q, t_inv, q), q)
        })
        .collect()
}

/// Δ_t·m as a coefficient-domain polynomial, for m with coefficients in [0, t).
pub fn scale_message(message: &[u64], t: u64, dim: usize, moduli: &[u64]) -> Poly {
    assert!(message.len() <= dim, "message longer than ring dimension");
    let delta = scaling_factor(moduli, t);
    let mut residues = vec![0u64; dim * moduli.len()];
    for (idx, (&q, &d)) in moduli.iter().zip(&delta).enumerate() {
        for (dst, &m) in residues[idx * dim..].iter_mut().zip(message) {
            *dst = ModQ::mul(m % t, d, q);
        }
    }
    Poly::from_residues(residues, moduli)
}

/// Encrypt under a public pad, returning only the body.
///
/// Computes b = -pad·z + e + Δ_t·m. `pad` and `z_ntt` are NTT-domain over
/// the moduli of `ctx`, and so is the result.
pub fn encrypt_with_pad(
    pad: &Poly,
    z_ntt: &Poly,
    message: &[u64],
    t: u64,
    sampler: &mut GaussianSampler,
    ctx: &NttContext,
) -> Poly {
    let n = ctx.dimension();
    let mut body = scale_message(message, t, n, ctx.moduli());
    body += &Poly::sample_gaussian(n, ctx.moduli(), sampler);
    body.to_ntt(ctx);
    body -= &pad.mul_ntt_domain(z_ntt, ctx);
    body
}

/// Phase b + a·z in coefficient domain
pub fn phase(ct: &RlweCiphertext, z_ntt: &Poly, ctx: &NttContext) -> Poly {
    let a = ct.a.to_ntt_new(ctx);
    let mut result = ct.b.to_ntt_new(ctx);
    result.mul_acc_ntt_domain(&a, z_ntt, ctx);
    result.from_ntt(ctx);
    result
}

/// Round each phase coefficient to Z_t: ⌊(t·x + Q/2) / Q⌋ mod t.
///
/// # Panics
///
/// Panics if the phase is in NTT domain or Q·t does not fit 128 bits.
pub fn decode_bfv(phase: &Poly, t: u64) -> Vec<u64> {
    assert!(!phase.is_ntt(), "decode requires coefficient domain");
    let basis = CrtBasis::new(phase.moduli())
        .unwrap_or_else(|| panic!("moduli {:?} do not form a CRT basis", phase.moduli()));
    let q = basis.product();
    assert!(q.checked_mul(t as u128).is_some(), "Q·t overflows 128 bits");

    let num_moduli = phase.moduli().len();
    let mut residues = vec![0u64; num_moduli];
    (0..phase.dimension())
        .map(|j| {
            for (i, r) in residues.iter_mut().enumerate() {
                *r = phase.residue(i)[j];
            }
            let x = basis.compose(&residues);
            ((x * t as u128 + q / 2) / q % t as u128) as u64
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::PrngKind;

    const QS: [u64; 2] = [35184371884033, 35184371703809];
    const T: u64 = 3072001;

    fn setup(n: usize) -> (NttContext, RlweSecretKey, GaussianSampler) {
        let ctx = NttContext::with_moduli(n, &QS);
        let mut sampler = GaussianSampler::with_seed(8f64.sqrt(), 17);
        let sk = RlweSecretKey::generate_ternary(n, &mut sampler);
        (ctx, sk, sampler)
    }

    #[test]
    fn test_scaling_factor_matches_floor() {
        let q: u128 = QS[0] as u128 * QS[1] as u128;
        let delta = q / T as u128;
        let residues = scaling_factor(&QS, T);
        for (&qi, &d) in QS.iter().zip(&residues) {
            assert_eq!(d as u128, delta % qi as u128);
        }
    }

    #[test]
    fn test_encrypt_decrypt_full_modulus() {
        let n = 32;
        let (ctx, sk, mut sampler) = setup(n);
        let z = sk.to_ntt(&ctx);
        let pad = Poly::from_seed_indexed(PrngKind::ChaCha20, &[4u8; 32], 2, 0, n, &QS);
        let message: Vec<u64> = (0..n as u64).map(|i| (i * 99991) % T).collect();

        let b = encrypt_with_pad(&pad, &z, &message, T, &mut sampler, &ctx);
        let ct = RlweCiphertext::from_parts(pad, b);
        assert_eq!(decode_bfv(&phase(&ct, &z, &ctx), T), message);
    }

    #[test]
    fn test_decrypt_after_rescale() {
        let n = 32;
        let (ctx, sk, mut sampler) = setup(n);
        let z = sk.to_ntt(&ctx);
        let pad = Poly::from_seed_indexed(PrngKind::ChaCha20, &[5u8; 32], 2, 0, n, &QS);
        let message: Vec<u64> = (0..n as u64).map(|i| T - 1 - i).collect();

        let b = encrypt_with_pad(&pad, &z, &message, T, &mut sampler, &ctx);
        let mut ct = RlweCiphertext::from_parts(pad, b);
        ct.a.from_ntt(&ctx);
        ct.b.from_ntt(&ctx);
        let switched = ct.rescale_drop_last();

        let out_ctx = NttContext::new(n, QS[0]);
        let z_out = sk.to_ntt(&out_ctx);
        assert_eq!(decode_bfv(&phase(&switched, &z_out, &out_ctx), T), message);
    }

    #[test]
    fn test_generate_ternary() {
        let mut sampler = GaussianSampler::with_seed(1.0, 9);
        let sk = RlweSecretKey::generate_ternary(256, &mut sampler);
        assert!(sk.coeffs().iter().all(|c| (-1..=1).contains(c)));
        assert!(sk.coeffs().iter().any(|&c| c != 0));
    }
}
