//! Key-switching operation, split into mask and body halves.
//!
//! Rotating (a, b) by τ_g and switching back to z gives
//!
//! ```text
//! a' = Σ_j g⁻¹(τ_g(a))_j · pad_j
//! b' = τ_g(b) + Σ_j g⁻¹(τ_g(a))_j · body_j
//! ```
//!
//! The mask a' and the digits depend only on `a`. When `a` is public the
//! mask half runs once ahead of time and the digits are kept, so the
//! online work on `b` is a permutation plus L multiply-adds.

use crate::math::{NttContext, Poly};
use crate::rlwe::RlweCiphertext;

use super::gadget::RnsGadget;
use super::setup::GaloisKeyPads;

/// Mask half of a rotation.
///
/// Returns the NTT-domain gadget digits of τ_g(a) and the new mask a'.
pub fn switch_mask(
    a_ntt: &Poly,
    key: &GaloisKeyPads,
    gadget: &RnsGadget,
    ctx: &NttContext,
) -> (Vec<Poly>, Poly) {
    let rotated = a_ntt
        .automorphism_ntt(key.galois_element, ctx)
        .from_ntt_new(ctx);
    let digits = gadget.decompose_ntt(&rotated, ctx);

    let mut new_a = Poly::zero(ctx.dimension(), ctx.moduli());
    new_a.force_ntt_domain();
    for (d, pad) in digits.iter().zip(&key.pads) {
        new_a.mul_acc_ntt_domain(d, pad, ctx);
    }
    (digits, new_a)
}

/// Body half of a rotation, given the digits from [`switch_mask`]
pub fn switch_body(
    b_ntt: &Poly,
    galois_element: usize,
    digits: &[Poly],
    bodies: &[Poly],
    ctx: &NttContext,
) -> Poly {
    debug_assert_eq!(digits.len(), bodies.len(), "digit/key length mismatch");
    let mut new_b = b_ntt.automorphism_ntt(galois_element, ctx);
    for (d, body) in digits.iter().zip(bodies) {
        new_b.mul_acc_ntt_domain(d, body, ctx);
    }
    new_b
}

/// Rotate an NTT-domain ciphertext by τ_g and switch back to the original key
pub fn rotate(
    ct: &RlweCiphertext,
    key: &GaloisKeyPads,
    bodies: &[Poly],
    gadget: &RnsGadget,
    ctx: &NttContext,
) -> RlweCiphertext {
    let (digits, a) = switch_mask(&ct.a, key, gadget, ctx);
    let b = switch_body(&ct.b, key.galois_element, &digits, bodies, ctx);
    RlweCiphertext::from_parts(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ks::generate_key_bodies;
    use crate::math::{GaussianSampler, PrngKind};
    use crate::rlwe::{
        decode_bfv, encrypt_with_pad, phase, rotation_element, BatchEncoder, RlweSecretKey,
    };

    const QS: [u64; 2] = [35184371884033, 35184371703809];
    const T: u64 = 3072001;

    #[test]
    fn test_rotation_through_key_switch() {
        let n = 32;
        let half = n / 2;
        let ctx = NttContext::with_moduli(n, &QS);
        let gadget = RnsGadget::new(&QS, &[16, 16]);
        let encoder = BatchEncoder::new(n, T);
        let mut sampler = GaussianSampler::with_seed(8f64.sqrt(), 21);
        let sk = RlweSecretKey::generate_ternary(n, &mut sampler);
        let z = sk.to_ntt(&ctx);

        let slots: Vec<u64> = (0..n as u64).map(|i| i * 1000 + 1).collect();
        let pad = Poly::from_seed_indexed(PrngKind::ChaCha20, &[8u8; 32], 2, 0, n, &QS);
        let b = encrypt_with_pad(&pad, &z, &encoder.encode(&slots), T, &mut sampler, &ctx);
        let ct = RlweCiphertext::from_parts(pad, b);

        let g = rotation_element(1, n);
        let key = GaloisKeyPads::expand(PrngKind::ChaCha20, &[9u8; 32], 0, g, gadget.len(), &ctx);
        let bodies = generate_key_bodies(&z, &key, &gadget, &mut sampler, &ctx);

        let mut current = ct;
        for r in 1..=3 {
            current = rotate(&current, &key, &bodies, &gadget, &ctx);
            let decoded = encoder.decode(&decode_bfv(&phase(&current, &z, &ctx), T));
            for h in 0..2 {
                for c in 0..half {
                    assert_eq!(decoded[h * half + c], slots[h * half + (c + r) % half]);
                }
            }
        }
    }

    #[test]
    fn test_split_halves_match_full_rotation() {
        let n = 16;
        let ctx = NttContext::with_moduli(n, &QS);
        let gadget = RnsGadget::new(&QS, &[16, 16]);
        let mut sampler = GaussianSampler::with_seed(8f64.sqrt(), 4);
        let z = RlweSecretKey::generate_ternary(n, &mut sampler).to_ntt(&ctx);

        let g = rotation_element(2, n);
        let key = GaloisKeyPads::expand(PrngKind::ChaCha8, &[3u8; 32], 1, g, gadget.len(), &ctx);
        let bodies = generate_key_bodies(&z, &key, &gadget, &mut sampler, &ctx);

        let a = Poly::from_seed_indexed(PrngKind::ChaCha8, &[6u8; 32], 2, 0, n, &QS);
        let b = encrypt_with_pad(&a, &z, &[5, 6, 7], T, &mut sampler, &ctx);
        let ct = RlweCiphertext::from_parts(a, b);

        let full = rotate(&ct, &key, &bodies, &gadget, &ctx);
        let (digits, mask) = switch_mask(&ct.a, &key, &gadget, &ctx);
        let body = switch_body(&ct.b, g, &digits, &bodies, &ctx);
        assert_eq!(full.a, mask);
        assert_eq!(full.b, body);
    }
}
