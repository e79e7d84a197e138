//! Client side of LinPIR: query encryption and block decryption

use crate::math::{GaussianSampler, ModQ, Poly};
use crate::pir::error::Result;
use crate::rlwe::{decode_bfv, encrypt_with_pad, phase, RlweCiphertext};

use super::context::LinPirContext;

/// Slot vector with s replicated: slot `h·n/2 + c` holds s[c mod k]
pub fn replicate_secret(secret: &[i64], ring_dim: usize, t: u64) -> Vec<u64> {
    let half = ring_dim / 2;
    (0..ring_dim)
        .map(|j| ModQ::from_signed(secret[(j % half) % secret.len()], t))
        .collect()
}

/// Encrypt the LWE secret under `z_ntt` against query pad `pad_index`, one
/// body per plaintext modulus
pub fn encrypt_query(
    ctx: &LinPirContext,
    pad_index: u32,
    z_ntt: &Poly,
    secret: &[i64],
    sampler: &mut GaussianSampler,
) -> Vec<Poly> {
    let n = ctx.layout().ring_dim;
    ctx.ts()
        .iter()
        .enumerate()
        .map(|(t_idx, &t)| {
            let message = ctx.encoder(t_idx).encode(&replicate_secret(secret, n, t));
            let pad = ctx.query_pad(pad_index, t_idx);
            encrypt_with_pad(&pad, z_ntt, &message, t, sampler, ctx.ntt())
        })
        .collect()
}

/// Decrypt one block into its `rows_per_block` hint products mod 2^w.
///
/// `parts[t_idx]` is the (mask, body) pair of the block for plaintext
/// modulus `t_idx`, both modulo the output modulus. `z_out` is the secret
/// in NTT form over the output modulus.
pub fn decrypt_block(
    ctx: &LinPirContext,
    z_out: &Poly,
    parts: &[(&Poly, &Poly)],
) -> Result<Vec<u32>> {
    let slots: Vec<Vec<u64>> = parts
        .iter()
        .enumerate()
        .map(|(t_idx, &(a, b))| {
            let t = ctx.ts()[t_idx];
            let ct = RlweCiphertext::from_parts(a.clone(), b.clone());
            let coeffs = decode_bfv(&phase(&ct, z_out, ctx.output_ntt()), t);
            ctx.encoder(t_idx).decode(&coeffs)
        })
        .collect();
    ctx.combine_slots(&slots, ctx.layout().rows_per_block)
}
