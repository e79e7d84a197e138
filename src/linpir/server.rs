//! Server side of LinPIR.
//!
//! Preprocessing encodes the stacked hint as diagonal plaintexts. The mask
//! (`a`) chain of the evaluation depends only on the query pad and the
//! database, so it is run ahead of time for the first few pad indices,
//! keeping the gadget digits of every rotation. Online evaluation then only
//! touches bodies (`b`). Pads beyond the precomputed ones get their chain
//! computed on demand.

use std::borrow::Cow;

use rayon::prelude::*;
use tracing::{debug, info};

use crate::ks::{switch_body, switch_mask};
use crate::math::Poly;

use super::context::LinPirContext;
use super::keys::GaloisKeyBundle;

/// Mask half of the evaluation for one query pad
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MaskChain {
    pad_index: u32,
    /// Per plaintext modulus: digits of the baby-step rotations
    baby_digits: Vec<Vec<Vec<Poly>>>,
    /// Per (t, block): digits of the giant-step rotations, in Horner order
    giant_digits: Vec<Vec<Vec<Poly>>>,
    /// Per (t, block): modulus-switched output mask (coefficient domain)
    output_masks: Vec<Poly>,
}

impl MaskChain {
    pub fn pad_index(&self) -> u32 {
        self.pad_index
    }

    /// Static output mask of output `idx`
    pub fn output_mask(&self, idx: usize) -> &Poly {
        &self.output_masks[idx]
    }

    pub fn num_outputs(&self) -> usize {
        self.output_masks.len()
    }
}

/// Database-dependent LinPIR state held by the server
#[derive(Debug)]
pub struct LinPirServer {
    /// (t, block) order. Diagonal i is pre-rotated by -g·⌊i/g⌋ for its
    /// giant step.
    plaintexts: Vec<Vec<Poly>>,
    /// Mask chains of pads `0..precomputed.len()`
    precomputed: Vec<MaskChain>,
}

impl LinPirServer {
    /// Build the diagonal plaintexts and the mask chains of the first
    /// `precomputed_pads` query pads.
    ///
    /// `hints[k]` is H_k = D_k·A, row-major with `lwe_dim` columns.
    pub fn preprocess(ctx: &LinPirContext, hints: &[Vec<u32>], precomputed_pads: u32) -> Self {
        let layout = *ctx.layout();
        let num_t = ctx.ts().len();

        let plaintexts: Vec<Vec<Poly>> = (0..num_t * layout.num_blocks)
            .into_par_iter()
            .map(|idx| {
                let (t_idx, block) = (idx / layout.num_blocks, idx % layout.num_blocks);
                encode_block(ctx, t_idx, hints, block)
            })
            .collect();

        let precomputed = (0..precomputed_pads)
            .map(|pad| compute_chain(ctx, &plaintexts, pad))
            .collect();

        info!(
            plaintext_moduli = num_t,
            blocks = layout.num_blocks,
            diagonals = layout.lwe_dim,
            precomputed_pads,
            "LinPIR preprocessing complete"
        );

        Self {
            plaintexts,
            precomputed,
        }
    }

    /// Number of output ciphertexts, (t, block) pairs
    pub fn num_outputs(&self) -> usize {
        self.plaintexts.len()
    }

    pub fn num_precomputed(&self) -> usize {
        self.precomputed.len()
    }

    /// Mask chain of query pad `pad_index`, computed now when it was not
    /// precomputed
    pub fn mask_chain(&self, ctx: &LinPirContext, pad_index: u32) -> Cow<'_, MaskChain> {
        match self.precomputed.get(pad_index as usize) {
            Some(chain) => Cow::Borrowed(chain),
            None => {
                debug!(pad_index, "computing mask chain online");
                Cow::Owned(compute_chain(ctx, &self.plaintexts, pad_index))
            }
        }
    }

    /// Evaluate the body chain for one query.
    ///
    /// `query_bodies` holds one NTT-domain body per plaintext modulus,
    /// encrypted against the pad of `chain`. `keys` must have passed
    /// [`GaloisKeyBundle::matches`]. Returns the modulus-switched output
    /// bodies in (t, block) order.
    pub fn evaluate(
        &self,
        ctx: &LinPirContext,
        chain: &MaskChain,
        query_bodies: &[Poly],
        keys: &GaloisKeyBundle,
    ) -> Vec<Poly> {
        let layout = *ctx.layout();
        let ntt = ctx.ntt();

        let baby: Vec<Vec<Poly>> = query_bodies
            .par_iter()
            .enumerate()
            .map(|(t_idx, body)| {
                let mut bodies_out = Vec::with_capacity(layout.baby_steps);
                bodies_out.push(body.clone());
                if let (Some(key), Some(bodies)) = (ctx.baby_key(), keys.baby_step.as_deref()) {
                    for digits in &chain.baby_digits[t_idx] {
                        let prev = &bodies_out[bodies_out.len() - 1];
                        let next = switch_body(prev, key.galois_element, digits, bodies, ntt);
                        bodies_out.push(next);
                    }
                }
                bodies_out
            })
            .collect();

        let giant = ctx.giant_key().zip(keys.giant_step.as_deref());
        let outputs = self
            .plaintexts
            .par_iter()
            .enumerate()
            .map(|(idx, diagonals)| {
                let baby_bodies = &baby[idx / layout.num_blocks];
                let digits = &chain.giant_digits[idx];
                let body = match giant {
                    Some((key, bodies)) => horner(ctx, diagonals, baby_bodies, |step, acc| {
                        switch_body(acc, key.galois_element, &digits[step], bodies, ntt)
                    }),
                    None => horner(ctx, diagonals, baby_bodies, |_, acc| acc.clone()),
                };
                body.from_ntt_new(ntt).rescale_drop_last()
            })
            .collect();

        debug!(
            outputs = self.plaintexts.len(),
            pad_index = chain.pad_index,
            "LinPIR evaluation complete"
        );
        outputs
    }
}

/// Run the mask half of the whole evaluation for query pad `pad_index`
fn compute_chain(ctx: &LinPirContext, plaintexts: &[Vec<Poly>], pad_index: u32) -> MaskChain {
    let layout = *ctx.layout();

    let baby: Vec<(Vec<Poly>, Vec<Vec<Poly>>)> = (0..ctx.ts().len())
        .into_par_iter()
        .map(|t_idx| baby_mask_chain(ctx, pad_index, t_idx))
        .collect();

    let (giant_digits, output_masks): (Vec<Vec<Vec<Poly>>>, Vec<Poly>) = plaintexts
        .par_iter()
        .enumerate()
        .map(|(idx, diagonals)| {
            let baby_masks = &baby[idx / layout.num_blocks].0;
            let mut digits = Vec::with_capacity(layout.giant_steps.saturating_sub(1));
            let mask = match ctx.giant_key() {
                Some(key) => horner(ctx, diagonals, baby_masks, |_, acc| {
                    let (d, rotated) = switch_mask(acc, key, ctx.gadget(), ctx.ntt());
                    digits.push(d);
                    rotated
                }),
                // a single giant step never rotates
                None => horner(ctx, diagonals, baby_masks, |_, acc| acc.clone()),
            };
            (digits, mask.from_ntt_new(ctx.ntt()).rescale_drop_last())
        })
        .unzip();

    MaskChain {
        pad_index,
        baby_digits: baby.into_iter().map(|(_, digits)| digits).collect(),
        giant_digits,
        output_masks,
    }
}

/// Mask chain of the baby steps: rot_a(pad) for a in 0..g, plus the
/// digits of each single-slot rotation.
fn baby_mask_chain(
    ctx: &LinPirContext,
    pad_index: u32,
    t_idx: usize,
) -> (Vec<Poly>, Vec<Vec<Poly>>) {
    let g = ctx.layout().baby_steps;
    let mut masks = Vec::with_capacity(g);
    let mut digits = Vec::with_capacity(g.saturating_sub(1));
    masks.push(ctx.query_pad(pad_index, t_idx));

    if let Some(key) = ctx.baby_key() {
        for _ in 1..g {
            let (d, next) = switch_mask(&masks[masks.len() - 1], key, ctx.gadget(), ctx.ntt());
            digits.push(d);
            masks.push(next);
        }
    }
    (masks, digits)
}

/// Encode the k diagonals of one block for plaintext modulus `t_idx`.
///
/// Slot (h, j) of plaintext i holds diag_i[h][(j - g·⌊i/g⌋) mod n/2], where
/// diag_i[h][x] = H[row(h, x)][(x + i) mod k] for local row h·n/2 + x.
fn encode_block(ctx: &LinPirContext, t_idx: usize, hints: &[Vec<u32>], block: usize) -> Vec<Poly> {
    let layout = ctx.layout();
    let (n, half, k, g) = (
        layout.ring_dim,
        layout.half(),
        layout.lwe_dim,
        layout.baby_steps,
    );
    let rpb = layout.rows_per_block;
    let db_rows = hints[0].len() / k;
    let t = ctx.ts()[t_idx];
    let encoder = ctx.encoder(t_idx);

    (0..k)
        .map(|i| {
            let shift = (g * (i / g)) % half;
            let mut slots = vec![0u64; n];
            for h in 0..2 {
                for j in 0..half {
                    let x = (j + half - shift) % half;
                    let local = h * half + x;
                    if local >= rpb {
                        continue;
                    }
                    let row = block * rpb + local;
                    let (chunk, r) = (row / db_rows, row % db_rows);
                    let entry = hints[chunk][r * k + (x + i) % k];
                    slots[h * half + j] = ctx.hint_entry_mod_t(entry, t);
                }
            }
            let coeffs = encoder.encode_centered(&slots);
            Poly::from_signed(&coeffs, n, ctx.ntt().moduli()).to_ntt_new(ctx.ntt())
        })
        .collect()
}

/// Horner evaluation of y = I_0 + rot_g(I_1 + rot_g(I_2 + ...)) on one
/// ciphertext half, with I_b = Σ_a P_{g·b+a} ⊙ baby[a].
///
/// `rotate(step, acc)` applies the giant rotation; `step` counts rotations
/// in evaluation order.
fn horner<F>(ctx: &LinPirContext, plaintexts: &[Poly], baby: &[Poly], mut rotate: F) -> Poly
where
    F: FnMut(usize, &Poly) -> Poly,
{
    let layout = ctx.layout();
    let (g, k) = (layout.baby_steps, layout.lwe_dim);
    let ntt = ctx.ntt();

    let mut acc: Option<Poly> = None;
    let mut step = 0;
    for b in (0..layout.giant_steps).rev() {
        let mut inner = Poly::zero(layout.ring_dim, ntt.moduli());
        inner.force_ntt_domain();
        for (a, v) in baby.iter().enumerate().take(g) {
            let i = g * b + a;
            if i >= k {
                break;
            }
            inner.mul_acc_ntt_domain(&plaintexts[i], v, ntt);
        }
        acc = Some(match acc {
            None => inner,
            Some(prev) => {
                let rotated = rotate(step, &prev);
                step += 1;
                &inner + &rotated
            }
        });
    }
    acc.unwrap_or_else(|| {
        let mut zero = Poly::zero(layout.ring_dim, ntt.moduli());
        zero.force_ntt_domain();
        zero
    })
}
