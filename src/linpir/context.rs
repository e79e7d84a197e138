//! Public LinPIR setup shared by client and server.
//!
//! Everything here is a deterministic function of the parameters and the
//! LinPIR seed: NTT tables, gadget, batch encoders, the query pads and the
//! Galois key pads.
//!
//! Query pads are indexed. A session must encrypt each query under a pad
//! index it has not used before: two bodies under one pad and one secret
//! subtract to the difference of their messages.

use crate::ks::{GaloisKeyPads, RnsGadget};
use crate::math::prng::domain;
use crate::math::{CrtBasis, ModQ, NttContext, Poly};
use crate::params::{Parameters, PrngKind};
use crate::pir::error::{pir_err, Result};
use crate::rlwe::{rotation_element, BatchEncoder};

/// Shape of the stacked hint matrix and of the diagonal evaluation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockLayout {
    pub ring_dim: usize,
    /// Rows of the stacked hint `[H_0; ...; H_{K-1}]`
    pub total_rows: usize,
    pub rows_per_block: usize,
    pub num_blocks: usize,
    /// LWE secret dimension k (columns of the hint)
    pub lwe_dim: usize,
    /// Baby-step count g
    pub baby_steps: usize,
    /// Giant-step count ⌈k/g⌉
    pub giant_steps: usize,
}

impl BlockLayout {
    pub fn new(params: &Parameters) -> Self {
        Self {
            ring_dim: params.linpir_params.ring_dim(),
            total_rows: params.num_chunks() * params.db_rows,
            rows_per_block: params.linpir_params.rows_per_block,
            num_blocks: params.num_blocks(),
            lwe_dim: params.lwe_secret_dim,
            baby_steps: params.baby_steps(),
            giant_steps: params.giant_steps(),
        }
    }

    pub fn half(&self) -> usize {
        self.ring_dim / 2
    }

    /// Slot of local row ρ: `(ρ / (n/2), ρ mod (n/2))` flattened
    pub fn slot_of_row(&self, local_row: usize) -> usize {
        local_row
    }

    /// Block and local row of stacked row `row`
    pub fn locate(&self, row: usize) -> (usize, usize) {
        (row / self.rows_per_block, row % self.rows_per_block)
    }
}

/// Public LinPIR state derived from parameters and seed
#[derive(Clone, Debug)]
pub struct LinPirContext {
    layout: BlockLayout,
    ts: Vec<u64>,
    lwe_modulus_bits: u32,
    ctx: NttContext,
    out_ctx: NttContext,
    gadget: RnsGadget,
    encoders: Vec<BatchEncoder>,
    t_basis: CrtBasis,
    /// Largest |H·s| accepted after CRT recombination
    hint_bound: i128,
    prng_kind: PrngKind,
    seed: [u8; 32],
    baby_key: Option<GaloisKeyPads>,
    giant_key: Option<GaloisKeyPads>,
}

impl LinPirContext {
    /// Expand the public state. `params` must already be validated.
    pub fn new(params: &Parameters, seed: &[u8; 32]) -> Result<Self> {
        let rp = &params.linpir_params;
        let layout = BlockLayout::new(params);
        let n = layout.ring_dim;

        let ctx = NttContext::with_moduli(n, &rp.qs);
        let out_ctx = NttContext::with_moduli(n, rp.output_moduli());
        let gadget = RnsGadget::from_params(rp);
        let encoders = rp.ts.iter().map(|&t| BatchEncoder::new(n, t)).collect();
        let t_basis = CrtBasis::new(&rp.ts)
            .ok_or_else(|| pir_err!(Configuration, "plaintext moduli do not form a CRT basis"))?;

        let baby_key = (layout.baby_steps > 1).then(|| {
            GaloisKeyPads::expand(rp.prng_kind, seed, 0, rotation_element(1, n), gadget.len(), &ctx)
        });
        let giant_key = (layout.giant_steps > 1).then(|| {
            let g = rotation_element(layout.baby_steps, n);
            GaloisKeyPads::expand(rp.prng_kind, seed, 1, g, gadget.len(), &ctx)
        });

        Ok(Self {
            layout,
            ts: rp.ts.clone(),
            lwe_modulus_bits: params.lwe_modulus_bit_size,
            ctx,
            out_ctx,
            gadget,
            encoders,
            t_basis,
            hint_bound: params.hint_product_bound() as i128,
            prng_kind: rp.prng_kind,
            seed: *seed,
            baby_key,
            giant_key,
        })
    }

    pub fn layout(&self) -> &BlockLayout {
        &self.layout
    }

    pub fn ts(&self) -> &[u64] {
        &self.ts
    }

    pub fn ntt(&self) -> &NttContext {
        &self.ctx
    }

    /// NTT context over the moduli left after modulus switching
    pub fn output_ntt(&self) -> &NttContext {
        &self.out_ctx
    }

    pub fn gadget(&self) -> &RnsGadget {
        &self.gadget
    }

    pub fn encoder(&self, t_idx: usize) -> &BatchEncoder {
        &self.encoders[t_idx]
    }

    /// Query mask for pad `pad_index` and plaintext modulus `t_idx` (NTT domain)
    pub fn query_pad(&self, pad_index: u32, t_idx: usize) -> Poly {
        let index = pad_index as u64 * self.ts.len() as u64 + t_idx as u64;
        Poly::from_seed_indexed(
            self.prng_kind,
            &self.seed,
            domain::QUERY_PAD,
            index,
            self.layout.ring_dim,
            self.ctx.moduli(),
        )
    }

    /// Key for rotation by one slot, present when g > 1
    pub fn baby_key(&self) -> Option<&GaloisKeyPads> {
        self.baby_key.as_ref()
    }

    /// Key for rotation by g slots, present when ⌈k/g⌉ > 1
    pub fn giant_key(&self) -> Option<&GaloisKeyPads> {
        self.giant_key.as_ref()
    }

    /// Keys in bundle order: baby step first, then giant step
    pub fn rotation_keys(&self) -> impl Iterator<Item = &GaloisKeyPads> {
        self.baby_key.iter().chain(self.giant_key.iter())
    }

    pub fn num_rotation_keys(&self) -> usize {
        self.rotation_keys().count()
    }

    /// Whether `poly` has the shape of an element of R_Q in the expected domain
    pub fn check_poly(&self, poly: &Poly, moduli: &[u64], ntt: bool) -> bool {
        poly.dimension() == self.layout.ring_dim
            && poly.moduli() == moduli
            && poly.coeffs().len() == self.layout.ring_dim * moduli.len()
            && poly.is_ntt() == ntt
            && moduli
                .iter()
                .enumerate()
                .all(|(i, &q)| poly.residue(i).iter().all(|&c| c < q))
    }

    /// Combine per-modulus slot values of one block into hint products mod 2^w.
    ///
    /// `slots[t_idx]` holds the decoded slots for plaintext modulus `t_idx`.
    /// Each value is CRT-combined, centered, checked against
    /// [`Parameters::hint_product_bound`] and reduced mod 2^w.
    pub fn combine_slots(&self, slots: &[Vec<u64>], rows: usize) -> Result<Vec<u32>> {
        let bound = self.hint_bound;
        let modulus = 1i128 << self.lwe_modulus_bits;
        let mut residues = vec![0u64; slots.len()];

        (0..rows)
            .map(|row| {
                let slot = self.layout.slot_of_row(row);
                for (r, s) in residues.iter_mut().zip(slots) {
                    *r = s[slot];
                }
                let value = self.t_basis.compose_centered(&residues);
                if value.abs() > bound {
                    return Err(pir_err!(
                        CryptographicFailure,
                        "hint product {} in row {} exceeds bound {}",
                        value,
                        row,
                        bound
                    ));
                }
                Ok(value.rem_euclid(modulus) as u32)
            })
            .collect()
    }

    /// Hint entry centered modulo 2^w and reduced into Z_t
    pub(crate) fn hint_entry_mod_t(&self, entry: u32, t: u64) -> u64 {
        let w = self.lwe_modulus_bits;
        let masked = if w >= 32 { entry as i64 } else { (entry & ((1u32 << w) - 1)) as i64 };
        let centered = if masked >= 1i64 << (w - 1) {
            masked - (1i64 << w)
        } else {
            masked
        };
        ModQ::from_signed(centered, t)
    }
}
