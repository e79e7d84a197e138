//! Galois key generation
//!
//! A key-switching key from τ_g(z) to z consists of L RLWE encryptions of
//! the gadget multiples of τ_g(z):
//!
//! ```text
//! K_j = (pad_j, -pad_j·z + e_j + g_j·τ_g(z))
//! ```
//!
//! The pads are expanded from a public seed, so only the bodies travel from
//! client to server.

use crate::math::prng::{domain, PrngKind};
use crate::math::{GaussianSampler, NttContext, Poly};

use super::gadget::RnsGadget;

/// Public half of a Galois key, expanded from the LinPIR seed
#[derive(Clone, Debug)]
pub struct GaloisKeyPads {
    /// Galois element g of τ_g
    pub galois_element: usize,
    /// NTT-domain pads, one per gadget entry
    pub pads: Vec<Poly>,
}

impl GaloisKeyPads {
    /// Expand the pads of key number `key_idx`.
    ///
    /// Pad j of key `key_idx` uses stream index `key_idx · L + j`.
    pub fn expand(
        kind: PrngKind,
        seed: &[u8; 32],
        key_idx: usize,
        galois_element: usize,
        gadget_len: usize,
        ctx: &NttContext,
    ) -> Self {
        let pads = (0..gadget_len)
            .map(|j| {
                Poly::from_seed_indexed(
                    kind,
                    seed,
                    domain::KEY_PAD,
                    (key_idx * gadget_len + j) as u64,
                    ctx.dimension(),
                    ctx.moduli(),
                )
            })
            .collect();
        Self {
            galois_element,
            pads,
        }
    }

    pub fn len(&self) -> usize {
        self.pads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pads.is_empty()
    }
}

/// Bodies of the key switching τ_g(z) back to z, NTT domain.
pub fn generate_key_bodies(
    z_ntt: &Poly,
    key: &GaloisKeyPads,
    gadget: &RnsGadget,
    sampler: &mut GaussianSampler,
    ctx: &NttContext,
) -> Vec<Poly> {
    debug_assert_eq!(key.len(), gadget.len(), "one pad per gadget entry");
    let n = ctx.dimension();
    let z_auto = z_ntt.automorphism_ntt(key.galois_element, ctx);

    key.pads
        .iter()
        .enumerate()
        .map(|(j, pad)| {
            let mut body = Poly::sample_gaussian(n, ctx.moduli(), sampler);
            body.to_ntt(ctx);
            body += &z_auto.scalar_mul_rns(&gadget.element(j));
            body -= &pad.mul_ntt_domain(z_ntt, ctx);
            body
        })
        .collect()
}
