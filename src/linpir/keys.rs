//! Galois key bundle: the secret-dependent halves of the rotation keys.

use serde::{Deserialize, Serialize};

use crate::ks::{generate_key_bodies, GaloisKeyPads};
use crate::math::{GaussianSampler, Poly};

use super::context::LinPirContext;

/// Key bodies sent by the client, NTT domain over the full modulus.
///
/// The matching pads come from the LinPIR seed, see
/// [`LinPirContext::rotation_keys`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GaloisKeyBundle {
    /// Bodies of the single-slot rotation key
    pub baby_step: Option<Vec<Poly>>,
    /// Bodies of the g-slot rotation key
    pub giant_step: Option<Vec<Poly>>,
}

impl GaloisKeyBundle {
    /// Generate the bodies of every key the evaluation needs
    pub fn generate(ctx: &LinPirContext, z_ntt: &Poly, sampler: &mut GaussianSampler) -> Self {
        let mut bodies_for = |key: &GaloisKeyPads| {
            generate_key_bodies(z_ntt, key, ctx.gadget(), sampler, ctx.ntt())
        };
        let baby_step = ctx.baby_key().map(&mut bodies_for);
        let giant_step = ctx.giant_key().map(&mut bodies_for);
        Self {
            baby_step,
            giant_step,
        }
    }

    /// Whether the bundle has exactly the keys and shapes `ctx` expects
    pub fn matches(&self, ctx: &LinPirContext) -> bool {
        let qs = ctx.ntt().moduli();
        let check = |expected: bool, bodies: &Option<Vec<Poly>>| match bodies {
            None => !expected,
            Some(bodies) => {
                expected
                    && bodies.len() == ctx.gadget().len()
                    && bodies.iter().all(|p| ctx.check_poly(p, qs, true))
            }
        };
        check(ctx.baby_key().is_some(), &self.baby_step)
            && check(ctx.giant_key().is_some(), &self.giant_step)
    }

    pub fn num_keys(&self) -> usize {
        usize::from(self.baby_step.is_some()) + usize::from(self.giant_step.is_some())
    }
}
