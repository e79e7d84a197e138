//! RNS gadget decomposition.
//!
//! For Q = q_0 · q_1 · ... and x ∈ Z_Q with residues x_i:
//!
//! ```text
//! x ≡ Σ_i [x_i · (Q/q_i)^{-1}]_{q_i} · (Q/q_i)   (mod Q)
//! ```
//!
//! Each bracketed term x̃_i is split into ℓ_i digits of base B_i = 2^{log_b_i},
//! giving gadget entries g_{i,d} = B_i^d · (Q/q_i). Entry g_{i,d} is zero
//! modulo every prime except q_i, so its RNS scalars are cheap to apply.

use crate::math::{ModQ, NttContext, Poly};
use crate::params::RlweParameters;

/// Gadget over an RNS modulus
#[derive(Clone, Debug)]
pub struct RnsGadget {
    moduli: Vec<u64>,
    log_bases: Vec<u32>,
    /// ℓ_i per modulus
    digits: Vec<usize>,
    /// (Q/q_i)^{-1} mod q_i
    q_hat_inv: Vec<u64>,
    /// (Q/q_i) mod q_i
    q_hat: Vec<u64>,
}

impl RnsGadget {
    /// # Panics
    ///
    /// Panics if the moduli are not pairwise coprime or a base exceeds 2^32.
    pub fn new(moduli: &[u64], log_bases: &[u32]) -> Self {
        assert_eq!(moduli.len(), log_bases.len(), "one gadget base per modulus");
        let mut digits = Vec::with_capacity(moduli.len());
        let mut q_hat = Vec::with_capacity(moduli.len());
        let mut q_hat_inv = Vec::with_capacity(moduli.len());

        for (i, (&q, &log_b)) in moduli.iter().zip(log_bases).enumerate() {
            assert!((1..=32).contains(&log_b), "gadget base must be in 2^1..=2^32");
            let bits = 64 - q.leading_zeros();
            digits.push(bits.div_ceil(log_b) as usize);

            let hat = moduli
                .iter()
                .enumerate()
                .filter(|&(l, _)| l != i)
                .fold(1u64, |acc, (_, &m)| ModQ::mul(acc, m % q, q));
            let inv = ModQ::inverse(hat, q)
                .unwrap_or_else(|| panic!("modulus {} shares a factor with the others", q));
            q_hat.push(hat);
            q_hat_inv.push(inv);
        }

        Self {
            moduli: moduli.to_vec(),
            log_bases: log_bases.to_vec(),
            digits,
            q_hat_inv,
            q_hat,
        }
    }

    pub fn from_params(params: &RlweParameters) -> Self {
        Self::new(&params.qs, &params.gadget_log_bs)
    }

    /// Total gadget length L = Σ ℓ_i
    pub fn len(&self) -> usize {
        self.digits.iter().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn moduli(&self) -> &[u64] {
        &self.moduli
    }

    /// (modulus index, digit index) of flat gadget position `j`
    fn position(&self, mut j: usize) -> (usize, usize) {
        for (i, &l) in self.digits.iter().enumerate() {
            if j < l {
                return (i, j);
            }
            j -= l;
        }
        panic!("gadget index out of range");
    }

    /// RNS scalars of gadget entry `j`, one per modulus
    pub fn element(&self, j: usize) -> Vec<u64> {
        let (i, d) = self.position(j);
        let q = self.moduli[i];
        let base_pow = ModQ::pow(2, self.log_bases[i] as u64 * d as u64, q);
        let mut scalars = vec![0u64; self.moduli.len()];
        scalars[i] = ModQ::mul(base_pow, self.q_hat[i], q);
        scalars
    }

    /// Split a coefficient-domain polynomial into L digit polynomials.
    ///
    /// Digits are in [0, B_i) and are lifted to every modulus, so
    /// Σ_j digit_j · g_j reproduces the input modulo Q.
    pub fn decompose(&self, poly: &Poly) -> Vec<Poly> {
        assert!(!poly.is_ntt(), "Gadget decomposition requires coefficient domain");
        assert_eq!(poly.moduli(), &self.moduli[..], "Moduli must match gadget");
        let n = poly.dimension();
        let mut out = Vec::with_capacity(self.len());

        for (i, &q) in self.moduli.iter().enumerate() {
            let log_b = self.log_bases[i];
            let mask = (1u64 << log_b) - 1;
            let scaled: Vec<u64> = poly
                .residue(i)
                .iter()
                .map(|&x| ModQ::mul(x, self.q_hat_inv[i], q))
                .collect();

            for d in 0..self.digits[i] {
                let shift = log_b as usize * d;
                let digit: Vec<u64> = scaled.iter().map(|&x| (x >> shift) & mask).collect();
                let mut residues = Vec::with_capacity(n * self.moduli.len());
                for _ in &self.moduli {
                    residues.extend_from_slice(&digit);
                }
                out.push(Poly::from_residues(residues, &self.moduli));
            }
        }
        out
    }

    /// Decompose and move every digit to NTT domain
    pub fn decompose_ntt(&self, poly: &Poly, ctx: &NttContext) -> Vec<Poly> {
        let mut digits = self.decompose(poly);
        for d in &mut digits {
            d.to_ntt(ctx);
        }
        digits
    }
}
