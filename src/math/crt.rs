//! CRT (Chinese Remainder Theorem) helpers.

/// Compute a modular inverse using extended Euclidean algorithm.
///
/// Returns `x` such that `(a * x) % modulus == 1`, or `None` when `a` and
/// `modulus` are not coprime.
pub fn mod_inverse(a: u64, modulus: u64) -> Option<u64> {
    let mut t: i128 = 0;
    let mut new_t: i128 = 1;
    let mut r: i128 = modulus as i128;
    let mut new_r: i128 = (a % modulus) as i128;

    while new_r != 0 {
        let quotient = r / new_r;
        let tmp_t = t - quotient * new_t;
        t = new_t;
        new_t = tmp_t;

        let tmp_r = r - quotient * new_r;
        r = new_r;
        new_r = tmp_r;
    }

    if r != 1 {
        return None;
    }

    if t < 0 {
        t += modulus as i128;
    }
    Some(t as u64)
}

/// Mixed-radix (Garner) reconstruction over a fixed set of coprime moduli.
///
/// The product of the moduli must fit in 127 bits.
#[derive(Clone, Debug)]
pub struct CrtBasis {
    moduli: Vec<u64>,
    /// `(m_0 * ... * m_{i-1})^{-1} mod m_i` for each `i > 0`.
    prefix_inv: Vec<u64>,
    product: u128,
}

impl CrtBasis {
    /// Build the basis, returning `None` if the moduli are not pairwise
    /// coprime or their product overflows 127 bits.
    pub fn new(moduli: &[u64]) -> Option<Self> {
        let mut prefix_inv = Vec::with_capacity(moduli.len());
        let mut product: u128 = 1;
        for &m in moduli {
            if m < 2 {
                return None;
            }
            let prefix_mod = (product % m as u128) as u64;
            prefix_inv.push(mod_inverse(prefix_mod, m)?);
            product = product.checked_mul(m as u128)?;
            if product >> 127 != 0 {
                return None;
            }
        }
        Some(Self {
            moduli: moduli.to_vec(),
            prefix_inv,
            product,
        })
    }

    /// Product of all moduli.
    pub fn product(&self) -> u128 {
        self.product
    }

    pub fn moduli(&self) -> &[u64] {
        &self.moduli
    }

    /// Compose residues into the unique value in `[0, product)`.
    pub fn compose(&self, residues: &[u64]) -> u128 {
        assert_eq!(residues.len(), self.moduli.len(), "residue count mismatch");
        let mut x: u128 = 0;
        let mut prefix: u128 = 1;
        for (i, (&r, &m)) in residues.iter().zip(&self.moduli).enumerate() {
            let x_mod = (x % m as u128) as u64;
            let diff = if r % m >= x_mod {
                r % m - x_mod
            } else {
                m - (x_mod - r % m)
            };
            let k = if i == 0 {
                diff
            } else {
                ((diff as u128 * self.prefix_inv[i] as u128) % m as u128) as u64
            };
            x += prefix * k as u128;
            prefix *= m as u128;
        }
        x
    }

    /// Compose residues and map into the centered range `(-P/2, P/2]`.
    pub fn compose_centered(&self, residues: &[u64]) -> i128 {
        let x = self.compose(residues);
        if x > self.product / 2 {
            x as i128 - self.product as i128
        } else {
            x as i128
        }
    }
}
