//! Seed expansion for public randomness.
//!
//! Public matrices and pads are never transmitted; both parties expand them
//! from a 32-byte seed. Each expansion is bound to a domain tag and an index
//! so that independent objects never share a keystream.

use rand::{Error, RngCore, SeedableRng};
use rand_chacha::{ChaCha12Rng, ChaCha20Rng, ChaCha8Rng};
use serde::{Deserialize, Serialize};

/// Stream cipher used to expand public seeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PrngKind {
    /// ChaCha with 20 rounds (recommended)
    #[default]
    ChaCha20,
    /// ChaCha with 12 rounds
    ChaCha12,
    /// ChaCha with 8 rounds (fastest)
    ChaCha8,
}

/// Domain tags for seed expansion.
pub mod domain {
    /// LWE public matrix A
    pub const LWE_MATRIX: u8 = 1;
    /// RLWE query pads, one per (pad index, plaintext modulus)
    pub const QUERY_PAD: u8 = 2;
    /// Galois key pads, one per (key, gadget digit)
    pub const KEY_PAD: u8 = 3;
    /// Fingerprint of a set of public seeds
    pub const FINGERPRINT: u8 = 4;
}

/// Deterministic RNG derived from a seed, a domain tag and an index.
pub enum SeedExpander {
    ChaCha20(ChaCha20Rng),
    ChaCha12(ChaCha12Rng),
    ChaCha8(ChaCha8Rng),
}

impl PrngKind {
    /// Derive an expander for `(seed, domain, index)`.
    ///
    /// The derived seed XORs the little-endian index into the first eight
    /// bytes and the domain tag into the ninth.
    pub fn expand(self, seed: &[u8; 32], domain: u8, index: u64) -> SeedExpander {
        let mut derived = *seed;
        for (d, i) in derived.iter_mut().zip(index.to_le_bytes()) {
            *d ^= i;
        }
        derived[8] ^= domain;

        match self {
            PrngKind::ChaCha20 => SeedExpander::ChaCha20(ChaCha20Rng::from_seed(derived)),
            PrngKind::ChaCha12 => SeedExpander::ChaCha12(ChaCha12Rng::from_seed(derived)),
            PrngKind::ChaCha8 => SeedExpander::ChaCha8(ChaCha8Rng::from_seed(derived)),
        }
    }
}

impl RngCore for SeedExpander {
    fn next_u32(&mut self) -> u32 {
        match self {
            SeedExpander::ChaCha20(rng) => rng.next_u32(),
            SeedExpander::ChaCha12(rng) => rng.next_u32(),
            SeedExpander::ChaCha8(rng) => rng.next_u32(),
        }
    }

    fn next_u64(&mut self) -> u64 {
        match self {
            SeedExpander::ChaCha20(rng) => rng.next_u64(),
            SeedExpander::ChaCha12(rng) => rng.next_u64(),
            SeedExpander::ChaCha8(rng) => rng.next_u64(),
        }
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        match self {
            SeedExpander::ChaCha20(rng) => rng.fill_bytes(dest),
            SeedExpander::ChaCha12(rng) => rng.fill_bytes(dest),
            SeedExpander::ChaCha8(rng) => rng.fill_bytes(dest),
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

/// Fresh 32-byte seed from OS entropy.
pub fn random_seed() -> [u8; 32] {
    let mut seed = [0u8; 32];
    ChaCha20Rng::from_entropy().fill_bytes(&mut seed);
    seed
}
