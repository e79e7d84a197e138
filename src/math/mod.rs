//! Mathematical primitives for hintless PIR.
//!
//! This module provides the core arithmetic required by both halves of the
//! protocol:
//!
//! - **Modular arithmetic** over Z_q, with a Miller-Rabin primality check
//! - **Number-Theoretic Transform (NTT)** using Montgomery reduction
//! - **RNS polynomials** over R_Q = Z_Q[X]/(X^n + 1)
//! - **Gaussian and ternary sampling** for errors and secrets
//! - **CRT reconstruction** for plaintext and ciphertext moduli
//! - **Seed expansion** for public matrices and pads
//!
//! # Example
//!
//! ```
//! use hintless_pir::math::{NttContext, Poly};
//!
//! let moduli = [35184371884033u64, 35184371703809];
//! let ctx = NttContext::with_moduli(256, &moduli);
//! let mut rng = rand::thread_rng();
//! let mut poly = Poly::random_with_rng(256, &moduli, &mut rng);
//! poly.to_ntt(&ctx);
//! ```

pub mod crt;
pub mod modular;
pub mod ntt;
pub mod poly;
pub mod prng;
pub mod sampler;

pub use crt::{mod_inverse, CrtBasis};
pub use modular::{is_prime, ModQ};
pub use ntt::NttContext;
pub use poly::Poly;
pub use prng::{random_seed, PrngKind, SeedExpander};
pub use sampler::GaussianSampler;
