//! RLWE (Ring Learning With Errors) encryption module
//!
//! This module implements BFV-style RLWE encryption over the ring
//! R_Q = Z_Q[X]/(X^n + 1) with Q a product of NTT-friendly primes.
//!
//! # Overview
//!
//! - Secret key z is a ternary polynomial
//! - Ciphertext (a, b) encrypts m ∈ R_t as b = -a·z + e + Δ_t·m
//! - Δ_t = ⌊Q/t⌋ is the scaling factor for plaintext modulus t
//!
//! In LinPIR every `a` is either a public pad expanded from a seed or
//! derived from pads by public operations, so encryption functions here
//! return only the body `b`.
//!
//! # Galois Automorphisms
//!
//! Automorphisms τ_g: R → R defined by τ_g(X) = X^g rotate the SIMD slots
//! of a [`BatchEncoder`] plaintext.
//!
//! # Example
//!
//! ```
//! use hintless_pir::math::{GaussianSampler, NttContext, Poly, PrngKind};
//! use hintless_pir::rlwe::{decode_bfv, encrypt_with_pad, phase, RlweCiphertext, RlweSecretKey};
//!
//! let qs = [35184371884033u64, 35184371703809];
//! let t = 3072001;
//! let ctx = NttContext::with_moduli(64, &qs);
//! let mut sampler = GaussianSampler::new(8f64.sqrt());
//!
//! let sk = RlweSecretKey::generate_ternary(64, &mut sampler);
//! let z = sk.to_ntt(&ctx);
//! let pad = Poly::from_seed_indexed(PrngKind::ChaCha20, &[0u8; 32], 2, 0, 64, &qs);
//!
//! let b = encrypt_with_pad(&pad, &z, &[42, 7], t, &mut sampler, &ctx);
//! let ct = RlweCiphertext::from_parts(pad, b);
//! let decoded = decode_bfv(&phase(&ct, &z, &ctx), t);
//! assert_eq!(&decoded[..2], &[42, 7]);
//! ```

mod batch;
mod enc;
mod galois;
mod types;

pub use batch::BatchEncoder;
pub use enc::{decode_bfv, encrypt_with_pad, phase, scale_message, scaling_factor};
pub use galois::{automorphism_order, rotation_element};
pub use types::{RlweCiphertext, RlweSecretKey};
