//! Key-switching module
//!
//! Galois automorphisms move a ciphertext from key z to τ_g(z); key
//! switching brings it back. Keys use the RNS gadget of [`RnsGadget`].
//!
//! # Key-Switching Key
//!
//! A key for τ_g consists of L RLWE ciphertexts under z:
//! ```text
//! K_j = (pad_j, -pad_j·z + e_j + g_j·τ_g(z))
//! ```
//!
//! # Algorithm
//!
//! To switch τ_g((a, b)) back to z:
//! 1. Decompose τ_g(a) with the gadget: g⁻¹(τ_g(a)) = [d_0, ..., d_{L-1}]
//! 2. Compute (a', b') = (0, τ_g(b)) + Σ_j d_j · K_j
//!
//! [`switch_mask`] and [`switch_body`] expose the two halves separately so
//! that the mask half can be precomputed when `a` is public.

mod gadget;
mod setup;
mod switch;

pub use gadget::RnsGadget;
pub use setup::{generate_key_bodies, GaloisKeyPads};
pub use switch::{rotate, switch_body, switch_mask};
