//! LWE (Learning With Errors) layer of the SimplePIR query.
//!
//! The client encrypts a one-hot column selector under a fresh ternary
//! secret s, against a public matrix A shared through a seed:
//!
//! ```text
//! qu = A·s + e + Δ·u_col   (mod 2^w)
//! ```
//!
//! The server multiplies the database matrix D by qu. Row `row` of the answer
//! is (D·A)·s + D·e + Δ·D[row][col]. Once the hint term H·s = (D·A)·s is
//! removed, rounding by Δ yields the record chunk.
//!
//! # Example
//!
//! ```
//! use hintless_pir::lwe::{encrypt_selection, LweMatrix, LweSecretKey};
//! use hintless_pir::math::{GaussianSampler, PrngKind};
//!
//! let a = LweMatrix::from_seed(PrngKind::ChaCha20, &[0u8; 32], 64, 16);
//! let mut sampler = GaussianSampler::new(8f64.sqrt());
//! let sk = LweSecretKey::generate_ternary(16, &mut sampler);
//! let query = encrypt_selection(&a, &sk, 3, 24, u32::MAX, &mut sampler);
//! assert_eq!(query.len(), 64);
//! ```

mod enc;
mod types;

pub use enc::{decode, encrypt_selection, inner_product_ternary};
pub use types::{LweMatrix, LweSecretKey};
