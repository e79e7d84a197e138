//! LinPIR: outsourcing the hint product H·s to the server.
//!
//! The client encrypts its LWE secret s, replicated across the SIMD slots,
//! once per plaintext modulus t. The server holds the stacked hint
//! `[H_0; ...; H_{K-1}]` split into blocks of `rows_per_block` rows and
//! evaluates each block homomorphically with the diagonal method:
//!
//! ```text
//! y = Σ_i diag_i ⊙ rot_i(v)
//!   = I_0 + rot_g(I_1 + rot_g(I_2 + ...)),   I_b = Σ_a rot_{-g·b}(diag_{g·b+a}) ⊙ rot_a(v)
//! ```
//!
//! Only two Galois keys are needed: rotation by one slot (baby steps) and
//! by g slots (giant steps). The product is recovered exactly by CRT over
//! the plaintext moduli, since their product exceeds the range of H·s.
//!
//! # Static and dynamic halves
//!
//! Every mask in the evaluation is a function of the query pad, the public
//! key pads and the database only. A [`MaskChain`] holds all of them for one
//! pad index, with the gadget digits of every rotation and the final
//! modulus-switched masks. [`LinPirServer::evaluate`] then computes bodies
//! only. The output masks do not depend on the client's secret, so a client
//! can cache them per pad index and reuse them in later sessions.

mod client;
mod context;
mod keys;
mod server;

pub use client::{decrypt_block, encrypt_query, replicate_secret};
pub use context::{BlockLayout, LinPirContext};
pub use keys::GaloisKeyBundle;
pub use server::{LinPirServer, MaskChain};
