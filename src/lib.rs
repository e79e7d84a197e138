//! Hintless PIR: single-server private information retrieval without a
//! client-side hint.
//!
//! The database is encoded as in SimplePIR and queried with an LWE
//! ciphertext. Instead of downloading the database-dependent hint H = D·A,
//! the client has the server compute H·s homomorphically (LinPIR):
//!
//! - Ring-LWE over two NTT-friendly primes with SIMD batching
//! - Diagonal matrix-vector evaluation with only two Galois keys
//! - Static/dynamic response split: ciphertext halves that depend only on the
//!   database and the query pad are precomputed and cached by the client
//! - Per-session Galois key caching on the server, with a fresh query pad
//!   for every request of a session

pub mod database;
pub mod ks;
pub mod linpir;
pub mod lwe;
pub mod math;
pub mod params;
pub mod pir;
pub mod rlwe;

pub use database::Database;
pub use params::{Parameters, PrngKind, RlweParameters};
pub use pir::{
    CachePolicy, Client, LruSessionStore, PirError, ProtocolError, PublicParams, Request,
    Response, Server, SessionStore,
};
