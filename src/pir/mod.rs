//! Hintless PIR protocol
//!
//! SimplePIR over an LWE-encoded database, with the client-side hint
//! product outsourced to the server through LinPIR.
//!
//! # Protocol Overview
//!
//! 1. **Preprocess**: the server samples public seeds, computes the hint
//!    H_k = D_k·A and runs the static half of the LinPIR evaluation for the
//!    first query pads
//! 2. **Request**: the client sends an LWE query for the record's column, the
//!    RLWE encryption of its LWE secret s under a fresh query pad and, once
//!    per session, its Galois keys
//! 3. **Respond**: the server answers D_k·qu and evaluates H·s homomorphically;
//!    static ciphertext halves are sent only when the client lacks them
//! 4. **Recover**: the client decrypts H·s, subtracts it and rounds
//!
//! # Session caching
//!
//! Galois keys travel with the first request of a session and are cached by
//! the server in a [`SessionStore`]. The RLWE secret is fixed for the
//! session, so every request uses a query pad the session has not used
//! before (`Request::pad_index` counts up from zero). Two bodies under one
//! pad would subtract to the difference of the LWE secrets, and from there
//! to the queried columns. Distinct pads leave only the number of queries
//! in the session visible to the server.
//!
//! The static halves of a response depend on the database and the pad index
//! only. A client keeps them per pad index across sessions, so a returning
//! client that starts a new session gets `ReusePrior` markers for every pad
//! it has seen. Requests carry [`PublicParams::fingerprint`]; after the
//! server preprocesses again they fail with
//! [`ProtocolError::StaleParameters`] and the session store is empty.
//!
//! # Example
//!
//! ```no_run
//! use hintless_pir::params::Parameters;
//! use hintless_pir::pir::{Client, Server};
//!
//! let params = Parameters::default();
//! let mut server = Server::create_with_random_database_records(&params)?;
//! server.preprocess()?;
//!
//! let mut client = Client::create(&params, &server.public_params()?)?;
//! let request = client.generate_request(42)?;
//! let response = server.handle_request(&request)?;
//! let record = client.recover_record(&response)?;
//! assert_eq!(record, server.database().record(42)?);
//! # Ok::<(), hintless_pir::pir::PirError>(())
//! ```

mod client;
pub mod error;
mod messages;
mod server;
pub mod session;
pub mod sizes;

pub use client::Client;
pub use error::{PirError, ProtocolError, Result};
pub use messages::{LinPirBlockResponse, PublicParams, Request, Response, StaticPart, WireFormat};
pub use server::Server;
pub use session::{CachePolicy, LruSessionStore, SessionId, SessionKeys, SessionStore};
pub use sizes::{RequestSizes, ResponseSizes};
