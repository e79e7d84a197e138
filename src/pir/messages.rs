//! Wire messages exchanged between client and server.
//!
//! All messages derive serde traits; bincode is the reference encoding and
//! the one [`WireFormat`] uses.

use rand::RngCore;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::error::Result;
use super::session::SessionId;
use crate::linpir::GaloisKeyBundle;
use crate::math::prng::domain;
use crate::math::Poly;
use crate::params::Parameters;

/// Everything a client needs besides its own secrets.
///
/// Only seeds are published: the LWE matrix A and every RLWE pad are
/// re-expanded by the client. The hint never leaves the server.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PublicParams {
    pub params: Parameters,
    /// Expands to A, `db_cols × lwe_secret_dim`
    pub lwe_matrix_seed: [u8; 32],
    /// Expands to the query pads and the Galois key pads
    pub linpir_seed: [u8; 32],
}

impl PublicParams {
    /// Short identifier of the seeds, carried by every request
    pub fn fingerprint(&self) -> u64 {
        let kind = self.params.prng_kind;
        kind.expand(&self.lwe_matrix_seed, domain::FINGERPRINT, 0).next_u64()
            ^ kind.expand(&self.linpir_seed, domain::FINGERPRINT, 1).next_u64()
    }
}

/// One PIR query
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub session_id: SessionId,
    pub request_id: u64,
    /// [`PublicParams::fingerprint`] of the parameters the request was built for
    pub params_fingerprint: u64,
    /// Query pad the LinPIR bodies are encrypted against; never repeats
    /// within a session
    pub pad_index: u32,
    /// qu = A·s + e + Δ·u_col, `db_cols` entries
    pub lwe_query: Vec<u32>,
    /// Body of the encrypted LWE secret, one per plaintext modulus (NTT domain)
    pub linpir_query: Vec<Poly>,
    /// Key bodies, sent on the first request of a session
    pub keys: Option<GaloisKeyBundle>,
    /// Ask for the static response parts of `pad_index`
    pub needs_static: bool,
}

/// Static half of an output ciphertext: a function of the database and the
/// query pad, not of the query or the client's secret
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StaticPart {
    Included(Poly),
    /// Same as in an earlier response for the same pad index
    ReusePrior,
}

impl StaticPart {
    pub fn is_included(&self) -> bool {
        matches!(self, StaticPart::Included(_))
    }
}

/// Output ciphertext of one (plaintext modulus, block) pair
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinPirBlockResponse {
    /// Dynamic body modulo the output modulus (coefficient domain)
    pub b: Poly,
    pub a: StaticPart,
}

/// Answer to one [`Request`]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub session_id: SessionId,
    pub request_id: u64,
    /// ans_k = D_k·qu, one vector of `db_rows` entries per chunk
    pub lwe_answers: Vec<Vec<u32>>,
    /// (t, block) order
    pub linpir_responses: Vec<LinPirBlockResponse>,
}

/// bincode encoding of a wire message
pub trait WireFormat: Serialize + DeserializeOwned {
    fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}

impl WireFormat for PublicParams {}
impl WireFormat for Request {}
impl WireFormat for Response {}
