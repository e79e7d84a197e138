//! PIR client: query generation and record recovery.

use std::collections::{BTreeMap, HashMap};

use rand::Rng;
use tracing::debug;

use super::error::{pir_err, PirError, ProtocolError, Result};
use super::messages::{PublicParams, Request, Response, StaticPart};
use super::session::SessionId;
use crate::database::unpack_record;
use crate::linpir::{decrypt_block, encrypt_query, GaloisKeyBundle, LinPirContext};
use crate::lwe::{decode, encrypt_selection, LweMatrix, LweSecretKey};
use crate::math::{GaussianSampler, Poly};
use crate::params::Parameters;
use crate::rlwe::RlweSecretKey;

/// RLWE secret and cached server state of one session
struct Session {
    id: SessionId,
    z_ntt: Poly,
    /// Secret over the output modulus, for decryption
    z_out: Poly,
    keys: GaloisKeyBundle,
    keys_sent: bool,
    /// Lowest query pad not yet used under `z_ntt`
    next_pad: u32,
}

/// What a response needs from the request it answers
#[derive(Clone, Copy, Debug)]
struct Pending {
    index: usize,
    pad_index: u32,
}

/// Hintless PIR client
pub struct Client {
    params: Parameters,
    fingerprint: u64,
    lwe_matrix: LweMatrix,
    linpir: LinPirContext,
    lwe_sampler: GaussianSampler,
    rlwe_sampler: GaussianSampler,
    session: Session,
    /// Output masks by pad index, then (t, block) index. They depend on the
    /// database and the pad only, so they outlive sessions.
    static_parts: HashMap<u32, Vec<Option<Poly>>>,
    next_request_id: u64,
    /// The LWE secret is not kept: the LinPIR response carries H·s.
    pending: HashMap<u64, Pending>,
}

impl Client {
    /// Create a client for the server that published `public_params`
    pub fn create(params: &Parameters, public_params: &PublicParams) -> Result<Self> {
        params.validate()?;
        if public_params.params != *params {
            return Err(pir_err!(
                Configuration,
                "public parameters were generated for different parameters"
            ));
        }

        let lwe_matrix = LweMatrix::from_seed(
            params.prng_kind,
            &public_params.lwe_matrix_seed,
            params.db_cols,
            params.lwe_secret_dim,
        );
        let linpir = LinPirContext::new(params, &public_params.linpir_seed)?;
        let lwe_sampler = GaussianSampler::from_variance(params.lwe_error_variance as f64);
        let mut rlwe_sampler =
            GaussianSampler::from_variance(params.linpir_params.error_variance as f64);
        let session = Session::start(&linpir, &mut rlwe_sampler);

        Ok(Self {
            params: params.clone(),
            fingerprint: public_params.fingerprint(),
            lwe_matrix,
            linpir,
            lwe_sampler,
            rlwe_sampler,
            session,
            static_parts: HashMap::new(),
            next_request_id: 0,
            pending: HashMap::new(),
        })
    }

    pub fn session_id(&self) -> SessionId {
        self.session.id
    }

    /// Number of requests awaiting a response
    pub fn pending_requests(&self) -> usize {
        self.pending.len()
    }

    /// Start over with a new id, secret and keys.
    ///
    /// Pending requests are dropped. Cached static parts are kept.
    pub fn start_new_session(&mut self) {
        self.session = Session::start(&self.linpir, &mut self.rlwe_sampler);
        self.pending.clear();
        debug!(session_id = self.session.id, "new session started");
    }

    /// Attach the key bundle to the next request again
    pub fn resend_keys(&mut self) {
        self.session.keys_sent = false;
    }

    /// Build a request for record `index`
    pub fn generate_request(&mut self, index: usize) -> Result<Request> {
        let num_records = self.params.num_records();
        if index >= num_records {
            return Err(pir_err!(
                InvalidArgument,
                "record index {} out of range (num_records = {})",
                index,
                num_records
            ));
        }
        if self.session.next_pad == u32::MAX {
            self.start_new_session();
        }
        let pad_index = self.session.next_pad;
        self.session.next_pad += 1;

        let params = &self.params;
        let secret = LweSecretKey::generate_ternary(params.lwe_secret_dim, &mut self.lwe_sampler);
        let lwe_query = encrypt_selection(
            &self.lwe_matrix,
            &secret,
            index % params.db_cols,
            params.lwe_delta_log(),
            params.lwe_modulus_mask(),
            &mut self.lwe_sampler,
        );
        let linpir_query = encrypt_query(
            &self.linpir,
            pad_index,
            &self.session.z_ntt,
            &secret.coeffs,
            &mut self.rlwe_sampler,
        );

        let keys = (!self.session.keys_sent).then(|| self.session.keys.clone());
        self.session.keys_sent = true;
        let needs_static = !self
            .static_parts
            .get(&pad_index)
            .is_some_and(|parts| parts.iter().all(Option::is_some));

        let request_id = self.next_request_id;
        self.next_request_id += 1;
        self.pending.insert(request_id, Pending { index, pad_index });

        debug!(
            session_id = self.session.id,
            request_id,
            pad_index,
            with_keys = keys.is_some(),
            needs_static,
            "request generated"
        );
        Ok(Request {
            session_id: self.session.id,
            request_id,
            params_fingerprint: self.fingerprint,
            pad_index,
            lwe_query,
            linpir_query,
            keys,
            needs_static,
        })
    }

    /// Decode the record requested by the request `response` answers.
    ///
    /// The pending request is consumed whether or not decoding succeeds.
    pub fn recover_record(&mut self, response: &Response) -> Result<Vec<u8>> {
        let Pending { index, pad_index } = self
            .pending
            .remove(&response.request_id)
            .ok_or(ProtocolError::UnknownRequest {
                request_id: response.request_id,
            })?;
        self.validate_response(response)?;
        self.store_static_parts(pad_index, response)?;

        let params = &self.params;
        let layout = *self.linpir.layout();
        let row = index / params.db_cols;

        let mut decrypted: BTreeMap<usize, Vec<u32>> = BTreeMap::new();
        let mut values = Vec::with_capacity(params.num_chunks());
        for (k, answers) in response.lwe_answers.iter().enumerate() {
            let (block, local) = layout.locate(k * params.db_rows + row);
            if !decrypted.contains_key(&block) {
                let rows = self.decrypt_block(response, pad_index, block)?;
                decrypted.insert(block, rows);
            }
            let hint_product = decrypted[&block][local];
            let noisy = answers[row].wrapping_sub(hint_product) & params.lwe_modulus_mask();
            values.push(decode(
                noisy,
                params.lwe_delta_log(),
                params.lwe_plaintext_bit_size,
                params.lwe_modulus_mask(),
            ));
        }

        debug!(
            request_id = response.request_id,
            blocks_decrypted = decrypted.len(),
            "record recovered"
        );
        Ok(unpack_record(
            &values,
            params.db_record_bit_size,
            params.lwe_plaintext_bit_size as usize,
        ))
    }

    /// Merge the static parts of `response` into the cache of `pad_index`.
    ///
    /// Nothing is written unless every reused part is already cached.
    fn store_static_parts(&mut self, pad_index: u32, response: &Response) -> Result<()> {
        let cached = self.static_parts.get(&pad_index);
        let missing = response
            .linpir_responses
            .iter()
            .enumerate()
            .find(|(idx, block)| {
                matches!(block.a, StaticPart::ReusePrior)
                    && cached.and_then(|parts| parts[*idx].as_ref()).is_none()
            });
        if let Some((block, _)) = missing {
            return Err(ProtocolError::MissingStaticComponent { block }.into());
        }

        if response.linpir_responses.iter().any(|b| b.a.is_included()) {
            let num_outputs = response.linpir_responses.len();
            let parts = self
                .static_parts
                .entry(pad_index)
                .or_insert_with(|| vec![None; num_outputs]);
            for (slot, block) in parts.iter_mut().zip(&response.linpir_responses) {
                if let StaticPart::Included(a) = &block.a {
                    *slot = Some(a.clone());
                }
            }
        }
        Ok(())
    }

    /// H·s for every row of `block`
    fn decrypt_block(&self, response: &Response, pad_index: u32, block: usize) -> Result<Vec<u32>> {
        let nb = self.linpir.layout().num_blocks;
        let cached = self.static_parts.get(&pad_index);
        let mut parts = Vec::with_capacity(self.linpir.ts().len());
        for t_idx in 0..self.linpir.ts().len() {
            let idx = t_idx * nb + block;
            let a = cached
                .and_then(|masks| masks[idx].as_ref())
                .ok_or(ProtocolError::MissingStaticComponent { block: idx })?;
            parts.push((a, &response.linpir_responses[idx].b));
        }
        decrypt_block(&self.linpir, &self.session.z_out, &parts)
    }

    fn validate_response(&self, response: &Response) -> Result<()> {
        let malformed = |msg: String| -> PirError { ProtocolError::MalformedResponse(msg).into() };
        if response.session_id != self.session.id {
            return Err(malformed(format!(
                "session {:#x} does not match the current session {:#x}",
                response.session_id, self.session.id
            )));
        }

        let params = &self.params;
        if response.lwe_answers.len() != params.num_chunks()
            || response
                .lwe_answers
                .iter()
                .any(|ans| ans.len() != params.db_rows)
        {
            return Err(malformed(format!(
                "expected {} LWE answers of {} entries",
                params.num_chunks(),
                params.db_rows
            )));
        }

        let expected = self.linpir.ts().len() * self.linpir.layout().num_blocks;
        if response.linpir_responses.len() != expected {
            return Err(malformed(format!(
                "{} LinPIR ciphertexts, expected {}",
                response.linpir_responses.len(),
                expected
            )));
        }
        let out = self.linpir.output_ntt().moduli();
        for (idx, block) in response.linpir_responses.iter().enumerate() {
            let a_ok = match &block.a {
                StaticPart::Included(a) => self.linpir.check_poly(a, out, false),
                StaticPart::ReusePrior => true,
            };
            if !a_ok || !self.linpir.check_poly(&block.b, out, false) {
                return Err(malformed(format!("LinPIR ciphertext {} has the wrong shape", idx)));
            }
        }
        Ok(())
    }
}

impl Session {
    fn start(linpir: &LinPirContext, sampler: &mut GaussianSampler) -> Self {
        let id = sampler.rng().gen();
        let z = RlweSecretKey::generate_ternary(linpir.layout().ring_dim, sampler);
        let z_ntt = z.to_ntt(linpir.ntt());
        let z_out = z.to_ntt(linpir.output_ntt());
        let keys = GaloisKeyBundle::generate(linpir, &z_ntt, sampler);
        Self {
            id,
            z_ntt,
            z_out,
            keys,
            keys_sent: false,
            next_pad: 0,
        }
    }
}
