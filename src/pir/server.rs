//! PIR server: database owner, preprocessing and request handling.

use std::sync::Arc;

use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use tracing::{debug, info, warn};

use super::error::{pir_err, ProtocolError, Result};
use super::messages::{LinPirBlockResponse, PublicParams, Request, Response, StaticPart};
use super::session::{CachePolicy, LruSessionStore, SessionKeys, SessionStore};
use crate::database::Database;
use crate::linpir::{LinPirContext, LinPirServer};
use crate::lwe::LweMatrix;
use crate::math::random_seed;
use crate::params::Parameters;

/// State produced by [`Server::preprocess`]
struct Preprocessed {
    public_params: PublicParams,
    /// [`PublicParams::fingerprint`], checked on every request
    fingerprint: u64,
    linpir_ctx: LinPirContext,
    linpir: LinPirServer,
}

/// Hintless PIR server.
///
/// `handle_request` takes `&self` and may be called from many threads once
/// preprocessing has run.
pub struct Server {
    params: Parameters,
    database: Database,
    sessions: Arc<dyn SessionStore>,
    state: Option<Preprocessed>,
}

impl Server {
    /// Server over a random database, with the default session store
    pub fn create_with_random_database_records(params: &Parameters) -> Result<Self> {
        params.validate()?;
        let mut rng = ChaCha20Rng::from_entropy();
        let database = Database::random(params, &mut rng);
        Self::new(params, database)
    }

    /// Server over `database`, with the default session store
    pub fn new(params: &Parameters, database: Database) -> Result<Self> {
        let store = Arc::new(LruSessionStore::new(CachePolicy::default()));
        Self::with_session_store(params, database, store)
    }

    /// Server over `database`, caching session keys in `sessions`
    pub fn with_session_store(
        params: &Parameters,
        database: Database,
        sessions: Arc<dyn SessionStore>,
    ) -> Result<Self> {
        params.validate()?;
        if database.db_rows() != params.db_rows
            || database.db_cols() != params.db_cols
            || database.num_chunks() != params.num_chunks()
        {
            return Err(pir_err!(
                InvalidArgument,
                "database shape {}x{} with {} chunks does not match the parameters",
                database.db_rows(),
                database.db_cols(),
                database.num_chunks()
            ));
        }
        Ok(Self {
            params: params.clone(),
            database,
            sessions,
            state: None,
        })
    }

    /// Sample fresh seeds, compute the hint and run LinPIR preprocessing.
    ///
    /// Cached session keys belong to the previous public parameters and are
    /// dropped. On error the server keeps its previous state.
    pub fn preprocess(&mut self) -> Result<()> {
        let params = &self.params;
        let lwe_matrix_seed = random_seed();
        let linpir_seed = random_seed();

        let matrix = LweMatrix::from_seed(
            params.prng_kind,
            &lwe_matrix_seed,
            params.db_cols,
            params.lwe_secret_dim,
        );
        let hints: Vec<Vec<u32>> = (0..params.num_chunks())
            .map(|k| self.database.hint(k, &matrix))
            .collect();
        info!(
            chunks = hints.len(),
            rows = params.db_rows,
            lwe_dim = params.lwe_secret_dim,
            "hint computed"
        );

        let linpir_ctx = LinPirContext::new(params, &linpir_seed)?;
        let linpir = LinPirServer::preprocess(
            &linpir_ctx,
            &hints,
            params.linpir_params.precomputed_pads,
        );
        info!(
            blocks = linpir.num_outputs(),
            rotation_keys = linpir_ctx.num_rotation_keys(),
            precomputed_pads = linpir.num_precomputed(),
            "blocks encoded"
        );

        let public_params = PublicParams {
            params: params.clone(),
            lwe_matrix_seed,
            linpir_seed,
        };
        let fingerprint = public_params.fingerprint();
        self.state = Some(Preprocessed {
            public_params,
            fingerprint,
            linpir_ctx,
            linpir,
        });
        self.sessions.clear();
        info!(fingerprint, "public parameters ready");
        Ok(())
    }

    fn state(&self) -> Result<&Preprocessed> {
        self.state
            .as_ref()
            .ok_or_else(|| pir_err!(Precondition, "server has not been preprocessed"))
    }

    /// Public parameters for clients; available after preprocessing
    pub fn public_params(&self) -> Result<PublicParams> {
        Ok(self.state()?.public_params.clone())
    }

    pub fn params(&self) -> &Parameters {
        &self.params
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn session_store(&self) -> &dyn SessionStore {
        self.sessions.as_ref()
    }

    /// Answer one request.
    ///
    /// Keys carried by the request replace the cached keys of its session.
    /// A keyless request for an unknown session fails with
    /// [`ProtocolError::SessionDesync`], and a request built for earlier
    /// public parameters with [`ProtocolError::StaleParameters`].
    pub fn handle_request(&self, request: &Request) -> Result<Response> {
        let state = self.state()?;
        let ctx = &state.linpir_ctx;
        self.validate_request(ctx, request)?;
        if request.params_fingerprint != state.fingerprint {
            warn!(
                session_id = request.session_id,
                fingerprint = request.params_fingerprint,
                "request for stale public parameters"
            );
            return Err(ProtocolError::StaleParameters {
                request: request.params_fingerprint,
                current: state.fingerprint,
            }
            .into());
        }

        let session_id = request.session_id;
        let keys = match &request.keys {
            Some(bundle) => {
                let keys = Arc::new(SessionKeys::new(bundle.clone()));
                self.sessions.insert(session_id, Arc::clone(&keys));
                keys
            }
            None => match self.sessions.get(session_id) {
                Some(keys) => {
                    debug!(session_id, "session cache hit");
                    keys
                }
                None => {
                    warn!(session_id, "keyless request for an unknown session");
                    return Err(ProtocolError::SessionDesync { session_id }.into());
                }
            },
        };

        let mask = self.params.lwe_modulus_mask();
        let lwe_answers: Vec<Vec<u32>> = (0..self.database.num_chunks())
            .map(|k| {
                let mut ans = self.database.multiply(k, &request.lwe_query);
                ans.iter_mut().for_each(|v| *v &= mask);
                ans
            })
            .collect();

        let chain = state.linpir.mask_chain(ctx, request.pad_index);
        let bodies = state
            .linpir
            .evaluate(ctx, &chain, &request.linpir_query, keys.bundle());
        let include_static = request.keys.is_some() || request.needs_static;
        let linpir_responses = bodies
            .into_iter()
            .enumerate()
            .map(|(idx, b)| LinPirBlockResponse {
                b,
                a: if include_static {
                    StaticPart::Included(chain.output_mask(idx).clone())
                } else {
                    StaticPart::ReusePrior
                },
            })
            .collect();

        let response = Response {
            session_id,
            request_id: request.request_id,
            lwe_answers,
            linpir_responses,
        };
        if tracing::enabled!(tracing::Level::DEBUG) {
            if let Ok(sizes) = response.size_breakdown() {
                debug!(
                    session_id,
                    request_id = request.request_id,
                    pad_index = request.pad_index,
                    include_static,
                    %sizes,
                    "response assembled"
                );
            }
        }
        Ok(response)
    }

    fn validate_request(&self, ctx: &LinPirContext, request: &Request) -> Result<()> {
        if request.lwe_query.len() != self.params.db_cols {
            return Err(pir_err!(
                InvalidArgument,
                "LWE query has {} entries, expected {}",
                request.lwe_query.len(),
                self.params.db_cols
            ));
        }
        if request.linpir_query.len() != ctx.ts().len() {
            return Err(pir_err!(
                InvalidArgument,
                "LinPIR query has {} ciphertexts, expected {}",
                request.linpir_query.len(),
                ctx.ts().len()
            ));
        }
        let qs = ctx.ntt().moduli();
        if let Some(i) = request
            .linpir_query
            .iter()
            .position(|p| !ctx.check_poly(p, qs, true))
        {
            return Err(pir_err!(
                InvalidArgument,
                "LinPIR query ciphertext {} has the wrong shape",
                i
            ));
        }
        if let Some(bundle) = &request.keys {
            if !bundle.matches(ctx) {
                return Err(pir_err!(
                    InvalidArgument,
                    "Galois key bundle does not match the parameters"
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::RlweParameters;
    use crate::pir::PirError;

    fn small_params() -> Parameters {
        Parameters {
            db_rows: 16,
            db_cols: 32,
            db_record_bit_size: 20,
            lwe_secret_dim: 16,
            lwe_modulus_bit_size: 32,
            lwe_plaintext_bit_size: 8,
            lwe_error_variance: 8,
            linpir_params: RlweParameters {
                log_n: 5,
                rows_per_block: 16,
                ..RlweParameters::default()
            },
            ..Parameters::default()
        }
    }

    fn empty_request() -> Request {
        Request {
            session_id: 1,
            request_id: 0,
            params_fingerprint: 0,
            pad_index: 0,
            lwe_query: vec![0; 32],
            linpir_query: Vec::new(),
            keys: None,
            needs_static: false,
        }
    }

    #[test]
    fn test_server_is_sync() {
        fn assert_sync<T: Send + Sync>() {}
        assert_sync::<Server>();
    }

    #[test]
    fn test_precondition_before_preprocess() {
        let server = Server::create_with_random_database_records(&small_params()).unwrap();
        assert!(matches!(server.public_params(), Err(PirError::Precondition(_))));
        assert!(matches!(
            server.handle_request(&empty_request()),
            Err(PirError::Precondition(_))
        ));
    }

    #[test]
    fn test_database_shape_must_match() {
        let params = small_params();
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let other = Parameters {
            db_rows: 32,
            ..small_params()
        };
        let database = Database::random(&other, &mut rng);
        assert!(matches!(
            Server::new(&params, database),
            Err(PirError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_malformed_request_rejected() {
        let mut server = Server::create_with_random_database_records(&small_params()).unwrap();
        server.preprocess().unwrap();

        let mut short = empty_request();
        short.lwe_query.pop();
        assert!(matches!(
            server.handle_request(&short),
            Err(PirError::InvalidArgument(_))
        ));
        // right LWE length, no LinPIR ciphertexts
        assert!(matches!(
            server.handle_request(&empty_request()),
            Err(PirError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_request_for_other_fingerprint_rejected() {
        let params = small_params();
        let mut server = Server::create_with_random_database_records(&params).unwrap();
        server.preprocess().unwrap();
        let pp = server.public_params().unwrap();
        let mut client = crate::pir::Client::create(&params, &pp).unwrap();

        let mut request = client.generate_request(3).unwrap();
        assert_eq!(request.params_fingerprint, pp.fingerprint());
        request.params_fingerprint ^= 1;
        assert_eq!(
            server.handle_request(&request),
            Err(ProtocolError::StaleParameters {
                request: pp.fingerprint() ^ 1,
                current: pp.fingerprint(),
            }
            .into())
        );
        // rejected before any keys were cached
        assert!(server.session_store().is_empty());
    }

    #[test]
    fn test_preprocess_drops_cached_sessions() {
        let params = small_params();
        let mut server = Server::create_with_random_database_records(&params).unwrap();
        server.preprocess().unwrap();
        let first = server.public_params().unwrap();
        let mut client = crate::pir::Client::create(&params, &first).unwrap();
        server.handle_request(&client.generate_request(0).unwrap()).unwrap();
        assert_eq!(server.session_store().len(), 1);

        server.preprocess().unwrap();
        assert!(server.session_store().is_empty());
        assert_ne!(server.public_params().unwrap().fingerprint(), first.fingerprint());
    }

    #[test]
    fn test_public_params_reflect_preprocessing() {
        let params = small_params();
        let mut server = Server::create_with_random_database_records(&params).unwrap();
        server.preprocess().unwrap();
        let pp = server.public_params().unwrap();
        assert_eq!(pp.params, params);
        assert_ne!(pp.lwe_matrix_seed, pp.linpir_seed);
    }
}
