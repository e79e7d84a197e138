//! End-to-end PIR correctness tests
//!
//! Preprocess → GenerateRequest → HandleRequest → RecoverRecord = Original Record

use hintless_pir::database::Database;
use hintless_pir::lwe::LweMatrix;
use hintless_pir::math::{ModQ, NttContext};
use hintless_pir::params::{Parameters, RlweParameters};
use hintless_pir::pir::{Client, PirError, Server, StaticPart, WireFormat};
use hintless_pir::rlwe::{decode_bfv, BatchEncoder};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn test_params() -> Parameters {
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

fn setup(params: &Parameters) -> (Server, Client) {
    init_tracing();
    let mut server = Server::create_with_random_database_records(params).unwrap();
    server.preprocess().unwrap();
    let client = Client::create(params, &server.public_params().unwrap()).unwrap();
    (server, client)
}

fn fetch(server: &Server, client: &mut Client, index: usize) -> Vec<u8> {
    let request = client.generate_request(index).unwrap();
    let response = server.handle_request(&request).unwrap();
    client.recover_record(&response).unwrap()
}

#[test]
fn test_e2e_repeated_random_queries() {
    let params = test_params();
    let (server, mut client) = setup(&params);
    let mut rng = rand::thread_rng();

    for _ in 0..12 {
        let index = rng.gen_range(0..params.num_records());
        let record = fetch(&server, &mut client, index);
        assert_eq!(record, server.database().record(index).unwrap(), "record {}", index);
    }
}

#[test]
fn test_e2e_explicit_records() {
    init_tracing();
    let params = test_params();
    // 20-bit records: three bytes, top nibble clear
    let records: Vec<Vec<u8>> = (0..params.num_records())
        .map(|i| vec![(i * 7) as u8, (i * 13 + 5) as u8, (i % 16) as u8])
        .collect();
    let database = Database::from_records(&params, &records).unwrap();
    let mut server = Server::new(&params, database).unwrap();
    server.preprocess().unwrap();
    let mut client = Client::create(&params, &server.public_params().unwrap()).unwrap();

    for index in [0, 1, 31, 32, 200, 511] {
        assert_eq!(fetch(&server, &mut client, index), records[index], "record {}", index);
    }
}

#[test]
fn test_e2e_short_records_are_zero_padded() {
    init_tracing();
    let params = test_params();
    let records = vec![vec![0xab], vec![], vec![1, 2]];
    let database = Database::from_records(&params, &records).unwrap();
    let mut server = Server::new(&params, database).unwrap();
    server.preprocess().unwrap();
    let mut client = Client::create(&params, &server.public_params().unwrap()).unwrap();

    assert_eq!(fetch(&server, &mut client, 0), vec![0xab, 0, 0]);
    assert_eq!(fetch(&server, &mut client, 1), vec![0, 0, 0]);
    assert_eq!(fetch(&server, &mut client, 2), vec![1, 2, 0]);
    assert_eq!(fetch(&server, &mut client, 300), vec![0, 0, 0]);
}

#[test]
fn test_e2e_index_boundaries() {
    let params = test_params();
    let (server, mut client) = setup(&params);
    let n = params.num_records();

    assert_eq!(fetch(&server, &mut client, 0), server.database().record(0).unwrap());
    assert_eq!(fetch(&server, &mut client, n - 1), server.database().record(n - 1).unwrap());
    assert!(matches!(
        client.generate_request(n),
        Err(PirError::InvalidArgument(_))
    ));
}

#[test]
fn test_e2e_full_ring_blocks() {
    // n = 64 and one block per chunk, filling both halves of the slots
    let mut params = test_params();
    params.db_rows = 64;
    params.linpir_params.log_n = 6;
    params.linpir_params.rows_per_block = 64;
    let (server, mut client) = setup(&params);

    for index in [0, 33, 1000, params.num_records() - 1] {
        assert_eq!(
            fetch(&server, &mut client, index),
            server.database().record(index).unwrap(),
            "record {}",
            index
        );
    }
}

#[test]
fn test_e2e_single_chunk_records() {
    let mut params = test_params();
    params.db_record_bit_size = 8;
    let (server, mut client) = setup(&params);
    for index in [3, 77, 400] {
        assert_eq!(fetch(&server, &mut client, index), server.database().record(index).unwrap());
    }
}

#[test]
fn test_decomposed_response_decodes_like_full_response() {
    let params = test_params();
    let (server, mut client) = setup(&params);
    let index = 123;
    let expected = server.database().record(index).unwrap();

    // a first session collects the static parts of pads 0 and 1
    assert_eq!(fetch(&server, &mut client, index), expected);
    assert_eq!(fetch(&server, &mut client, index), expected);

    client.start_new_session();
    assert_eq!(fetch(&server, &mut client, index), expected);
    let request = client.generate_request(index).unwrap();
    assert_eq!(request.pad_index, 1);
    assert!(request.keys.is_none());
    assert!(!request.needs_static);
    let reused = server.handle_request(&request).unwrap();
    let full = server
        .handle_request(&hintless_pir::Request {
            needs_static: true,
            ..request.clone()
        })
        .unwrap();

    assert!(reused
        .linpir_responses
        .iter()
        .all(|block| block.a == StaticPart::ReusePrior));
    assert!(full.linpir_responses.iter().all(|block| block.a.is_included()));
    for (r, f) in reused.linpir_responses.iter().zip(&full.linpir_responses) {
        assert_eq!(r.b, f.b);
    }
    assert_eq!(reused.lwe_answers, full.lwe_answers);

    assert_eq!(client.recover_record(&reused).unwrap(), expected);
}

#[test]
fn test_communication_shrinks_after_first_request() {
    let params = test_params();
    let (server, mut client) = setup(&params);
    fetch(&server, &mut client, 1);
    fetch(&server, &mut client, 2);
    client.start_new_session();

    let first = client.generate_request(5).unwrap();
    let first_response = server.handle_request(&first).unwrap();
    client.recover_record(&first_response).unwrap();
    let second = client.generate_request(6).unwrap();
    let second_response = server.handle_request(&second).unwrap();
    client.recover_record(&second_response).unwrap();

    let (q1, q2) = (first.size_breakdown().unwrap(), second.size_breakdown().unwrap());
    assert!(q1.keys > 0);
    assert_eq!(q2.keys, 0);
    assert_eq!(q1.total - q2.total, q1.keys);
    assert!(q1.keys >= 2 * params.linpir_params.key_bytes());

    let (r1, r2) = (
        first_response.size_breakdown().unwrap(),
        second_response.size_breakdown().unwrap(),
    );
    assert!(r1.linpir_static > 0);
    assert_eq!(r2.linpir_static, 0);
    assert_eq!(r1.total - r2.total, r1.linpir_static);
    assert_eq!(r1.linpir_dynamic, r2.linpir_dynamic);

    let pp = server.public_params().unwrap();
    assert!(pp.byte_size().unwrap() < 256);
}

#[test]
fn test_session_queries_hide_selected_columns() {
    let params = test_params();
    let (server, mut client) = setup(&params);
    let pp = server.public_params().unwrap();
    let rp = &params.linpir_params;
    let (n, k, cols) = (rp.ring_dim(), params.lwe_secret_dim, params.db_cols);

    let first = client.generate_request(3 * cols + 7).unwrap();
    let second = client.generate_request(11 * cols + 21).unwrap();
    assert_eq!(first.session_id, second.session_id);
    assert_ne!(first.pad_index, second.pad_index);

    // a server subtracts the two bodies and decodes the difference
    let ntt = NttContext::with_moduli(n, &rp.qs);
    let t = rp.ts[0];
    let diff = (&first.linpir_query[0] - &second.linpir_query[0]).from_ntt_new(&ntt);
    let slots = BatchEncoder::new(n, t).decode(&decode_bfv(&diff, t));
    let guess: Vec<i64> = slots[..k].iter().map(|&v| ModQ::to_signed(v, t)).collect();

    // then strips A·guess from the difference of the LWE queries
    let matrix = LweMatrix::from_seed(params.prng_kind, &pp.lwe_matrix_seed, cols, k);
    let half_delta = 1i64 << (params.lwe_delta_log() - 1);
    let small = (0..cols)
        .filter(|&c| {
            let a_guess = matrix
                .row(c)
                .iter()
                .zip(&guess)
                .fold(0u32, |acc, (&a, &g)| acc.wrapping_add(a.wrapping_mul(g as u32)));
            let residual = first.lwe_query[c]
                .wrapping_sub(second.lwe_query[c])
                .wrapping_sub(a_guess);
            (residual as i32 as i64).abs() < half_delta
        })
        .count();
    // under a shared pad all but the two queried columns come out small
    assert!(small < cols / 2, "{} of {} columns are noise-sized", small, cols);

    for request in [&first, &second] {
        let response = server.handle_request(request).unwrap();
        client.recover_record(&response).unwrap();
    }
}

#[test]
fn test_wire_roundtrip() {
    let params = test_params();
    let (server, _) = setup(&params);

    let pp_bytes = server.public_params().unwrap().to_bytes().unwrap();
    let pp = hintless_pir::PublicParams::from_bytes(&pp_bytes).unwrap();
    let mut client = Client::create(&params, &pp).unwrap();

    let index = 250;
    let request_bytes = client.generate_request(index).unwrap().to_bytes().unwrap();
    let request = hintless_pir::Request::from_bytes(&request_bytes).unwrap();
    let response_bytes = server.handle_request(&request).unwrap().to_bytes().unwrap();
    let response = hintless_pir::Response::from_bytes(&response_bytes).unwrap();

    assert_eq!(
        client.recover_record(&response).unwrap(),
        server.database().record(index).unwrap()
    );
}

#[test]
fn test_concurrent_sessions() {
    let params = test_params();
    init_tracing();
    let mut server = Server::create_with_random_database_records(&params).unwrap();
    server.preprocess().unwrap();
    let pp = server.public_params().unwrap();

    std::thread::scope(|scope| {
        for worker in 0..4usize {
            let (server, pp, params) = (&server, &pp, &params);
            scope.spawn(move || {
                let mut client = Client::create(params, pp).unwrap();
                for i in 0..3 {
                    let index = (worker * 97 + i * 31) % params.num_records();
                    assert_eq!(
                        fetch(server, &mut client, index),
                        server.database().record(index).unwrap()
                    );
                }
            });
        }
    });
    assert_eq!(server.session_store().len(), 4);
}

#[test]
fn test_preconditions() {
    init_tracing();
    let params = test_params();
    let server = Server::create_with_random_database_records(&params).unwrap();
    assert!(matches!(server.public_params(), Err(PirError::Precondition(_))));

    // a request from a client bound to another server
    let mut other = Server::create_with_random_database_records(&params).unwrap();
    other.preprocess().unwrap();
    let mut client = Client::create(&params, &other.public_params().unwrap()).unwrap();
    let request = client.generate_request(0).unwrap();
    assert!(matches!(
        server.handle_request(&request),
        Err(PirError::Precondition(_))
    ));
}

#[test]
fn test_parameter_validation() {
    let mut params = test_params();
    params.linpir_params.rows_per_block = 12;
    assert!(matches!(
        Server::create_with_random_database_records(&params),
        Err(PirError::Configuration(_))
    ));

    let mut params = test_params();
    params.lwe_error_variance = 1 << 24;
    assert!(matches!(
        Server::create_with_random_database_records(&params),
        Err(PirError::Configuration(_))
    ));

    let mut params = test_params();
    params.linpir_params.error_variance = 1 << 40;
    assert!(matches!(
        Server::create_with_random_database_records(&params),
        Err(PirError::Configuration(_))
    ));

    let params = test_params();
    let mut server = Server::create_with_random_database_records(&params).unwrap();
    server.preprocess().unwrap();
    let mut other = params.clone();
    other.db_cols = 64;
    assert!(matches!(
        Client::create(&other, &server.public_params().unwrap()),
        Err(PirError::Configuration(_))
    ));
}

#[test]
fn test_record_lookup_is_byte_exact() {
    let params = test_params();
    let mut rng = ChaCha20Rng::seed_from_u64(11);
    let database = Database::random(&params, &mut rng);
    for index in 0..params.num_records() {
        let record = database.record(index).unwrap();
        assert_eq!(record.len(), 3);
        assert_eq!(record[2] >> 4, 0);
    }
}
