//! Parameter sets for hintless PIR
//!
//! A [`Parameters`] value is constructed once, validated once, and then
//! shared by the database encoder, the server and the client. Validation
//! checks both structural constraints (shapes, divisibility, NTT-friendly
//! moduli) and the numeric noise invariants of the LWE and LinPIR layers.

use serde::{Deserialize, Serialize};

use crate::math::{is_prime, CrtBasis};
use crate::pir::error::{pir_err, Result};

pub use crate::math::PrngKind;

/// Decryption must hold at this many standard deviations of the estimated noise.
const NOISE_TAIL_FACTOR: f64 = 8.0;

/// RLWE parameters for the LinPIR sub-protocol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RlweParameters {
    /// log2 of the ring dimension n
    pub log_n: usize,

    /// RNS ciphertext moduli; each prime, ≡ 1 (mod 2n).
    /// Responses are modulus-switched down by dropping the last one.
    pub qs: Vec<u64>,

    /// Plaintext moduli; each prime, ≡ 1 (mod 2n) for SIMD batching.
    /// Their product bounds the exactly recoverable hint products.
    pub ts: Vec<u64>,

    /// log2 of the gadget base, one per modulus in `qs`
    pub gadget_log_bs: Vec<u32>,

    /// Variance of the RLWE error distribution
    pub error_variance: u64,

    /// Seed expansion for public pads
    pub prng_kind: PrngKind,

    /// Hint rows evaluated by one homomorphic pass (at most n)
    pub rows_per_block: usize,

    /// Query pads whose mask chain the server evaluates during preprocessing.
    /// Requests with a higher pad index run the whole chain online.
    pub precomputed_pads: u32,
}

/// Full protocol parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    /// Database rows
    pub db_rows: usize,

    /// Database columns
    pub db_cols: usize,

    /// Bits per record
    pub db_record_bit_size: usize,

    /// LWE secret dimension (must divide n/2)
    pub lwe_secret_dim: usize,

    /// LWE ciphertext modulus is 2^lwe_modulus_bit_size (at most 32)
    pub lwe_modulus_bit_size: u32,

    /// LWE plaintext modulus is 2^lwe_plaintext_bit_size
    pub lwe_plaintext_bit_size: u32,

    /// Variance of the LWE error distribution
    pub lwe_error_variance: u64,

    /// LinPIR parameters
    pub linpir_params: RlweParameters,

    /// Seed expansion for the LWE matrix
    pub prng_kind: PrngKind,
}

impl Default for RlweParameters {
    fn default() -> Self {
        Self {
            log_n: 12,
            qs: vec![35184371884033, 35184371703809], // 90 bits
            ts: vec![3072001, 3022849],               // 43 bits
            gadget_log_bs: vec![16, 16],
            error_variance: 8,
            prng_kind: PrngKind::ChaCha20,
            rows_per_block: 1024,
            precomputed_pads: 1,
        }
    }
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            db_rows: 1024,
            db_cols: 1024,
            db_record_bit_size: 64,
            lwe_secret_dim: 1024,
            lwe_modulus_bit_size: 32,
            lwe_plaintext_bit_size: 8,
            lwe_error_variance: 8,
            linpir_params: RlweParameters::default(),
            prng_kind: PrngKind::ChaCha20,
        }
    }
}

impl RlweParameters {
    /// Ring dimension n
    pub fn ring_dim(&self) -> usize {
        1 << self.log_n
    }

    /// Gadget digits for modulus `idx`: ⌈log2(q_idx) / log_b_idx⌉
    pub fn gadget_digits(&self, idx: usize) -> usize {
        let bits = 64 - self.qs[idx].leading_zeros();
        bits.div_ceil(self.gadget_log_bs[idx]) as usize
    }

    /// Total gadget length across all moduli
    pub fn gadget_len(&self) -> usize {
        (0..self.qs.len()).map(|i| self.gadget_digits(i)).sum()
    }

    /// Moduli left after the response is modulus-switched
    pub fn output_moduli(&self) -> &[u64] {
        &self.qs[..self.qs.len().saturating_sub(1)]
    }

    /// Bytes of one coefficient vector per modulus
    pub fn modulus_bytes(&self) -> usize {
        self.ring_dim() * std::mem::size_of::<u64>()
    }

    /// Raw bytes of one RLWE ciphertext over the full modulus
    pub fn ciphertext_bytes(&self) -> usize {
        2 * self.qs.len() * self.modulus_bytes()
    }

    /// Raw bytes of one modulus-switched response ciphertext
    pub fn output_ciphertext_bytes(&self) -> usize {
        2 * self.output_moduli().len() * self.modulus_bytes()
    }

    /// Raw bytes of the transmitted half of one Galois key
    pub fn key_bytes(&self) -> usize {
        self.gadget_len() * self.qs.len() * self.modulus_bytes()
    }
}

impl Parameters {
    /// Default parameters with a different database shape
    pub fn with_db_shape(db_rows: usize, db_cols: usize) -> Self {
        Self {
            db_rows,
            db_cols,
            ..Self::default()
        }
    }

    /// Number of records
    pub fn num_records(&self) -> usize {
        self.db_rows * self.db_cols
    }

    /// Plaintext values per record: ⌈record bits / plaintext bits⌉
    pub fn num_chunks(&self) -> usize {
        self.db_record_bit_size
            .div_ceil(self.lwe_plaintext_bit_size as usize)
    }

    /// Bytes per record
    pub fn record_bytes(&self) -> usize {
        self.db_record_bit_size.div_ceil(8)
    }

    /// Mask reducing a wrapping `u32` modulo the LWE modulus
    pub fn lwe_modulus_mask(&self) -> u32 {
        if self.lwe_modulus_bit_size >= 32 {
            u32::MAX
        } else {
            (1u32 << self.lwe_modulus_bit_size) - 1
        }
    }

    /// log2 of the LWE scaling factor Δ = q / p
    pub fn lwe_delta_log(&self) -> u32 {
        self.lwe_modulus_bit_size - self.lwe_plaintext_bit_size
    }

    /// LinPIR blocks per plaintext modulus
    pub fn num_blocks(&self) -> usize {
        self.num_chunks() * self.db_rows / self.linpir_params.rows_per_block
    }

    /// Baby-step count g = ⌈√k⌉ for the diagonal evaluation
    pub fn baby_steps(&self) -> usize {
        let k = self.lwe_secret_dim;
        let mut g = (k as f64).sqrt() as usize;
        while g * g < k {
            g += 1;
        }
        g.max(1)
    }

    /// Giant-step count ⌈k / g⌉
    pub fn giant_steps(&self) -> usize {
        self.lwe_secret_dim.div_ceil(self.baby_steps())
    }

    /// log2 of the estimated LWE decryption noise standard deviation
    pub fn lwe_noise_log2(&self) -> f64 {
        let p = 2f64.powi(self.lwe_plaintext_bit_size as i32);
        let var = self.db_cols as f64 * (p * p / 3.0) * self.lwe_error_variance as f64;
        0.5 * var.max(1.0).log2()
    }

    /// log2 of the estimated LinPIR output noise standard deviation after
    /// modulus switching.
    ///
    /// Accounts for key-switching noise along the baby-step chain,
    /// plaintext-ciphertext products (including the BFV carry term), the
    /// giant-step rotations and the final rounding.
    pub fn linpir_noise_log2(&self) -> f64 {
        let rp = &self.linpir_params;
        let n = rp.ring_dim() as f64;
        let sigma2 = rp.error_variance as f64;
        let t = rp.ts.iter().copied().max().unwrap_or(0) as f64;
        let k = self.lwe_secret_dim as f64;
        let b = 2f64.powi(rp.gadget_log_bs.iter().copied().max().unwrap_or(0) as i32);
        let q_last = rp.qs.last().copied().unwrap_or(1) as f64;

        let var_ks = rp.gadget_len() as f64 * n * (b * b / 3.0) * sigma2;
        let var_baby = sigma2 + (self.baby_steps() as f64 - 1.0) * var_ks;
        let var_inner = k * (n * t * t / 12.0 * var_baby + n * t.powi(4) / 36.0);
        let var_total = var_inner + (self.giant_steps() as f64 - 1.0) * var_ks;
        let var_out = var_total / (q_last * q_last) + (1.0 + 2.0 * n / 3.0) / 12.0;
        0.5 * var_out.log2()
    }

    /// Tail bound on |H·s| for the centered hint H and a ternary secret s.
    ///
    /// Entries of H are uniform modulo 2^w, with variance 2^{2w}/12, and a
    /// coordinate of s is nonzero with probability 2/3. The bound is
    /// `NOISE_TAIL_FACTOR` standard deviations of the sum, capped by the
    /// worst case k·2^{w-1}.
    pub fn hint_product_bound(&self) -> u128 {
        let k = self.lwe_secret_dim as f64;
        let q = 2f64.powi(self.lwe_modulus_bit_size as i32);
        let sigma = (2.0 * k / 3.0).sqrt() * q / 12f64.sqrt();
        let tail = (NOISE_TAIL_FACTOR * sigma).ceil() as u128;
        let worst = (self.lwe_secret_dim as u128) << self.lwe_modulus_bit_size.saturating_sub(1);
        tail.min(worst)
    }

    /// Validate all structural and numeric invariants
    pub fn validate(&self) -> Result<()> {
        self.validate_shape()?;
        self.validate_moduli()?;
        self.validate_noise()
    }

    fn validate_shape(&self) -> Result<()> {
        let rp = &self.linpir_params;
        if self.db_rows == 0 || self.db_cols == 0 {
            return Err(pir_err!(Configuration, "database dimensions must be positive"));
        }
        if self.db_record_bit_size == 0 {
            return Err(pir_err!(Configuration, "db_record_bit_size must be positive"));
        }
        if self.lwe_secret_dim == 0 {
            return Err(pir_err!(Configuration, "lwe_secret_dim must be positive"));
        }
        if self.lwe_modulus_bit_size == 0 || self.lwe_modulus_bit_size > 32 {
            return Err(pir_err!(
                Configuration,
                "lwe_modulus_bit_size must be in 1..=32, got {}",
                self.lwe_modulus_bit_size
            ));
        }
        if self.lwe_plaintext_bit_size == 0
            || self.lwe_plaintext_bit_size >= self.lwe_modulus_bit_size
        {
            return Err(pir_err!(
                Configuration,
                "lwe_plaintext_bit_size must be in 1..{}, got {}",
                self.lwe_modulus_bit_size,
                self.lwe_plaintext_bit_size
            ));
        }
        if rp.log_n < 2 || rp.log_n > 17 {
            return Err(pir_err!(Configuration, "log_n must be in 2..=17, got {}", rp.log_n));
        }
        let n = rp.ring_dim();
        if rp.rows_per_block == 0 || rp.rows_per_block > n {
            return Err(pir_err!(
                Configuration,
                "rows_per_block must be in 1..={}, got {}",
                n,
                rp.rows_per_block
            ));
        }
        if self.db_rows % rp.rows_per_block != 0 {
            return Err(pir_err!(
                Configuration,
                "db_rows ({}) must be divisible by rows_per_block ({})",
                self.db_rows,
                rp.rows_per_block
            ));
        }
        if (n / 2) % self.lwe_secret_dim != 0 {
            return Err(pir_err!(
                Configuration,
                "lwe_secret_dim ({}) must divide n/2 ({})",
                self.lwe_secret_dim,
                n / 2
            ));
        }
        Ok(())
    }

    fn validate_moduli(&self) -> Result<()> {
        let rp = &self.linpir_params;
        let two_n = 2 * rp.ring_dim() as u64;

        if rp.qs.len() != 2 {
            return Err(pir_err!(
                Configuration,
                "qs must hold exactly two moduli (one is dropped for the response), got {}",
                rp.qs.len()
            ));
        }
        if rp.gadget_log_bs.len() != rp.qs.len() {
            return Err(pir_err!(Configuration, "gadget_log_bs must have one entry per modulus"));
        }
        if rp.gadget_log_bs.iter().any(|&b| b == 0 || b > 32) {
            return Err(pir_err!(Configuration, "gadget log bases must be in 1..=32"));
        }
        if rp.ts.is_empty() {
            return Err(pir_err!(Configuration, "ts must be non-empty"));
        }

        for (name, moduli) in [("q", &rp.qs), ("t", &rp.ts)] {
            for &m in moduli.iter() {
                if m >= 1 << 62 {
                    return Err(pir_err!(Configuration, "{} = {} exceeds 62 bits", name, m));
                }
                if m % two_n != 1 {
                    return Err(pir_err!(Configuration, "{} = {} is not 1 mod 2n", name, m));
                }
                if !is_prime(m) {
                    return Err(pir_err!(Configuration, "{} = {} is not prime", name, m));
                }
            }
        }
        let mut all: Vec<u64> = rp.qs.iter().chain(&rp.ts).copied().collect();
        all.sort_unstable();
        all.dedup();
        if all.len() != rp.qs.len() + rp.ts.len() {
            return Err(pir_err!(Configuration, "moduli must be pairwise distinct"));
        }

        let q_min = rp.qs.iter().copied().min().unwrap_or(0);
        if rp.ts.iter().any(|&t| t >= q_min) {
            return Err(pir_err!(Configuration, "every t must be below every q"));
        }
        if rp.gadget_log_bs.iter().any(|&b| 1u64 << b >= q_min) {
            return Err(pir_err!(Configuration, "gadget bases must be below every q"));
        }

        let t_basis = CrtBasis::new(&rp.ts)
            .ok_or_else(|| pir_err!(Configuration, "product of ts exceeds 127 bits"))?;
        // centered CRT recovery of H·s needs |H·s| < ∏t / 2
        let bound = self.hint_product_bound();
        if t_basis.product() <= 2 * bound {
            return Err(pir_err!(
                Configuration,
                "product of ts ({}) must exceed twice the hint product bound ({})",
                t_basis.product(),
                bound
            ));
        }
        Ok(())
    }

    fn validate_noise(&self) -> Result<()> {
        let rp = &self.linpir_params;

        let lwe_margin = (self.lwe_delta_log() - 1) as f64;
        let lwe_noise = self.lwe_noise_log2() + NOISE_TAIL_FACTOR.log2();
        if lwe_noise >= lwe_margin {
            return Err(pir_err!(
                Configuration,
                "LWE noise (2^{:.1}) exceeds half the scaling factor (2^{:.1}); \
                 lwe_error_variance is too large for the LWE modulus",
                lwe_noise,
                lwe_margin
            ));
        }

        let q_out: f64 = rp.output_moduli().iter().map(|&q| q as f64).product();
        let t_max = rp.ts.iter().copied().max().unwrap_or(1) as f64;
        let linpir_margin = (q_out / (2.0 * t_max)).log2();
        let linpir_noise = self.linpir_noise_log2() + NOISE_TAIL_FACTOR.log2();
        if linpir_noise >= linpir_margin {
            return Err(pir_err!(
                Configuration,
                "LinPIR noise (2^{:.1}) exceeds the decoding margin (2^{:.1}); \
                 moduli are too small for the error variance and gadget base",
                linpir_noise,
                linpir_margin
            ));
        }
        Ok(())
    }
}
