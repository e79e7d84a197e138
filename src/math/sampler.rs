//! Gaussian sampling for error generation

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

/// Samples beyond this many standard deviations are rejected.
const TAIL_CUT: f64 = 6.0;

/// Gaussian sampler for error polynomials and secrets
pub struct GaussianSampler {
    sigma: f64,
    rng: ChaCha20Rng,
}

impl GaussianSampler {
    /// Create a new Gaussian sampler with given standard deviation
    pub fn new(sigma: f64) -> Self {
        Self {
            sigma,
            rng: ChaCha20Rng::from_entropy(),
        }
    }

    /// Create a sampler from a variance, as parameter sets specify it
    pub fn from_variance(variance: f64) -> Self {
        Self::new(variance.sqrt())
    }

    /// Create a seeded sampler for reproducibility
    pub fn with_seed(sigma: f64, seed: u64) -> Self {
        Self {
            sigma,
            rng: ChaCha20Rng::seed_from_u64(seed),
        }
    }

    /// Sample from a rounded Gaussian using the Box-Muller transform,
    /// rejecting samples outside the tail cut
    pub fn sample(&mut self) -> i64 {
        if self.sigma == 0.0 {
            return 0;
        }
        let bound = TAIL_CUT * self.sigma;
        loop {
            let u1: f64 = self.rng.gen_range(f64::MIN_POSITIVE..1.0);
            let u2: f64 = self.rng.gen_range(0.0..1.0);

            let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
            let value = z * self.sigma;
            if value.abs() <= bound {
                return value.round() as i64;
            }
        }
    }

    /// Sample n signed Gaussian values
    pub fn sample_vec(&mut self, n: usize) -> Vec<i64> {
        (0..n).map(|_| self.sample()).collect()
    }

    /// Sample uniformly from {-1, 0, 1}
    pub fn sample_ternary(&mut self) -> i64 {
        self.rng.gen_range(-1..=1)
    }

    /// Access the underlying RNG for uniform sampling
    pub fn rng(&mut self) -> &mut ChaCha20Rng {
        &mut self.rng
    }

    /// Get the standard deviation
    pub fn sigma(&self) -> f64 {
        self.sigma
    }
}
