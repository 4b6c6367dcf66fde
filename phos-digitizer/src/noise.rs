//! Electronics noise sampling
//!
//! The merge engine draws one noise value per channel through the
//! [`NoiseSampler`] it is handed; it keeps no random state of its own.
//! Reproducible runs come from seeding [`GaussianNoise`].

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

/// Source of noise values in calibrated units
pub trait NoiseSampler: Send {
    /// Draw one value from Gaussian(0, `sigma`)
    fn sample(&mut self, sigma: f64) -> f64;
}

/// Gaussian noise from a seedable generator
#[derive(Debug, Clone)]
pub struct GaussianNoise {
    rng: StdRng,
}

impl GaussianNoise {
    /// Seeded generator, or entropy-seeded when `seed` is `None`
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng }
    }
}

impl NoiseSampler for GaussianNoise {
    fn sample(&mut self, sigma: f64) -> f64 {
        if sigma <= 0.0 {
            return 0.0;
        }
        let z: f64 = self.rng.sample(StandardNormal);
        z * sigma
    }
}

/// Always returns the same value; for deterministic digitization
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedNoise(pub f64);

impl NoiseSampler for FixedNoise {
    fn sample(&mut self, _sigma: f64) -> f64 {
        self.0
    }
}
