//! Sampling: uniform, ternary, and discrete Gaussian
//! distributions, plus the `AtLevel`/`ReadAndAdd` sampler conveniences.

use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use rand_distr::{Distribution, Normal};

use crate::modulus::Modulus;
use crate::ring::poly::Poly;

/// A seeded, cloneable PRNG stream. Cloning produces an *independent*
/// stream, which is
/// why this wraps a stored seed rather than the live generator state.
#[derive(Debug, Clone)]
pub struct Prng {
    rng: ChaCha20Rng,
}

impl Prng {
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Prng {
            rng: ChaCha20Rng::from_seed(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Prng {
            rng: ChaCha20Rng::from_entropy(),
        }
    }

    /// An independent stream derived from this one, without disturbing it.
    pub fn fork(&mut self) -> Prng {
        let mut seed = [0u8; 32];
        self.rng.fill_bytes(&mut seed);
        Prng::from_seed(seed)
    }

    pub fn inner(&mut self) -> &mut impl RngCore {
        &mut self.rng
    }
}

/// Uniform sampler over each RNS row's modulus.
pub struct UniformSampler;

impl UniformSampler {
    /// Fills `poly` (already allocated to the desired level/n) with
    /// uniform residues mod each row's prime.
    pub fn sample(prng: &mut Prng, moduli: &[Modulus], n: usize) -> Poly {
        let rows = moduli
            .iter()
            .map(|q| (0..n).map(|_| prng.inner().gen_range(0..q.q())).collect())
            .collect();
        Poly::from_rows(rows)
    }

    /// Adds fresh uniform noise into an existing polynomial in place
    /// ("ReadAndAdd" variant).
    pub fn read_and_add(prng: &mut Prng, moduli: &[Modulus], poly: &mut Poly) {
        for (row, q) in poly.rows_mut().iter_mut().zip(moduli.iter()) {
            for v in row.iter_mut() {
                *v = q.add(*v, prng.inner().gen_range(0..q.q()));
            }
        }
    }
}

/// The two ternary-secret parameterizations supported here.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub enum Ternary {
    /// Dense: independently zero with probability `density_of_zero`,
    /// otherwise ±1 with equal probability.
    Density { zero_probability: f64 },
    /// Sparse: exactly `hamming_weight` nonzero (±1) coefficients, placed
    /// uniformly at random, the rest zero.
    HammingWeight { hamming_weight: usize },
}

impl Ternary {
    pub fn sample_centered(&self, prng: &mut Prng, n: usize) -> Vec<i64> {
        match *self {
            Ternary::Density { zero_probability } => (0..n)
                .map(|_| {
                    let r: f64 = prng.inner().gen_range(0.0..1.0);
                    if r < zero_probability {
                        0
                    } else if r < zero_probability + (1.0 - zero_probability) / 2.0 {
                        1
                    } else {
                        -1
                    }
                })
                .collect(),
            Ternary::HammingWeight { hamming_weight } => {
                debug_assert!(hamming_weight <= n);
                let mut coeffs = vec![0i64; n];
                let mut positions: Vec<usize> = (0..n).collect();
                // Fisher-Yates partial shuffle to choose `hamming_weight`
                // distinct positions uniformly at random.
                for i in 0..hamming_weight {
                    let j = i + (prng.inner().next_u64() as usize) % (n - i);
                    positions.swap(i, j);
                    let sign = if prng.inner().next_u32() & 1 == 0 { 1 } else { -1 };
                    coeffs[positions[i]] = sign;
                }
                coeffs
            }
        }
    }

    /// Expected standard deviation of a coefficient drawn from this
    /// distribution, used by noise-analysis utilities.
    pub fn expected_std_dev(&self, n: usize) -> f64 {
        match *self {
            Ternary::Density { zero_probability } => (1.0 - zero_probability).sqrt(),
            Ternary::HammingWeight { hamming_weight } => (hamming_weight as f64 / n as f64).sqrt(),
        }
    }
}

/// Rejection-sampled discrete Gaussian bounded by `bound` (the practical
/// substitute for a full Ziggurat sampler: a Ziggurat
/// would only change the sampling algorithm, not the distribution's
/// moments, which is all downstream noise analysis depends on).
#[derive(Debug, Clone, Copy)]
pub struct DiscreteGaussian {
    pub sigma: f64,
    pub bound: f64,
}

impl DiscreteGaussian {
    pub fn new(sigma: f64, bound: f64) -> Self {
        DiscreteGaussian { sigma, bound }
    }

    pub fn sample_centered(&self, prng: &mut Prng, n: usize) -> Vec<i64> {
        let normal = Normal::new(0.0, self.sigma).expect("sigma must be positive and finite");
        (0..n)
            .map(|_| loop {
                let x = normal.sample(prng.inner());
                if x.abs() <= self.bound {
                    return x.round() as i64;
                }
            })
            .collect()
    }

    pub fn expected_std_dev(&self) -> f64 {
        self.sigma
    }
}
